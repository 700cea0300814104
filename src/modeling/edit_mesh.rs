//! Stored mesh form for edit sessions.
//!
//! `EditMesh` is an indexed polygon list with per-element selection flags.
//! It is the payload an entity references through `EditableMesh` and the
//! form every session backup is kept in. The triangle list is a derived
//! cache: rebuild it with `recompute_triangles` after changing `faces`.

use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use std::collections::HashSet;

/// Index of a polygon face in the mesh.
pub type FaceIndex = usize;

/// Canonical edge representation (lower vertex index first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(pub u32, pub u32);

impl Edge {
    /// Create a canonical edge with the lower index first.
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b { Edge(a, b) } else { Edge(b, a) }
    }
}

/// Indexed polygon mesh with selection state.
#[derive(Asset, TypePath, Debug, Clone, Default, PartialEq)]
pub struct EditMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Counter-clockwise vertex loops, three or more vertices each.
    pub faces: Vec<Vec<u32>>,
    pub vertex_select: Vec<bool>,
    pub face_select: Vec<bool>,
    pub selected_edges: HashSet<Edge>,
    /// Fan triangulation of `faces`.
    pub triangles: Vec<[u32; 3]>,
}

impl EditMesh {
    /// Build a mesh from positions and polygons with nothing selected.
    pub fn from_polygons(positions: Vec<Vec3>, faces: Vec<Vec<u32>>) -> Self {
        let vertex_count = positions.len();
        let face_count = faces.len();
        let mut mesh = EditMesh {
            positions,
            normals: vec![Vec3::ZERO; vertex_count],
            uvs: vec![Vec2::ZERO; vertex_count],
            faces,
            vertex_select: vec![false; vertex_count],
            face_select: vec![false; face_count],
            selected_edges: HashSet::new(),
            triangles: Vec::new(),
        };
        mesh.recompute_normals();
        mesh.recompute_triangles();
        mesh
    }

    /// Axis-aligned cube centered on the origin, one quad per side.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h, -h, -h), // 0
            Vec3::new(h, -h, -h),  // 1
            Vec3::new(h, h, -h),   // 2
            Vec3::new(-h, h, -h),  // 3
            Vec3::new(-h, -h, h),  // 4
            Vec3::new(h, -h, h),   // 5
            Vec3::new(h, h, h),    // 6
            Vec3::new(-h, h, h),   // 7
        ];
        let faces = vec![
            vec![4, 5, 6, 7], // front (z+)
            vec![1, 0, 3, 2], // back (z-)
            vec![5, 1, 2, 6], // right (x+)
            vec![0, 4, 7, 3], // left (x-)
            vec![7, 6, 2, 3], // top (y+)
            vec![0, 1, 5, 4], // bottom (y-)
        ];
        Self::from_polygons(positions, faces)
    }

    /// Build an `EditMesh` from a Bevy `Mesh`, one face per triangle.
    ///
    /// Returns `None` if the mesh lacks positions or uses a non-triangle topology.
    pub fn from_bevy_mesh(mesh: &Mesh) -> Option<Self> {
        if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
            return None;
        }

        let positions: Vec<Vec3> = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float32x3(v) => v.iter().map(|p| Vec3::from(*p)).collect(),
            _ => return None,
        };

        let uvs: Vec<Vec2> = match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(v)) => {
                v.iter().map(|u| Vec2::from(*u)).collect()
            }
            _ => vec![Vec2::ZERO; positions.len()],
        };

        let faces: Vec<Vec<u32>> = match mesh.indices() {
            Some(Indices::U32(indices)) => indices
                .chunks_exact(3)
                .map(|c| vec![c[0], c[1], c[2]])
                .collect(),
            Some(Indices::U16(indices)) => indices
                .chunks_exact(3)
                .map(|c| vec![c[0] as u32, c[1] as u32, c[2] as u32])
                .collect(),
            None => (0..positions.len() as u32)
                .collect::<Vec<_>>()
                .chunks_exact(3)
                .map(|c| c.to_vec())
                .collect(),
        };

        let mut edit = Self::from_polygons(positions, faces);
        edit.uvs = uvs;
        Some(edit)
    }

    /// Convert the triangulation to a Bevy `Mesh` with normals and tangents.
    pub fn to_bevy_mesh(&self) -> Mesh {
        let build = || {
            let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, default());
            mesh.insert_attribute(
                Mesh::ATTRIBUTE_POSITION,
                self.positions.iter().map(|p| [p.x, p.y, p.z]).collect::<Vec<_>>(),
            );
            mesh.insert_attribute(
                Mesh::ATTRIBUTE_NORMAL,
                self.normals.iter().map(|n| [n.x, n.y, n.z]).collect::<Vec<_>>(),
            );
            mesh.insert_attribute(
                Mesh::ATTRIBUTE_UV_0,
                self.uvs.iter().map(|u| [u.x, u.y]).collect::<Vec<_>>(),
            );
            let indices: Vec<u32> = self.triangles.iter().flat_map(|t| t.iter().copied()).collect();
            mesh.insert_indices(Indices::U32(indices));
            mesh
        };

        match build().with_generated_tangents() {
            Ok(m) => m,
            Err(e) => {
                debug!("Skipping tangents for EditMesh: {e}");
                build()
            }
        }
    }

    /// Rebuild the fan triangulation of every face.
    pub fn recompute_triangles(&mut self) {
        self.triangles.clear();
        for face in &self.faces {
            if face.len() < 3 {
                continue;
            }
            for i in 1..face.len() - 1 {
                self.triangles.push([face[0], face[i], face[i + 1]]);
            }
        }
    }

    /// Recompute smooth vertex normals from polygon normals.
    pub fn recompute_normals(&mut self) {
        self.normals.clear();
        self.normals.resize(self.positions.len(), Vec3::ZERO);

        for fi in 0..self.faces.len() {
            let normal = self.newell_normal(fi);
            for &v in &self.faces[fi] {
                self.normals[v as usize] += normal;
            }
        }

        for n in &mut self.normals {
            *n = n.normalize_or_zero();
        }
    }

    /// Unnormalized Newell normal of a polygon (length is twice the area).
    fn newell_normal(&self, face: FaceIndex) -> Vec3 {
        let verts = &self.faces[face];
        let mut normal = Vec3::ZERO;
        for (i, &a) in verts.iter().enumerate() {
            let b = verts[(i + 1) % verts.len()];
            let p = self.positions[a as usize];
            let q = self.positions[b as usize];
            normal += Vec3::new(
                (p.y - q.y) * (p.z + q.z),
                (p.z - q.z) * (p.x + q.x),
                (p.x - q.x) * (p.y + q.y),
            );
        }
        normal
    }

    /// Unit normal of a polygon face.
    pub fn face_normal(&self, face: FaceIndex) -> Vec3 {
        self.newell_normal(face).normalize_or_zero()
    }

    /// Compute the centroid of a polygon face.
    pub fn face_center(&self, face: FaceIndex) -> Vec3 {
        let verts = &self.faces[face];
        if verts.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = verts.iter().map(|&v| self.positions[v as usize]).sum();
        sum / verts.len() as f32
    }

    /// Get the edges around a polygon face.
    pub fn face_edges(&self, face: FaceIndex) -> Vec<Edge> {
        let verts = &self.faces[face];
        (0..verts.len())
            .map(|i| Edge::new(verts[i], verts[(i + 1) % verts.len()]))
            .collect()
    }

    /// Every distinct edge of the mesh.
    pub fn unique_edges(&self) -> HashSet<Edge> {
        (0..self.faces.len()).flat_map(|fi| self.face_edges(fi)).collect()
    }

    /// Select an edge along with its two vertices.
    pub fn select_edge(&mut self, a: u32, b: u32) {
        self.selected_edges.insert(Edge::new(a, b));
        self.vertex_select[a as usize] = true;
        self.vertex_select[b as usize] = true;
    }

    /// Clear every selection flag.
    pub fn deselect_all(&mut self) {
        self.vertex_select.iter_mut().for_each(|s| *s = false);
        self.face_select.iter_mut().for_each(|s| *s = false);
        self.selected_edges.clear();
    }

    /// Whether two meshes hold the same geometry and selection. Derived
    /// normals and triangles are ignored.
    pub fn geometry_eq(&self, other: &EditMesh) -> bool {
        self.positions == other.positions
            && self.faces == other.faces
            && self.vertex_select == other.vertex_select
            && self.face_select == other.face_select
            && self.selected_edges == other.selected_edges
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of polygon faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_counts() {
        let cube = EditMesh::cube(1.0);
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.face_count(), 6);
        assert_eq!(cube.unique_edges().len(), 12);
        assert_eq!(cube.triangles.len(), 12);
    }

    #[test]
    fn cube_faces_point_outward() {
        let cube = EditMesh::cube(2.0);
        for fi in 0..cube.face_count() {
            let outward = cube.face_center(fi).normalize();
            assert!(
                cube.face_normal(fi).dot(outward) > 0.99,
                "face {} is wound inward",
                fi
            );
        }
    }

    #[test]
    fn fan_triangulation_of_pentagon() {
        let positions = (0..5)
            .map(|i| {
                let a = i as f32 / 5.0 * std::f32::consts::TAU;
                Vec3::new(a.cos(), a.sin(), 0.0)
            })
            .collect();
        let mesh = EditMesh::from_polygons(positions, vec![vec![0, 1, 2, 3, 4]]);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
        assert!(mesh.normals.iter().all(|n| n.abs_diff_eq(Vec3::Z, 1e-5)));
    }

    #[test]
    fn select_edge_marks_endpoints() {
        let mut cube = EditMesh::cube(1.0);
        cube.select_edge(6, 7);
        assert!(cube.selected_edges.contains(&Edge::new(7, 6)));
        assert!(cube.vertex_select[6] && cube.vertex_select[7]);

        cube.deselect_all();
        assert!(cube.selected_edges.is_empty());
        assert!(cube.vertex_select.iter().all(|s| !s));
    }

    #[test]
    fn geometry_eq_ignores_derived_data() {
        let a = EditMesh::cube(1.0);
        let mut b = a.clone();
        b.normals.iter_mut().for_each(|n| *n = Vec3::ZERO);
        b.triangles.clear();
        assert!(a.geometry_eq(&b));

        b.positions[0].x += 0.5;
        assert!(!a.geometry_eq(&b));
    }

    #[test]
    fn bevy_mesh_round_trip_keeps_triangles() {
        let cube = EditMesh::cube(1.0);
        let bevy_mesh = cube.to_bevy_mesh();
        let back = EditMesh::from_bevy_mesh(&bevy_mesh).expect("triangle list");
        assert_eq!(back.vertex_count(), 8);
        assert_eq!(back.face_count(), cube.triangles.len());
    }
}
