//! Half-edge mesh data structure for efficient topology traversal.
//!
//! `HalfEdgeMesh` is the live editing structure. A session builds one from
//! the stored `EditMesh` (or aliases the one held by `EditModeMesh`), runs
//! operators against it, then writes it back with `to_edit_mesh`.
//!
//! Uses index-based arena storage (not pointers) for cache-friendly traversal.
//! Faces are arbitrary polygons. Edge selection is stored on both twins.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use super::edit_mesh::{Edge, EditMesh};
use crate::editor::state::SelectMode;

/// Index into the half-edge array.
pub type HalfEdgeId = u32;
/// Index into the vertex array.
pub type VertexId = u32;
/// Index into the face array.
pub type FaceId = u32;

/// Sentinel value indicating "no element" (null pointer equivalent).
pub const INVALID: u32 = u32::MAX;

/// A single half-edge in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// The opposite half-edge (sharing the same geometric edge).
    pub twin: HalfEdgeId,
    /// Next half-edge around the face (counter-clockwise).
    pub next: HalfEdgeId,
    /// Previous half-edge around the face (clockwise).
    pub prev: HalfEdgeId,
    /// Vertex this half-edge originates from.
    pub vertex: VertexId,
    /// Face this half-edge borders (INVALID for boundary half-edges).
    pub face: FaceId,
    pub selected: bool,
}

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct HVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    /// One outgoing half-edge from this vertex.
    pub half_edge: HalfEdgeId,
    pub selected: bool,
}

/// A face in the half-edge mesh.
#[derive(Debug, Clone, Copy)]
pub struct HFace {
    /// One half-edge on the boundary of this face.
    pub half_edge: HalfEdgeId,
    pub normal: Vec3,
    pub selected: bool,
}

/// An element recorded in the select history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshElement {
    Vertex(VertexId),
    Edge(HalfEdgeId),
    Face(FaceId),
}

/// Half-edge mesh with index-based arena storage.
///
/// Supports efficient O(1)-per-step traversal of vertex neighborhoods,
/// edge loops, and face boundaries.
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    pub half_edges: Vec<HalfEdge>,
    pub vertices: Vec<HVertex>,
    pub faces: Vec<HFace>,
    /// Element types selection flushes through.
    pub select_mode: SelectMode,
    /// Elements in the order they were selected, most recent last.
    pub select_history: Vec<MeshElement>,
    /// Directed (from, to) vertex pair to face half-edge.
    edge_lookup: HashMap<(VertexId, VertexId), HalfEdgeId>,
}

impl HalfEdgeMesh {
    /// Build a `HalfEdgeMesh` from an `EditMesh`.
    ///
    /// Twin half-edges are linked where faces share edges; boundary edges get
    /// boundary twins (face = INVALID) so traversal never hits dead ends.
    /// Faces with fewer than three vertices or out-of-range indices are skipped.
    pub fn from_edit_mesh(mesh: &EditMesh) -> Self {
        let mut he = HalfEdgeMesh::default();
        he.build(mesh);
        he
    }

    /// Drop all geometry and selection. The select mode is kept.
    pub fn clear(&mut self) {
        self.half_edges.clear();
        self.vertices.clear();
        self.faces.clear();
        self.select_history.clear();
        self.edge_lookup.clear();
    }

    /// Replace the contents with `mesh`, keeping the select mode.
    pub fn load(&mut self, mesh: &EditMesh) {
        self.clear();
        self.build(mesh);
    }

    fn build(&mut self, mesh: &EditMesh) {
        let vertex_count = mesh.positions.len();
        self.vertices = (0..vertex_count)
            .map(|i| HVertex {
                position: mesh.positions[i],
                normal: mesh.normals.get(i).copied().unwrap_or(Vec3::ZERO),
                uv: mesh.uvs.get(i).copied().unwrap_or(Vec2::ZERO),
                half_edge: INVALID,
                selected: mesh.vertex_select.get(i).copied().unwrap_or(false),
            })
            .collect();

        for (fi, verts) in mesh.faces.iter().enumerate() {
            if verts.len() < 3 || verts.iter().any(|&v| v as usize >= vertex_count) {
                warn!("Skipping malformed face {} while building half-edge mesh", fi);
                continue;
            }
            let selected = mesh.face_select.get(fi).copied().unwrap_or(false);
            self.push_face(verts, selected);
        }

        self.link_twins();

        for edge in &mesh.selected_edges {
            if let Some(he) = self.find_half_edge(edge.0, edge.1) {
                self.set_edge_select(he, true);
            }
        }

        for fi in 0..self.faces.len() {
            self.faces[fi].normal = self.face_normal(fi as FaceId);
        }
    }

    /// Append a face loop. Twins are linked later by `link_twins`.
    fn push_face(&mut self, verts: &[VertexId], selected: bool) -> FaceId {
        let face_id = self.faces.len() as FaceId;
        let base = self.half_edges.len() as HalfEdgeId;
        let n = verts.len() as u32;

        for i in 0..n {
            let from = verts[i as usize];
            let to = verts[((i + 1) % n) as usize];
            let he_id = base + i;

            self.half_edges.push(HalfEdge {
                twin: INVALID,
                next: base + (i + 1) % n,
                prev: base + (i + n - 1) % n,
                vertex: from,
                face: face_id,
                selected: false,
            });

            if self.vertices[from as usize].half_edge == INVALID {
                self.vertices[from as usize].half_edge = he_id;
            }

            self.edge_lookup.insert((from, to), he_id);
        }

        self.faces.push(HFace {
            half_edge: base,
            normal: Vec3::ZERO,
            selected,
        });
        face_id
    }

    /// Link twins for every face half-edge, creating boundary half-edges
    /// for unmatched ones.
    fn link_twins(&mut self) {
        let interior_count = self.half_edges.len();
        let mut boundary_twins: Vec<HalfEdge> = Vec::new();

        for he_idx in 0..interior_count {
            if self.half_edges[he_idx].twin != INVALID {
                continue;
            }
            let from = self.half_edges[he_idx].vertex;
            let next_he = self.half_edges[he_idx].next;
            let to = self.half_edges[next_he as usize].vertex;

            match self.edge_lookup.get(&(to, from)) {
                Some(&twin_idx) if twin_idx as usize != he_idx => {
                    self.half_edges[he_idx].twin = twin_idx;
                    self.half_edges[twin_idx as usize].twin = he_idx as HalfEdgeId;
                }
                _ => {
                    let boundary_id = (interior_count + boundary_twins.len()) as HalfEdgeId;
                    self.half_edges[he_idx].twin = boundary_id;
                    boundary_twins.push(HalfEdge {
                        twin: he_idx as HalfEdgeId,
                        next: INVALID,
                        prev: INVALID,
                        vertex: to,
                        face: INVALID,
                        selected: false,
                    });
                }
            }
        }

        self.half_edges.extend(boundary_twins);
        Self::link_boundary_chains(&mut self.half_edges, interior_count);
    }

    /// Link next/prev pointers for boundary half-edges.
    fn link_boundary_chains(half_edges: &mut [HalfEdge], interior_count: usize) {
        // Map: vertex -> boundary half-edge starting from that vertex
        let mut boundary_from: HashMap<VertexId, HalfEdgeId> = HashMap::new();
        for (i, he) in half_edges.iter().enumerate().skip(interior_count) {
            boundary_from.insert(he.vertex, i as HalfEdgeId);
        }

        for i in interior_count..half_edges.len() {
            // This boundary he goes from he.vertex to twin's vertex
            let end_vertex = half_edges[half_edges[i].twin as usize].vertex;
            if let Some(&next_id) = boundary_from.get(&end_vertex) {
                half_edges[i].next = next_id;
                half_edges[next_id as usize].prev = i as HalfEdgeId;
            }
        }
    }

    /// Convert back to an `EditMesh`, polygons and selection included.
    pub fn to_edit_mesh(&self) -> EditMesh {
        let faces: Vec<Vec<u32>> = (0..self.faces.len())
            .map(|fi| self.face_vertices(fi as FaceId))
            .collect();

        let selected_edges: HashSet<Edge> = self
            .half_edges
            .iter()
            .enumerate()
            .filter(|(_, he)| he.face != INVALID && he.selected)
            .map(|(i, _)| {
                let (from, to) = self.edge_vertices(i as HalfEdgeId);
                Edge::new(from, to)
            })
            .collect();

        let mut mesh = EditMesh {
            positions: self.vertices.iter().map(|v| v.position).collect(),
            normals: self.vertices.iter().map(|v| v.normal).collect(),
            uvs: self.vertices.iter().map(|v| v.uv).collect(),
            faces,
            vertex_select: self.vertices.iter().map(|v| v.selected).collect(),
            face_select: self.faces.iter().map(|f| f.selected).collect(),
            selected_edges,
            triangles: Vec::new(),
        };
        mesh.recompute_triangles();
        mesh
    }

    // -------------------------------------------------------------------
    // Derived state
    // -------------------------------------------------------------------

    /// Rebuild the directed edge lookup table.
    pub fn ensure_lookup(&mut self) {
        self.edge_lookup.clear();
        for i in 0..self.half_edges.len() {
            let he = self.half_edges[i];
            if he.face == INVALID {
                continue;
            }
            if let Some(next) = self.half_edges.get(he.next as usize) {
                self.edge_lookup.insert((he.vertex, next.vertex), i as HalfEdgeId);
            }
        }
    }

    /// Find a face half-edge joining `a` and `b`, in either direction.
    pub fn find_half_edge(&self, a: VertexId, b: VertexId) -> Option<HalfEdgeId> {
        self.edge_lookup
            .get(&(a, b))
            .or_else(|| self.edge_lookup.get(&(b, a)))
            .copied()
    }

    /// Drop select history entries that no longer name an element.
    pub fn validate_select_history(&mut self) {
        let (nv, nh, nf) = (self.vertices.len(), self.half_edges.len(), self.faces.len());
        self.select_history.retain(|element| match *element {
            MeshElement::Vertex(v) => (v as usize) < nv,
            MeshElement::Edge(e) => (e as usize) < nh,
            MeshElement::Face(f) => (f as usize) < nf,
        });
    }

    /// Propagate selection between element types according to `select_mode`.
    ///
    /// Vertex mode derives edges and faces from vertices, edge mode derives
    /// faces and vertices from edges, face mode derives edges and vertices
    /// from faces.
    pub fn select_flush_mode(&mut self) {
        let mode = self.select_mode;

        if mode.contains(SelectMode::VERTEX) {
            for i in 0..self.half_edges.len() {
                let (from, to) = self.edge_endpoints(i as HalfEdgeId);
                self.half_edges[i].selected = self.vertex_selected(from) && self.vertex_selected(to);
            }
            for fi in 0..self.faces.len() {
                let all = self
                    .face_vertices(fi as FaceId)
                    .iter()
                    .all(|&v| self.vertex_selected(v));
                self.faces[fi].selected = all;
            }
        } else if mode.contains(SelectMode::EDGE) {
            for fi in 0..self.faces.len() {
                let all = self
                    .face_half_edges(fi as FaceId)
                    .iter()
                    .all(|&he| self.half_edges[he as usize].selected);
                self.faces[fi].selected = all;
            }
            for v in &mut self.vertices {
                v.selected = false;
            }
            for i in 0..self.half_edges.len() {
                if self.half_edges[i].selected {
                    let origin = self.half_edges[i].vertex as usize;
                    if let Some(v) = self.vertices.get_mut(origin) {
                        v.selected = true;
                    }
                }
            }
        } else if mode.contains(SelectMode::FACE) {
            for he in &mut self.half_edges {
                he.selected = false;
            }
            for v in &mut self.vertices {
                v.selected = false;
            }
            for fi in 0..self.faces.len() {
                if !self.faces[fi].selected {
                    continue;
                }
                for he in self.face_half_edges(fi as FaceId) {
                    self.set_edge_select(he, true);
                    let origin = self.half_edges[he as usize].vertex as usize;
                    self.vertices[origin].selected = true;
                }
            }
        }
    }

    /// Recompute face normals and smooth vertex normals.
    pub fn recompute_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = Vec3::ZERO;
        }

        for fi in 0..self.faces.len() {
            let verts = self.face_vertices(fi as FaceId);
            let normal = self.newell_normal(&verts);
            for &v in &verts {
                self.vertices[v as usize].normal += normal;
            }
            self.faces[fi].normal = normal.normalize_or_zero();
        }

        for v in &mut self.vertices {
            v.normal = v.normal.normalize_or_zero();
        }
    }

    /// Full refresh after the structure was rebuilt.
    pub fn refresh_derived(&mut self, mode: SelectMode) {
        self.select_mode = mode;
        self.ensure_lookup();
        self.validate_select_history();
        self.select_flush_mode();
        self.recompute_normals();
    }

    /// Light refresh after an operator ran.
    pub fn refresh_selection(&mut self, mode: SelectMode) {
        self.select_mode = mode;
        self.select_flush_mode();
        self.recompute_normals();
    }

    /// Check the arena for dangling indices and broken links.
    pub fn is_valid(&self) -> bool {
        let nh = self.half_edges.len() as u32;
        let nv = self.vertices.len() as u32;
        let nf = self.faces.len() as u32;

        for (i, he) in self.half_edges.iter().enumerate() {
            let i = i as u32;
            if he.vertex >= nv || he.twin >= nh || self.half_edges[he.twin as usize].twin != i {
                return false;
            }
            if he.face == INVALID {
                // Boundary chains may be open at non-manifold vertices.
                if he.next != INVALID && (he.next >= nh || self.half_edges[he.next as usize].prev != i)
                {
                    return false;
                }
                continue;
            }
            if he.face >= nf || he.next >= nh || he.prev >= nh {
                return false;
            }
            if self.half_edges[he.next as usize].prev != i {
                return false;
            }
        }

        for (fi, face) in self.faces.iter().enumerate() {
            if face.half_edge >= nh {
                return false;
            }
            let mut current = face.half_edge;
            let mut len = 0u32;
            loop {
                if self.half_edges[current as usize].face != fi as FaceId {
                    return false;
                }
                len += 1;
                current = self.half_edges[current as usize].next;
                if current == face.half_edge {
                    break;
                }
                if len > nh {
                    return false;
                }
            }
            if len < 3 {
                return false;
            }
        }

        self.vertices
            .iter()
            .all(|v| v.half_edge == INVALID || v.half_edge < nh)
    }

    // -------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------

    /// Set the selection flag of an edge on both of its half-edges.
    pub fn set_edge_select(&mut self, he: HalfEdgeId, selected: bool) {
        let Some(edge) = self.half_edges.get_mut(he as usize) else {
            return;
        };
        edge.selected = selected;
        let twin = edge.twin;
        if let Some(twin) = self.half_edges.get_mut(twin as usize) {
            twin.selected = selected;
        }
    }

    /// Select an edge with its endpoints and record it in the select history.
    pub fn select_edge(&mut self, he: HalfEdgeId) {
        if he as usize >= self.half_edges.len() {
            return;
        }
        self.set_edge_select(he, true);
        let (from, to) = self.edge_endpoints(he);
        for v in [from, to] {
            if let Some(vertex) = self.vertices.get_mut(v as usize) {
                vertex.selected = true;
            }
        }
        self.select_history.push(MeshElement::Edge(self.canonical_edge(he)));
    }

    /// Canonical half-edge of every selected edge.
    pub fn selected_edges(&self) -> Vec<HalfEdgeId> {
        self.unique_edges()
            .into_iter()
            .filter(|&he| self.half_edges[he as usize].selected)
            .collect()
    }

    fn vertex_selected(&self, v: VertexId) -> bool {
        self.vertices.get(v as usize).is_some_and(|v| v.selected)
    }

    // -------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------

    /// Outgoing face half-edges around `v`, or `None` when the fan is open
    /// (boundary or non-manifold vertex).
    ///
    /// Consecutive entries share the edge `prev(fan[i])`.
    pub fn closed_fan(&self, v: VertexId) -> Option<Vec<HalfEdgeId>> {
        let start = self.vertices.get(v as usize)?.half_edge;
        if start == INVALID {
            return None;
        }

        let mut fan = Vec::new();
        let mut current = start;
        loop {
            let he = self.half_edges.get(current as usize)?;
            if he.face == INVALID || he.vertex != v {
                return None;
            }
            fan.push(current);
            current = self.half_edges.get(he.prev as usize)?.twin;
            if current == start {
                return Some(fan);
            }
            if fan.len() > self.half_edges.len() {
                return None;
            }
        }
    }

    /// Get all face indices adjacent to a vertex.
    pub fn vertex_faces(&self, vertex: VertexId) -> Vec<FaceId> {
        self.half_edges
            .iter()
            .filter(|he| he.vertex == vertex && he.face != INVALID)
            .map(|he| he.face)
            .collect()
    }

    /// Get the half-edge indices forming a face boundary (in order).
    pub fn face_half_edges(&self, face: FaceId) -> Vec<HalfEdgeId> {
        let start = self.faces[face as usize].half_edge;
        let mut result = Vec::new();
        let mut current = start;
        loop {
            result.push(current);
            current = self.half_edges[current as usize].next;
            if current == start || result.len() > self.half_edges.len() {
                break;
            }
        }
        result
    }

    /// Get the vertex indices forming a face boundary (in order).
    pub fn face_vertices(&self, face: FaceId) -> Vec<VertexId> {
        self.face_half_edges(face)
            .into_iter()
            .map(|he| self.half_edges[he as usize].vertex)
            .collect()
    }

    /// Get the vertex pair (from, to) for a face half-edge.
    pub fn edge_vertices(&self, he: HalfEdgeId) -> (VertexId, VertexId) {
        let from = self.half_edges[he as usize].vertex;
        let to = self.half_edges[self.half_edges[he as usize].next as usize].vertex;
        (from, to)
    }

    /// Endpoints of any half-edge, boundary ones included.
    fn edge_endpoints(&self, he: HalfEdgeId) -> (VertexId, VertexId) {
        let edge = self.half_edges[he as usize];
        let to = self
            .half_edges
            .get(edge.twin as usize)
            .map_or(INVALID, |twin| twin.vertex);
        (edge.vertex, to)
    }

    fn newell_normal(&self, verts: &[VertexId]) -> Vec3 {
        let mut normal = Vec3::ZERO;
        for (i, &a) in verts.iter().enumerate() {
            let p = self.vertices[a as usize].position;
            let q = self.vertices[verts[(i + 1) % verts.len()] as usize].position;
            normal += Vec3::new(
                (p.y - q.y) * (p.z + q.z),
                (p.z - q.z) * (p.x + q.x),
                (p.x - q.x) * (p.y + q.y),
            );
        }
        normal
    }

    /// Compute face normal from vertex positions.
    pub fn face_normal(&self, face: FaceId) -> Vec3 {
        let verts = self.face_vertices(face);
        if verts.len() < 3 {
            return Vec3::ZERO;
        }
        self.newell_normal(&verts).normalize_or_zero()
    }

    /// Compute face centroid.
    pub fn face_center(&self, face: FaceId) -> Vec3 {
        let verts = self.face_vertices(face);
        if verts.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = verts
            .iter()
            .map(|&v| self.vertices[v as usize].position)
            .sum();
        sum / verts.len() as f32
    }

    /// Check if a half-edge is on the boundary (its face is INVALID).
    pub fn is_boundary(&self, he: HalfEdgeId) -> bool {
        self.half_edges[he as usize].face == INVALID
    }

    /// Whether every edge borders two faces.
    pub fn is_closed(&self) -> bool {
        self.half_edges.iter().all(|he| he.face != INVALID)
    }

    /// The face half-edge standing for the edge `he` belongs to: the lower
    /// index of two face twins, or the face side of a boundary edge.
    pub fn canonical_edge(&self, he: HalfEdgeId) -> HalfEdgeId {
        let edge = self.half_edges[he as usize];
        if edge.face == INVALID {
            return edge.twin;
        }
        match self.half_edges.get(edge.twin as usize) {
            Some(twin) if twin.face != INVALID => he.min(edge.twin),
            _ => he,
        }
    }

    /// Canonical half-edge of every geometric edge.
    pub fn unique_edges(&self) -> Vec<HalfEdgeId> {
        (0..self.half_edges.len() as HalfEdgeId)
            .filter(|&he| !self.is_boundary(he) && self.canonical_edge(he) == he)
            .collect()
    }

    /// Get the number of edges in the mesh.
    pub fn edge_count(&self) -> usize {
        self.unique_edges().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_single_triangle() -> EditMesh {
        EditMesh::from_polygons(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2]],
        )
    }

    fn make_two_triangles() -> EditMesh {
        // Two triangles sharing edge (1,2):
        //   0--1
        //   |/ |
        //   2--3
        EditMesh::from_polygons(
            vec![
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
            ],
            vec![vec![0, 2, 1], vec![1, 2, 3]],
        )
    }

    #[test]
    fn round_trip_single_triangle() {
        let mesh = make_single_triangle();
        let he = HalfEdgeMesh::from_edit_mesh(&mesh);
        let back = he.to_edit_mesh();

        assert_eq!(back.positions.len(), 3);
        assert_eq!(back.faces, mesh.faces);
        assert!(!he.is_closed());
    }

    #[test]
    fn round_trip_cube_keeps_quads() {
        let mesh = EditMesh::cube(1.0);
        let he = HalfEdgeMesh::from_edit_mesh(&mesh);
        let back = he.to_edit_mesh();

        assert_eq!(back.positions.len(), 8);
        assert_eq!(back.faces, mesh.faces);
        assert_eq!(back.triangles.len(), 12);
    }

    #[test]
    fn twin_linkage() {
        let mesh = make_two_triangles();
        let he = HalfEdgeMesh::from_edit_mesh(&mesh);

        for (i, edge) in he.half_edges.iter().enumerate() {
            assert_ne!(edge.twin, INVALID, "half-edge {} has no twin", i);
            let twin = &he.half_edges[edge.twin as usize];
            assert_eq!(twin.twin, i as u32, "twin linkage broken at {}", i);
        }
        assert_eq!(he.edge_count(), 5);
        assert!(he.is_valid());
    }

    #[test]
    fn vertex_fan() {
        let he = HalfEdgeMesh::from_edit_mesh(&make_two_triangles());
        assert_eq!(he.vertex_faces(1).len(), 2);
        assert_eq!(he.vertex_faces(0).len(), 1);
        assert!(he.closed_fan(1).is_none(), "open mesh has no closed fans");
    }

    #[test]
    fn cube_topology() {
        let he = HalfEdgeMesh::from_edit_mesh(&EditMesh::cube(1.0));

        assert_eq!(he.vertices.len(), 8);
        assert_eq!(he.faces.len(), 6);
        assert_eq!(he.edge_count(), 12);
        assert!(he.is_closed());
        assert!(he.is_valid());

        for vi in 0..8 {
            let fan = he.closed_fan(vi).expect("cube vertices are manifold");
            assert_eq!(fan.len(), 3, "vertex {} fan", vi);
            for face_he in &fan {
                assert_eq!(he.half_edges[*face_he as usize].vertex, vi);
            }
        }
        for fi in 0..he.faces.len() {
            assert_eq!(he.face_half_edges(fi as FaceId).len(), 4);
        }
    }

    #[test]
    fn edge_selection_survives_conversion() {
        let mut mesh = EditMesh::cube(1.0);
        mesh.select_edge(6, 7);

        let he = HalfEdgeMesh::from_edit_mesh(&mesh);
        let selected = he.selected_edges();
        assert_eq!(selected.len(), 1);
        let (a, b) = he.edge_vertices(selected[0]);
        assert_eq!(Edge::new(a, b), Edge::new(6, 7));

        let twin = he.half_edges[selected[0] as usize].twin;
        assert!(he.half_edges[twin as usize].selected, "twin mirrors selection");

        let back = he.to_edit_mesh();
        assert!(back.selected_edges.contains(&Edge::new(6, 7)));
    }

    #[test]
    fn vertex_mode_flush_derives_edges_and_faces() {
        let mut mesh = EditMesh::cube(1.0);
        for v in [4, 5, 6, 7] {
            mesh.vertex_select[v] = true;
        }
        let mut he = HalfEdgeMesh::from_edit_mesh(&mesh);
        he.refresh_derived(SelectMode::VERTEX);

        assert_eq!(he.selected_edges().len(), 4);
        let selected_faces: Vec<usize> = (0..6).filter(|&f| he.faces[f].selected).collect();
        assert_eq!(selected_faces, vec![0]);
    }

    #[test]
    fn face_mode_flush_derives_edges_and_vertices() {
        let mut mesh = EditMesh::cube(1.0);
        mesh.face_select[4] = true;
        let mut he = HalfEdgeMesh::from_edit_mesh(&mesh);
        he.refresh_derived(SelectMode::FACE);

        assert_eq!(he.selected_edges().len(), 4);
        let selected: Vec<usize> = (0..8).filter(|&v| he.vertices[v].selected).collect();
        assert_eq!(selected, vec![2, 3, 6, 7]);
    }

    #[test]
    fn edge_mode_flush_selects_endpoints_only() {
        let mut mesh = EditMesh::cube(1.0);
        mesh.selected_edges.insert(Edge::new(6, 7));
        let mut he = HalfEdgeMesh::from_edit_mesh(&mesh);
        he.refresh_derived(SelectMode::EDGE);

        let selected: Vec<usize> = (0..8).filter(|&v| he.vertices[v].selected).collect();
        assert_eq!(selected, vec![6, 7]);
        assert!(he.faces.iter().all(|f| !f.selected));
    }

    #[test]
    fn select_history_drops_stale_entries() {
        let mut he = HalfEdgeMesh::from_edit_mesh(&EditMesh::cube(1.0));
        he.select_history.push(MeshElement::Vertex(3));
        he.select_history.push(MeshElement::Face(40));
        he.select_history.push(MeshElement::Edge(INVALID));
        he.validate_select_history();
        assert_eq!(he.select_history, vec![MeshElement::Vertex(3)]);
    }

    #[test]
    fn lookup_finds_both_directions() {
        let mut he = HalfEdgeMesh::from_edit_mesh(&EditMesh::cube(1.0));
        he.ensure_lookup();
        let forward = he.find_half_edge(4, 5).expect("edge 4-5");
        let backward = he.find_half_edge(5, 4).expect("edge 5-4");
        assert_eq!(he.canonical_edge(forward), he.canonical_edge(backward));
        assert!(he.find_half_edge(4, 6).is_none(), "diagonal is not an edge");
    }

    #[test]
    fn clear_keeps_select_mode() {
        let mut he = HalfEdgeMesh::from_edit_mesh(&EditMesh::cube(1.0));
        he.select_mode = SelectMode::FACE;
        he.clear();
        assert!(he.vertices.is_empty() && he.half_edges.is_empty());
        assert_eq!(he.select_mode, SelectMode::FACE);

        he.load(&make_single_triangle());
        assert_eq!(he.faces.len(), 1);
        assert_eq!(he.select_mode, SelectMode::FACE);
    }

    #[test]
    fn broken_twin_is_invalid() {
        let mut he = HalfEdgeMesh::from_edit_mesh(&EditMesh::cube(1.0));
        he.half_edges[0].twin = 5;
        assert!(!he.is_valid());
    }

    #[test]
    fn malformed_faces_are_skipped() {
        let mut mesh = make_single_triangle();
        mesh.faces.push(vec![0, 1]);
        mesh.faces.push(vec![0, 1, 9]);
        mesh.face_select = vec![false; 3];
        let he = HalfEdgeMesh::from_edit_mesh(&mesh);
        assert_eq!(he.faces.len(), 1);
        assert!(he.is_valid());
    }

    #[test]
    fn normals_point_outward_on_cube() {
        let mut he = HalfEdgeMesh::from_edit_mesh(&EditMesh::cube(2.0));
        he.recompute_normals();
        for fi in 0..he.faces.len() {
            let outward = he.face_center(fi as FaceId).normalize();
            assert!(he.faces[fi].normal.dot(outward) > 0.99);
        }
        for v in &he.vertices {
            assert!(v.normal.dot(v.position.normalize()) > 0.99);
        }
    }
}
