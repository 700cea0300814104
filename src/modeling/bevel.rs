//! Edge bevel operation for mesh edit sessions.
//!
//! Bevels selected edges by pulling the two adjacent faces back from the
//! edge by a perpendicular offset and filling the gap with a strip of quads
//! that follows a superellipse profile. The hole left at each beveled vertex
//! is closed by a cap polygon. Corners use sharp miters: a corner between a
//! beveled and a plain edge slides along the plain edge, a corner between two
//! beveled edges is inset from both.
//!
//! Works on the polygon level and reloads the `HalfEdgeMesh` afterwards.

use bevy::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::f32::consts::{FRAC_PI_2, LN_2};

use super::edit_mesh::{Edge, EditMesh};
use super::half_edge::{FaceId, HalfEdgeId, HalfEdgeMesh, INVALID, VertexId};

/// Offsets at or below this leave the mesh untouched.
pub const MIN_OFFSET: f32 = 1e-6;
/// Largest superellipse exponent (a square profile).
pub const MAX_EXPONENT: f32 = 1e4;
const MIN_SIN: f32 = 1e-4;

/// Bevel settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BevelParams {
    /// Perpendicular distance the adjacent faces are pulled back by.
    pub offset: f32,
    /// Number of quads across the strip.
    pub segments: u32,
    /// Profile shape: 0.25 is straight, 0.5 round, 1.0 square.
    pub profile: f32,
    /// Limit each slide to half the length of the edge it slides along.
    pub clamp_overlap: bool,
}

impl Default for BevelParams {
    fn default() -> Self {
        Self {
            offset: 0.0,
            segments: 3,
            profile: 1.0,
            clamp_overlap: false,
        }
    }
}

/// What a bevel call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BevelReport {
    pub beveled_edges: usize,
    /// Edges that were not manifold, had an open vertex fan or were out of range.
    pub skipped_edges: usize,
    /// Strip and cap faces created.
    pub new_faces: usize,
}

/// Superellipse exponent for a profile value.
pub fn superellipse_exponent(profile: f32) -> f32 {
    let ln = profile.clamp(1e-4, 1.0).sqrt().ln();
    if ln.abs() < f32::EPSILON {
        return MAX_EXPONENT;
    }
    (-LN_2 / ln).clamp(1.0, MAX_EXPONENT)
}

/// Point on the profile from `a` (t = 0) to `b` (t = 1) bulging toward `corner`.
fn profile_point(a: Vec3, b: Vec3, corner: Vec3, exponent: f32, t: f32) -> Vec3 {
    let phi = t * FRAC_PI_2;
    let e = 2.0 / exponent;
    let x = phi.cos().max(0.0).powf(e);
    let y = phi.sin().max(0.0).powf(e);
    let o = a + b - corner;
    o + (a - o) * x + (b - o) * y
}

/// One face corner around a beveled vertex.
struct Corner {
    vertex: VertexId,
    /// Outgoing half-edge; identifies the corner.
    out: HalfEdgeId,
    in_beveled: bool,
    out_beveled: bool,
    /// Unit direction toward the previous vertex of the face.
    dir_in: Vec3,
    /// Unit direction toward the next vertex of the face.
    dir_out: Vec3,
    in_edge: Edge,
    out_edge: Edge,
    sin: f32,
}

/// Vertex arrays under construction.
struct Builder {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
}

impl Builder {
    fn add(&mut self, position: Vec3, uv: Vec2) -> u32 {
        self.positions.push(position);
        self.uvs.push(uv);
        (self.positions.len() - 1) as u32
    }
}

/// Bevel `edges` of `mesh` in place.
///
/// Only the new strip and cap faces are selected afterwards. Empty input or
/// an offset at or below `MIN_OFFSET` is a no-op.
pub fn bevel_edges(
    mesh: &mut HalfEdgeMesh,
    edges: &[HalfEdgeId],
    params: &BevelParams,
) -> BevelReport {
    let mut report = BevelReport::default();
    if edges.is_empty() || params.offset <= MIN_OFFSET {
        return report;
    }

    let mut fans: HashMap<VertexId, Option<Vec<HalfEdgeId>>> = HashMap::new();
    let mut beveled: BTreeSet<HalfEdgeId> = BTreeSet::new();
    for &he in edges {
        if he as usize >= mesh.half_edges.len() {
            report.skipped_edges += 1;
            continue;
        }
        let canon = mesh.canonical_edge(he);
        if beveled.contains(&canon) {
            continue;
        }
        if qualifies(mesh, canon, &mut fans) {
            beveled.insert(canon);
        } else {
            report.skipped_edges += 1;
        }
    }
    if beveled.is_empty() {
        return report;
    }

    let bevel_set: HashSet<Edge> = beveled
        .iter()
        .map(|&he| {
            let (a, b) = mesh.edge_vertices(he);
            Edge::new(a, b)
        })
        .collect();
    let displaced: BTreeSet<VertexId> = beveled
        .iter()
        .flat_map(|&he| {
            let (a, b) = mesh.edge_vertices(he);
            [a, b]
        })
        .collect();

    let corners = collect_corners(mesh, &displaced, &fans, &bevel_set);

    // Slide distance along each plain edge, per vertex.
    let mut slides: HashMap<(VertexId, Edge), f32> = HashMap::new();
    for c in &corners {
        if c.sin <= MIN_SIN || c.in_beveled == c.out_beveled {
            continue;
        }
        let plain = if c.in_beveled { c.out_edge } else { c.in_edge };
        let mut t = params.offset / c.sin;
        if params.clamp_overlap {
            let a = mesh.vertices[plain.0 as usize].position;
            let b = mesh.vertices[plain.1 as usize].position;
            t = t.min(a.distance(b) * 0.5);
        }
        let slot = slides.entry((c.vertex, plain)).or_insert(0.0);
        *slot = slot.max(t);
    }

    let mut builder = Builder {
        positions: mesh.vertices.iter().map(|v| v.position).collect(),
        uvs: mesh.vertices.iter().map(|v| v.uv).collect(),
    };
    let mut boundverts: HashMap<(VertexId, Edge), u32> = HashMap::new();
    let mut edge_end = |builder: &mut Builder, v: VertexId, edge: Edge, dir: Vec3| -> u32 {
        let Some(&t) = slides.get(&(v, edge)) else {
            return v;
        };
        *boundverts.entry((v, edge)).or_insert_with(|| {
            let origin = mesh.vertices[v as usize].position;
            builder.add(origin + dir * t, mesh.vertices[v as usize].uv)
        })
    };

    // Replacement vertices for every corner at a displaced vertex, in face order.
    let mut seq: HashMap<HalfEdgeId, Vec<u32>> = HashMap::new();
    for c in &corners {
        let origin = mesh.vertices[c.vertex as usize].position;
        let uv = mesh.vertices[c.vertex as usize].uv;
        let points = match (c.in_beveled, c.out_beveled) {
            (true, true) => {
                let inset = if c.sin > MIN_SIN {
                    origin + (c.dir_in + c.dir_out) * (params.offset / c.sin)
                } else {
                    origin
                };
                vec![builder.add(inset, uv)]
            }
            (true, false) => vec![edge_end(&mut builder, c.vertex, c.out_edge, c.dir_out)],
            (false, true) => vec![edge_end(&mut builder, c.vertex, c.in_edge, c.dir_in)],
            (false, false) => {
                let a = edge_end(&mut builder, c.vertex, c.in_edge, c.dir_in);
                let b = edge_end(&mut builder, c.vertex, c.out_edge, c.dir_out);
                if a == b { vec![a] } else { vec![a, b] }
            }
        };
        seq.insert(c.out, points);
    }

    let mut faces: Vec<Vec<u32>> = Vec::with_capacity(mesh.faces.len());
    for fi in 0..mesh.faces.len() {
        let mut verts = Vec::new();
        for he in mesh.face_half_edges(fi as FaceId) {
            match seq.get(&he) {
                Some(points) => verts.extend_from_slice(points),
                None => verts.push(mesh.half_edges[he as usize].vertex),
            }
        }
        dedupe_ring(&mut verts);
        if verts.len() >= 3 {
            faces.push(verts);
        }
    }
    let first_new_face = faces.len();

    let segments = params.segments.max(1) as usize;
    let exponent = superellipse_exponent(params.profile);
    let mut columns: HashMap<HalfEdgeId, (Vec<u32>, Vec<u32>)> = HashMap::new();

    for &h1 in &beveled {
        let h2 = mesh.half_edges[h1 as usize].twin;
        let n1 = mesh.half_edges[h1 as usize].next;
        let n2 = mesh.half_edges[h2 as usize].next;
        let (v1, v2) = mesh.edge_vertices(h1);

        let ends = (
            seq.get(&h1).and_then(|s| s.last()),
            seq.get(&n1).and_then(|s| s.first()),
            seq.get(&n2).and_then(|s| s.first()),
            seq.get(&h2).and_then(|s| s.last()),
        );
        let (Some(&a0), Some(&b0), Some(&a_s), Some(&b_s)) = ends else {
            warn!("Bevel strip for edge {}-{} has no corners, skipping", v1, v2);
            continue;
        };

        let col_a = build_column(&mut builder, mesh, a0, a_s, v1, segments, exponent);
        let col_b = build_column(&mut builder, mesh, b0, b_s, v2, segments, exponent);
        for k in 0..segments {
            faces.push(vec![col_b[k], col_a[k], col_a[k + 1], col_b[k + 1]]);
        }
        columns.insert(h1, (col_a, col_b));
    }

    for &v in &displaced {
        let Some(Some(fan)) = fans.get(&v) else {
            continue;
        };
        let mut ring: Vec<u32> = Vec::new();
        for &out in fan {
            if let Some(points) = seq.get(&out) {
                ring.extend(points.iter().rev());
            }
            let incoming = mesh.half_edges[out as usize].prev;
            let canon = mesh.canonical_edge(incoming);
            if let Some((col_a, col_b)) = columns.get(&canon) {
                if incoming == canon {
                    ring.extend_from_slice(&col_b[1..segments]);
                } else {
                    ring.extend(col_a[1..segments].iter().rev());
                }
            }
        }
        dedupe_ring(&mut ring);
        if ring.len() >= 3 {
            faces.push(ring);
        }
    }

    report.beveled_edges = beveled.len();
    report.new_faces = faces.len() - first_new_face;

    let edit = assemble(builder, faces, first_new_face);
    debug!(
        "Beveled {} edges (offset {:.4}): {} vertices, {} faces",
        report.beveled_edges,
        params.offset,
        edit.vertex_count(),
        edit.face_count()
    );
    mesh.load(&edit);
    report
}

/// Manifold edge with closed fans at both endpoints.
fn qualifies(
    mesh: &HalfEdgeMesh,
    he: HalfEdgeId,
    fans: &mut HashMap<VertexId, Option<Vec<HalfEdgeId>>>,
) -> bool {
    let edge = mesh.half_edges[he as usize];
    let Some(twin) = mesh.half_edges.get(edge.twin as usize) else {
        return false;
    };
    if edge.face == INVALID || twin.face == INVALID || edge.face == twin.face {
        return false;
    }
    let (a, b) = mesh.edge_vertices(he);
    [a, b].into_iter().all(|v| {
        fans.entry(v)
            .or_insert_with(|| mesh.closed_fan(v))
            .is_some()
    })
}

fn collect_corners(
    mesh: &HalfEdgeMesh,
    displaced: &BTreeSet<VertexId>,
    fans: &HashMap<VertexId, Option<Vec<HalfEdgeId>>>,
    bevel_set: &HashSet<Edge>,
) -> Vec<Corner> {
    let mut corners = Vec::new();
    for &v in displaced {
        let Some(Some(fan)) = fans.get(&v) else {
            continue;
        };
        let origin = mesh.vertices[v as usize].position;
        for &out in fan {
            let incoming = mesh.half_edges[out as usize].prev;
            let prev_vertex = mesh.half_edges[incoming as usize].vertex;
            let (_, next_vertex) = mesh.edge_vertices(out);
            let in_edge = Edge::new(prev_vertex, v);
            let out_edge = Edge::new(v, next_vertex);
            let dir_in = (mesh.vertices[prev_vertex as usize].position - origin).normalize_or_zero();
            let dir_out = (mesh.vertices[next_vertex as usize].position - origin).normalize_or_zero();
            corners.push(Corner {
                vertex: v,
                out,
                in_beveled: bevel_set.contains(&in_edge),
                out_beveled: bevel_set.contains(&out_edge),
                dir_in,
                dir_out,
                in_edge,
                out_edge,
                sin: dir_in.cross(dir_out).length(),
            });
        }
    }
    corners
}

/// Profile vertices from `start` to `end` around the original vertex `corner`.
fn build_column(
    builder: &mut Builder,
    mesh: &HalfEdgeMesh,
    start: u32,
    end: u32,
    corner: VertexId,
    segments: usize,
    exponent: f32,
) -> Vec<u32> {
    let a = builder.positions[start as usize];
    let b = builder.positions[end as usize];
    let c = mesh.vertices[corner as usize].position;
    let uv = mesh.vertices[corner as usize].uv;

    let mut column = Vec::with_capacity(segments + 1);
    column.push(start);
    for k in 1..segments {
        let t = k as f32 / segments as f32;
        column.push(builder.add(profile_point(a, b, c, exponent, t), uv));
    }
    column.push(end);
    column
}

/// Remove repeated vertices from a polygon loop, keeping first occurrences.
fn dedupe_ring(ring: &mut Vec<u32>) {
    let mut seen = HashSet::new();
    ring.retain(|v| seen.insert(*v));
}

/// Drop unreferenced vertices and build the stored mesh with the new faces
/// selected.
fn assemble(builder: Builder, faces: Vec<Vec<u32>>, first_new_face: usize) -> EditMesh {
    let mut remap = vec![INVALID; builder.positions.len()];
    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    for face in &faces {
        for &v in face {
            if remap[v as usize] == INVALID {
                remap[v as usize] = positions.len() as u32;
                positions.push(builder.positions[v as usize]);
                uvs.push(builder.uvs[v as usize]);
            }
        }
    }
    let faces: Vec<Vec<u32>> = faces
        .into_iter()
        .map(|face| face.into_iter().map(|v| remap[v as usize]).collect())
        .collect();

    let mut edit = EditMesh::from_polygons(positions, faces);
    edit.uvs = uvs;
    for fi in first_new_face..edit.faces.len() {
        edit.face_select[fi] = true;
        for edge in edit.face_edges(fi) {
            edit.select_edge(edge.0, edge.1);
        }
    }
    edit
}
