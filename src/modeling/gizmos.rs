//! Gizmo rendering for edited meshes.
//!
//! Draws the selected edges of the selected mesh, reading the edit-mode form
//! when there is one and the payload otherwise.

use bevy::prelude::*;

use crate::editor::mode::{EditModeMesh, EditableMesh};
use crate::editor::state::EditorState;
use crate::selection::Selected;

use super::edit_mesh::EditMesh;

// Bevy-native colors matching the theme palette
const HIGHLIGHT_ORANGE: Color = Color::srgb(0.808, 0.569, 0.341);
const WIRE_GREY: Color = Color::srgba(0.8, 0.8, 0.8, 0.35);

/// Draw the selected edges of every selected editable mesh.
pub fn draw_selected_edges(
    mut gizmos: Gizmos,
    editor_state: Res<EditorState>,
    assets: Res<Assets<EditMesh>>,
    selected: Query<(&EditableMesh, &GlobalTransform, Option<&EditModeMesh>), With<Selected>>,
) {
    if !editor_state.gizmos_visible {
        return;
    }

    for (editable, transform, edit_mode) in &selected {
        match edit_mode {
            Some(edit_mode) => {
                let mesh = &edit_mode.mesh;
                // Wireframe so the cage is visible in edit mode
                for he in mesh.unique_edges() {
                    let (a, b) = mesh.edge_vertices(he);
                    let color = if mesh.half_edges[he as usize].selected {
                        HIGHLIGHT_ORANGE
                    } else {
                        WIRE_GREY
                    };
                    gizmos.line(
                        transform.transform_point(mesh.vertices[a as usize].position),
                        transform.transform_point(mesh.vertices[b as usize].position),
                        color,
                    );
                }
            }
            None => {
                let Some(mesh) = assets.get(&editable.0) else {
                    continue;
                };
                for edge in &mesh.selected_edges {
                    let (Some(a), Some(b)) = (
                        mesh.positions.get(edge.0 as usize),
                        mesh.positions.get(edge.1 as usize),
                    ) else {
                        continue;
                    };
                    gizmos.line(
                        transform.transform_point(*a),
                        transform.transform_point(*b),
                        HIGHLIGHT_ORANGE,
                    );
                }
            }
        }
    }
}
