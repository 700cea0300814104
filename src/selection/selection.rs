use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::editor::mode::EditableMesh;
use crate::editor::state::EditorState;
use crate::modeling::edit_mesh::EditMesh;
use crate::modeling::input::ActiveTool;

/// Marker component for selected entities
#[derive(Component, Default)]
pub struct Selected;

/// Resource to track multi-selection state
#[derive(Resource, Default)]
pub struct SelectionState {
    pub multi_select: bool,
}

pub struct SelectionSystemPlugin;

impl Plugin for SelectionSystemPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SelectionState>()
            .add_systems(Update, (update_multi_select_state, handle_click_selection).chain());
    }
}

/// The selected editable mesh tools operate on. With several selected, the
/// lowest entity wins so the choice is stable.
pub fn selected_target(world: &mut World) -> Option<Entity> {
    world
        .query_filtered::<Entity, (With<Selected>, With<EditableMesh>)>()
        .iter(world)
        .min()
}

/// Track shift key for multi-selection
fn update_multi_select_state(keyboard: Res<ButtonInput<KeyCode>>, mut state: ResMut<SelectionState>) {
    state.multi_select = keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight);
}

/// Handle click-to-select by casting the cursor ray against mesh bounds
fn handle_click_selection(
    mouse_button: Res<ButtonInput<MouseButton>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    meshes: Query<(Entity, &EditableMesh, &GlobalTransform)>,
    selected: Query<Entity, With<Selected>>,
    assets: Res<Assets<EditMesh>>,
    selection_state: Res<SelectionState>,
    editor_state: Res<EditorState>,
    active_tool: Option<Res<ActiveTool>>,
    mut commands: Commands,
) {
    // Only select on left click
    if !mouse_button.just_pressed(MouseButton::Left) || !editor_state.editor_active {
        return;
    }
    // The running tool keeps its target
    if active_tool.is_some_and(|t| t.is_running()) {
        return;
    }

    let Ok(window) = window_query.single() else {
        return;
    };
    let Some(cursor_position) = window.cursor_position() else {
        return;
    };
    let Some((camera, camera_transform)) = camera_query.iter().find(|(c, _)| c.is_active) else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(camera_transform, cursor_position) else {
        return;
    };

    let hit = meshes
        .iter()
        .filter_map(|(entity, editable, transform)| {
            let mesh = assets.get(&editable.0)?;
            let (center, radius) = bounding_sphere(mesh, transform)?;
            ray_sphere_distance(ray, center, radius).map(|t| (entity, t))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(entity, _)| entity);

    if let Some(entity_to_select) = hit {
        if !selection_state.multi_select {
            // Clear previous selection
            for entity in selected.iter() {
                if entity != entity_to_select {
                    commands.entity(entity).remove::<Selected>();
                }
            }
        }

        // Toggle selection if multi-select and already selected
        if selection_state.multi_select && selected.get(entity_to_select).is_ok() {
            commands.entity(entity_to_select).remove::<Selected>();
        } else {
            commands.entity(entity_to_select).insert(Selected);
        }
    } else if !selection_state.multi_select {
        // Clicked on nothing - clear selection
        for entity in selected.iter() {
            commands.entity(entity).remove::<Selected>();
        }
    }
}

/// World-space sphere around the mesh's vertices.
fn bounding_sphere(mesh: &EditMesh, transform: &GlobalTransform) -> Option<(Vec3, f32)> {
    if mesh.positions.is_empty() {
        return None;
    }
    let world: Vec<Vec3> = mesh
        .positions
        .iter()
        .map(|p| transform.transform_point(*p))
        .collect();
    let center = world.iter().copied().sum::<Vec3>() / world.len() as f32;
    let radius = world
        .iter()
        .map(|p| p.distance(center))
        .fold(0.0_f32, f32::max);
    Some((center, radius))
}

/// Distance along the ray to the first sphere hit. A ray starting inside
/// the sphere hits at 0.
fn ray_sphere_distance(ray: Ray3d, center: Vec3, radius: f32) -> Option<f32> {
    let dir = *ray.direction;
    let to_center = center - ray.origin;
    let along = to_center.dot(dir);
    let closest_sq = to_center.length_squared() - along * along;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }
    let half_chord = (radius_sq - closest_sq).sqrt();
    let near = along - half_chord;
    let far = along + half_chord;
    if far < 0.0 {
        None
    } else {
        Some(near.max(0.0))
    }
}
