use bevy::prelude::*;

use super::state::EditorStatePlugin;
use crate::gizmos::EditorGizmosPlugin;
use crate::modeling::MeshModelPlugin;
use crate::selection::SelectionPlugin;
use crate::settings::SettingsPlugin;

/// Main plugin that bundles mesh editing functionality
pub struct MeshSessionPlugin;

impl Plugin for MeshSessionPlugin {
    fn build(&self, app: &mut App) {
        app
            // Editor core
            .add_plugins(EditorStatePlugin)
            .add_plugins(SettingsPlugin)
            // Editor systems
            .add_plugins(SelectionPlugin)
            .add_plugins(EditorGizmosPlugin)
            .add_plugins(MeshModelPlugin)
            // Setup
            .add_systems(Startup, setup_editor_scene);
    }
}

/// Setup initial editor scene with lighting
fn setup_editor_scene(mut commands: Commands) {
    // Ambient light (now a component in Bevy 0.18+)
    commands.spawn(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
        affects_lightmapped_meshes: true,
    });
}
