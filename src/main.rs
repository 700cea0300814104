//! Standalone demo: a cube with one selected edge, ready to bevel.

use bevy::prelude::*;
use bevy_mesh_session::editor::sync_render_mesh;
use bevy_mesh_session::{EditMesh, EditableMesh, MeshSessionPlugin, Selected};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Bevy Mesh Session".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(MeshSessionPlugin)
        .add_systems(Startup, (setup_camera, spawn_demo_cube))
        .run();
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(4.0, 3.5, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(3.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn spawn_demo_cube(world: &mut World) {
    let mut cube = EditMesh::cube(2.0);
    cube.select_edge(6, 7);
    let handle = world.resource_mut::<Assets<EditMesh>>().add(cube.clone());
    let material = world
        .resource_mut::<Assets<StandardMaterial>>()
        .add(StandardMaterial {
            base_color: Color::srgb(0.7, 0.7, 0.75),
            ..default()
        });

    let entity = world
        .spawn((
            Name::new("Cube"),
            EditableMesh(handle),
            MeshMaterial3d(material),
            Transform::default(),
            Selected,
        ))
        .id();
    sync_render_mesh(world, entity, &cube);
}
