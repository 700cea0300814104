//! Object mode and edit mode for editable meshes.
//!
//! In object mode the `EditMesh` asset behind `EditableMesh` is the only copy
//! of the geometry. Entering edit mode builds an `EditModeMesh` component that
//! holds the working `HalfEdgeMesh`; leaving edit mode writes it back.

use bevy::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

use super::state::ToolSettings;
use crate::modeling::edit_mesh::EditMesh;
use crate::modeling::half_edge::HalfEdgeMesh;

static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

/// Marks an entity as an editable mesh and points at its stored geometry.
#[derive(Component, Debug, Clone)]
pub struct EditableMesh(pub Handle<EditMesh>);

/// Working mesh of an entity in edit mode.
///
/// Every instance gets a fresh generation, so anything that aliases it can
/// tell a re-entered edit mode apart from the one it started with.
#[derive(Component, Debug)]
pub struct EditModeMesh {
    pub mesh: HalfEdgeMesh,
    generation: u32,
}

impl EditModeMesh {
    pub fn new(mesh: HalfEdgeMesh) -> Self {
        Self {
            mesh,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

pub fn is_in_edit_mode(world: &World, entity: Entity) -> bool {
    world.get::<EditModeMesh>(entity).is_some()
}

/// Build the edit-mode mesh from the entity's payload.
pub fn enter_edit_mode(world: &mut World, entity: Entity) -> bool {
    if is_in_edit_mode(world, entity) {
        return true;
    }
    let Some(id) = world.get::<EditableMesh>(entity).map(|m| m.0.id()) else {
        warn!("Cannot enter edit mode: {} is not an editable mesh", entity);
        return false;
    };
    let mode = world
        .get_resource::<ToolSettings>()
        .map(|s| s.select_mode)
        .unwrap_or_default();
    let Some(edit) = world
        .get_resource::<Assets<EditMesh>>()
        .and_then(|assets| assets.get(id))
    else {
        warn!("Cannot enter edit mode: mesh payload of {} is missing", entity);
        return false;
    };

    let mut mesh = HalfEdgeMesh::from_edit_mesh(edit);
    mesh.refresh_derived(mode);
    world.entity_mut(entity).insert(EditModeMesh::new(mesh));
    info!("Edit mode: {}", entity);
    true
}

/// Write the edit-mode mesh back into the payload and drop it.
pub fn exit_edit_mode(world: &mut World, entity: Entity) -> bool {
    if !sync_payload_from_edit_mode(world, entity) {
        return false;
    }
    if let Ok(mut e) = world.get_entity_mut(entity) {
        e.remove::<EditModeMesh>();
    }
    if let Some(edit) = payload_of(world, entity) {
        sync_render_mesh(world, entity, &edit);
    }
    info!("Object mode: {}", entity);
    true
}

/// Copy the edit-mode mesh into the payload asset. False when the entity is
/// not in edit mode or has no payload.
pub fn sync_payload_from_edit_mode(world: &mut World, entity: Entity) -> bool {
    let Some(edit) = world
        .get::<EditModeMesh>(entity)
        .map(|e| e.mesh.to_edit_mesh())
    else {
        return false;
    };
    let Some(id) = world.get::<EditableMesh>(entity).map(|m| m.0.id()) else {
        return false;
    };
    let Some(mut assets) = world.get_resource_mut::<Assets<EditMesh>>() else {
        return false;
    };
    if !assets.contains(id) {
        return false;
    }
    assets.insert(id, edit).is_ok()
}

/// Clone of the entity's payload asset.
pub fn payload_of(world: &World, entity: Entity) -> Option<EditMesh> {
    let id = world.get::<EditableMesh>(entity)?.0.id();
    world.get_resource::<Assets<EditMesh>>()?.get(id).cloned()
}

/// Rebuild the entity's render mesh from `edit`, adding a `Mesh3d` if it
/// has none. Does nothing in worlds without `Assets<Mesh>`.
pub fn sync_render_mesh(world: &mut World, entity: Entity, edit: &EditMesh) {
    let existing = world.get::<Mesh3d>(entity).map(|m| m.0.id());
    let mesh = edit.to_bevy_mesh();
    let Some(mut meshes) = world.get_resource_mut::<Assets<Mesh>>() else {
        return;
    };
    match existing {
        Some(id) => {
            if meshes.insert(id, mesh).is_err() {
                warn!("Render mesh of {} went stale", entity);
            }
        }
        None => {
            let handle = meshes.add(mesh);
            if let Ok(mut e) = world.get_entity_mut(entity) {
                e.insert(Mesh3d(handle));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_cube() -> (World, Entity, AssetId<EditMesh>) {
        let mut world = World::new();
        world.init_resource::<Assets<EditMesh>>();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<ToolSettings>();
        let handle = world
            .resource_mut::<Assets<EditMesh>>()
            .add(EditMesh::cube(1.0));
        let id = handle.id();
        let entity = world.spawn(EditableMesh(handle)).id();
        (world, entity, id)
    }

    #[test]
    fn enter_and_exit_round_trip() {
        let (mut world, entity, id) = world_with_cube();
        assert!(enter_edit_mode(&mut world, entity));
        assert!(is_in_edit_mode(&world, entity));

        world
            .get_mut::<EditModeMesh>(entity)
            .expect("edit mode mesh")
            .mesh
            .vertices[0]
            .position = Vec3::splat(-2.0);

        assert!(exit_edit_mode(&mut world, entity));
        assert!(!is_in_edit_mode(&world, entity));
        let payload = world.resource::<Assets<EditMesh>>().get(id).expect("payload");
        assert_eq!(payload.positions[0], Vec3::splat(-2.0));
        assert!(world.get::<Mesh3d>(entity).is_some(), "render mesh created");
    }

    #[test]
    fn each_entry_gets_a_new_generation() {
        let (mut world, entity, _) = world_with_cube();
        enter_edit_mode(&mut world, entity);
        let first = world.get::<EditModeMesh>(entity).expect("edit mode").generation();
        exit_edit_mode(&mut world, entity);
        enter_edit_mode(&mut world, entity);
        let second = world.get::<EditModeMesh>(entity).expect("edit mode").generation();
        assert_ne!(first, second);
    }

    #[test]
    fn non_mesh_entities_stay_in_object_mode() {
        let mut world = World::new();
        world.init_resource::<Assets<EditMesh>>();
        let entity = world.spawn_empty().id();
        assert!(!enter_edit_mode(&mut world, entity));
        assert!(!exit_edit_mode(&mut world, entity));
    }

    #[test]
    fn render_mesh_is_reused() {
        let (mut world, entity, id) = world_with_cube();
        let edit = world.resource::<Assets<EditMesh>>().get(id).cloned().expect("payload");
        sync_render_mesh(&mut world, entity, &edit);
        let first = world.get::<Mesh3d>(entity).expect("mesh").0.id();
        sync_render_mesh(&mut world, entity, &edit);
        let second = world.get::<Mesh3d>(entity).expect("mesh").0.id();
        assert_eq!(first, second);
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 1);
    }
}
