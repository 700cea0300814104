//! Interactive mesh edit session with snapshot undo.
//!
//! A `MeshSession` binds one live `HalfEdgeMesh` to one target entity. The
//! live mesh either aliases the entity's `EditModeMesh` or is an owned copy of
//! its `EditMesh` payload. Every operation re-checks that the target, its
//! payload and the original snapshot are still the ones captured at start.
//!
//! The public operations return `bool` and never panic. Each has a `try_*`
//! twin that reports why it failed; the `bool` form logs that reason once.

use bevy::prelude::*;
use thiserror::Error;

use super::edit_mesh::EditMesh;
use super::half_edge::HalfEdgeMesh;
use super::snapshot::{DEFAULT_UNDO_LIMIT, SnapshotStore};
use crate::editor::mode::{
    EditModeMesh, EditableMesh, is_in_edit_mode, sync_payload_from_edit_mode, sync_render_mesh,
};
use crate::editor::state::{SelectMode, ToolSettings};
use crate::settings::SessionSettings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
    #[error("target {0} no longer exists")]
    TargetMissing(Entity),
    #[error("target {0} is not an editable mesh")]
    NotAMesh(Entity),
    #[error("mesh payload was replaced outside the session")]
    PayloadSwapped,
    #[error("mesh payload asset is missing")]
    PayloadMissing,
    #[error("original backup is missing")]
    OriginalMissing,
    #[error("latest backup is missing")]
    BackupMissing,
    #[error("live mesh is stale")]
    StaleLive,
    #[error("live mesh has an invalid structure")]
    InvalidStructure,
    #[error("Assets<EditMesh> resource is missing")]
    MissingAssets,
}

/// Where the live mesh lives.
#[derive(Debug)]
enum LiveMesh {
    /// The target's `EditModeMesh` with this generation.
    EditMode { generation: u32 },
    Owned(HalfEdgeMesh),
}

#[derive(Debug)]
pub struct MeshSession {
    target: Entity,
    payload: AssetId<EditMesh>,
    matrix_world: Mat4,
    matrix_world_inverse: Mat4,
    matrix_world_transpose: Mat4,
    store: SnapshotStore,
    live: Option<LiveMesh>,
    last_error: Option<SessionError>,
    closed: bool,
}

impl MeshSession {
    /// Start a session on `target` with the undo limit from `SessionSettings`.
    pub fn new(world: &mut World, target: Entity) -> Result<Self, SessionError> {
        let limit = world
            .get_resource::<SessionSettings>()
            .map_or(DEFAULT_UNDO_LIMIT, |s| s.undo_limit);
        Self::with_undo_limit(world, target, limit)
    }

    /// Start a session on `target`, capturing its payload identity, its world
    /// transform and the original snapshot.
    pub fn with_undo_limit(
        world: &mut World,
        target: Entity,
        undo_limit: usize,
    ) -> Result<Self, SessionError> {
        let entity = world
            .get_entity(target)
            .map_err(|_| SessionError::TargetMissing(target))?;
        let payload = entity
            .get::<EditableMesh>()
            .ok_or(SessionError::NotAMesh(target))?
            .0
            .id();
        let matrix_world = entity
            .get::<GlobalTransform>()
            .map_or(Mat4::IDENTITY, |gt| Mat4::from(gt.affine()));

        let mut original = match entity.get::<EditModeMesh>() {
            Some(edit_mode) => edit_mode.mesh.to_edit_mesh(),
            None => world
                .get_resource::<Assets<EditMesh>>()
                .ok_or(SessionError::MissingAssets)?
                .get(payload)
                .cloned()
                .ok_or(SessionError::PayloadMissing)?,
        };
        original.recompute_triangles();

        let mut store = SnapshotStore::new(undo_limit);
        let mut assets = world
            .get_resource_mut::<Assets<EditMesh>>()
            .ok_or(SessionError::MissingAssets)?;
        store.set_original(&mut assets, original);

        let matrix_world_inverse = if matrix_world.determinant().abs() > f32::EPSILON {
            matrix_world.inverse()
        } else {
            Mat4::IDENTITY
        };

        info!("Mesh session started on {} (undo limit {})", target, store.limit());
        Ok(Self {
            target,
            payload,
            matrix_world,
            matrix_world_inverse,
            matrix_world_transpose: matrix_world.transpose(),
            store,
            live: None,
            last_error: None,
            closed: false,
        })
    }

    // -------------------------------------------------------------------
    // Public contract
    // -------------------------------------------------------------------

    pub fn validate(&mut self, world: &mut World) -> bool {
        let result = self.try_validate(world);
        self.report("validate", result)
    }

    pub fn ensure_live(&mut self, world: &mut World) -> bool {
        let result = self.try_ensure_live(world);
        self.report("ensure_live", result)
    }

    pub fn restore(&mut self, world: &mut World) -> bool {
        let result = self.try_restore(world);
        self.report("restore", result)
    }

    pub fn update(&mut self, world: &mut World) -> bool {
        let result = self.try_update(world);
        self.report("update", result)
    }

    pub fn save(&mut self, world: &mut World) -> bool {
        let result = self.try_save(world);
        self.report("save", result)
    }

    pub fn undo(&mut self, world: &mut World) -> bool {
        let result = self.try_undo(world);
        self.report("undo", result)
    }

    /// Tear the session down. With `revert` the live mesh first rolls back to
    /// the original snapshot. Safe to call more than once.
    pub fn close(&mut self, world: &mut World, revert: bool) {
        if self.closed {
            return;
        }
        let payload = self.payload;

        if let Some(mut assets) = world.get_resource_mut::<Assets<EditMesh>>() {
            self.store.release_backups(&mut assets, payload);
        }
        if revert {
            self.restore(world);
        }
        self.update(world);
        self.live = None;

        if let Some(mut assets) = world.get_resource_mut::<Assets<EditMesh>>() {
            if let Some(mut edit) = assets.get(payload).cloned() {
                edit.recompute_triangles();
                if assets.insert(payload, edit).is_err() {
                    warn!("Mesh payload of {} went stale before close", self.target);
                }
            }
            self.store.release_original(&mut assets, payload);
        }

        self.closed = true;
        self.last_error = None;
        info!("Mesh session closed on {} (revert: {})", self.target, revert);
    }

    // -------------------------------------------------------------------
    // Fallible operations
    // -------------------------------------------------------------------

    /// Identity checks, then `try_ensure_live`.
    pub fn try_validate(&mut self, world: &mut World) -> Result<(), SessionError> {
        self.check_identity(world)?;
        self.try_ensure_live(world)
    }

    /// Drop a stale live mesh and build a new one when missing.
    pub fn try_ensure_live(&mut self, world: &mut World) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if let Err(err) = self.check_live(world) {
            debug!("Rebuilding live mesh of {}: {}", self.target, err);
            self.live = None;
        }
        if self.live.is_some() {
            return Ok(());
        }

        let mode = select_mode(world);
        let live = if let Some(mut edit_mode) = world.get_mut::<EditModeMesh>(self.target) {
            if !edit_mode.mesh.is_valid() {
                return Err(SessionError::InvalidStructure);
            }
            edit_mode.mesh.refresh_derived(mode);
            LiveMesh::EditMode {
                generation: edit_mode.generation(),
            }
        } else {
            let assets = world
                .get_resource::<Assets<EditMesh>>()
                .ok_or(SessionError::MissingAssets)?;
            let edit = assets.get(self.payload).ok_or(SessionError::PayloadMissing)?;
            let mut mesh = HalfEdgeMesh::from_edit_mesh(edit);
            if !mesh.is_valid() {
                return Err(SessionError::InvalidStructure);
            }
            mesh.refresh_derived(mode);
            LiveMesh::Owned(mesh)
        };
        self.live = Some(live);
        Ok(())
    }

    /// Rebuild the live mesh from the latest backup, or the original.
    pub fn try_restore(&mut self, world: &mut World) -> Result<(), SessionError> {
        self.try_validate(world)?;
        let id = self.store.latest_id().ok_or(SessionError::OriginalMissing)?;
        let backup = world
            .get_resource::<Assets<EditMesh>>()
            .ok_or(SessionError::MissingAssets)?
            .get(id)
            .cloned()
            .ok_or(SessionError::BackupMissing)?;

        let mode = select_mode(world);
        let mesh = self.live_mut(world).ok_or(SessionError::StaleLive)?;
        mesh.clear();
        mesh.load(&backup);
        if !mesh.is_valid() {
            return Err(SessionError::InvalidStructure);
        }
        mesh.refresh_derived(mode);
        Ok(())
    }

    /// Refresh selection and normals, then flush the live mesh to what the
    /// host displays.
    pub fn try_update(&mut self, world: &mut World) -> Result<(), SessionError> {
        self.try_validate(world)?;
        let mode = select_mode(world);
        let aliased = self.is_aliased();
        let mesh = self.live_mut(world).ok_or(SessionError::StaleLive)?;
        mesh.refresh_selection(mode);
        let edit = mesh.to_edit_mesh();

        sync_render_mesh(world, self.target, &edit);
        if !aliased {
            let mut assets = world
                .get_resource_mut::<Assets<EditMesh>>()
                .ok_or(SessionError::MissingAssets)?;
            assets
                .insert(self.payload, edit)
                .map_err(|_| SessionError::PayloadMissing)?;
        }
        Ok(())
    }

    /// Flush, then snapshot the payload onto the undo stack.
    pub fn try_save(&mut self, world: &mut World) -> Result<(), SessionError> {
        self.try_update(world)?;
        if is_in_edit_mode(world, self.target) && !sync_payload_from_edit_mode(world, self.target)
        {
            return Err(SessionError::PayloadMissing);
        }

        let payload = self.payload;
        let mut assets = world
            .get_resource_mut::<Assets<EditMesh>>()
            .ok_or(SessionError::MissingAssets)?;
        let mut snapshot = assets
            .get(payload)
            .cloned()
            .ok_or(SessionError::PayloadMissing)?;
        snapshot.recompute_triangles();
        let id = self.store.push(&mut assets, snapshot, payload);
        debug!(
            "Saved mesh backup {:?} ({}/{})",
            id,
            self.store.len(),
            self.store.limit()
        );
        Ok(())
    }

    /// Drop the latest backup, then restore and flush.
    pub fn try_undo(&mut self, world: &mut World) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let payload = self.payload;
        if let Some(mut assets) = world.get_resource_mut::<Assets<EditMesh>>() {
            self.store.pop(&mut assets, payload);
        }
        self.try_restore(world)?;
        self.try_update(world)
    }

    // -------------------------------------------------------------------
    // Access
    // -------------------------------------------------------------------

    /// The live mesh, if one is built and still current.
    pub fn live<'a>(&'a self, world: &'a World) -> Option<&'a HalfEdgeMesh> {
        match self.live.as_ref()? {
            LiveMesh::Owned(mesh) => Some(mesh),
            LiveMesh::EditMode { generation } => {
                let edit_mode = world.get::<EditModeMesh>(self.target)?;
                (edit_mode.generation() == *generation).then_some(&edit_mode.mesh)
            }
        }
    }

    pub fn live_mut<'a>(&'a mut self, world: &'a mut World) -> Option<&'a mut HalfEdgeMesh> {
        let target = self.target;
        match self.live.as_mut()? {
            LiveMesh::Owned(mesh) => Some(mesh),
            LiveMesh::EditMode { generation } => {
                let generation = *generation;
                let edit_mode = world.get_mut::<EditModeMesh>(target)?.into_inner();
                (edit_mode.generation() == generation).then_some(&mut edit_mode.mesh)
            }
        }
    }

    pub fn target(&self) -> Entity {
        self.target
    }

    pub fn payload_id(&self) -> AssetId<EditMesh> {
        self.payload
    }

    pub fn matrix_world(&self) -> Mat4 {
        self.matrix_world
    }

    pub fn matrix_world_inverse(&self) -> Mat4 {
        self.matrix_world_inverse
    }

    pub fn matrix_world_transpose(&self) -> Mat4 {
        self.matrix_world_transpose
    }

    pub fn undo_limit(&self) -> usize {
        self.store.limit()
    }

    pub fn backup_count(&self) -> usize {
        self.store.len()
    }

    pub fn backup_ids(&self) -> Vec<AssetId<EditMesh>> {
        self.store.backup_ids()
    }

    pub fn original_id(&self) -> Option<AssetId<EditMesh>> {
        self.store.original_id()
    }

    pub fn is_aliased(&self) -> bool {
        matches!(self.live, Some(LiveMesh::EditMode { .. }))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reason the last failed operation gave.
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn check_identity(&self, world: &World) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let entity = world
            .get_entity(self.target)
            .map_err(|_| SessionError::TargetMissing(self.target))?;
        let editable = entity
            .get::<EditableMesh>()
            .ok_or(SessionError::NotAMesh(self.target))?;
        if editable.0.id() != self.payload {
            return Err(SessionError::PayloadSwapped);
        }
        let assets = world
            .get_resource::<Assets<EditMesh>>()
            .ok_or(SessionError::MissingAssets)?;
        if !assets.contains(self.payload) {
            return Err(SessionError::PayloadMissing);
        }
        match self.store.original_id() {
            Some(id) if assets.contains(id) => Ok(()),
            _ => Err(SessionError::OriginalMissing),
        }
    }

    fn check_live(&self, world: &World) -> Result<(), SessionError> {
        match &self.live {
            None => Ok(()),
            Some(LiveMesh::EditMode { generation }) => match world.get::<EditModeMesh>(self.target) {
                Some(edit_mode) if edit_mode.generation() == *generation => {
                    if edit_mode.mesh.is_valid() {
                        Ok(())
                    } else {
                        Err(SessionError::InvalidStructure)
                    }
                }
                _ => Err(SessionError::StaleLive),
            },
            Some(LiveMesh::Owned(mesh)) => {
                if is_in_edit_mode(world, self.target) {
                    Err(SessionError::StaleLive)
                } else if !mesh.is_valid() {
                    Err(SessionError::InvalidStructure)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn report(&mut self, op: &str, result: Result<(), SessionError>) -> bool {
        match result {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                if self.last_error.as_ref() != Some(&err) {
                    warn!("Mesh session {} on {} failed: {}", op, self.target, err);
                }
                self.last_error = Some(err);
                false
            }
        }
    }
}

fn select_mode(world: &World) -> SelectMode {
    world
        .get_resource::<ToolSettings>()
        .map(|s| s.select_mode)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::mode::{enter_edit_mode, exit_edit_mode};

    fn world_with_cube() -> (World, Entity, AssetId<EditMesh>) {
        let mut world = World::new();
        world.init_resource::<Assets<EditMesh>>();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<ToolSettings>();
        let handle = world
            .resource_mut::<Assets<EditMesh>>()
            .add(EditMesh::cube(1.0));
        let id = handle.id();
        let entity = world
            .spawn((
                EditableMesh(handle),
                GlobalTransform::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            ))
            .id();
        (world, entity, id)
    }

    fn payload_x(world: &World, id: AssetId<EditMesh>) -> f32 {
        world
            .resource::<Assets<EditMesh>>()
            .get(id)
            .expect("payload")
            .positions[0]
            .x
    }

    /// Move vertex 0 so saved states can be told apart.
    fn mark(session: &mut MeshSession, world: &mut World, x: f32) {
        assert!(session.validate(world));
        session.live_mut(world).expect("live mesh").vertices[0].position.x = x;
        assert!(session.update(world));
    }

    #[test]
    fn construction_captures_transform_and_original() {
        let (mut world, entity, id) = world_with_cube();
        let session = MeshSession::new(&mut world, entity).expect("session");

        assert_eq!(session.target(), entity);
        assert_eq!(session.payload_id(), id);
        assert_eq!(session.undo_limit(), DEFAULT_UNDO_LIMIT);
        assert_eq!(session.backup_count(), 0);
        assert_eq!(
            session.matrix_world().w_axis.truncate(),
            Vec3::new(1.0, 2.0, 3.0)
        );
        let product = session.matrix_world() * session.matrix_world_inverse();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-6));

        let original = session.original_id().expect("original");
        assert_ne!(original, id);
        let assets = world.resource::<Assets<EditMesh>>();
        assert!(assets.get(original).expect("original").geometry_eq(assets.get(id).expect("payload")));
    }

    #[test]
    fn restore_twice_is_idempotent() {
        let (mut world, entity, _) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");
        mark(&mut session, &mut world, 2.0);
        assert!(session.save(&mut world));
        mark(&mut session, &mut world, 5.0);

        let backup = world
            .resource::<Assets<EditMesh>>()
            .get(session.backup_ids()[0])
            .cloned()
            .expect("backup");

        assert!(session.restore(&mut world));
        let first = session.live(&world).expect("live mesh").to_edit_mesh();
        assert!(first.geometry_eq(&backup));

        assert!(session.restore(&mut world));
        let second = session.live(&world).expect("live mesh").to_edit_mesh();
        assert!(second.geometry_eq(&backup));
        assert!(second.geometry_eq(&first));
    }

    #[test]
    fn construction_rejects_missing_and_non_mesh_targets() {
        let (mut world, entity, _) = world_with_cube();
        let plain = world.spawn_empty().id();
        assert_eq!(
            MeshSession::new(&mut world, plain).err(),
            Some(SessionError::NotAMesh(plain))
        );

        world.despawn(entity);
        assert_eq!(
            MeshSession::new(&mut world, entity).err(),
            Some(SessionError::TargetMissing(entity))
        );
    }

    #[test]
    fn validate_builds_owned_live_mesh() {
        let (mut world, entity, _) = world_with_cube();
        world.resource_mut::<ToolSettings>().select_mode = SelectMode::FACE;
        let mut session = MeshSession::new(&mut world, entity).expect("session");

        assert!(session.live(&world).is_none());
        assert!(session.validate(&mut world));
        assert!(!session.is_aliased());
        let live = session.live(&world).expect("live mesh");
        assert_eq!(live.faces.len(), 6);
        assert_eq!(live.select_mode, SelectMode::FACE);
    }

    #[test]
    fn validate_fails_after_despawn() {
        let (mut world, entity, _) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");
        world.despawn(entity);

        assert!(!session.validate(&mut world));
        assert_eq!(session.last_error(), Some(&SessionError::TargetMissing(entity)));
        assert!(!session.update(&mut world));
    }

    #[test]
    fn validate_fails_when_payload_is_swapped() {
        let (mut world, entity, _) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");

        let other = world
            .resource_mut::<Assets<EditMesh>>()
            .add(EditMesh::cube(3.0));
        world.entity_mut(entity).insert(EditableMesh(other));
        assert!(!session.validate(&mut world));
        assert_eq!(session.last_error(), Some(&SessionError::PayloadSwapped));
    }

    #[test]
    fn validate_fails_when_original_is_removed() {
        let (mut world, entity, _) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");
        let original = session.original_id().expect("original");
        world.resource_mut::<Assets<EditMesh>>().remove(original);

        assert!(!session.validate(&mut world));
        assert_eq!(session.last_error(), Some(&SessionError::OriginalMissing));
    }

    #[test]
    fn restore_discards_speculative_edits() {
        let (mut world, entity, id) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");

        mark(&mut session, &mut world, 7.0);
        assert_eq!(payload_x(&world, id), 7.0);

        assert!(session.restore(&mut world));
        assert_eq!(session.live(&world).expect("live").vertices[0].position.x, -0.5);
        assert!(session.update(&mut world));
        assert_eq!(payload_x(&world, id), -0.5);
    }

    #[test]
    fn update_rebuilds_render_mesh() {
        let (mut world, entity, _) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");
        assert!(session.update(&mut world));
        assert!(world.get::<Mesh3d>(entity).is_some());
    }

    #[test]
    fn save_and_undo_follow_the_stack() {
        let (mut world, entity, id) = world_with_cube();
        let mut session = MeshSession::with_undo_limit(&mut world, entity, 3).expect("session");

        for x in [1.0, 2.0, 3.0, 4.0] {
            mark(&mut session, &mut world, x);
            assert!(session.save(&mut world));
        }
        assert_eq!(session.backup_count(), 3);
        // payload, original and three backups
        assert_eq!(world.resource::<Assets<EditMesh>>().len(), 5);

        assert!(session.undo(&mut world));
        assert_eq!(session.backup_count(), 2);
        assert_eq!(payload_x(&world, id), 3.0);

        assert!(session.undo(&mut world));
        assert!(session.undo(&mut world));
        assert_eq!(payload_x(&world, id), -0.5, "back at the original");
        assert!(session.undo(&mut world), "undo with no backups restores the original");
    }

    #[test]
    fn close_with_revert_returns_to_original_and_frees_backups() {
        let (mut world, entity, id) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");
        for x in [1.0, 2.0] {
            mark(&mut session, &mut world, x);
            assert!(session.save(&mut world));
        }
        mark(&mut session, &mut world, 9.0);

        session.close(&mut world, true);
        assert!(session.is_closed());
        assert_eq!(payload_x(&world, id), -0.5);
        assert_eq!(world.resource::<Assets<EditMesh>>().len(), 1, "only the payload is left");
    }

    #[test]
    fn close_without_revert_keeps_last_flush() {
        let (mut world, entity, id) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");
        mark(&mut session, &mut world, 5.0);

        session.close(&mut world, false);
        assert_eq!(payload_x(&world, id), 5.0);
        assert_eq!(world.resource::<Assets<EditMesh>>().len(), 1);
    }

    #[test]
    fn closed_session_refuses_everything() {
        let (mut world, entity, id) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");
        session.close(&mut world, false);
        session.close(&mut world, true);

        assert!(!session.validate(&mut world));
        assert!(!session.restore(&mut world));
        assert!(!session.save(&mut world));
        assert!(!session.undo(&mut world));
        assert_eq!(session.last_error(), Some(&SessionError::Closed));
        assert!(world.resource::<Assets<EditMesh>>().get(id).is_some());
    }

    #[test]
    fn edit_mode_target_is_aliased() {
        let (mut world, entity, id) = world_with_cube();
        assert!(enter_edit_mode(&mut world, entity));
        let mut session = MeshSession::new(&mut world, entity).expect("session");

        assert!(session.validate(&mut world));
        assert!(session.is_aliased());
        session.live_mut(&mut world).expect("live").vertices[0].position.x = 4.0;
        assert!(session.update(&mut world));

        let edit_mode = world.get::<EditModeMesh>(entity).expect("edit mode");
        assert_eq!(edit_mode.mesh.vertices[0].position.x, 4.0);
        assert_eq!(payload_x(&world, id), -0.5, "update leaves the payload to the host");

        assert!(session.save(&mut world));
        assert_eq!(payload_x(&world, id), 4.0, "save syncs from edit mode");
    }

    #[test]
    fn entering_edit_mode_mid_session_switches_to_alias() {
        let (mut world, entity, _) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");
        assert!(session.validate(&mut world));
        assert!(!session.is_aliased());

        enter_edit_mode(&mut world, entity);
        assert!(session.validate(&mut world));
        assert!(session.is_aliased());

        exit_edit_mode(&mut world, entity);
        assert!(session.validate(&mut world));
        assert!(!session.is_aliased());

        enter_edit_mode(&mut world, entity);
        assert!(session.validate(&mut world));
        assert!(session.live(&world).is_some(), "alias follows the new generation");
    }

    #[test]
    fn corrupted_live_mesh_is_rebuilt() {
        let (mut world, entity, _) = world_with_cube();
        let mut session = MeshSession::new(&mut world, entity).expect("session");
        assert!(session.validate(&mut world));

        session.live_mut(&mut world).expect("live").half_edges[0].twin = 5;
        assert!(session.validate(&mut world));
        assert!(session.live(&world).expect("live").is_valid());
    }
}
