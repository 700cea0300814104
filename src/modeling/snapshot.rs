//! Snapshot history for mesh edit sessions.
//!
//! Backups are `EditMesh` assets in the shared `Assets<EditMesh>` pool. The
//! store holds strong handles to the original snapshot and to a bounded FIFO
//! of later snapshots, most recent last. Releasing a snapshot removes its
//! asset from the pool, but never one that is still the target's payload,
//! the original, or another retained backup.

use bevy::prelude::*;
use std::collections::VecDeque;

use super::edit_mesh::EditMesh;

/// Backups kept per session unless configured otherwise.
pub const DEFAULT_UNDO_LIMIT: usize = 32;

#[derive(Debug, Default)]
pub struct SnapshotStore {
    original: Option<Handle<EditMesh>>,
    backups: VecDeque<Handle<EditMesh>>,
    limit: usize,
}

impl SnapshotStore {
    /// Create an empty store. The limit is at least one.
    pub fn new(limit: usize) -> Self {
        Self {
            original: None,
            backups: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Capture the original snapshot. Not counted against the limit.
    pub fn set_original(&mut self, assets: &mut Assets<EditMesh>, mesh: EditMesh) -> AssetId<EditMesh> {
        let handle = assets.add(mesh);
        let id = handle.id();
        self.original = Some(handle);
        id
    }

    pub fn original_id(&self) -> Option<AssetId<EditMesh>> {
        self.original.as_ref().map(Handle::id)
    }

    /// Ids of the retained backups, oldest first.
    pub fn backup_ids(&self) -> Vec<AssetId<EditMesh>> {
        self.backups.iter().map(Handle::id).collect()
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    /// The snapshot a restore rolls back to: the latest backup, else the original.
    pub fn latest_id(&self) -> Option<AssetId<EditMesh>> {
        self.backups
            .back()
            .or(self.original.as_ref())
            .map(Handle::id)
    }

    /// Append a snapshot and evict the oldest ones above the limit.
    ///
    /// `payload` is the target's current payload and is never released.
    pub fn push(
        &mut self,
        assets: &mut Assets<EditMesh>,
        mesh: EditMesh,
        payload: AssetId<EditMesh>,
    ) -> AssetId<EditMesh> {
        let handle = assets.add(mesh);
        let id = handle.id();
        self.backups.push_back(handle);

        while self.backups.len() > self.limit {
            if let Some(oldest) = self.backups.pop_front() {
                debug!("Evicting oldest mesh backup {:?}", oldest.id());
                self.release(assets, &oldest, payload);
            }
        }
        id
    }

    /// Drop and release the most recent backup. Returns false when empty.
    pub fn pop(&mut self, assets: &mut Assets<EditMesh>, payload: AssetId<EditMesh>) -> bool {
        match self.backups.pop_back() {
            Some(handle) => {
                self.release(assets, &handle, payload);
                true
            }
            None => false,
        }
    }

    /// Release every backup. The original is kept.
    pub fn release_backups(&mut self, assets: &mut Assets<EditMesh>, payload: AssetId<EditMesh>) {
        while let Some(handle) = self.backups.pop_front() {
            self.release(assets, &handle, payload);
        }
    }

    /// Release the original snapshot.
    pub fn release_original(&mut self, assets: &mut Assets<EditMesh>, payload: AssetId<EditMesh>) {
        if let Some(handle) = self.original.take() {
            self.release(assets, &handle, payload);
        }
    }

    /// Remove a snapshot asset no longer held by this store. Returns whether
    /// anything was removed.
    fn release(
        &self,
        assets: &mut Assets<EditMesh>,
        handle: &Handle<EditMesh>,
        payload: AssetId<EditMesh>,
    ) -> bool {
        let id = handle.id();
        if id == payload {
            warn!("Refusing to release mesh backup {:?}: it is the target payload", id);
            return false;
        }
        if self.original_id() == Some(id) || self.backups.iter().any(|h| h.id() == id) {
            warn!("Refusing to release mesh backup {:?}: still retained", id);
            return false;
        }
        assets.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(tag: f32) -> EditMesh {
        let mut mesh = EditMesh::cube(1.0);
        mesh.positions[0].x = tag;
        mesh
    }

    fn tag_of(assets: &Assets<EditMesh>, id: AssetId<EditMesh>) -> f32 {
        assets.get(id).expect("backup asset").positions[0].x
    }

    #[test]
    fn fifo_eviction_keeps_last_limit() {
        let mut assets = Assets::<EditMesh>::default();
        let payload = assets.add(EditMesh::cube(1.0)).id();
        let mut store = SnapshotStore::new(3);
        let original = store.set_original(&mut assets, marked(-1.0));

        let ids: Vec<_> = (0..4)
            .map(|i| store.push(&mut assets, marked(i as f32), payload))
            .collect();

        assert_eq!(store.backup_ids(), ids[1..].to_vec());
        assert!(assets.get(ids[0]).is_none(), "evicted backup should be freed");
        assert!(assets.get(original).is_some());
        assert!(assets.get(payload).is_some());
        assert_eq!(tag_of(&assets, store.latest_id().expect("latest")), 3.0);
    }

    #[test]
    fn many_saves_stay_bounded() {
        let mut assets = Assets::<EditMesh>::default();
        let payload = assets.add(EditMesh::cube(1.0)).id();
        let mut store = SnapshotStore::new(DEFAULT_UNDO_LIMIT);
        store.set_original(&mut assets, EditMesh::cube(1.0));

        for i in 0..50 {
            store.push(&mut assets, marked(i as f32), payload);
            assert!(store.len() <= DEFAULT_UNDO_LIMIT);
        }
        let tags: Vec<f32> = store
            .backup_ids()
            .into_iter()
            .map(|id| tag_of(&assets, id))
            .collect();
        let expected: Vec<f32> = (18..50).map(|i| i as f32).collect();
        assert_eq!(tags, expected);
        // payload + original + retained backups
        assert_eq!(assets.len(), 2 + DEFAULT_UNDO_LIMIT);
    }

    #[test]
    fn latest_falls_back_to_original() {
        let mut assets = Assets::<EditMesh>::default();
        let payload = assets.add(EditMesh::cube(1.0)).id();
        let mut store = SnapshotStore::new(4);
        assert_eq!(store.latest_id(), None);

        let original = store.set_original(&mut assets, marked(-1.0));
        assert_eq!(store.latest_id(), Some(original));

        let saved = store.push(&mut assets, marked(1.0), payload);
        assert_eq!(store.latest_id(), Some(saved));

        assert!(store.pop(&mut assets, payload));
        assert!(assets.get(saved).is_none());
        assert_eq!(store.latest_id(), Some(original));
        assert!(!store.pop(&mut assets, payload), "nothing left to pop");
    }

    #[test]
    fn release_refuses_payload_identity() {
        let mut assets = Assets::<EditMesh>::default();
        let mut store = SnapshotStore::new(2);
        store.set_original(&mut assets, EditMesh::cube(1.0));
        let backup = store.push(&mut assets, marked(1.0), AssetId::default());

        // The backup became the target's payload in the meantime.
        store.release_backups(&mut assets, backup);
        assert!(store.is_empty());
        assert!(assets.get(backup).is_some(), "payload storage must survive");
    }

    #[test]
    fn release_original_at_close() {
        let mut assets = Assets::<EditMesh>::default();
        let payload = assets.add(EditMesh::cube(1.0)).id();
        let mut store = SnapshotStore::new(2);
        let original = store.set_original(&mut assets, EditMesh::cube(1.0));

        store.release_original(&mut assets, payload);
        assert_eq!(store.original_id(), None);
        assert!(assets.get(original).is_none());
        assert!(assets.get(payload).is_some());
    }

    #[test]
    fn zero_limit_is_raised_to_one() {
        let mut assets = Assets::<EditMesh>::default();
        let payload = assets.add(EditMesh::cube(1.0)).id();
        let mut store = SnapshotStore::new(0);
        assert_eq!(store.limit(), 1);
        let a = store.push(&mut assets, marked(1.0), payload);
        let b = store.push(&mut assets, marked(2.0), payload);
        assert_eq!(store.backup_ids(), vec![b]);
        assert!(assets.get(a).is_none());
    }
}
