//! Viewport overlays published by running tools.
//!
//! A tool registers an overlay for a draw stage, replaces its shapes as it
//! runs and removes it when it closes. The registry draws whatever is
//! registered each frame.

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::editor::state::{EditorState, SceneReloading};

/// Opaque overlay identifier, unique for the lifetime of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayHandle(u64);

/// Where an overlay's coordinates live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStage {
    /// Shapes in world space.
    World,
    /// Shapes in viewport pixels, drawn over the scene.
    Screen,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Segment { start: Vec3, end: Vec3 },
    Path(Vec<Vec2>),
}

#[derive(Debug, Clone)]
pub struct Overlay {
    pub stage: DrawStage,
    pub color: Color,
    pub shapes: Vec<OverlayShape>,
}

#[derive(Resource, Debug, Default)]
pub struct OverlayRegistry {
    overlays: BTreeMap<OverlayHandle, Overlay>,
    next_id: u64,
}

impl OverlayRegistry {
    pub fn register(&mut self, stage: DrawStage, color: Color) -> OverlayHandle {
        let handle = OverlayHandle(self.next_id);
        self.next_id += 1;
        self.overlays.insert(
            handle,
            Overlay {
                stage,
                color,
                shapes: Vec::new(),
            },
        );
        handle
    }

    /// Replace the shapes of an overlay. False if it is not registered.
    pub fn set_shapes(&mut self, handle: OverlayHandle, shapes: Vec<OverlayShape>) -> bool {
        match self.overlays.get_mut(&handle) {
            Some(overlay) => {
                overlay.shapes = shapes;
                true
            }
            None => false,
        }
    }

    /// Unregister an overlay. Removing twice is harmless.
    pub fn remove(&mut self, handle: OverlayHandle) -> bool {
        self.overlays.remove(&handle).is_some()
    }

    pub fn get(&self, handle: OverlayHandle) -> Option<&Overlay> {
        self.overlays.get(&handle)
    }

    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OverlayHandle, &Overlay)> {
        self.overlays.iter()
    }
}

/// Depth in front of the camera that screen overlays are drawn at.
const SCREEN_OVERLAY_DEPTH: f32 = 0.1;

pub(super) fn clear_overlays(mut registry: ResMut<OverlayRegistry>) {
    if !registry.is_empty() {
        info!("Clearing {} stale overlays", registry.len());
    }
    registry.clear();
}

pub(super) fn clear_overlays_on_reload(
    mut reloads: MessageReader<SceneReloading>,
    mut registry: ResMut<OverlayRegistry>,
) {
    if reloads.read().count() > 0 && !registry.is_empty() {
        info!("Scene reloading, dropping {} overlays", registry.len());
        registry.clear();
    }
}

/// Draw every registered overlay.
pub(super) fn draw_overlays(
    mut gizmos: Gizmos,
    registry: Res<OverlayRegistry>,
    editor_state: Res<EditorState>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
) {
    if !editor_state.gizmos_visible || registry.is_empty() {
        return;
    }
    let camera = cameras.iter().find(|(camera, _)| camera.is_active);

    for (_, overlay) in registry.iter() {
        for shape in &overlay.shapes {
            match (overlay.stage, shape) {
                (DrawStage::World, OverlayShape::Segment { start, end }) => {
                    gizmos.line(*start, *end, overlay.color);
                }
                (DrawStage::World, OverlayShape::Path(_)) => {
                    warn_once!("World overlays hold segments, not screen paths");
                }
                (DrawStage::Screen, OverlayShape::Path(points)) => {
                    let Some((camera, cam_tf)) = camera else {
                        continue;
                    };
                    let world_points: Vec<Vec3> = points
                        .iter()
                        .filter_map(|p| camera.viewport_to_world(cam_tf, *p).ok())
                        .map(|ray| ray.get_point(SCREEN_OVERLAY_DEPTH))
                        .collect();
                    if world_points.len() >= 2 {
                        gizmos.linestrip(world_points, overlay.color);
                    }
                }
                (DrawStage::Screen, OverlayShape::Segment { start, end }) => {
                    let Some((camera, cam_tf)) = camera else {
                        continue;
                    };
                    let ends = (
                        camera.viewport_to_world(cam_tf, start.truncate()),
                        camera.viewport_to_world(cam_tf, end.truncate()),
                    );
                    if let (Ok(a), Ok(b)) = ends {
                        gizmos.line(
                            a.get_point(SCREEN_OVERLAY_DEPTH),
                            b.get_point(SCREEN_OVERLAY_DEPTH),
                            overlay.color,
                        );
                    }
                }
            }
        }
    }
}
