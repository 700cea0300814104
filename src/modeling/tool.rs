//! Modal bevel tool.
//!
//! `BevelModal` drives a `MeshSession` across interaction events. Every
//! pointer move rolls the live mesh back to its clean base and bevels the
//! selected edges again with the accumulated offset, so repeated frames never
//! stack. `Escape` cancels and reverts, `Enter` commits the last frame.

use bevy::prelude::*;
use thiserror::Error;

use super::bevel::{BevelReport, bevel_edges};
use super::session::{MeshSession, SessionError};
use crate::gizmos::{DrawStage, OverlayHandle, OverlayRegistry, OverlayShape};
use crate::selection::selected_target;
use crate::settings::{BevelSettings, SessionSettings};

const PATH_ORANGE: Color = Color::srgb(0.808, 0.569, 0.341);
const EDGE_CYAN: Color = Color::srgb(0.306, 0.788, 0.839);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Invoked,
    Running,
    Finished,
    Cancelled,
}

impl ToolState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolState::Finished | ToolState::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Start,
    Frame,
    Cancel,
    Commit,
    Fail,
}

fn next_state(state: ToolState, transition: Transition) -> ToolState {
    use ToolState::*;
    use Transition::*;
    match (state, transition) {
        (Finished | Cancelled, _) => state,
        (Invoked, Start) => Running,
        (Invoked, Frame | Commit) => Invoked,
        (Running, Start | Frame) => Running,
        (Running, Commit) => Finished,
        (_, Cancel | Fail) => Cancelled,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKey {
    Escape,
    Enter,
    Other,
}

/// One interaction event delivered to the active tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolEvent {
    /// Cursor position in viewport pixels.
    PointerMove { x: f32, y: f32 },
    Key(ToolKey),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("no selected mesh to run the tool on")]
    NoTarget,
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub struct BevelModal {
    session: MeshSession,
    state: ToolState,
    offset: f32,
    offset_per_pixel: f32,
    policy: BevelSettings,
    previous_x: Option<f32>,
    pointer_path: Vec<Vec2>,
    world_overlay: OverlayHandle,
    screen_overlay: OverlayHandle,
    last_report: BevelReport,
}

impl BevelModal {
    /// Start the tool on the selected editable mesh.
    pub fn invoke_on_selected(world: &mut World, cursor: Option<Vec2>) -> Result<Self, ToolError> {
        let target = selected_target(world).ok_or(ToolError::NoTarget)?;
        Self::invoke(world, target, cursor)
    }

    /// Start a session on `target` and register the tool's overlays.
    pub fn invoke(world: &mut World, target: Entity, cursor: Option<Vec2>) -> Result<Self, ToolError> {
        let settings = world
            .get_resource::<SessionSettings>()
            .cloned()
            .unwrap_or_default();
        let session = MeshSession::with_undo_limit(world, target, settings.undo_limit)?;

        let mut registry = world.get_resource_or_init::<OverlayRegistry>();
        let world_overlay = registry.register(DrawStage::World, EDGE_CYAN);
        let screen_overlay = registry.register(DrawStage::Screen, PATH_ORANGE);

        let mut tool = Self {
            session,
            state: ToolState::Invoked,
            offset: 0.0,
            offset_per_pixel: settings.offset_per_pixel,
            policy: settings.bevel,
            previous_x: cursor.map(|c| c.x),
            pointer_path: cursor.into_iter().collect(),
            world_overlay,
            screen_overlay,
            last_report: BevelReport::default(),
        };
        tool.state = next_state(tool.state, Transition::Start);
        info!("Bevel tool running on {}", target);
        Ok(tool)
    }

    /// Feed one event to the tool and return the state it ends up in.
    pub fn handle(&mut self, world: &mut World, event: ToolEvent) -> ToolState {
        if self.state.is_terminal() {
            return self.state;
        }
        if !self.session.validate(world) {
            warn!("Bevel target is gone, cancelling");
            return self.close(world, Transition::Fail);
        }

        match event {
            ToolEvent::PointerMove { x, y } => {
                if let Some(previous) = self.previous_x {
                    self.offset += (x - previous) * self.offset_per_pixel;
                }
                self.previous_x = Some(x);
                self.pointer_path.push(Vec2::new(x, y));
                if !self.run_frame(world) {
                    warn!("Bevel frame failed, cancelling");
                    return self.close(world, Transition::Fail);
                }
                self.state = next_state(self.state, Transition::Frame);
                self.state
            }
            ToolEvent::Key(ToolKey::Escape) => self.close(world, Transition::Cancel),
            ToolEvent::Key(ToolKey::Enter) => self.close(world, Transition::Commit),
            ToolEvent::Key(ToolKey::Other) => self.state,
        }
    }

    /// Cancel from outside the event stream, reverting the target.
    pub fn cancel(&mut self, world: &mut World) -> ToolState {
        if self.state.is_terminal() {
            return self.state;
        }
        self.close(world, Transition::Cancel)
    }

    /// Restore, bevel and flush one frame. False when the session could not
    /// roll back or flush.
    fn run_frame(&mut self, world: &mut World) -> bool {
        if !self.session.restore(world) {
            return false;
        }
        let params = self.policy.params(self.offset);
        let matrix = self.session.matrix_world();
        let mut segments = Vec::new();

        if let Some(mesh) = self.session.live_mut(world) {
            let edges = mesh.selected_edges();
            if edges.is_empty() {
                debug!("No selected edges, skipping bevel frame");
                self.last_report = BevelReport::default();
            } else {
                segments = edges
                    .iter()
                    .map(|&he| {
                        let (a, b) = mesh.edge_vertices(he);
                        OverlayShape::Segment {
                            start: matrix.transform_point3(mesh.vertices[a as usize].position),
                            end: matrix.transform_point3(mesh.vertices[b as usize].position),
                        }
                    })
                    .collect();
                self.last_report = bevel_edges(mesh, &edges, &params);
            }
        }
        if self.last_report.beveled_edges == 0 {
            segments.clear();
        }

        if !self.session.update(world) {
            return false;
        }

        if let Some(mut registry) = world.get_resource_mut::<OverlayRegistry>() {
            registry.set_shapes(self.world_overlay, segments);
            registry.set_shapes(
                self.screen_overlay,
                vec![OverlayShape::Path(self.pointer_path.clone())],
            );
        }
        true
    }

    fn close(&mut self, world: &mut World, transition: Transition) -> ToolState {
        let revert = transition != Transition::Commit;
        self.state = next_state(self.state, transition);
        if let Some(mut registry) = world.get_resource_mut::<OverlayRegistry>() {
            registry.remove(self.world_overlay);
            registry.remove(self.screen_overlay);
        }
        self.session.close(world, revert);
        info!("Bevel tool {:?} at offset {:.3}", self.state, self.offset);
        self.state
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn pointer_path(&self) -> &[Vec2] {
        &self.pointer_path
    }

    pub fn last_report(&self) -> BevelReport {
        self.last_report
    }

    pub fn session(&self) -> &MeshSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MeshSession {
        &mut self.session
    }

    pub fn overlays(&self) -> (OverlayHandle, OverlayHandle) {
        (self.world_overlay, self.screen_overlay)
    }
}
