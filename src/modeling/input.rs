//! Keyboard and pointer input for the mesh tools.
//!
//! Regular systems only collect input into `ToolInputQueue`. The exclusive
//! `run_active_tool` system drains it with full world access, so the active
//! tool is the only writer while it runs.

use bevy::prelude::*;
use bevy::window::CursorMoved;

use crate::editor::mode::{enter_edit_mode, exit_edit_mode, is_in_edit_mode};
use crate::editor::state::{EditorState, SelectMode, ToolSettings};
use crate::selection::selected_target;

use super::tool::{BevelModal, ToolEvent, ToolKey};

/// Input collected since the active tool last ran.
#[derive(Resource, Default, Debug)]
pub struct ToolInputQueue {
    pub events: Vec<ToolEvent>,
    pub invoke_bevel: bool,
    pub toggle_edit_mode: bool,
    /// Last known cursor position in viewport pixels.
    pub cursor: Option<Vec2>,
}

impl ToolInputQueue {
    pub fn push(&mut self, event: ToolEvent) {
        if let ToolEvent::PointerMove { x, y } = event {
            self.cursor = Some(Vec2::new(x, y));
        }
        self.events.push(event);
    }
}

/// The running modal tool, if any.
#[derive(Resource, Default)]
pub struct ActiveTool(pub Option<BevelModal>);

impl ActiveTool {
    pub fn is_running(&self) -> bool {
        self.0.is_some()
    }
}

/// Translate keyboard and cursor input into queued tool requests.
pub fn queue_tool_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut cursor_moves: MessageReader<CursorMoved>,
    editor_state: Res<EditorState>,
    active: Res<ActiveTool>,
    mut tool_settings: ResMut<ToolSettings>,
    mut queue: ResMut<ToolInputQueue>,
) {
    for moved in cursor_moves.read() {
        if active.is_running() {
            queue.push(ToolEvent::PointerMove {
                x: moved.position.x,
                y: moved.position.y,
            });
        } else {
            queue.cursor = Some(moved.position);
        }
    }

    if !editor_state.editor_active {
        return;
    }

    if active.is_running() {
        if keyboard.just_pressed(KeyCode::Escape) {
            queue.push(ToolEvent::Key(ToolKey::Escape));
        } else if keyboard.just_pressed(KeyCode::Enter) || keyboard.just_pressed(KeyCode::NumpadEnter) {
            queue.push(ToolEvent::Key(ToolKey::Enter));
        } else if keyboard.get_just_pressed().next().is_some() {
            queue.push(ToolEvent::Key(ToolKey::Other));
        }
        return;
    }

    // 1/2/3 pick the selection mode, like vertex/edge/face in most modelers
    let mode = if keyboard.just_pressed(KeyCode::Digit1) {
        Some(SelectMode::VERTEX)
    } else if keyboard.just_pressed(KeyCode::Digit2) {
        Some(SelectMode::EDGE)
    } else if keyboard.just_pressed(KeyCode::Digit3) {
        Some(SelectMode::FACE)
    } else {
        None
    };
    if let Some(mode) = mode {
        tool_settings.select_mode = mode;
        info!("Selection: {}", mode.display_name());
    }

    if keyboard.just_pressed(KeyCode::Tab) {
        queue.toggle_edit_mode = true;
    }
    if keyboard.just_pressed(KeyCode::KeyB) {
        queue.invoke_bevel = true;
    }
}

/// Drain the input queue into the active tool, starting one when requested.
pub fn run_active_tool(world: &mut World) {
    let pending = std::mem::take(&mut *world.get_resource_or_init::<ToolInputQueue>());
    // Keep the last cursor so the next invocation starts from it
    world.resource_mut::<ToolInputQueue>().cursor = pending.cursor;

    let mut tool = world.get_resource_or_init::<ActiveTool>().0.take();

    if tool.is_none() {
        if pending.toggle_edit_mode {
            toggle_edit_mode(world);
        }
        if pending.invoke_bevel {
            match BevelModal::invoke_on_selected(world, pending.cursor) {
                Ok(started) => tool = Some(started),
                Err(e) => warn!("Bevel not started: {}", e),
            }
        }
    }

    if let Some(running) = tool.as_mut() {
        for event in pending.events {
            if running.handle(world, event).is_terminal() {
                break;
            }
        }
    }

    world.resource_mut::<ActiveTool>().0 = tool.filter(|t| !t.state().is_terminal());
}

fn toggle_edit_mode(world: &mut World) {
    let Some(target) = selected_target(world) else {
        info!("Nothing selected to edit");
        return;
    };
    if is_in_edit_mode(world, target) {
        exit_edit_mode(world, target);
    } else {
        enter_edit_mode(world, target);
    }
}
