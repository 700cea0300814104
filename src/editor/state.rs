use bevy::prelude::*;

bitflags::bitflags! {
    /// Which mesh elements selection operates on, mirrored into every live
    /// mesh a session builds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SelectMode: u8 {
        const VERTEX = 1 << 0;
        const EDGE = 1 << 1;
        const FACE = 1 << 2;
    }
}

impl Default for SelectMode {
    fn default() -> Self {
        SelectMode::VERTEX
    }
}

impl SelectMode {
    pub fn display_name(&self) -> &'static str {
        if self.contains(SelectMode::VERTEX) {
            "Vertex"
        } else if self.contains(SelectMode::EDGE) {
            "Edge"
        } else if self.contains(SelectMode::FACE) {
            "Face"
        } else {
            "None"
        }
    }
}

/// Host tool settings read by mesh sessions. Sessions never write to it.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct ToolSettings {
    /// Current mesh selection mode (vertex / edge / face flags)
    pub select_mode: SelectMode,
}

/// Editor-wide state resource
#[derive(Debug, Resource)]
pub struct EditorState {
    /// Whether the editor is active
    /// When false, all hotkeys are disabled
    pub editor_active: bool,
    /// Whether gizmos are visible
    pub gizmos_visible: bool,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            editor_active: true,
            gizmos_visible: true,
        }
    }
}

/// Sent by the host right before a scene is replaced. Any overlay still
/// registered at that point belongs to a tool that will not survive.
#[derive(Message)]
pub struct SceneReloading;

pub struct EditorStatePlugin;

impl Plugin for EditorStatePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EditorState>()
            .init_resource::<ToolSettings>()
            .add_message::<SceneReloading>();
    }
}
