//! Mesh editing: the half-edge model, the bevel operator and the session
//! plus modal tool that apply it to a scene object.
//!
//! `Tab` toggles edit mode on the selected mesh, `B` starts the bevel tool.
//! While beveling, horizontal pointer travel sets the width, `Enter`
//! commits and `Escape` reverts.

pub mod bevel;
pub mod edit_mesh;
mod gizmos;
pub mod half_edge;
pub mod input;
pub mod session;
pub mod snapshot;
pub mod tool;

use bevy::prelude::*;

use gizmos::draw_selected_edges;
use input::{ActiveTool, ToolInputQueue, queue_tool_input, run_active_tool};

pub use bevel::{BevelParams, BevelReport, bevel_edges};
pub use edit_mesh::EditMesh;
pub use half_edge::HalfEdgeMesh;
pub use session::{MeshSession, SessionError};
pub use tool::{BevelModal, ToolError, ToolEvent, ToolKey, ToolState};

pub struct MeshModelPlugin;

impl Plugin for MeshModelPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<EditMesh>()
            .init_resource::<ToolInputQueue>()
            .init_resource::<ActiveTool>()
            .add_systems(Update, (queue_tool_input, run_active_tool).chain())
            .add_systems(Update, draw_selected_edges.after(run_active_tool));
    }
}
