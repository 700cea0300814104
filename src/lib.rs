//! # Bevy Mesh Session
//!
//! Editable mesh sessions and a modal bevel tool for Bevy.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bevy::prelude::*;
//! use bevy_mesh_session::MeshSessionPlugin;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(MeshSessionPlugin)
//!         .run();
//! }
//! ```
//!
//! ## Making Meshes Editable
//!
//! Give an entity an `EditableMesh` holding an `EditMesh` asset. Selected
//! editable meshes are what the tools operate on:
//!
//! ```ignore
//! let handle = edit_meshes.add(EditMesh::cube(2.0));
//! commands.spawn((EditableMesh(handle), Transform::default(), Selected));
//! ```
//!
//! ## Sessions
//!
//! A `MeshSession` binds one target for the duration of a tool. It keeps
//! the original geometry, a bounded stack of backups and a live half-edge
//! form it rebuilds whenever the target changed underneath it. Its
//! operations return `false` instead of panicking when the target is gone.
//!
//! ## Keys
//!
//! - `Tab`: toggle edit mode on the selected mesh
//! - `1` / `2` / `3`: vertex, edge or face selection
//! - `B`: bevel selected edges, pointer left/right sets the width
//! - `Enter` / `Escape`: commit or revert the running tool

pub mod editor;
pub mod gizmos;
pub mod modeling;
pub mod selection;
pub mod settings;

// Re-export the main plugin
pub use editor::MeshSessionPlugin;

// Re-export commonly used types
pub use editor::{EditModeMesh, EditableMesh, SceneReloading, SelectMode, ToolSettings};
pub use modeling::{
    BevelModal, BevelParams, EditMesh, HalfEdgeMesh, MeshSession, SessionError, ToolState,
};
pub use selection::Selected;
pub use settings::SessionSettings;
