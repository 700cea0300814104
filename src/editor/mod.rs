pub mod mode;
mod plugin;
pub mod state;

pub use mode::*;
pub use plugin::*;
pub use state::*;
