pub mod console;
pub mod context;
pub mod main_view;
pub mod workflow;

pub use context::{AppContext, AppEvent};
pub use workflow::{run_add_or_edit_flow, EditEvent, EditSession};
