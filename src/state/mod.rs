//! State - Controller-Owned Application State
//!
//! Each state module represents a distinct piece of state with its own update
//! cadence: the selection changes on user input, the dashboard on load
//! completion, the catalog when the crop list is (re)loaded.

pub mod crop_catalog;
pub mod dashboard_state;
pub mod selection_state;

pub use crop_catalog::*;
pub use dashboard_state::*;
pub use selection_state::*;
