//! Crops Feature
//!
//! Selection-driven dashboard loading for farm crops: the aggregate loader,
//! the reactor that debounces selection changes into loads, and the
//! controller presentation code talks to.

pub mod controller;
pub mod loader;
pub mod reactor;

pub use controller::*;
pub use loader::*;
pub use reactor::*;
