//! Domain - Pure Data Structures
//!
//! These types carry no I/O and represent the farm monitoring domain.

pub mod action;
pub mod analytics;
pub mod config;
pub mod crop;
pub mod dashboard;
pub mod sensor;
