//! Features - Vertical Feature Slices
//!
//! Each feature contains its controller and the background machinery it drives.

pub mod crops;
