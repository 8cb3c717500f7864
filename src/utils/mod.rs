//! Utilities - configuration files, persistence and formatting

pub mod config_store;
pub mod format;
pub mod logging;
pub mod storage;
