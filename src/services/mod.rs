//! Service Layer
//!
//! The service layer owns all I/O: the backend [`Fetcher`], request
//! deduplication, the per-process caches and the tokio runtime bridge.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CropDataService                           │
//! │  ┌──────────────┐  ┌────────────────────┐  ┌─────────────┐  │
//! │  │ BoundedCache │  │ RequestDeduplicator│  │   Fetcher   │  │
//! │  │  (settled)   │─▶│    (in flight)     │─▶│ (HTTP/mock) │  │
//! │  └──────────────┘  └────────────────────┘  └─────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼ SharedResult / DashboardEvent
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Crops feature (loader, reactor)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod crop_data;
mod dedup;
mod events;
mod fetcher;
mod http;
pub mod runtime;

#[cfg(test)]
pub mod mock;

pub use crop_data::*;
pub use dedup::*;
pub use events::*;
pub use fetcher::*;
pub use http::*;
