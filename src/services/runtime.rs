//! Tokio Runtime Bridge
//!
//! Background work (deduplicated requests, the selection reactor, aggregate
//! loads) must keep running after the caller that started it goes away. This
//! module spawns such work on the ambient tokio runtime when there is one, and
//! on a lazily created global runtime otherwise.
//!
//! ## Pattern
//!
//! ```text
//! caller (any thread)
//!       │
//!       ▼
//! spawn_named("name", async { ... })
//!       │
//!       ├── inside a runtime ──► Handle::current().spawn()
//!       │
//!       └── outside ───────────► global Runtime::spawn()
//! ```

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

/// Global tokio runtime instance
static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or initialize the global tokio runtime
fn get_runtime() -> &'static Runtime {
    TOKIO_RUNTIME.get_or_init(|| Runtime::new().expect("Failed to create tokio runtime"))
}

/// Handle of the runtime the caller is on, or the global one
pub fn runtime_handle() -> Handle {
    Handle::try_current().unwrap_or_else(|_| get_runtime().handle().clone())
}

/// Spawn a task with a name (for debugging)
///
/// The returned handle may be dropped to detach the task.
pub fn spawn_named<F>(name: &'static str, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tracing::trace!("Spawning tokio task: {}", name);
    runtime_handle().spawn(async move {
        let output = future.await;
        tracing::trace!("Tokio task completed: {}", name);
        output
    })
}

/// Block on a future synchronously (use sparingly, mainly for the binary entry point)
///
/// **Warning**: This blocks the current thread and must not be called from
/// inside a runtime.
pub fn block_on<F, T>(future: F) -> T
where
    F: Future<Output = T>,
{
    get_runtime().block_on(future)
}
