/*!
 * Shared Test Helpers
 */

#![allow(dead_code)]

use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACING: Once = Once::new();

/// Install a compact fmt subscriber once per test binary
///
/// RUST_LOG controls the level (default: warn).
pub fn init_tracing() {
    TRACING.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_thread_ids(true)
                    .compact(),
            )
            .try_init()
            .ok();
    });
}

/// Unique semaphore name, short enough for every platform's limit
pub fn unique_semaphore_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("/lk-{}", &id[..16])
}

/// Unlinks a named semaphore when dropped
pub struct UnlinkOnDrop(pub String);

impl Drop for UnlinkOnDrop {
    fn drop(&mut self) {
        lockkit::ProcessMutex::unlink(&self.0).ok();
    }
}
