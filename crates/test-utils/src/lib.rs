//! Shared helpers for the `assetdag` integration tests.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use assetdag::logging::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, fmt};

pub use builders::{ConfigFileBuilder, TaskConfigBuilder};
pub use fake_executor::FakeExecutor;

/// Upper bound for a single build, run or watcher round trip in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Route `tracing` output through the test harness.
///
/// Reads the same `ASSETDAG_LOG` filter as the binary, defaulting to
/// `info`. Output is captured and only shown for failing tests.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|s| EnvFilter::try_new(s).ok())
            .unwrap_or_else(|| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it outlives [`TEST_TIMEOUT`].
///
/// A hung build or a runtime that never drains its in-flight runs shows up
/// as a panic here instead of a stuck test binary.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("assetdag test did not finish within {TEST_TIMEOUT:?}"),
    }
}
