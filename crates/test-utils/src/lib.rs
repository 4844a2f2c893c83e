pub mod buffer;
pub mod builders;
pub mod endpoint;
pub mod provider;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary.
///
/// Output goes through `with_test_writer()`, so it only shows up for failing
/// tests unless run with `--nocapture`. Defaults to `ghost=debug`; override
/// with `RUST_LOG`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ghost=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .init();
    });
}

/// Fail the test if `f` has not finished within 15 seconds.
pub async fn within_limit<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(15), f)
        .await
        .expect("test exceeded its 15s limit")
}
