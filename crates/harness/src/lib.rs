pub mod fixtures;
pub mod workspace;

pub use workspace::{SqliteWorkspace, TestWorkspace};

use tracing_subscriber::EnvFilter;

/// Routes store logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
