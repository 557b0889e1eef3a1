//! Tracing setup.
//!
//! Filter resolution: `PROTRACK_LOG` > `RUST_LOG` > `warn`. Output goes
//! to stderr so it never mixes with command output.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = std::env::var("PROTRACK_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());

    // try_init so tests that set up logging twice don't panic.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .try_init();
}
