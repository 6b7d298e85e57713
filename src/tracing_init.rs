//! Tracing initialization for tests and binaries
//!
//! Centralized subscriber setup with environment-based filtering.

#[cfg(test)]
use once_cell::sync::Lazy;

/// Initialize tracing for tests with environment-based filtering.
///
/// Uses the RUST_LOG environment variable to control output:
/// - `RUST_LOG=cofdmtv=debug` - all debug output
/// - `RUST_LOG=cofdmtv::decoder=trace` - trace one module
///
/// Safe to call from every test; initialization happens once.
#[cfg(test)]
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("cofdmtv=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}

/// Initialize tracing for binaries with environment-based filtering.
///
/// Call early in main() to enable tracing throughout the application.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cofdmtv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
