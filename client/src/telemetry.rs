//! Tracing subscriber installation for hosts embedding the client.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a JSON formatter filtered by `RUST_LOG`.
///
/// Hosts that already installed a global subscriber keep theirs; the failure
/// is logged through it and otherwise ignored.
pub fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialisation_is_tolerated() {
        init_tracing();
        init_tracing();
    }
}
