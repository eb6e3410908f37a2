//! Client core for a blog's comment threads.
//!
//! The crate keeps an optimistic view of one comment thread in step with the
//! comment backend, and lazily resolves the signed-in identity to an
//! application user, provisioning one on first contact.
//!
//! - [`domain`]: store, loader, resolver, and the ports they depend on
//! - [`outbound`]: reqwest-backed and in-memory adapters for those ports
//! - [`config`]: layered client settings
//! - [`wiring`]: composes adapters and services from settings

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod wiring;

pub use config::ClientSettings;
pub use wiring::{ClientPorts, ClientServices};
