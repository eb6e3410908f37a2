//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **http**: reqwest-backed adapters for the comment backend's REST API
//! - **session**: in-process holder for the signed-in session
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod http;
pub mod session;
