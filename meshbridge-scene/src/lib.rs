//! Host scene surface for meshbridge
//!
//! The pipeline never reaches for global scene state: every operation receives
//! a [`Host`] explicitly. [`InMemoryScene`] implements it for tests and for the
//! command line front end.

pub mod host;
pub mod scene;

pub use host::*;
pub use scene::*;
