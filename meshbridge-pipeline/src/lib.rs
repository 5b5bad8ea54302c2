//! # meshbridge pipeline
//!
//! Hands the active mesh of a host scene to a geometry engine and folds the
//! answer back into the scene:
//! - [`normalizer`]: vertex welding and triangulation
//! - [`codec`]: host mesh to snapshot and back
//! - [`reconcile`]: segment materials and object replacement
//! - [`command`]: the [`Pipeline`] driving one user action end to end

pub mod config;
pub mod params;
pub mod normalizer;
pub mod codec;
pub mod palette;
pub mod replace;
pub mod reconcile;
pub mod stats;
pub mod command;

pub use config::*;
pub use params::*;
pub use normalizer::*;
pub use codec::{apply, extract};
pub use palette::*;
pub use replace::*;
pub use reconcile::*;
pub use stats::*;
pub use command::*;
