//! Geometry engine contract for meshbridge
//!
//! The host talks to an external geometry kernel through flat buffers:
//! - [`wire`]: the request/response layout and its JSON encoding
//! - [`request`]: validated, typed requests and results
//! - [`adapter`]: the single point where requests are sent and results checked
//! - [`process`]: a kernel running as a child process, and the serve loop for it
//! - [`local`]: in-process reference kernels (shape diameter, quadric collapse)

pub mod wire;
pub mod request;
pub mod adapter;
pub mod process;
pub mod local;
pub mod shape_diameter;
pub mod edge_collapse;

pub use wire::*;
pub use request::*;
pub use adapter::*;
pub use process::*;
pub use local::*;
pub use shape_diameter::*;
pub use edge_collapse::*;

use meshbridge_core::Result;

/// Transport to a geometry kernel
///
/// One request, one response. Kernel-side failures come back as
/// [`WireResponse::Failure`]; `Err` is reserved for transport problems.
pub trait GeometryEngine {
    fn call(&mut self, request: &WireRequest) -> Result<WireResponse>;
}

impl<E: GeometryEngine + ?Sized> GeometryEngine for &mut E {
    fn call(&mut self, request: &WireRequest) -> Result<WireResponse> {
        (**self).call(request)
    }
}

impl<E: GeometryEngine + ?Sized> GeometryEngine for Box<E> {
    fn call(&mut self, request: &WireRequest) -> Result<WireResponse> {
        (**self).call(request)
    }
}
