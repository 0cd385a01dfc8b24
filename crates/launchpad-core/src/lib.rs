//! Core types for Launchpad.
//!
//! This crate holds the pieces of the launcher's windowing core that carry no
//! windowing logic of their own:
//!
//! - **Identifiers**: [`HostId`] (generational handle) and [`SurfaceId`]
//! - **Geometry**: [`Bounds`], [`Point`], [`Size`] in screen pixels
//! - **Errors**: the [`ShellError`] taxonomy and [`NativeError`]
//! - **Signals**: [`Signal`] for fanning lifecycle notifications out
//! - **Logging**: `tracing` targets and the [`OperationSpan`] guard
//!
//! # Example
//!
//! ```
//! use launchpad_core::{Bounds, Signal};
//!
//! let moved = Signal::<Bounds>::new();
//! moved.connect(|bounds| println!("host moved to {bounds:?}"));
//! moved.emit(Bounds::new(100, 100, 800, 66));
//! ```

mod error;
pub mod geometry;
mod ids;
pub mod logging;
pub mod signal;

pub use error::{NativeError, NativeResult, ShellError, ShellResult};
pub use geometry::{Bounds, Point, Size};
pub use ids::{HostId, SurfaceId};
pub use logging::OperationSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};

static_assertions::assert_impl_all!(Bounds: Copy, Send, Sync);
static_assertions::assert_impl_all!(HostId: Copy, Send, Sync);
static_assertions::assert_impl_all!(ShellError: Send, Sync, std::error::Error);
static_assertions::assert_impl_all!(Signal<SurfaceId>: Send, Sync);
