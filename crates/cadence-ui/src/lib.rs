//! UI-facing capabilities built on [`cadence_core`].
//!
//! - [`Resizable`]: throttled resize handling, plus one resize shortly
//!   after init.
//! - [`ProcessingVisibility`]: fades between a host's main layer and its
//!   processing overlay.
//!
//! Both attach to a host's [`Lifecycle`](cadence_core::Lifecycle) like the
//! core capabilities do.

pub mod processing;
pub mod resizable;
pub mod throttle;

#[cfg(test)]
mod tests;

pub use processing::{LayerStyle, ProcessingConfig, ProcessingVisibility};
pub use resizable::{ResizeConfig, Resizable, Size};
pub use throttle::Throttle;
