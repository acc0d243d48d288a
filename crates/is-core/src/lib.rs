//! is-core: shared foundation for istep.
//!
//! Contains:
//! - units (uom time type + constructors for nanoseconds, milliseconds, seconds)
//! - numeric (Real + tolerances + timing epsilon + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
