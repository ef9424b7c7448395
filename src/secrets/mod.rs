//! Secret interpolation for proxied requests.
//!
//! # Data Flow
//! ```text
//! process environment (captured once at startup)
//!     → SecretSet (name → value, plus NAME_ACCESS policies)
//!     → Interpolator::interpolate(template, upstream host)
//!     → `${NAME}` replaced when NAME_ACCESS permits the host
//! ```
//!
//! # Design Decisions
//! - A secret without a `NAME_ACCESS` companion is never released
//! - Unresolvable placeholders stay literal; the request still goes out
//! - Substituted values are not rescanned
//! - Values never reach logs or `Debug` output

pub mod access;
pub mod interpolate;

pub use access::{AccessPolicy, ACCESS_SUFFIX};
pub use interpolate::{Denial, Interpolator, SecretSet};
