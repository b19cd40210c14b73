//! Shared test utilities for the observation service workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic BOM station documents ([`Station`])
//! - Gzipped tar bundles built in memory ([`TgzBuilder`])
//! - A scripted remote serving those bundles ([`StaticRemote`])
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{Station, TgzBuilder};
//!
//! let bundle = TgzBuilder::new()
//!     .station("IDN60910", &Station::new("066062", "Sydney - Observatory Hill", 94768))
//!     .build();
//! ```

pub mod archive;
pub mod remote;
pub mod station;

pub use archive::TgzBuilder;
pub use remote::StaticRemote;
pub use station::{Station, COPYRIGHT};

/// Fresh temporary directory for a cache.
pub fn temp_cache_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("obs-cache-")
        .tempdir()
        .expect("failed to create temp cache dir")
}

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(-33.8607_f64, -33.86_f64, 0.001_f64); // passes
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(151.2094, 151.21, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(-33.9, -33.8, 0.001);
    }

    #[test]
    fn test_temp_cache_dir_exists() {
        let dir = temp_cache_dir();
        assert!(dir.path().is_dir());
    }
}
