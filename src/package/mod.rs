//! Package descriptor handling.

mod manifest;

pub use manifest::{DEPENDENCY_GROUPS, Manifest};
