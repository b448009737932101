//! Version string handling
//!
//! - [`normalize`]: turns raw upstream release tags into comparable version
//!   strings (pattern extraction, `REL_`/`VER_` markers, `v` prefix,
//!   underscore separators)
//! - [`compare`]: numeric-sequence comparison and status classification

pub mod compare;
pub mod normalize;

pub use compare::{VersionStatus, classify};
pub use normalize::normalize;
