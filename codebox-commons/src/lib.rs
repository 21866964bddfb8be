//! Shared helpers reused across the codebox crates. Everything here is
//! pure path arithmetic or a one-shot filesystem probe so that the
//! process runner, the configuration loader, and the execution engine can
//! agree on how a path is normalized without depending on each other.

pub mod paths;

pub use paths::{
    canonicalize_allow_missing, file_uri, is_case_insensitive_dir, normalize_path,
    relative_within, strip_trailing_separators,
};
