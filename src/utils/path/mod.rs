//! Path utilities.
//!
//! - [`fs`]: Filesystem helpers (`normalize_path`, `clean_path`, `write_atomic`)
//! - [`name`]: Extension and hash-segment transforms (`to_hashed`, `to_non_hashed`)
//! - [`resolve`]: Reference resolution by ancestor climbing (`resolve_reference`)
//! - [`link`]: Link classification (`is_external_link`)

pub mod fs;
pub mod link;
pub mod name;
pub mod resolve;

pub use fs::{clean_path, normalize_path, resolve_path};
pub use name::{to_hashed, to_non_hashed};
pub use resolve::{relative_to, resolve_reference};
