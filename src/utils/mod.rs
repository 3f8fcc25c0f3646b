//! Utility modules.

pub mod file;
pub mod text;

pub use file::{has_extension, list_files, source_id};
pub use text::tidy_extracted_text;
