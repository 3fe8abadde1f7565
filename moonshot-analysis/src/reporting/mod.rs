//! Rendering and file output shared by the analyses.

pub mod export;
pub mod markdown;

pub use export::{write_csv_rows, write_text};
pub use markdown::{Align, MarkdownTable};
