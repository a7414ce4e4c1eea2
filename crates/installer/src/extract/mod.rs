//! Split-archive extraction through external tools

pub mod error;
pub mod extractor;
pub mod payload;
pub mod runner;
pub mod tools;

#[cfg(test)]
mod tests;

pub use error::{ExtractionError, Result};
pub use extractor::ArchiveExtractor;
pub use payload::{TreeEntry, describe_tree, find_payload, walk_tree};
pub use runner::{ProcessRunner, ToolOutput, ToolRunner};
pub use tools::{ExtractionToolCandidate, ToolKind};
