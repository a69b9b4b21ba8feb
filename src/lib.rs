pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod analyzer {
    pub mod extract;
    pub mod index;
    pub mod locate;
}

// Re-export selected API for consumers
pub use analyzer::extract::SourceSpan;
pub use analyzer::locate::{locate, CallSite, CallSiteQuery};
pub use cache::{FsReader, ParseCache, SourceReader};
pub use config::Config;
pub use engine::{Extraction, Extractor};
pub use error::ExtractError;
pub use parser::{parse_template, traverse_ast, CallKind, MarkupKind, Node, ParseError};
