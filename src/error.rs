use std::path::PathBuf;

use thiserror::Error;

use crate::parser::ParseError;

/// Errors emitted while pulling example source out of a template.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("No `{method} '{argument}'` block found in `{path}`")]
    CallSiteNotFound {
        path: PathBuf,
        method: String,
        argument: String,
    },

    #[error("Invalid call-site pattern: {0}")]
    Pattern(#[from] regex::Error),
}
