use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Which stage of composition produced an error.
///
/// `Graphql` errors come out of parsing or validating a document; `Composition`
/// errors come out of merging subgraphs or applying a contract filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    Graphql,
    Composition,
}

/// A single error reported by [`compose`](crate::composition::compose).
///
/// Errors are plain messages rather than structured diagnostics: they are
/// meant to be surfaced to the schema author, who has no access to the
/// intermediate supergraph documents they may refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionError {
    pub message: String,
    pub source: ErrorSource,
}

impl CompositionError {
    pub fn composition(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: ErrorSource::Composition,
        }
    }

    pub fn graphql(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: ErrorSource::Graphql,
        }
    }
}

impl fmt::Display for CompositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompositionError {}
