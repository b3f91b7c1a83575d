use std::fmt;

use apollo_compiler::Schema;

use crate::error::CompositionError;
use crate::link::LinksMetadata;
use crate::link::database::links_metadata;

/// A parsed subgraph schema, together with the name and routing url it was
/// published under.
#[derive(Clone)]
pub struct Subgraph {
    pub name: String,
    pub url: String,
    pub schema: Schema,
}

impl Subgraph {
    pub fn new(name: &str, url: &str, schema: Schema) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            schema,
        }
    }

    /// Parses a subgraph document. Orphan `extend type` fragments are adopted
    /// as definitions since subgraphs commonly extend types they do not own.
    ///
    /// On failure, one error per parser diagnostic is returned, each prefixed
    /// with the subgraph name.
    pub fn parse(name: &str, url: &str, schema_str: &str) -> Result<Self, Vec<CompositionError>> {
        let schema = Schema::builder()
            .adopt_orphan_extensions()
            .parse(schema_str, name)
            .build()
            .map_err(|with_errors| {
                with_errors
                    .errors
                    .iter()
                    .map(|diagnostic| CompositionError::graphql(format!("[{name}] {diagnostic}")))
                    .collect::<Vec<_>>()
            })?;
        Ok(Self::new(name, url, schema))
    }

    /// The `@link` metadata of this subgraph's schema definition.
    pub fn links(&self) -> LinksMetadata {
        links_metadata(&self.schema)
    }
}

impl std::fmt::Debug for Subgraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subgraph")
            .field("name", &self.name)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Subgraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
