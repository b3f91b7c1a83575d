//! Identities and versions of `@link` specifications.
//!
//! A specification url such as `https://specs.apollo.dev/federation/v2.3`
//! decomposes into an [`Identity`] (domain + name) and a [`Version`]; the
//! identity is what schemas are matched against, the version is compared
//! separately through [`Version::satisfies`] or a [`LinkVersion`] requirement.
use std::fmt;
use std::str;

use apollo_compiler::Name;
use apollo_compiler::name;
use thiserror::Error;

pub const APOLLO_SPEC_DOMAIN: &str = "https://specs.apollo.dev";
pub const HIVE_SPEC_DOMAIN: &str = "https://specs.graphql-hive.com";

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum SpecError {
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// A `@link` specification identity: its url minus the version segment.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Identity {
    /// Domain part, e.g. `"https://specs.apollo.dev"`.
    pub domain: String,

    /// Specification name, e.g. `"federation"`.
    pub name: Name,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.name)
    }
}

impl Identity {
    fn apollo(name: Name) -> Identity {
        Identity {
            domain: APOLLO_SPEC_DOMAIN.to_string(),
            name,
        }
    }

    pub fn link_identity() -> Identity {
        Self::apollo(name!("link"))
    }

    pub fn federation_identity() -> Identity {
        Self::apollo(name!("federation"))
    }

    pub fn join_identity() -> Identity {
        Self::apollo(name!("join"))
    }

    pub fn tag_identity() -> Identity {
        Self::apollo(name!("tag"))
    }

    pub fn inaccessible_identity() -> Identity {
        Self::apollo(name!("inaccessible"))
    }

    /// The hive metadata specification (`@meta` and friends).
    pub fn hive_identity() -> Identity {
        Identity {
            domain: HIVE_SPEC_DOMAIN.to_string(),
            name: name!("hive"),
        }
    }
}

/// A major/minor specification version pair.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl str::FromStr for Version {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((major, minor)) = s.split_once('.') else {
            return Err(SpecError::ParseError(
                "version number is missing a dot (.)".to_string(),
            ));
        };
        Ok(Version {
            major: major.parse().map_err(|_| {
                SpecError::ParseError(format!("invalid major version number '{}'", major))
            })?,
            minor: minor.parse().map_err(|_| {
                SpecError::ParseError(format!("invalid minor version number '{}'", minor))
            })?,
        })
    }
}

impl Version {
    /// Whether this version satisfies `required`: same major and at least the
    /// minor. Major 0 versions carry no compatibility guarantee and only
    /// satisfy themselves exactly.
    pub fn satisfies(&self, required: &Version) -> bool {
        if self.major == 0 {
            self == required
        } else {
            self.major == required.major && self.minor >= required.minor
        }
    }
}

/// A version requirement checked against the set of `@link`s in a schema.
///
/// Schemas predating `@link` have no url to compare against, so "federation 1"
/// is its own variant rather than a sentinel version number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkVersion {
    /// Matches schemas with no `@link` application at all.
    Federation1,
    /// Matches any linked version of the specification.
    Any,
    /// Matches the exact major.minor version.
    Exact(Version),
    /// Matches any linked version that [`Version::satisfies`] this one.
    Compatible(Version),
}

/// A full specification url: identity plus version.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Url {
    pub identity: Identity,
    pub version: Version,
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/v{}", self.identity, self.version)
    }
}

impl str::FromStr for Url {
    type Err = SpecError;

    /// Parses e.g. `https://specs.apollo.dev/federation/v2.3`: the last path
    /// segment is the `v`-prefixed version, the one before it the
    /// specification name, and everything up to that (scheme, host, leading
    /// path) forms the identity's domain.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = url::Url::parse(s)
            .map_err(|e| SpecError::ParseError(format!("invalid specification url: {}", e)))?;
        if !url.scheme().starts_with("http") {
            return Err(SpecError::ParseError(
                "invalid `@link` specification url: only http(s) urls are supported currently"
                    .to_string(),
            ));
        }

        let mut segments = url.path_segments().ok_or(SpecError::ParseError(
            "invalid `@link` specification url".to_string(),
        ))?;
        let version = segments.next_back().ok_or(SpecError::ParseError(
            "invalid `@link` specification url: missing specification version".to_string(),
        ))?;
        let version = version
            .strip_prefix('v')
            .ok_or(SpecError::ParseError(
                "invalid `@link` specification url: the last element of the path should be the version starting with a 'v'"
                    .to_string(),
            ))?
            .parse::<Version>()?;
        // Spec names are not required to be valid GraphQL names (urls with
        // dashes exist in the wild). A namespaced reference to such a spec is
        // not expressible, but explicit imports from it still are.
        let name = segments
            .next_back()
            .map(Name::new_unchecked)
            .ok_or(SpecError::ParseError(
                "invalid `@link` specification url: missing specification name".to_string(),
            ))?;

        let host = url.domain().ok_or(SpecError::ParseError(
            "invalid `@link` specification url".to_string(),
        ))?;
        let mut domain = format!("{}://{}", url.scheme(), host);
        for leading_segment in segments {
            domain.push('/');
            domain.push_str(leading_segment);
        }
        Ok(Url {
            identity: Identity { domain, name },
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;

    fn version(major: u32, minor: u32) -> Version {
        Version { major, minor }
    }

    #[test]
    fn versions_order_by_major_then_minor() {
        assert!(version(0, 0) < version(0, 1));
        assert!(version(1, 9) < version(1, 10));
        assert!(version(1, 10) < version(2, 0));
        assert_eq!(version(2, 3), version(2, 3));
    }

    #[test]
    fn version_satisfaction_is_same_major_at_least_minor() {
        assert!(version(1, 0).satisfies(&version(1, 0)));
        assert!(version(1, 4).satisfies(&version(1, 2)));
        assert!(!version(1, 1).satisfies(&version(1, 2)));
        assert!(!version(2, 0).satisfies(&version(1, 9)));
        // major 0: exact match only
        assert!(version(0, 8).satisfies(&version(0, 8)));
        assert!(!version(0, 9).satisfies(&version(0, 8)));
    }

    #[test]
    fn versions_parse_from_major_dot_minor() {
        assert_eq!("0.0".parse::<Version>().unwrap(), version(0, 0));
        assert_eq!("1.5".parse::<Version>().unwrap(), version(1, 5));
        assert_eq!("2.49".parse::<Version>().unwrap(), version(2, 49));
    }

    #[test]
    fn bad_version_strings_name_the_offending_part() {
        let error = |message: &str| Err(SpecError::ParseError(message.to_string()));
        assert_eq!(
            "foo".parse::<Version>(),
            error("version number is missing a dot (.)")
        );
        assert_eq!(
            "foo.bar".parse::<Version>(),
            error("invalid major version number 'foo'")
        );
        assert_eq!(
            "0.bar".parse::<Version>(),
            error("invalid minor version number 'bar'")
        );
        assert_eq!(
            "0.12.2".parse::<Version>(),
            error("invalid minor version number '12.2'")
        );
    }

    #[test]
    fn urls_split_into_identity_and_version() {
        assert_eq!(
            "https://specs.apollo.dev/federation/v2.3"
                .parse::<Url>()
                .unwrap(),
            Url {
                identity: Identity::federation_identity(),
                version: version(2, 3),
            }
        );
        assert_eq!(
            "https://specs.graphql-hive.com/hive/v1.0"
                .parse::<Url>()
                .unwrap(),
            Url {
                identity: Identity::hive_identity(),
                version: version(1, 0),
            }
        );
        // leading path segments belong to the domain; query strings are ignored
        assert_eq!(
            "http://example.com/registry/specs/my_spec/v0.1?draft=yes"
                .parse::<Url>()
                .unwrap(),
            Url {
                identity: Identity {
                    domain: "http://example.com/registry/specs".to_string(),
                    name: name!("my_spec"),
                },
                version: version(0, 1),
            }
        );
    }

    #[test]
    fn non_spec_urls_are_rejected() {
        for bad in [
            "https://specs.apollo.dev/federation",
            "https://specs.apollo.dev/v2.0",
            "ftp://specs.apollo.dev/federation/v2.0",
            "not a url",
        ] {
            assert!(bad.parse::<Url>().is_err(), "{bad}");
        }
    }

    #[test]
    fn identities_display_as_versionless_urls() {
        assert_eq!(
            Identity::hive_identity().to_string(),
            "https://specs.graphql-hive.com/hive"
        );
        assert_eq!(
            Url {
                identity: Identity::tag_identity(),
                version: version(0, 3),
            }
            .to_string(),
            "https://specs.apollo.dev/tag/v0.3"
        );
    }
}
