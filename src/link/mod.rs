//! Parsed `@link` applications and name resolution against them.
//!
//! Every directive or type a specification contributes to a schema lives
//! there under a schema-local name: imported plainly, imported under an
//! alias, or namespaced as `spec__element`. [`LinksMetadata`] answers both
//! directions of that mapping — what is `@tag` called in this schema, and
//! which specification does the name `join__type` belong to.

use std::collections::HashMap;
use std::fmt;
use std::str;
use std::sync::Arc;

use apollo_compiler::InvalidNameError;
use apollo_compiler::Name;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::Value;
use apollo_compiler::name;
use thiserror::Error;

use crate::link::spec::Identity;
use crate::link::spec::LinkVersion;
use crate::link::spec::Url;

pub mod database;
pub mod spec;

pub const DEFAULT_LINK_NAME: Name = name!("link");

/// A problem found while reading a `@link` application.
///
/// Malformed `@link`s never abort composition: the offending application is
/// skipped and the problem is reported back as a diagnostic.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum LinkParseWarning {
    #[error("invalid name in @link application: {0}")]
    InvalidName(String),
    #[error("invalid use of @link in schema: {0}")]
    MalformedLink(String),
}

impl From<InvalidNameError> for LinkParseWarning {
    fn from(value: InvalidNameError) -> Self {
        LinkParseWarning::InvalidName(value.to_string())
    }
}

fn malformed(message: impl Into<String>) -> LinkParseWarning {
    LinkParseWarning::MalformedLink(message.into())
}

/// The `for:` argument of `@link`.
#[derive(Eq, PartialEq, Debug)]
pub enum Purpose {
    SECURITY,
    EXECUTION,
}

impl Purpose {
    pub fn from_value(value: &Value) -> Result<Purpose, LinkParseWarning> {
        let Value::Enum(value) = value else {
            return Err(malformed("invalid `for` value, should be an enum"));
        };
        value.parse()
    }
}

impl str::FromStr for Purpose {
    type Err = LinkParseWarning;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SECURITY" => Ok(Purpose::SECURITY),
            "EXECUTION" => Ok(Purpose::EXECUTION),
            _ => Err(malformed(format!(
                "invalid/unrecognized `for` value '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::SECURITY => f.write_str("SECURITY"),
            Purpose::EXECUTION => f.write_str("EXECUTION"),
        }
    }
}

impl From<&Purpose> for Name {
    fn from(value: &Purpose) -> Self {
        match value {
            Purpose::SECURITY => name!("SECURITY"),
            Purpose::EXECUTION => name!("EXECUTION"),
        }
    }
}

/// One entry of a `@link(import:)` list.
#[derive(Eq, PartialEq, Debug)]
pub struct Import {
    /// The imported element's name as the owning specification spells it,
    /// never `@`-prefixed; `is_directive` records whether it names a
    /// directive or a type.
    pub element: Name,

    pub is_directive: bool,

    /// The schema-local alias, when imported as `{ name: ..., as: ... }`.
    pub alias: Option<Name>,
}

impl Import {
    pub fn from_value(value: &Value) -> Result<Import, LinkParseWarning> {
        match value {
            Value::String(element) => Self::parse(element, None),
            Value::Object(fields) => {
                let mut element: Option<&str> = None;
                let mut alias: Option<&str> = None;
                for (field, value) in fields {
                    let slot = match field.as_str() {
                        "name" => &mut element,
                        "as" => &mut alias,
                        _ => {
                            return Err(malformed(format!(
                                "unknown field `{field}` in @link(import:) argument"
                            )));
                        }
                    };
                    *slot = Some(value.as_str().ok_or_else(|| {
                        malformed(format!(
                            "invalid value for `{field}` field in @link(import:) argument: must be a string"
                        ))
                    })?);
                }
                let Some(element) = element else {
                    return Err(malformed(
                        "invalid entry in @link(import:) argument, missing mandatory `name` field",
                    ));
                };
                Self::parse(element, alias)
            }
            _ => Err(malformed(
                "invalid sub-value for @link(import:) argument: values should be either strings or input object values of the form { name: \"<importedElement>\", as: \"<alias>\" }.",
            )),
        }
    }

    /// An import's alias must agree with its element on the `@` prefix; the
    /// stored names carry no prefix either way.
    fn parse(element: &str, alias: Option<&str>) -> Result<Import, LinkParseWarning> {
        match (element.strip_prefix('@'), alias) {
            (Some(directive), alias) => {
                let alias = match alias {
                    Some(alias) => Some(alias.strip_prefix('@').ok_or_else(|| {
                        malformed(format!(
                            "invalid alias '{}' for import name '{}': should start with '@' since the imported name does",
                            alias, element
                        ))
                    })?),
                    None => None,
                };
                Ok(Import {
                    element: Name::new(directive)?,
                    is_directive: true,
                    alias: alias.map(Name::new).transpose()?,
                })
            }
            (None, Some(alias)) if alias.starts_with('@') => Err(malformed(format!(
                "invalid alias '{}' for import name '{}': should not start with '@' (or, if {} is a directive, then the name should start with '@')",
                alias, element, element
            ))),
            (None, alias) => Ok(Import {
                element: Name::new(element)?,
                is_directive: false,
                alias: alias.map(Name::new).transpose()?,
            }),
        }
    }

    pub fn imported_name(&self) -> &Name {
        self.alias.as_ref().unwrap_or(&self.element)
    }

    fn prefixed(&self, name: &Name) -> String {
        if self.is_directive {
            format!("@{name}")
        } else {
            name.to_string()
        }
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(_) => write!(
                f,
                r#"{{ name: "{}", as: "{}" }}"#,
                self.prefixed(&self.element),
                self.prefixed(self.imported_name()),
            ),
            None => write!(f, r#""{}""#, self.prefixed(self.imported_name())),
        }
    }
}

/// One parsed `@link` application from a schema definition.
#[derive(Debug, Eq, PartialEq)]
pub struct Link {
    pub url: Url,
    pub spec_alias: Option<Name>,
    pub imports: Vec<Arc<Import>>,
    pub purpose: Option<Purpose>,
}

impl Link {
    pub fn from_directive_application(directive: &Directive) -> Result<Link, LinkParseWarning> {
        let url = directive
            .specified_argument_by_name("url")
            .ok_or_else(|| malformed("the `url` argument for @link is mandatory"))?
            .as_str()
            .ok_or_else(|| malformed("the `url` argument for @link must be a String"))?
            .parse::<Url>()
            .map_err(|e| malformed(format!("invalid `url` argument (reason: {e})")))?;

        let spec_alias = directive
            .specified_argument_by_name("as")
            .and_then(|arg| arg.as_str())
            .map(Name::new)
            .transpose()?;
        let purpose = directive
            .specified_argument_by_name("for")
            .map(|value| Purpose::from_value(value))
            .transpose()?;
        let imports = directive
            .specified_argument_by_name("import")
            .and_then(|arg| arg.as_list())
            .unwrap_or(&[])
            .iter()
            .map(|value| Import::from_value(value).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Link {
            url,
            spec_alias,
            imports,
            purpose,
        })
    }

    pub fn spec_name_in_schema(&self) -> &Name {
        self.spec_alias.as_ref().unwrap_or(&self.url.identity.name)
    }

    /// The schema-local name of this specification's directive `name`: the
    /// imported name if imported, the spec's own in-schema name when the
    /// directive is named like the spec, `spec__name` otherwise.
    pub fn directive_name_in_schema(&self, name: &Name) -> Name {
        if let Some(import) = self.import_of(name, true) {
            import.imported_name().clone()
        } else if name.as_str() == self.url.identity.name.as_str() {
            self.spec_name_in_schema().clone()
        } else {
            self.namespaced(name)
        }
    }

    /// Like [`Self::directive_name_in_schema`] for types; the spec-named
    /// special case does not apply to types.
    pub fn type_name_in_schema(&self, name: &Name) -> Name {
        if let Some(import) = self.import_of(name, false) {
            import.imported_name().clone()
        } else {
            self.namespaced(name)
        }
    }

    /// The in-schema name for `element` of this specification.
    ///
    /// `element` names a directive when prefixed with '@' (the returned
    /// [`Name`] never carries the prefix).
    pub fn resolve_import_name(&self, element: &str) -> Name {
        if let Some(directive_name) = element.strip_prefix('@') {
            self.directive_name_in_schema(&Name::new_unchecked(directive_name))
        } else {
            self.type_name_in_schema(&Name::new_unchecked(element))
        }
    }

    fn import_of(&self, element: &Name, directive: bool) -> Option<&Arc<Import>> {
        self.imports
            .iter()
            .find(|import| import.is_directive == directive && import.element == *element)
    }

    fn namespaced(&self, name: &Name) -> Name {
        // both sides are valid names and `__` only adds valid characters
        Name::new_unchecked(&format!("{}__{}", self.spec_name_in_schema(), name))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#"@link(url: "{}""#, self.url)?;
        if let Some(alias) = &self.spec_alias {
            write!(f, r#", as: "{alias}""#)?;
        }
        if !self.imports.is_empty() {
            write!(f, ", import: [")?;
            for (i, import) in self.imports.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{import}")?;
            }
            write!(f, "]")?;
        }
        if let Some(purpose) = &self.purpose {
            write!(f, ", for: {purpose}")?;
        }
        write!(f, ")")
    }
}

/// A schema name traced back to the `@link` that brought it in, and to the
/// specific import entry when it came through one.
#[derive(Debug)]
pub struct LinkedElement {
    pub link: Arc<Link>,
    pub import: Option<Arc<Import>>,
}

/// All the `@link`s of a schema, with lookup tables for name resolution.
#[derive(Default, Debug)]
pub struct LinksMetadata {
    pub(crate) links: Vec<Arc<Link>>,
    pub(crate) by_identity: HashMap<Identity, Arc<Link>>,
    pub(crate) by_name_in_schema: HashMap<Name, Arc<Link>>,
    pub(crate) types_by_imported_name: HashMap<Name, (Arc<Link>, Arc<Import>)>,
    pub(crate) directives_by_imported_name: HashMap<Name, (Arc<Link>, Arc<Import>)>,
    pub(crate) warnings: Vec<LinkParseWarning>,
}

impl LinksMetadata {
    pub fn all_links(&self) -> &[Arc<Link>] {
        self.links.as_ref()
    }

    /// Warnings for `@link` applications that could not be parsed and were skipped.
    pub fn warnings(&self) -> &[LinkParseWarning] {
        self.warnings.as_ref()
    }

    pub fn for_identity(&self, identity: &Identity) -> Option<Arc<Link>> {
        self.by_identity.get(identity).cloned()
    }

    /// Whether any specification is linked at all. Schemas without `@link` are
    /// treated as federation 1 documents.
    pub fn supports_federation_v2(&self) -> bool {
        !self.links.is_empty()
    }

    /// Whether the schema links `identity` at a version matching `requirement`.
    pub fn matches_implementation(&self, identity: &Identity, requirement: &LinkVersion) -> bool {
        match requirement {
            LinkVersion::Federation1 => self.links.is_empty(),
            LinkVersion::Any => self.by_identity.contains_key(identity),
            LinkVersion::Exact(version) => self
                .for_identity(identity)
                .is_some_and(|link| link.url.version == *version),
            LinkVersion::Compatible(version) => self
                .for_identity(identity)
                .is_some_and(|link| link.url.version.satisfies(version)),
        }
    }

    /// The in-schema name for `element` of the specification with `identity`.
    ///
    /// When the specification is not linked, the bare element name is returned
    /// unchanged (minus any '@' prefix): schemas that predate `@link` use the
    /// unprefixed names.
    pub fn resolve_import_name(&self, identity: &Identity, element: &str) -> Name {
        match self.by_identity.get(identity) {
            Some(link) => link.resolve_import_name(element),
            None => Name::new_unchecked(element.strip_prefix('@').unwrap_or(element)),
        }
    }

    /// The `@link` a type name came from: either through an import entry or
    /// through the `spec__Type` namespacing.
    pub fn source_link_of_type(&self, type_name: &Name) -> Option<LinkedElement> {
        if let Some((link, import)) = self.types_by_imported_name.get(type_name) {
            return Some(LinkedElement {
                link: Arc::clone(link),
                import: Some(Arc::clone(import)),
            });
        }
        self.link_of_namespaced(type_name)
    }

    /// Like [`Self::source_link_of_type`] for directives, with the extra case
    /// of a directive carrying the linked spec's own in-schema name.
    pub fn source_link_of_directive(&self, directive_name: &Name) -> Option<LinkedElement> {
        if let Some((link, import)) = self.directives_by_imported_name.get(directive_name) {
            return Some(LinkedElement {
                link: Arc::clone(link),
                import: Some(Arc::clone(import)),
            });
        }
        if let Some(link) = self.by_name_in_schema.get(directive_name) {
            return Some(LinkedElement {
                link: Arc::clone(link),
                import: None,
            });
        }
        self.link_of_namespaced(directive_name)
    }

    fn link_of_namespaced(&self, name: &Name) -> Option<LinkedElement> {
        let (spec_name, _) = name.split_once("__")?;
        self.by_name_in_schema
            .get(spec_name)
            .map(|link| LinkedElement {
                link: Arc::clone(link),
                import: None,
            })
    }
}
