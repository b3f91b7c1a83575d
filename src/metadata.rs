//! Collection of `@meta(name:, content:)` annotations linked from the hive
//! specification, and of the `@tag` names present in a composed supergraph.
//!
//! Metadata rides along with composition but never influences it: the
//! annotations are harvested here and reported next to the composed SDL.

use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast::Directive;
use apollo_compiler::schema::ExtendedType;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::link::database::links_metadata;
use crate::link::spec::Identity;
use crate::link::spec::Version;
use crate::link::spec::LinkVersion;
use crate::subgraph::Subgraph;

/// One `@meta` application, attributed to the subgraph it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataAttribute {
    pub name: String,
    pub content: String,
    pub source: String,
}

/// `Type.field` coordinate -> metadata attributes, in schema order.
pub type SchemaMetadata = IndexMap<String, Vec<MetadataAttribute>>;

/// Pushes schema-level `@meta` applications down to every object and
/// interface field, and type-level applications down to that type's fields.
/// Only subgraphs linking `hive/v1.x` participate; anything else is left
/// untouched.
pub fn propagate_metadata(subgraph: &mut Subgraph) {
    let links = subgraph.links();
    if !links.matches_implementation(
        &Identity::hive_identity(),
        &LinkVersion::Compatible(Version { major: 1, minor: 0 }),
    ) {
        return;
    }
    let meta_name = links.resolve_import_name(&Identity::hive_identity(), "@meta");

    let schema_metas: Vec<Node<Directive>> = subgraph
        .schema
        .schema_definition
        .directives
        .get_all(&meta_name)
        .map(|directive| directive.node.clone())
        .collect();

    for ty in subgraph.schema.types.values_mut() {
        let (type_metas, fields) = match ty {
            ExtendedType::Object(obj) => {
                let obj = obj.make_mut();
                let metas: Vec<Node<Directive>> = obj
                    .directives
                    .get_all(&meta_name)
                    .map(|directive| directive.node.clone())
                    .collect();
                (metas, &mut obj.fields)
            }
            ExtendedType::Interface(interface) => {
                let interface = interface.make_mut();
                let metas: Vec<Node<Directive>> = interface
                    .directives
                    .get_all(&meta_name)
                    .map(|directive| directive.node.clone())
                    .collect();
                (metas, &mut interface.fields)
            }
            _ => continue,
        };
        for field in fields.values_mut() {
            let field = field.make_mut();
            for meta in schema_metas.iter().chain(type_metas.iter()) {
                field.directives.push(meta.clone());
            }
        }
    }
}

/// Collects well-formed `@meta` applications from every object and interface
/// field of `schema`, keyed by `Type.field`. Applications missing either
/// argument (or carrying non-string values) are skipped.
pub fn extract_metadata(schema: &Schema, source: &str) -> SchemaMetadata {
    let links = links_metadata(schema);
    if !links.matches_implementation(
        &Identity::hive_identity(),
        &LinkVersion::Compatible(Version { major: 1, minor: 0 }),
    ) {
        return SchemaMetadata::default();
    }
    let meta_name = links.resolve_import_name(&Identity::hive_identity(), "@meta");

    let mut metadata = SchemaMetadata::default();
    for (type_name, ty) in &schema.types {
        if ty.is_built_in() || links.source_link_of_type(type_name).is_some() {
            continue;
        }
        let fields = match ty {
            ExtendedType::Object(obj) => &obj.fields,
            ExtendedType::Interface(interface) => &interface.fields,
            _ => continue,
        };
        for (field_name, field) in fields {
            for directive in field.directives.get_all(&meta_name) {
                let name = directive
                    .specified_argument_by_name("name")
                    .and_then(|value| value.as_str());
                let content = directive
                    .specified_argument_by_name("content")
                    .and_then(|value| value.as_str());
                let (Some(name), Some(content)) = (name, content) else {
                    continue;
                };
                metadata
                    .entry(format!("{type_name}.{field_name}"))
                    .or_default()
                    .push(MetadataAttribute {
                        name: name.to_string(),
                        content: content.to_string(),
                        source: source.to_string(),
                    });
            }
        }
    }
    metadata
}

/// Unions per-coordinate attribute lists across subgraphs, preserving the
/// order subgraphs contributed them in.
pub fn merge_metadata(maps: impl IntoIterator<Item = SchemaMetadata>) -> SchemaMetadata {
    let mut merged = SchemaMetadata::default();
    for map in maps {
        for (coordinate, attributes) in map {
            merged.entry(coordinate).or_default().extend(attributes);
        }
    }
    merged
}

/// Groups the distinct contents of every metadata name, sorted for a stable
/// report shape.
pub fn metadata_attributes(metadata: &SchemaMetadata) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for attribute in metadata.values().flatten() {
        grouped
            .entry(attribute.name.clone())
            .or_default()
            .insert(attribute.content.clone());
    }
    grouped
        .into_iter()
        .map(|(name, contents)| (name, contents.into_iter().collect()))
        .collect()
}

/// Every `@tag(name:)` value applied anywhere in `schema`, under the
/// schema's resolved tag directive name, sorted and deduplicated.
pub fn extract_tags(schema: &Schema) -> Vec<String> {
    let links = links_metadata(schema);
    let tag_name = links.resolve_import_name(&Identity::tag_identity(), "@tag");

    let mut tags: BTreeSet<String> = BTreeSet::new();
    let mut note = |directive: &Directive| {
        if let Some(name) = directive
            .specified_argument_by_name("name")
            .and_then(|value| value.as_str())
        {
            tags.insert(name.to_string());
        }
    };

    for directive in schema.schema_definition.directives.get_all(&tag_name) {
        note(directive);
    }
    for ty in schema.types.values() {
        if ty.is_built_in() {
            continue;
        }
        for directive in ty.directives().get_all(&tag_name) {
            note(directive);
        }
        match ty {
            ExtendedType::Object(obj) => {
                for field in obj.fields.values() {
                    for directive in field.directives.get_all(&tag_name) {
                        note(directive);
                    }
                    for arg in &field.arguments {
                        for directive in arg.directives.get_all(&tag_name) {
                            note(directive);
                        }
                    }
                }
            }
            ExtendedType::Interface(interface) => {
                for field in interface.fields.values() {
                    for directive in field.directives.get_all(&tag_name) {
                        note(directive);
                    }
                    for arg in &field.arguments {
                        for directive in arg.directives.get_all(&tag_name) {
                            note(directive);
                        }
                    }
                }
            }
            ExtendedType::InputObject(input) => {
                for field in input.fields.values() {
                    for directive in field.directives.get_all(&tag_name) {
                        note(directive);
                    }
                }
            }
            ExtendedType::Enum(enum_) => {
                for value in enum_.values.values() {
                    for directive in value.directives.get_all(&tag_name) {
                        note(directive);
                    }
                }
            }
            ExtendedType::Scalar(_) | ExtendedType::Union(_) => {}
        }
    }

    tags.into_iter().collect()
}
