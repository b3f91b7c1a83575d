//! Rewrites subgraph schemas for a contract: elements whose `@tag` membership
//! falls outside the filter become `@inaccessible`, and all `@tag`
//! applications are stripped from the output.
//!
//! Tags are collected into a cross-subgraph registry first, because a type's
//! tags are inherited by its fields, arguments and enum values, and because a
//! type may be contributed by several subgraphs. The per-subgraph `@tag` and
//! `@inaccessible` names are resolved through each subgraph's `@link`s.

use std::collections::BTreeSet;

use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::Directive;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use itertools::Itertools;

use crate::error::CompositionError;
use crate::link::spec::Identity;
use crate::subgraph::Subgraph;

/// Tag sets restricting a contract view. `include` is an allow-list (untagged
/// elements are hidden when it is non-empty), `exclude` a deny-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl TagFilter {
    pub fn new(
        include: impl IntoIterator<Item = String>,
        exclude: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            include: include.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
        }
    }

    /// Rejects filters that could never produce a meaningful contract:
    /// both sets empty, or a tag that is both included and excluded.
    pub fn validate(&self) -> Vec<CompositionError> {
        let mut errors = Vec::new();
        if self.include.is_empty() && self.exclude.is_empty() {
            errors.push(CompositionError::composition(
                "Contract filter must include or exclude at least one tag.",
            ));
        }
        let mut conflicting = self.include.intersection(&self.exclude).peekable();
        if conflicting.peek().is_some() {
            errors.push(CompositionError::composition(format!(
                "Contract filter cannot include and exclude the same tag(s): {}.",
                conflicting.map(|tag| format!("\"{tag}\"")).join(", ")
            )));
        }
        errors
    }
}

/// Tags applied per schema coordinate (`Type`, `Type.field`,
/// `Type.field(arg:)`, `Enum.VALUE`), unioned across all subgraphs, with type
/// tags inherited by the type's subcoordinates.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tags_by_coordinate: IndexMap<String, BTreeSet<String>>,
}

impl TagRegistry {
    pub fn build(subgraphs: &[Subgraph]) -> Self {
        let mut tags_by_coordinate: IndexMap<String, BTreeSet<String>> = IndexMap::new();
        let mut subcoordinates_by_type: IndexMap<String, IndexSet<String>> = IndexMap::new();

        for subgraph in subgraphs {
            let tag_name = subgraph
                .links()
                .resolve_import_name(&Identity::federation_identity(), "@tag");

            for (type_name, ty) in &subgraph.schema.types {
                if ty.is_built_in() {
                    continue;
                }
                let mut add = |coordinate: String, tags: Vec<String>| {
                    subcoordinates_by_type
                        .entry(type_name.to_string())
                        .or_default()
                        .insert(coordinate.clone());
                    if !tags.is_empty() {
                        tags_by_coordinate
                            .entry(coordinate)
                            .or_default()
                            .extend(tags);
                    }
                };

                match ty {
                    ExtendedType::Object(obj) => {
                        collect_field_tags(type_name, &obj.fields, &tag_name, &mut add);
                    }
                    ExtendedType::Interface(interface) => {
                        collect_field_tags(type_name, &interface.fields, &tag_name, &mut add);
                    }
                    ExtendedType::InputObject(input) => {
                        for (field_name, field) in &input.fields {
                            let tags =
                                tags_in(field.directives.iter().map(|d| d.as_ref()), &tag_name);
                            add(format!("{type_name}.{field_name}"), tags);
                        }
                    }
                    ExtendedType::Enum(enum_) => {
                        for (value_name, value) in &enum_.values {
                            let tags =
                                tags_in(value.directives.iter().map(|d| d.as_ref()), &tag_name);
                            add(format!("{type_name}.{value_name}"), tags);
                        }
                    }
                    ExtendedType::Scalar(_) | ExtendedType::Union(_) => {}
                }

                let type_tags = tags_in(
                    ty.directives().iter().map(|component| &*component.node),
                    &tag_name,
                );
                if !type_tags.is_empty() {
                    tags_by_coordinate
                        .entry(type_name.to_string())
                        .or_default()
                        .extend(type_tags);
                }
            }
        }

        // a type's tags are inherited by its subcoordinates
        for (type_name, subcoordinates) in &subcoordinates_by_type {
            let Some(type_tags) = tags_by_coordinate.get(type_name).cloned() else {
                continue;
            };
            for subcoordinate in subcoordinates {
                tags_by_coordinate
                    .entry(subcoordinate.clone())
                    .or_default()
                    .extend(type_tags.iter().cloned());
            }
        }

        Self { tags_by_coordinate }
    }

    fn intersects(&self, coordinate: &str, tags: &BTreeSet<String>) -> bool {
        self.tags_by_coordinate
            .get(coordinate)
            .is_some_and(|applied| !applied.is_disjoint(tags))
    }

    /// The element-level visibility rule: hidden when an include list is
    /// active and none of the element's tags are in it, or when an exclude
    /// list is active and one of them is.
    fn hidden(&self, filter: &TagFilter, coordinate: &str) -> bool {
        (!filter.include.is_empty() && !self.intersects(coordinate, &filter.include))
            || (!filter.exclude.is_empty() && self.intersects(coordinate, &filter.exclude))
    }

    /// Types are only hidden directly by the exclude list; the include list
    /// acts on fields and may hide a type indirectly through the
    /// all-fields-inaccessible rule.
    fn type_excluded(&self, filter: &TagFilter, type_name: &str) -> bool {
        !filter.exclude.is_empty() && self.intersects(type_name, &filter.exclude)
    }
}

fn collect_field_tags(
    type_name: &Name,
    fields: &apollo_compiler::collections::IndexMap<Name, Component<FieldDefinition>>,
    tag_name: &Name,
    add: &mut impl FnMut(String, Vec<String>),
) {
    for (field_name, field) in fields {
        let tags = tags_in(field.directives.iter().map(|d| d.as_ref()), tag_name);
        add(format!("{type_name}.{field_name}"), tags);
        for arg in &field.arguments {
            let tags = tags_in(arg.directives.iter().map(|d| d.as_ref()), tag_name);
            add(format!("{type_name}.{field_name}({}:)", arg.name), tags);
        }
    }
}

fn tags_in<'a>(directives: impl Iterator<Item = &'a Directive>, tag_name: &Name) -> Vec<String> {
    directives
        .filter(|directive| directive.name == *tag_name)
        .filter_map(|directive| directive.specified_argument_by_name("name")?.as_str())
        .map(str::to_string)
        .collect()
}

/// Strips every `@tag` application from the list and, when `hide` is set,
/// appends `@inaccessible` unless the element already carries it. Both names
/// are the subgraph-local ones.
fn transform_ast_directives(
    directives: &mut ast::DirectiveList,
    tag_name: &Name,
    inaccessible_name: &Name,
    hide: bool,
) {
    directives.retain(|directive| directive.name != *tag_name);
    if hide && !directives.has(inaccessible_name.as_str()) {
        directives.push(Node::new(Directive {
            name: inaccessible_name.clone(),
            arguments: vec![],
        }));
    }
}

fn transform_component_directives(
    directives: &mut apollo_compiler::schema::DirectiveList,
    tag_name: &Name,
    inaccessible_name: &Name,
    hide: bool,
) {
    directives.retain(|directive| directive.name != *tag_name);
    if hide && !directives.has(inaccessible_name.as_str()) {
        directives.push(Component::new(Directive {
            name: inaccessible_name.clone(),
            arguments: vec![],
        }));
    }
}

struct FilteredSubgraph {
    subgraph: Subgraph,
    inaccessible_name: Name,
    /// Types of this subgraph whose fields (or enum values) all became
    /// inaccessible. A type is only hidden when this holds in every subgraph
    /// defining it.
    all_fields_inaccessible: IndexMap<Name, bool>,
    /// Types that already received a type-level `@inaccessible` here.
    inaccessible_applied: IndexSet<Name>,
}

/// Returns rewritten deep copies of the subgraphs; the inputs are untouched.
pub fn apply_tag_filter_on_subgraphs(subgraphs: &[Subgraph], filter: &TagFilter) -> Vec<Subgraph> {
    let registry = TagRegistry::build(subgraphs);

    let mut filtered: Vec<FilteredSubgraph> = subgraphs
        .iter()
        .map(|subgraph| filter_subgraph(subgraph, &registry, filter))
        .collect();

    // Intersection pass: a type is hidden outright only when every subgraph
    // that defines it reported all of its fields inaccessible.
    let mut all_hidden: IndexMap<Name, bool> = IndexMap::new();
    for subgraph in &filtered {
        for (type_name, hidden) in &subgraph.all_fields_inaccessible {
            let entry = all_hidden.entry(type_name.clone()).or_insert(true);
            *entry = *entry && *hidden;
        }
    }
    let hidden_types: IndexSet<Name> = all_hidden
        .into_iter()
        .filter_map(|(type_name, hidden)| hidden.then_some(type_name))
        .collect();

    if !hidden_types.is_empty() {
        for subgraph in &mut filtered {
            mark_types_inaccessible(subgraph, &hidden_types);
        }
    }

    filtered.into_iter().map(|f| f.subgraph).collect()
}

fn filter_subgraph(
    subgraph: &Subgraph,
    registry: &TagRegistry,
    filter: &TagFilter,
) -> FilteredSubgraph {
    let links = subgraph.links();
    let federation = Identity::federation_identity();
    let tag_name = links.resolve_import_name(&federation, "@tag");
    let inaccessible_name = links.resolve_import_name(&federation, "@inaccessible");

    let mut schema = subgraph.schema.clone();
    let root_types: IndexSet<Name> = root_type_names(&schema).collect();
    let mut all_fields_inaccessible: IndexMap<Name, bool> = IndexMap::new();
    let mut inaccessible_applied: IndexSet<Name> = IndexSet::new();

    for (type_name, ty) in schema.types.iter_mut() {
        if ty.is_built_in() || links.source_link_of_type(type_name).is_some() {
            continue;
        }
        // root operation types are never hidden, directly or via the
        // all-fields rule
        let is_root = root_types.contains(type_name);

        let some_accessible = match ty {
            ExtendedType::Object(obj) => {
                let obj = obj.make_mut();
                let some = filter_fields(
                    type_name,
                    &mut obj.fields,
                    registry,
                    filter,
                    &tag_name,
                    &inaccessible_name,
                );
                let hide = !is_root && registry.type_excluded(filter, type_name.as_str());
                transform_component_directives(&mut obj.directives, &tag_name, &inaccessible_name, hide);
                if hide {
                    inaccessible_applied.insert(type_name.clone());
                }
                Some(some)
            }
            ExtendedType::Interface(interface) => {
                let interface = interface.make_mut();
                let some = filter_fields(
                    type_name,
                    &mut interface.fields,
                    registry,
                    filter,
                    &tag_name,
                    &inaccessible_name,
                );
                let hide = registry.type_excluded(filter, type_name.as_str());
                transform_component_directives(
                    &mut interface.directives,
                    &tag_name,
                    &inaccessible_name,
                    hide,
                );
                if hide {
                    inaccessible_applied.insert(type_name.clone());
                }
                Some(some)
            }
            ExtendedType::InputObject(input) => {
                let input = input.make_mut();
                let mut some = false;
                for (field_name, field) in input.fields.iter_mut() {
                    let coordinate = format!("{type_name}.{field_name}");
                    let hide = registry.hidden(filter, &coordinate);
                    some = some || !hide;
                    transform_ast_directives(
                        &mut field.make_mut().directives,
                        &tag_name,
                        &inaccessible_name,
                        hide,
                    );
                }
                let hide = registry.type_excluded(filter, type_name.as_str());
                transform_component_directives(
                    &mut input.directives,
                    &tag_name,
                    &inaccessible_name,
                    hide,
                );
                if hide {
                    inaccessible_applied.insert(type_name.clone());
                }
                Some(some)
            }
            ExtendedType::Enum(enum_) => {
                let enum_ = enum_.make_mut();
                let mut some = false;
                for (value_name, value) in enum_.values.iter_mut() {
                    let coordinate = format!("{type_name}.{value_name}");
                    let hide = registry.hidden(filter, &coordinate);
                    some = some || !hide;
                    transform_ast_directives(
                        &mut value.make_mut().directives,
                        &tag_name,
                        &inaccessible_name,
                        hide,
                    );
                }
                let hide = registry.type_excluded(filter, type_name.as_str());
                transform_component_directives(
                    &mut enum_.directives,
                    &tag_name,
                    &inaccessible_name,
                    hide,
                );
                if hide {
                    inaccessible_applied.insert(type_name.clone());
                }
                Some(some)
            }
            // scalars and unions have no subcoordinates and follow the plain
            // element rule; they do not participate in the all-fields pass
            ExtendedType::Scalar(scalar) => {
                let hide = registry.hidden(filter, type_name.as_str());
                transform_component_directives(
                    &mut scalar.make_mut().directives,
                    &tag_name,
                    &inaccessible_name,
                    hide,
                );
                None
            }
            ExtendedType::Union(union_) => {
                let hide = registry.hidden(filter, type_name.as_str());
                transform_component_directives(
                    &mut union_.make_mut().directives,
                    &tag_name,
                    &inaccessible_name,
                    hide,
                );
                None
            }
        };

        if let Some(some_accessible) = some_accessible
            && !is_root
        {
            if some_accessible {
                all_fields_inaccessible.insert(type_name.clone(), false);
            } else {
                all_fields_inaccessible
                    .entry(type_name.clone())
                    .or_insert(true);
            }
        }
    }

    FilteredSubgraph {
        subgraph: Subgraph::new(&subgraph.name, &subgraph.url, schema),
        inaccessible_name,
        all_fields_inaccessible,
        inaccessible_applied,
    }
}

fn filter_fields(
    type_name: &Name,
    fields: &mut apollo_compiler::collections::IndexMap<Name, Component<FieldDefinition>>,
    registry: &TagRegistry,
    filter: &TagFilter,
    tag_name: &Name,
    inaccessible_name: &Name,
) -> bool {
    let mut some_accessible = false;
    for (field_name, field) in fields.iter_mut() {
        let field = field.make_mut();
        for arg in field.arguments.iter_mut() {
            let coordinate = format!("{type_name}.{field_name}({}:)", arg.name);
            let hide = registry.hidden(filter, &coordinate);
            transform_ast_directives(
                &mut arg.make_mut().directives,
                tag_name,
                inaccessible_name,
                hide,
            );
        }
        let coordinate = format!("{type_name}.{field_name}");
        let hide = registry.hidden(filter, &coordinate);
        some_accessible = some_accessible || !hide;
        transform_ast_directives(&mut field.directives, tag_name, inaccessible_name, hide);
    }
    some_accessible
}

/// Marks every type of the hidden set `@inaccessible` in this subgraph,
/// skipping types that already received one during filtering.
fn mark_types_inaccessible(subgraph: &mut FilteredSubgraph, hidden_types: &IndexSet<Name>) {
    let inaccessible_name = subgraph.inaccessible_name.clone();
    for (type_name, ty) in subgraph.subgraph.schema.types.iter_mut() {
        if !hidden_types.contains(type_name)
            || subgraph.inaccessible_applied.contains(type_name)
        {
            continue;
        }
        let directives = match ty {
            ExtendedType::Object(obj) => &mut obj.make_mut().directives,
            ExtendedType::Interface(interface) => &mut interface.make_mut().directives,
            ExtendedType::InputObject(input) => &mut input.make_mut().directives,
            ExtendedType::Enum(enum_) => &mut enum_.make_mut().directives,
            ExtendedType::Scalar(_) | ExtendedType::Union(_) => continue,
        };
        if !directives.has(inaccessible_name.as_str()) {
            directives.push(Component::new(Directive {
                name: inaccessible_name.clone(),
                arguments: vec![],
            }));
        }
    }
}

fn root_type_names(schema: &apollo_compiler::Schema) -> impl Iterator<Item = Name> + '_ {
    let definition = &schema.schema_definition;
    definition
        .query
        .iter()
        .chain(definition.mutation.iter())
        .chain(definition.subscription.iter())
        .map(|root: &ComponentName| root.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subgraph(name: &str, sdl: &str) -> Subgraph {
        Subgraph::parse(name, "", sdl).unwrap()
    }

    fn filter(include: &[&str], exclude: &[&str]) -> TagFilter {
        TagFilter::new(
            include.iter().map(|s| s.to_string()),
            exclude.iter().map(|s| s.to_string()),
        )
    }

    fn object<'a>(subgraph: &'a Subgraph, name: &str) -> &'a apollo_compiler::schema::ObjectType {
        let Some(ExtendedType::Object(obj)) = subgraph.schema.types.get(name) else {
            panic!("{name} should be an object type");
        };
        obj
    }

    #[test]
    fn excluded_fields_become_inaccessible_and_tags_are_stripped() {
        let subgraphs = [subgraph(
            "a",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag", "@inaccessible"])
              type Query {
                hello: String
                helloHidden: String @tag(name: "toyota")
              }
            "#,
        )];

        let filtered = apply_tag_filter_on_subgraphs(&subgraphs, &filter(&[], &["toyota"]));
        let query = object(&filtered[0], "Query");
        assert!(!query.fields["hello"].directives.has("inaccessible"));
        assert!(query.fields["helloHidden"].directives.has("inaccessible"));
        assert!(!query.fields["helloHidden"].directives.has("tag"));
        // inputs are untouched
        assert!(
            object(&subgraphs[0], "Query").fields["helloHidden"]
                .directives
                .has("tag")
        );
    }

    #[test]
    fn include_mode_hides_untagged_elements() {
        let subgraphs = [subgraph(
            "a",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag", "@inaccessible"])
              type Query {
                public: String @tag(name: "public")
                internal: String
              }
            "#,
        )];

        let filtered = apply_tag_filter_on_subgraphs(&subgraphs, &filter(&["public"], &[]));
        let query = object(&filtered[0], "Query");
        assert!(!query.fields["public"].directives.has("inaccessible"));
        assert!(query.fields["internal"].directives.has("inaccessible"));
    }

    #[test]
    fn type_tags_are_inherited_by_fields() {
        let subgraphs = [subgraph(
            "a",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag", "@inaccessible"])
              type Query {
                billing: Billing
              }
              type Billing @tag(name: "internal") {
                invoice: String
              }
            "#,
        )];

        let filtered = apply_tag_filter_on_subgraphs(&subgraphs, &filter(&[], &["internal"]));
        let billing = object(&filtered[0], "Billing");
        // the type is excluded directly, its (inherited) fields too
        assert!(billing.directives.has("inaccessible"));
        assert!(billing.fields["invoice"].directives.has("inaccessible"));
    }

    #[test]
    fn type_with_all_fields_hidden_in_every_subgraph_is_hidden_once() {
        let subgraphs = [
            subgraph(
                "a",
                r#"
                  extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag", "@inaccessible"])
                  type Query { thing: Thing }
                  type Thing { secret: String @tag(name: "hidden") }
                "#,
            ),
            subgraph(
                "b",
                r#"
                  extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag", "@inaccessible"])
                  type Thing { alsoSecret: String @tag(name: "hidden") }
                "#,
            ),
        ];

        let filtered = apply_tag_filter_on_subgraphs(&subgraphs, &filter(&[], &["hidden"]));
        for sub in &filtered {
            let thing = object(sub, "Thing");
            assert_eq!(
                thing
                    .directives
                    .iter()
                    .filter(|d| d.name.as_str() == "inaccessible")
                    .count(),
                1,
                "subgraph {}",
                sub.name
            );
        }
    }

    #[test]
    fn partially_visible_type_is_not_hidden() {
        let subgraphs = [
            subgraph(
                "a",
                r#"
                  extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag", "@inaccessible"])
                  type Query { thing: Thing }
                  type Thing { secret: String @tag(name: "hidden") }
                "#,
            ),
            subgraph(
                "b",
                r#"
                  extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag", "@inaccessible"])
                  type Thing { visible: String }
                "#,
            ),
        ];

        let filtered = apply_tag_filter_on_subgraphs(&subgraphs, &filter(&[], &["hidden"]));
        for sub in &filtered {
            assert!(!object(sub, "Thing").directives.has("inaccessible"));
        }
    }

    #[test]
    fn root_types_are_never_hidden() {
        let subgraphs = [subgraph(
            "a",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag", "@inaccessible"])
              type Query {
                hello: String @tag(name: "hidden")
              }
            "#,
        )];

        let filtered = apply_tag_filter_on_subgraphs(&subgraphs, &filter(&[], &["hidden"]));
        let query = object(&filtered[0], "Query");
        assert!(!query.directives.has("inaccessible"));
        assert!(query.fields["hello"].directives.has("inaccessible"));
    }

    #[test]
    fn filtering_is_idempotent() {
        let subgraphs = [subgraph(
            "a",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag"])
              type Query { thing: Thing }
              type Thing @tag(name: "hidden") { id: ID }
              enum Color { RED @tag(name: "hidden") GREEN }
            "#,
        )];
        let exclude = filter(&[], &["hidden"]);

        let once = apply_tag_filter_on_subgraphs(&subgraphs, &exclude);
        let twice = apply_tag_filter_on_subgraphs(&once, &exclude);
        assert_eq!(
            once[0].schema.serialize().to_string(),
            twice[0].schema.serialize().to_string()
        );
    }

    #[test]
    fn respects_aliased_tag_directives() {
        let subgraphs = [subgraph(
            "a",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@inaccessible", { name: "@tag", as: "@label" }])
              type Query {
                hidden: String @label(name: "internal")
              }
            "#,
        )];

        let filtered = apply_tag_filter_on_subgraphs(&subgraphs, &filter(&[], &["internal"]));
        let query = object(&filtered[0], "Query");
        assert!(query.fields["hidden"].directives.has("inaccessible"));
        assert!(!query.fields["hidden"].directives.has("label"));
    }

    #[test]
    fn rejects_intersecting_and_empty_filters() {
        let errors = filter(&["a"], &["a", "b"]).validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("\"a\""));

        let errors = filter(&[], &[]).validate();
        assert_eq!(errors.len(), 1);

        assert!(filter(&["a"], &["b"]).validate().is_empty());
    }
}
