//! Post-composition pruning: types that the public schema can no longer reach
//! from its root operation types are marked `@inaccessible` in the
//! supergraph, so the final public SDL drops them entirely.

use std::collections::VecDeque;

use apollo_compiler::Schema;
use apollo_compiler::ast::Directive;
use apollo_compiler::name;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::Name;
use apollo_compiler::validation::Valid;
use indexmap::IndexSet;

use crate::api_schema::to_public_schema;
use crate::error::CompositionError;
use crate::link::database::links_metadata;
use crate::link::spec::Identity;

/// Names of all types reachable from the root operation types: field return
/// and argument types, input object field types, interfaces implemented by
/// visited types, and union members.
pub fn reachable_type_names(schema: &Schema) -> IndexSet<Name> {
    let mut visited: IndexSet<Name> = IndexSet::new();
    let definition = &schema.schema_definition;
    let mut queue: VecDeque<Name> = definition
        .query
        .iter()
        .chain(definition.mutation.iter())
        .chain(definition.subscription.iter())
        .map(|root| root.name.clone())
        .collect();

    while let Some(type_name) = queue.pop_front() {
        if !visited.insert(type_name.clone()) {
            continue;
        }
        let Some(ty) = schema.types.get(&type_name) else {
            continue;
        };
        match ty {
            ExtendedType::Object(obj) => {
                for field in obj.fields.values() {
                    queue.push_back(field.ty.inner_named_type().clone());
                    for arg in &field.arguments {
                        queue.push_back(arg.ty.inner_named_type().clone());
                    }
                }
                for interface in &obj.implements_interfaces {
                    queue.push_back(interface.name.clone());
                }
            }
            ExtendedType::Interface(interface) => {
                for field in interface.fields.values() {
                    queue.push_back(field.ty.inner_named_type().clone());
                    for arg in &field.arguments {
                        queue.push_back(arg.ty.inner_named_type().clone());
                    }
                }
                for implemented in &interface.implements_interfaces {
                    queue.push_back(implemented.name.clone());
                }
            }
            ExtendedType::Union(union_) => {
                for member in &union_.members {
                    queue.push_back(member.name.clone());
                }
            }
            ExtendedType::InputObject(input) => {
                for field in input.fields.values() {
                    queue.push_back(field.ty.inner_named_type().clone());
                }
            }
            ExtendedType::Scalar(_) | ExtendedType::Enum(_) => {}
        }
    }

    visited
}

/// Marks every supergraph type the public schema cannot reach as
/// `@inaccessible` (at most once per type) and revalidates. Idempotent:
/// already-marked types are left alone, and re-running on the result is a
/// no-op since marked types disappear from the public schema's reach anyway.
pub fn add_inaccessible_to_unreachable_types(
    supergraph: &Valid<Schema>,
) -> Result<Valid<Schema>, Vec<CompositionError>> {
    let public = to_public_schema(supergraph)?;
    let mut keep = reachable_type_names(&public);

    let links = links_metadata(supergraph);
    let inaccessible_name =
        links.resolve_import_name(&Identity::inaccessible_identity(), "@inaccessible");
    // the gateway rejects @inaccessible on the federation machinery itself
    keep.insert(links.resolve_import_name(&Identity::join_identity(), "FieldSet"));
    keep.insert(links.resolve_import_name(&Identity::join_identity(), "Graph"));
    keep.insert(links.resolve_import_name(&Identity::link_identity(), "Import"));
    keep.insert(links.resolve_import_name(&Identity::link_identity(), "Purpose"));
    keep.insert(name!("_Service"));
    keep.insert(name!("_Entity"));
    keep.insert(name!("_Any"));

    let mut schema = supergraph.clone().into_inner();
    for (type_name, ty) in schema.types.iter_mut() {
        if ty.is_built_in()
            || keep.contains(type_name)
            || links.source_link_of_type(type_name).is_some()
        {
            continue;
        }
        let directives = match ty {
            ExtendedType::Object(obj) => &mut obj.make_mut().directives,
            ExtendedType::Interface(interface) => &mut interface.make_mut().directives,
            ExtendedType::InputObject(input) => &mut input.make_mut().directives,
            ExtendedType::Enum(enum_) => &mut enum_.make_mut().directives,
            ExtendedType::Scalar(scalar) => &mut scalar.make_mut().directives,
            ExtendedType::Union(union_) => &mut union_.make_mut().directives,
        };
        if !directives.has(inaccessible_name.as_str()) {
            directives.push(Component::new(Directive {
                name: inaccessible_name.clone(),
                arguments: vec![],
            }));
        }
    }

    schema.validate().map_err(|with_errors| {
        with_errors
            .errors
            .iter()
            .map(|diagnostic| CompositionError::composition(diagnostic.to_string()))
            .collect::<Vec<_>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_subgraphs;
    use crate::subgraph::Subgraph;

    #[test]
    fn walks_fields_arguments_interfaces_unions_and_inputs() {
        let schema = Schema::parse(
            r#"
              type Query {
                search(input: SearchInput): SearchResult
                node: Node
              }
              input SearchInput { term: String }
              union SearchResult = Book | Movie
              type Book { title: String }
              type Movie implements Node { id: ID! }
              interface Node { id: ID! }
              type Orphan { id: ID }
              scalar Unused
            "#,
            "reachability.graphql",
        )
        .unwrap();

        let reachable = reachable_type_names(&schema);
        for name in ["Query", "SearchInput", "SearchResult", "Book", "Movie", "Node"] {
            assert!(reachable.iter().any(|n| n.as_str() == name), "{name}");
        }
        assert!(!reachable.iter().any(|n| n.as_str() == "Orphan"));
        assert!(!reachable.iter().any(|n| n.as_str() == "Unused"));
    }

    #[test]
    fn marks_types_unreachable_through_inaccessible_fields() {
        let subgraph = Subgraph::parse(
            "cars",
            "https://cars.test",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@inaccessible"])
              type Query {
                hello: String
                helloHidden: Toyota @inaccessible
              }
              type Toyota { id: String! }
            "#,
        )
        .unwrap();

        let supergraph = merge_subgraphs(&[subgraph]).unwrap().schema;
        let pruned = add_inaccessible_to_unreachable_types(&supergraph).unwrap();

        let ExtendedType::Object(toyota) = &pruned.types["Toyota"] else {
            panic!("Toyota should be an object type");
        };
        assert!(toyota.directives.has("inaccessible"));

        let public = to_public_schema(&pruned).unwrap();
        assert!(!public.types.contains_key("Toyota"));

        // idempotent
        let again = add_inaccessible_to_unreachable_types(&pruned).unwrap();
        assert_eq!(pruned.serialize().to_string(), again.serialize().to_string());
    }

    #[test]
    fn keeps_federation_machinery_unmarked() {
        let subgraph = Subgraph::parse(
            "a",
            "",
            r#"
              type Query { hello: String }
            "#,
        )
        .unwrap();

        let supergraph = merge_subgraphs(&[subgraph]).unwrap().schema;
        let pruned = add_inaccessible_to_unreachable_types(&supergraph).unwrap();
        for name in ["join__Graph", "join__FieldSet", "link__Import", "link__Purpose"] {
            assert!(
                !pruned.types[name].directives().has("inaccessible"),
                "{name}"
            );
        }
    }
}
