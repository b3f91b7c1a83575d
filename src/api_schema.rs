//! Derives the public (API) schema of a supergraph: the schema consumers see
//! once `@inaccessible` elements are removed and the link/join machinery is
//! stripped out.

use apollo_compiler::Schema;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::Name;
use apollo_compiler::validation::Valid;

use crate::error::CompositionError;
use crate::link::LinksMetadata;
use crate::link::database::links_metadata;
use crate::link::spec::Identity;

/// Removes every `@inaccessible` element and all spec-owned machinery from
/// the supergraph, then validates the result. Validation failures surface the
/// cases where hiding an element broke the remaining schema, e.g. a visible
/// field returning a hidden type.
pub fn to_public_schema(
    supergraph: &Valid<Schema>,
) -> Result<Valid<Schema>, Vec<CompositionError>> {
    let mut schema = supergraph.clone().into_inner();
    let links = links_metadata(&schema);
    let inaccessible_name =
        links.resolve_import_name(&Identity::inaccessible_identity(), "@inaccessible");

    remove_inaccessible_elements(&mut schema, &inaccessible_name);
    remove_core_feature_elements(&mut schema, &links);

    schema.validate().map_err(|with_errors| {
        with_errors
            .errors
            .iter()
            .map(|diagnostic| CompositionError::composition(diagnostic.to_string()))
            .collect::<Vec<_>>()
    })
}

fn remove_inaccessible_elements(schema: &mut Schema, inaccessible: &Name) {
    let inaccessible = inaccessible.as_str();

    let removed_types: Vec<Name> = schema
        .types
        .iter()
        .filter(|(_, ty)| ty.directives().has(inaccessible))
        .map(|(name, _)| name.clone())
        .collect();
    for type_name in &removed_types {
        schema.types.shift_remove(type_name);
    }

    let definition = schema.schema_definition.make_mut();
    for root in [
        &mut definition.query,
        &mut definition.mutation,
        &mut definition.subscription,
    ] {
        if root
            .as_ref()
            .is_some_and(|name| removed_types.contains(&name.name))
        {
            *root = None;
        }
    }

    for ty in schema.types.values_mut() {
        match ty {
            ExtendedType::Object(obj) => {
                let obj = obj.make_mut();
                obj.fields
                    .retain(|_, field| !field.directives.has(inaccessible));
                for field in obj.fields.values_mut() {
                    field
                        .make_mut()
                        .arguments
                        .retain(|arg| !arg.directives.has(inaccessible));
                }
            }
            ExtendedType::Interface(interface) => {
                let interface = interface.make_mut();
                interface
                    .fields
                    .retain(|_, field| !field.directives.has(inaccessible));
                for field in interface.fields.values_mut() {
                    field
                        .make_mut()
                        .arguments
                        .retain(|arg| !arg.directives.has(inaccessible));
                }
            }
            ExtendedType::InputObject(input) => {
                input
                    .make_mut()
                    .fields
                    .retain(|_, field| !field.directives.has(inaccessible));
            }
            ExtendedType::Enum(enum_) => {
                enum_
                    .make_mut()
                    .values
                    .retain(|_, value| !value.directives.has(inaccessible));
            }
            ExtendedType::Union(union_) => {
                // members of removed types would fail validation below
                union_
                    .make_mut()
                    .members
                    .retain(|member| !removed_types.contains(&member.name));
            }
            ExtendedType::Scalar(_) => {}
        }
    }
}

/// Removes types and directives owned by linked specifications, and their
/// applications anywhere in the schema. Adapted from the supergraph-to-API
/// transform: the public schema carries no `link__`/`join__` machinery, no
/// `@link` applications and no `@tag`/`@inaccessible` definitions.
fn remove_core_feature_elements(schema: &mut Schema, links: &LinksMetadata) {
    let types_for_removal: Vec<Name> = schema
        .types
        .keys()
        .filter(|type_name| links.source_link_of_type(type_name).is_some())
        .cloned()
        .collect();
    for type_name in &types_for_removal {
        schema.types.shift_remove(type_name);
    }

    let directives_for_removal: Vec<Name> = schema
        .directive_definitions
        .keys()
        .filter(|directive_name| links.source_link_of_directive(directive_name).is_some())
        .cloned()
        .collect();
    for directive_name in &directives_for_removal {
        schema.directive_definitions.shift_remove(directive_name);
    }

    let owned = |name: &Name| links.source_link_of_directive(name).is_some();

    schema
        .schema_definition
        .make_mut()
        .directives
        .retain(|directive| !owned(&directive.name));

    for ty in schema.types.values_mut() {
        match ty {
            ExtendedType::Object(obj) => {
                let obj = obj.make_mut();
                obj.directives.retain(|directive| !owned(&directive.name));
                for field in obj.fields.values_mut() {
                    let field = field.make_mut();
                    field.directives.retain(|directive| !owned(&directive.name));
                    for arg in field.arguments.iter_mut() {
                        arg.make_mut()
                            .directives
                            .retain(|directive| !owned(&directive.name));
                    }
                }
            }
            ExtendedType::Interface(interface) => {
                let interface = interface.make_mut();
                interface
                    .directives
                    .retain(|directive| !owned(&directive.name));
                for field in interface.fields.values_mut() {
                    let field = field.make_mut();
                    field.directives.retain(|directive| !owned(&directive.name));
                    for arg in field.arguments.iter_mut() {
                        arg.make_mut()
                            .directives
                            .retain(|directive| !owned(&directive.name));
                    }
                }
            }
            ExtendedType::InputObject(input) => {
                let input = input.make_mut();
                input.directives.retain(|directive| !owned(&directive.name));
                for field in input.fields.values_mut() {
                    field
                        .make_mut()
                        .directives
                        .retain(|directive| !owned(&directive.name));
                }
            }
            ExtendedType::Enum(enum_) => {
                let enum_ = enum_.make_mut();
                enum_.directives.retain(|directive| !owned(&directive.name));
                for value in enum_.values.values_mut() {
                    value
                        .make_mut()
                        .directives
                        .retain(|directive| !owned(&directive.name));
                }
            }
            ExtendedType::Scalar(scalar) => {
                scalar
                    .make_mut()
                    .directives
                    .retain(|directive| !owned(&directive.name));
            }
            ExtendedType::Union(union_) => {
                union_
                    .make_mut()
                    .directives
                    .retain(|directive| !owned(&directive.name));
            }
        }
    }
}
