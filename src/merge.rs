//! Merges subgraph schemas into a supergraph document carrying `join__` metadata.
//!
//! Beyond the structural merge, `@tag` and `@inaccessible` applications found in
//! the subgraphs are carried over under their canonical names (resolving any
//! per-subgraph `@link` imports or aliases), so that contract filtering and the
//! public schema transform can operate on the supergraph alone.

use std::fmt::Debug;
use std::fmt::Formatter;
use std::iter;

use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::ast::Argument;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::DirectiveDefinition;
use apollo_compiler::ast::DirectiveLocation;
use apollo_compiler::ast::EnumValueDefinition;
use apollo_compiler::ast::NamedType;
use apollo_compiler::ast::Value;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::name;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::EnumType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::InputObjectType;
use apollo_compiler::schema::InputValueDefinition;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::Name;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::schema::ScalarType;
use apollo_compiler::schema::UnionType;
use apollo_compiler::ty;
use apollo_compiler::validation::Valid;
use indexmap::map::Entry::Occupied;
use indexmap::map::Entry::Vacant;

use crate::error::CompositionError;
use crate::link::LinksMetadata;
use crate::link::spec::Identity;
use crate::subgraph::Subgraph;

type MergeHint = String;

pub struct MergeSuccess {
    pub schema: Valid<Schema>,
    pub composition_hints: Vec<MergeHint>,
}

pub struct MergeFailure {
    pub errors: Vec<CompositionError>,
    pub composition_hints: Vec<MergeHint>,
}

impl Debug for MergeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("MergeFailure")
            .field("errors", &self.errors)
            .field("composition_hints", &self.composition_hints)
            .finish()
    }
}

pub fn merge_subgraphs(subgraphs: &[Subgraph]) -> Result<MergeSuccess, MergeFailure> {
    let mut merger = Merger::new();
    merger.merge(subgraphs)
}

/// Per-subgraph state needed during the merge: the `join__Graph` enum value of
/// the subgraph and the local (post-`@link`-resolution) names of the federation
/// directives it may use.
struct SubgraphContext<'a> {
    subgraph: &'a Subgraph,
    enum_value: Name,
    key_name: Name,
    requires_name: Name,
    provides_name: Name,
    external_name: Name,
    interface_object_name: Name,
    tag_name: Name,
    inaccessible_name: Name,
    links: LinksMetadata,
}

impl<'a> SubgraphContext<'a> {
    fn new(subgraph: &'a Subgraph, enum_value: Name) -> Self {
        let links = subgraph.links();
        let federation = Identity::federation_identity();
        let key_name = links.resolve_import_name(&federation, "@key");
        let requires_name = links.resolve_import_name(&federation, "@requires");
        let provides_name = links.resolve_import_name(&federation, "@provides");
        let external_name = links.resolve_import_name(&federation, "@external");
        let interface_object_name = links.resolve_import_name(&federation, "@interfaceObject");
        let tag_name = links.resolve_import_name(&federation, "@tag");
        let inaccessible_name = links.resolve_import_name(&federation, "@inaccessible");
        Self {
            subgraph,
            enum_value,
            key_name,
            requires_name,
            provides_name,
            external_name,
            interface_object_name,
            tag_name,
            inaccessible_name,
            links,
        }
    }

    fn root_types(&self) -> impl Iterator<Item = &ComponentName> {
        let definition = &self.subgraph.schema.schema_definition;
        definition
            .query
            .iter()
            .chain(definition.mutation.iter())
            .chain(definition.subscription.iter())
    }

    fn is_root_type(&self, type_name: &Name) -> bool {
        self.root_types().any(|root| root.name == *type_name)
    }

    /// Types owned by a linked specification (`join__Graph`, imported
    /// `FieldSet`, ...) belong to the machinery of that spec and are not merged.
    fn is_mergeable_type(&self, type_name: &Name) -> bool {
        if self.links.source_link_of_type(type_name).is_some() {
            return false;
        }
        !matches!(type_name.as_str(), "_Any" | "_Entity" | "_Service")
    }
}

struct Merger {
    errors: Vec<CompositionError>,
    composition_hints: Vec<MergeHint>,
}

impl Merger {
    fn new() -> Self {
        Merger {
            composition_hints: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn merge(&mut self, subgraphs: &[Subgraph]) -> Result<MergeSuccess, MergeFailure> {
        let mut subgraphs: Vec<&Subgraph> = subgraphs.iter().collect();
        subgraphs.sort_by(|s1, s2| s1.name.cmp(&s2.name));
        let mut contexts: Vec<SubgraphContext<'_>> = Vec::new();
        for subgraph in &subgraphs {
            match Name::new(&subgraph.name.replace('-', "_").to_uppercase()) {
                Ok(enum_value) => contexts.push(SubgraphContext::new(subgraph, enum_value)),
                Err(_) => self.errors.push(CompositionError::composition(format!(
                    "Subgraph name \"{}\" couldn't be transformed into a valid GraphQL name",
                    subgraph.name
                ))),
            }
        }
        if !self.errors.is_empty() {
            return Err(MergeFailure {
                composition_hints: self.composition_hints.to_owned(),
                errors: self.errors.to_owned(),
            });
        }

        let mut supergraph = Schema::new();
        add_core_feature_link(&mut supergraph);
        add_core_feature_join(&mut supergraph, &contexts);
        add_core_feature_tag(&mut supergraph);
        add_core_feature_inaccessible(&mut supergraph);

        for context in &contexts {
            self.merge_schema(&mut supergraph, context);

            for (key, value) in &context.subgraph.schema.types {
                if value.is_built_in() || !context.is_mergeable_type(key) {
                    // skip built-ins and federation specific types
                    continue;
                }

                match value {
                    ExtendedType::Enum(value) => {
                        self.merge_enum_type(&mut supergraph.types, context, key.clone(), value)
                    }
                    ExtendedType::InputObject(value) => self.merge_input_object_type(
                        &mut supergraph.types,
                        context,
                        key.clone(),
                        value,
                    ),
                    ExtendedType::Interface(value) => self.merge_interface_type(
                        &mut supergraph.types,
                        context,
                        key.clone(),
                        value,
                    ),
                    ExtendedType::Object(value) => {
                        self.merge_object_type(&mut supergraph.types, context, key.clone(), value)
                    }
                    ExtendedType::Union(value) => {
                        self.merge_union_type(&mut supergraph.types, context, key.clone(), value)
                    }
                    ExtendedType::Scalar(value) => {
                        self.merge_scalar_type(&mut supergraph.types, context, key.clone(), value)
                    }
                }
            }

            // merge executable directives
            for directive in context.subgraph.schema.directive_definitions.values() {
                if !directive.is_built_in() && is_executable_directive(directive) {
                    merge_directive(&mut supergraph.directive_definitions, directive);
                }
            }
        }

        if !self.errors.is_empty() {
            return Err(MergeFailure {
                composition_hints: self.composition_hints.to_owned(),
                errors: self.errors.to_owned(),
            });
        }

        match supergraph.validate() {
            Ok(schema) => Ok(MergeSuccess {
                schema,
                composition_hints: self.composition_hints.to_owned(),
            }),
            Err(with_errors) => Err(MergeFailure {
                errors: with_errors
                    .errors
                    .iter()
                    .map(|diagnostic| CompositionError::composition(diagnostic.to_string()))
                    .collect(),
                composition_hints: self.composition_hints.to_owned(),
            }),
        }
    }

    fn merge_descriptions<T: Eq + Clone>(&mut self, merged: &mut Option<T>, new: &Option<T>) {
        match (&mut *merged, new) {
            (_, None) => {}
            (None, Some(_)) => merged.clone_from(new),
            (Some(a), Some(b)) => {
                if a != b {
                    self.composition_hints
                        .push(String::from("conflicting descriptions"));
                }
            }
        }
    }

    fn merge_schema(&mut self, supergraph_schema: &mut Schema, context: &SubgraphContext<'_>) {
        let supergraph_def = supergraph_schema.schema_definition.make_mut();
        let subgraph_def = &context.subgraph.schema.schema_definition;
        self.merge_descriptions(&mut supergraph_def.description, &subgraph_def.description);

        self.carry_onto_component_list(
            context,
            &subgraph_def.directives,
            &mut supergraph_def.directives,
        );

        if subgraph_def.query.is_some() {
            supergraph_def.query.clone_from(&subgraph_def.query);
        }
        if subgraph_def.mutation.is_some() {
            supergraph_def.mutation.clone_from(&subgraph_def.mutation);
        }
        if subgraph_def.subscription.is_some() {
            supergraph_def
                .subscription
                .clone_from(&subgraph_def.subscription);
        }
    }

    /// Carries `@tag` and `@inaccessible` from a subgraph element onto the
    /// corresponding supergraph element, under their canonical names.
    /// Duplicate tags and repeated `@inaccessible` are skipped so that the
    /// supergraph carries each at most once per element.
    fn carried_directives<'s>(
        &mut self,
        context: &SubgraphContext<'_>,
        source: impl Iterator<Item = &'s Directive>,
        target: impl Iterator<Item = &'s Directive> + Clone,
    ) -> Vec<Directive> {
        let mut carried: Vec<Directive> = Vec::new();
        for directive in source {
            if directive.name == context.tag_name {
                let Some(tag) = directive
                    .specified_argument_by_name("name")
                    .and_then(|value| value.as_str())
                else {
                    continue;
                };
                let already_tagged = |directive: &Directive| {
                    directive.name.as_str() == "tag"
                        && directive
                            .specified_argument_by_name("name")
                            .and_then(|value| value.as_str())
                            == Some(tag)
                };
                if !target.clone().any(already_tagged) && !carried.iter().any(already_tagged) {
                    carried.push(tag_applied_directive(tag));
                }
            } else if directive.name == context.inaccessible_name {
                let is_inaccessible =
                    |directive: &Directive| directive.name.as_str() == "inaccessible";
                if !target.clone().any(is_inaccessible) && !carried.iter().any(is_inaccessible) {
                    carried.push(Directive {
                        name: name!("inaccessible"),
                        arguments: vec![],
                    });
                }
            }
        }
        carried
    }

    fn carry_onto_ast_list(
        &mut self,
        context: &SubgraphContext<'_>,
        source: &ast::DirectiveList,
        target: &mut ast::DirectiveList,
    ) {
        let carried = self.carried_directives(
            context,
            source.iter().map(|node| node.as_ref()),
            target.iter().map(|node| node.as_ref()),
        );
        for directive in carried {
            target.push(Node::new(directive));
        }
    }

    fn carry_onto_component_list(
        &mut self,
        context: &SubgraphContext<'_>,
        source: &apollo_compiler::schema::DirectiveList,
        target: &mut apollo_compiler::schema::DirectiveList,
    ) {
        let carried = self.carried_directives(
            context,
            source.iter().map(|component| &*component.node),
            target.iter().map(|component| &*component.node),
        );
        for directive in carried {
            target.push(Component::new(directive));
        }
    }

    fn merge_enum_type(
        &mut self,
        types: &mut IndexMap<NamedType, ExtendedType>,
        context: &SubgraphContext<'_>,
        enum_name: NamedType,
        enum_type: &Node<EnumType>,
    ) {
        let existing_type = types
            .entry(enum_name.clone())
            .or_insert(copy_enum_type(enum_name.clone(), enum_type));
        if let ExtendedType::Enum(e) = existing_type {
            let join_type_directives =
                join_type_applied_directive(context.enum_value.clone(), iter::empty(), false);
            e.make_mut().directives.extend(join_type_directives);
            self.merge_descriptions(&mut e.make_mut().description, &enum_type.description);
            let directives = enum_type.directives.clone();
            self.carry_onto_component_list(context, &directives, &mut e.make_mut().directives);

            for (enum_value_name, enum_value) in enum_type.values.iter() {
                let ev = e
                    .make_mut()
                    .values
                    .entry(enum_value_name.clone())
                    .or_insert(Component::new(EnumValueDefinition {
                        value: enum_value.value.clone(),
                        description: None,
                        directives: Default::default(),
                    }));
                self.merge_descriptions(&mut ev.make_mut().description, &enum_value.description);
                ev.make_mut().directives.push(Node::new(Directive {
                    name: name!("join__enumValue"),
                    arguments: vec![Node::new(Argument {
                        name: name!("graph"),
                        value: Node::new(Value::Enum(context.enum_value.clone())),
                    })],
                }));
                self.carry_onto_ast_list(
                    context,
                    &enum_value.directives,
                    &mut ev.make_mut().directives,
                );
            }
        } else {
            self.type_kind_conflict(&enum_name, "enum");
        }
    }

    fn merge_input_object_type(
        &mut self,
        types: &mut IndexMap<NamedType, ExtendedType>,
        context: &SubgraphContext<'_>,
        input_object_name: NamedType,
        input_object: &Node<InputObjectType>,
    ) {
        let existing_type = types
            .entry(input_object_name.clone())
            .or_insert(copy_input_object_type_stub(
                input_object_name.clone(),
                input_object,
            ));
        if let ExtendedType::InputObject(obj) = existing_type {
            let join_type_directives =
                join_type_applied_directive(context.enum_value.clone(), iter::empty(), false);
            let mutable_object = obj.make_mut();
            mutable_object.directives.extend(join_type_directives);
            self.merge_descriptions(&mut mutable_object.description, &input_object.description);
            self.carry_onto_component_list(
                context,
                &input_object.directives,
                &mut mutable_object.directives,
            );

            for (field_name, field) in input_object.fields.iter() {
                let supergraph_field = match mutable_object.fields.entry(field_name.clone()) {
                    Vacant(entry) => entry.insert(Component::new(InputValueDefinition {
                        name: field.name.clone(),
                        description: field.description.clone(),
                        directives: Default::default(),
                        ty: field.ty.clone(),
                        default_value: field.default_value.clone(),
                    })),
                    Occupied(entry) => {
                        let existing = entry.into_mut();
                        if *existing.ty != *field.ty {
                            self.errors.push(CompositionError::composition(format!(
                                "Input field \"{}.{}\" has incompatible types across subgraphs: it has type \"{}\" but type \"{}\" in subgraph \"{}\"",
                                input_object.name,
                                field_name,
                                existing.ty,
                                field.ty,
                                context.subgraph.name,
                            )));
                        }
                        existing
                    }
                };
                let directives = field.directives.clone();
                self.carry_onto_ast_list(
                    context,
                    &directives,
                    &mut supergraph_field.make_mut().directives,
                );
            }
        } else {
            self.type_kind_conflict(&input_object_name, "input object");
        }
    }

    fn merge_interface_type(
        &mut self,
        types: &mut IndexMap<NamedType, ExtendedType>,
        context: &SubgraphContext<'_>,
        interface_name: NamedType,
        interface: &Node<InterfaceType>,
    ) {
        let existing_type = types
            .entry(interface_name.clone())
            .or_insert(copy_interface_type_stub(interface_name.clone(), interface));
        if let ExtendedType::Interface(intf) = existing_type {
            let key_directives = interface.directives.get_all(&context.key_name);
            let join_type_directives =
                join_type_applied_directive(context.enum_value.clone(), key_directives, false);
            let mutable_intf = intf.make_mut();
            mutable_intf.directives.extend(join_type_directives);
            self.merge_descriptions(&mut mutable_intf.description, &interface.description);
            self.carry_onto_component_list(
                context,
                &interface.directives,
                &mut mutable_intf.directives,
            );

            for (field_name, field) in interface.fields.iter() {
                let supergraph_field = match mutable_intf.fields.entry(field_name.clone()) {
                    Vacant(entry) => entry.insert(field_stub(field)),
                    Occupied(entry) => {
                        let existing = entry.into_mut();
                        self.check_field_types(&interface.name, field, existing, context);
                        existing
                    }
                };
                self.merge_field(context, field, supergraph_field);
            }
        } else {
            self.type_kind_conflict(&interface_name, "interface");
        }
    }

    fn merge_object_type(
        &mut self,
        types: &mut IndexMap<NamedType, ExtendedType>,
        context: &SubgraphContext<'_>,
        object_name: NamedType,
        object: &Node<ObjectType>,
    ) {
        let is_interface_object = object.directives.has(&context.interface_object_name);
        let existing_type = types
            .entry(object_name.clone())
            .or_insert(copy_object_type_stub(
                object_name.clone(),
                object,
                is_interface_object,
            ));
        if let ExtendedType::Object(obj) = existing_type {
            let key_fields = parse_keys(object.directives.get_all(&context.key_name));
            let is_join_field = !key_fields.is_empty() || context.is_root_type(&object_name);
            let key_directives = object.directives.get_all(&context.key_name);
            let join_type_directives =
                join_type_applied_directive(context.enum_value.clone(), key_directives, false);
            let mutable_object = obj.make_mut();
            mutable_object.directives.extend(join_type_directives);
            self.merge_descriptions(&mut mutable_object.description, &object.description);
            self.carry_onto_component_list(
                context,
                &object.directives,
                &mut mutable_object.directives,
            );
            object.implements_interfaces.iter().for_each(|intf_name| {
                // IndexSet::insert deduplicates
                mutable_object
                    .implements_interfaces
                    .insert(intf_name.clone());
                let join_implements_directive =
                    join_type_implements(context.enum_value.clone(), intf_name);
                mutable_object.directives.push(join_implements_directive);
            });

            for (field_name, field) in object.fields.iter() {
                // skip federation built-in queries
                if field_name.as_str() == "_service" || field_name.as_str() == "_entities" {
                    continue;
                }

                let supergraph_field = match mutable_object.fields.entry(field_name.clone()) {
                    Vacant(entry) => entry.insert(field_stub(field)),
                    Occupied(entry) => {
                        let existing = entry.into_mut();
                        self.check_field_types(&object.name, field, existing, context);
                        existing
                    }
                };

                if is_join_field && !key_fields.contains(field_name.as_str()) {
                    let requires = field
                        .directives
                        .get_all(&context.requires_name)
                        .next()
                        .and_then(|d| directive_string_arg_value(d, &name!("fields")));
                    let provides = field
                        .directives
                        .get_all(&context.provides_name)
                        .next()
                        .and_then(|d| directive_string_arg_value(d, &name!("fields")));
                    let external = field.directives.has(&context.external_name);
                    let join_field_directive = join_field_applied_directive(
                        context.enum_value.clone(),
                        requires,
                        provides,
                        external,
                    );
                    supergraph_field
                        .make_mut()
                        .directives
                        .push(Node::new(join_field_directive));
                }

                self.merge_field(context, field, supergraph_field);
            }
        } else if let ExtendedType::Interface(intf) = existing_type {
            // an @interfaceObject contribution to a type other subgraphs know
            // as an interface
            let key_directives = object.directives.get_all(&context.key_name);
            let join_type_directives =
                join_type_applied_directive(context.enum_value.clone(), key_directives, true);
            intf.make_mut().directives.extend(join_type_directives);
        } else {
            self.type_kind_conflict(&object_name, "object");
        }
    }

    /// Description, argument and carried-directive merging shared by object and
    /// interface fields.
    fn merge_field(
        &mut self,
        context: &SubgraphContext<'_>,
        field: &Component<FieldDefinition>,
        supergraph_field: &mut Component<FieldDefinition>,
    ) {
        self.merge_descriptions(
            &mut supergraph_field.make_mut().description,
            &field.description,
        );
        for arg in field.arguments.iter() {
            let Some(supergraph_arg) = supergraph_field
                .make_mut()
                .arguments
                .iter_mut()
                .find(|existing| existing.name == arg.name)
            else {
                continue;
            };
            let directives = arg.directives.clone();
            self.carry_onto_ast_list(
                context,
                &directives,
                &mut supergraph_arg.make_mut().directives,
            );
        }
        let directives = field.directives.clone();
        self.carry_onto_ast_list(
            context,
            &directives,
            &mut supergraph_field.make_mut().directives,
        );
    }

    fn check_field_types(
        &mut self,
        type_name: &Name,
        field: &Component<FieldDefinition>,
        existing: &Component<FieldDefinition>,
        context: &SubgraphContext<'_>,
    ) {
        if existing.ty != field.ty {
            self.errors.push(CompositionError::composition(format!(
                "Field \"{}.{}\" has incompatible types across subgraphs: it has type \"{}\" but type \"{}\" in subgraph \"{}\"",
                type_name, field.name, existing.ty, field.ty, context.subgraph.name,
            )));
        }
    }

    fn merge_union_type(
        &mut self,
        types: &mut IndexMap<NamedType, ExtendedType>,
        context: &SubgraphContext<'_>,
        union_name: NamedType,
        union: &Node<UnionType>,
    ) {
        let existing_type = types.entry(union_name.clone()).or_insert(copy_union_type(
            union_name.clone(),
            union.description.clone(),
        ));
        if let ExtendedType::Union(u) = existing_type {
            let join_type_directives =
                join_type_applied_directive(context.enum_value.clone(), iter::empty(), false);
            u.make_mut().directives.extend(join_type_directives);
            self.carry_onto_component_list(context, &union.directives, &mut u.make_mut().directives);

            for union_member in union.members.iter() {
                // IndexSet::insert deduplicates
                u.make_mut().members.insert(union_member.clone());
                u.make_mut().directives.push(Component::new(Directive {
                    name: name!("join__unionMember"),
                    arguments: vec![
                        Node::new(Argument {
                            name: name!("graph"),
                            value: Node::new(Value::Enum(context.enum_value.clone())),
                        }),
                        Node::new(Argument {
                            name: name!("member"),
                            value: Node::new(Value::String(union_member.name.to_string())),
                        }),
                    ],
                }));
            }
        } else {
            self.type_kind_conflict(&union_name, "union");
        }
    }

    fn merge_scalar_type(
        &mut self,
        types: &mut IndexMap<NamedType, ExtendedType>,
        context: &SubgraphContext<'_>,
        scalar_name: NamedType,
        scalar: &Node<ScalarType>,
    ) {
        let existing_type = types
            .entry(scalar_name.clone())
            .or_insert(ExtendedType::Scalar(Node::new(ScalarType {
                description: scalar.description.clone(),
                name: scalar_name.clone(),
                directives: Default::default(),
            })));
        if let ExtendedType::Scalar(s) = existing_type {
            let join_type_directives =
                join_type_applied_directive(context.enum_value.clone(), iter::empty(), false);
            s.make_mut().directives.extend(join_type_directives);
            self.merge_descriptions(&mut s.make_mut().description, &scalar.description);
            self.carry_onto_component_list(context, &scalar.directives, &mut s.make_mut().directives);
        } else {
            self.type_kind_conflict(&scalar_name, "scalar");
        }
    }

    fn type_kind_conflict(&mut self, type_name: &Name, expected: &str) {
        self.errors.push(CompositionError::composition(format!(
            "Type \"{}\" has mismatched kinds across subgraphs (expected {} everywhere)",
            type_name, expected,
        )));
    }
}

const EXECUTABLE_DIRECTIVE_LOCATIONS: [DirectiveLocation; 8] = [
    DirectiveLocation::Query,
    DirectiveLocation::Mutation,
    DirectiveLocation::Subscription,
    DirectiveLocation::Field,
    DirectiveLocation::FragmentDefinition,
    DirectiveLocation::FragmentSpread,
    DirectiveLocation::InlineFragment,
    DirectiveLocation::VariableDefinition,
];

fn is_executable_directive(directive: &Node<DirectiveDefinition>) -> bool {
    directive
        .locations
        .iter()
        .any(|loc| EXECUTABLE_DIRECTIVE_LOCATIONS.contains(loc))
}

fn copy_enum_type(enum_name: Name, enum_type: &Node<EnumType>) -> ExtendedType {
    ExtendedType::Enum(Node::new(EnumType {
        description: enum_type.description.clone(),
        name: enum_name,
        directives: Default::default(),
        values: Default::default(),
    }))
}

fn copy_input_object_type_stub(
    input_object_name: Name,
    input_object: &Node<InputObjectType>,
) -> ExtendedType {
    ExtendedType::InputObject(Node::new(InputObjectType {
        description: input_object.description.clone(),
        name: input_object_name,
        directives: Default::default(),
        fields: Default::default(),
    }))
}

fn copy_interface_type_stub(interface_name: Name, interface: &Node<InterfaceType>) -> ExtendedType {
    ExtendedType::Interface(Node::new(InterfaceType {
        description: interface.description.clone(),
        name: interface_name,
        directives: Default::default(),
        fields: copy_fields(&**interface),
        implements_interfaces: interface.implements_interfaces.clone(),
    }))
}

fn copy_object_type_stub(
    object_name: Name,
    object: &Node<ObjectType>,
    is_interface_object: bool,
) -> ExtendedType {
    if is_interface_object {
        ExtendedType::Interface(Node::new(InterfaceType {
            description: object.description.clone(),
            name: object_name,
            directives: Default::default(),
            fields: copy_fields(&**object),
            implements_interfaces: object.implements_interfaces.clone(),
        }))
    } else {
        ExtendedType::Object(Node::new(ObjectType {
            description: object.description.clone(),
            name: object_name,
            directives: Default::default(),
            fields: copy_fields(&**object),
            implements_interfaces: object.implements_interfaces.clone(),
        }))
    }
}

trait FieldedType {
    fn fields(&self) -> &IndexMap<Name, Component<FieldDefinition>>;
}

impl FieldedType for ObjectType {
    fn fields(&self) -> &IndexMap<Name, Component<FieldDefinition>> {
        &self.fields
    }
}

impl FieldedType for InterfaceType {
    fn fields(&self) -> &IndexMap<Name, Component<FieldDefinition>> {
        &self.fields
    }
}

fn copy_fields<T: FieldedType>(ty: &T) -> IndexMap<Name, Component<FieldDefinition>> {
    let mut new_fields: IndexMap<Name, Component<FieldDefinition>> = Default::default();
    for (field_name, field) in ty.fields() {
        // skip federation built-in queries
        if field_name.as_str() == "_service" || field_name.as_str() == "_entities" {
            continue;
        }
        new_fields.insert(field_name.clone(), field_stub(field));
    }
    new_fields
}

/// A supergraph field copied from a subgraph field: same signature, no
/// directives (subgraph directives are either carried explicitly or dropped).
fn field_stub(field: &Component<FieldDefinition>) -> Component<FieldDefinition> {
    let args: Vec<Node<InputValueDefinition>> = field
        .arguments
        .iter()
        .map(|a| {
            Node::new(InputValueDefinition {
                name: a.name.clone(),
                description: a.description.clone(),
                directives: Default::default(),
                ty: a.ty.clone(),
                default_value: a.default_value.clone(),
            })
        })
        .collect();
    Component::new(FieldDefinition {
        name: field.name.clone(),
        description: field.description.clone(),
        directives: Default::default(),
        arguments: args,
        ty: field.ty.clone(),
    })
}

fn copy_union_type(union_name: Name, description: Option<Node<str>>) -> ExtendedType {
    ExtendedType::Union(Node::new(UnionType {
        description,
        name: union_name,
        directives: Default::default(),
        members: Default::default(),
    }))
}

fn tag_applied_directive(tag: &str) -> Directive {
    Directive {
        name: name!("tag"),
        arguments: vec![Node::new(Argument {
            name: name!("name"),
            value: Node::new(Value::String(tag.to_string())),
        })],
    }
}

fn join_type_applied_directive<'a>(
    subgraph_name: Name,
    key_directives: impl Iterator<Item = &'a Component<Directive>> + Sized,
    is_interface_object: bool,
) -> Vec<Component<Directive>> {
    let mut join_type_directive = Directive {
        name: name!("join__type"),
        arguments: vec![Node::new(Argument {
            name: name!("graph"),
            value: Node::new(Value::Enum(subgraph_name)),
        })],
    };
    if is_interface_object {
        join_type_directive.arguments.push(Node::new(Argument {
            name: name!("isInterfaceObject"),
            value: Node::new(Value::Boolean(is_interface_object)),
        }));
    }

    let mut result = vec![];
    for key_directive in key_directives {
        let Some(field_set) = directive_string_arg_value(key_directive, &name!("fields")) else {
            continue;
        };
        let mut join_type_directive_with_key = join_type_directive.clone();
        join_type_directive_with_key
            .arguments
            .push(Node::new(Argument {
                name: name!("key"),
                value: Node::new(Value::String(field_set.to_string())),
            }));

        let resolvable =
            directive_bool_arg_value(key_directive, &name!("resolvable")).unwrap_or(true);
        if !resolvable {
            join_type_directive_with_key
                .arguments
                .push(Node::new(Argument {
                    name: name!("resolvable"),
                    value: Node::new(Value::Boolean(false)),
                }));
        }
        result.push(join_type_directive_with_key)
    }
    if result.is_empty() {
        result.push(join_type_directive)
    }
    result
        .into_iter()
        .map(Component::new)
        .collect::<Vec<Component<Directive>>>()
}

fn join_type_implements(subgraph_name: Name, intf_name: &ComponentName) -> Component<Directive> {
    Component::new(Directive {
        name: name!("join__implements"),
        arguments: vec![
            Node::new(Argument {
                name: name!("graph"),
                value: Node::new(Value::Enum(subgraph_name)),
            }),
            Node::new(Argument {
                name: name!("interface"),
                value: Node::new(Value::String(intf_name.name.to_string())),
            }),
        ],
    })
}

fn directive_arg_value<'a>(directive: &'a Directive, arg_name: &Name) -> Option<&'a Value> {
    directive
        .arguments
        .iter()
        .find(|arg| arg.name == *arg_name)
        .map(|arg| arg.value.as_ref())
}

fn directive_string_arg_value<'a>(directive: &'a Directive, arg_name: &Name) -> Option<&'a str> {
    match directive_arg_value(directive, arg_name) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

fn directive_bool_arg_value(directive: &Directive, arg_name: &Name) -> Option<bool> {
    match directive_arg_value(directive, arg_name) {
        Some(Value::Boolean(value)) => Some(*value),
        _ => None,
    }
}

fn add_core_feature_link(supergraph: &mut Schema) {
    // @link(url: "https://specs.apollo.dev/link/v1.0")
    supergraph
        .schema_definition
        .make_mut()
        .directives
        .push(Component::new(Directive {
            name: name!("link"),
            arguments: vec![Node::new(Argument {
                name: name!("url"),
                value: Node::new(Value::String(
                    "https://specs.apollo.dev/link/v1.0".to_string(),
                )),
            })],
        }));

    let (name, link_purpose_enum) = link_purpose_enum_type();
    supergraph.types.insert(name, link_purpose_enum.into());

    // scalar Import
    let link_import_name = name!("link__Import");
    let link_import_scalar = ExtendedType::Scalar(Node::new(ScalarType {
        directives: Default::default(),
        name: link_import_name.clone(),
        description: None,
    }));
    supergraph
        .types
        .insert(link_import_name, link_import_scalar);

    let link_directive_definition = link_directive_definition();
    supergraph
        .directive_definitions
        .insert(name!("link"), Node::new(link_directive_definition));
}

/// directive @link(url: String, as: String, for: link__Purpose, import: [link__Import]) repeatable on SCHEMA
fn link_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        name: name!("link"),
        description: None,
        arguments: vec![
            input_value(name!("url"), ty!(String).into()),
            input_value(name!("as"), ty!(String).into()),
            input_value(name!("for"), ty!(link__Purpose).into()),
            input_value(name!("import"), ty!([link__Import]).into()),
        ],
        locations: vec![DirectiveLocation::Schema],
        repeatable: true,
    }
}

fn input_value(name: Name, ty: Node<ast::Type>) -> Node<InputValueDefinition> {
    Node::new(InputValueDefinition {
        name,
        description: None,
        directives: Default::default(),
        ty,
        default_value: None,
    })
}

/// enum link__Purpose
fn link_purpose_enum_type() -> (Name, EnumType) {
    let link_purpose_name = name!("link__Purpose");
    let mut link_purpose_enum = EnumType {
        description: None,
        name: link_purpose_name.clone(),
        directives: Default::default(),
        values: Default::default(),
    };
    let link_purpose_security_value = EnumValueDefinition {
        description: Some(
            "SECURITY features provide metadata necessary to securely resolve fields.".into(),
        ),
        directives: Default::default(),
        value: name!("SECURITY"),
    };
    let link_purpose_execution_value = EnumValueDefinition {
        description: Some(
            "EXECUTION features provide metadata necessary for operation execution.".into(),
        ),
        directives: Default::default(),
        value: name!("EXECUTION"),
    };
    link_purpose_enum.values.insert(
        link_purpose_security_value.value.clone(),
        Component::new(link_purpose_security_value),
    );
    link_purpose_enum.values.insert(
        link_purpose_execution_value.value.clone(),
        Component::new(link_purpose_execution_value),
    );
    (link_purpose_name, link_purpose_enum)
}

fn add_core_feature_join(supergraph: &mut Schema, contexts: &[SubgraphContext<'_>]) {
    // @link(url: "https://specs.apollo.dev/join/v0.3", for: EXECUTION)
    supergraph
        .schema_definition
        .make_mut()
        .directives
        .push(Component::new(Directive {
            name: name!("link"),
            arguments: vec![
                Node::new(Argument {
                    name: name!("url"),
                    value: Node::new(Value::String(
                        "https://specs.apollo.dev/join/v0.3".to_string(),
                    )),
                }),
                Node::new(Argument {
                    name: name!("for"),
                    value: Node::new(Value::Enum(name!("EXECUTION"))),
                }),
            ],
        }));

    // scalar FieldSet
    let join_field_set_name = name!("join__FieldSet");
    let join_field_set_scalar = ExtendedType::Scalar(Node::new(ScalarType {
        directives: Default::default(),
        name: join_field_set_name.clone(),
        description: None,
    }));
    supergraph
        .types
        .insert(join_field_set_name, join_field_set_scalar);

    for definition in [
        join_graph_directive_definition(),
        join_type_directive_definition(),
        join_field_directive_definition(),
        join_implements_directive_definition(),
        join_union_member_directive_definition(),
        join_enum_value_directive_definition(),
    ] {
        supergraph
            .directive_definitions
            .insert(definition.name.clone(), Node::new(definition));
    }

    let (name, join_graph_enum_type) = join_graph_enum_type(contexts);
    supergraph.types.insert(name, join_graph_enum_type.into());
}

/// directive @tag(name: String!) repeatable, on anything that can be hidden by
/// a contract filter
fn add_core_feature_tag(supergraph: &mut Schema) {
    // @link(url: "https://specs.apollo.dev/tag/v0.3")
    supergraph
        .schema_definition
        .make_mut()
        .directives
        .push(Component::new(Directive {
            name: name!("link"),
            arguments: vec![Node::new(Argument {
                name: name!("url"),
                value: Node::new(Value::String(
                    "https://specs.apollo.dev/tag/v0.3".to_string(),
                )),
            })],
        }));

    let tag_directive_definition = DirectiveDefinition {
        name: name!("tag"),
        description: None,
        arguments: vec![input_value(name!("name"), ty!(String!).into())],
        locations: vec![
            DirectiveLocation::FieldDefinition,
            DirectiveLocation::Object,
            DirectiveLocation::Interface,
            DirectiveLocation::Union,
            DirectiveLocation::ArgumentDefinition,
            DirectiveLocation::Scalar,
            DirectiveLocation::Enum,
            DirectiveLocation::EnumValue,
            DirectiveLocation::InputObject,
            DirectiveLocation::InputFieldDefinition,
            DirectiveLocation::Schema,
        ],
        repeatable: true,
    };
    supergraph
        .directive_definitions
        .insert(name!("tag"), Node::new(tag_directive_definition));
}

/// directive @inaccessible on everything a contract filter may hide
fn add_core_feature_inaccessible(supergraph: &mut Schema) {
    // @link(url: "https://specs.apollo.dev/inaccessible/v0.2", for: EXECUTION)
    supergraph
        .schema_definition
        .make_mut()
        .directives
        .push(Component::new(Directive {
            name: name!("link"),
            arguments: vec![
                Node::new(Argument {
                    name: name!("url"),
                    value: Node::new(Value::String(
                        "https://specs.apollo.dev/inaccessible/v0.2".to_string(),
                    )),
                }),
                Node::new(Argument {
                    name: name!("for"),
                    value: Node::new(Value::Enum(name!("EXECUTION"))),
                }),
            ],
        }));

    let inaccessible_directive_definition = DirectiveDefinition {
        name: name!("inaccessible"),
        description: None,
        arguments: vec![],
        locations: vec![
            DirectiveLocation::FieldDefinition,
            DirectiveLocation::Object,
            DirectiveLocation::Interface,
            DirectiveLocation::Union,
            DirectiveLocation::ArgumentDefinition,
            DirectiveLocation::Scalar,
            DirectiveLocation::Enum,
            DirectiveLocation::EnumValue,
            DirectiveLocation::InputObject,
            DirectiveLocation::InputFieldDefinition,
        ],
        repeatable: false,
    };
    supergraph.directive_definitions.insert(
        name!("inaccessible"),
        Node::new(inaccessible_directive_definition),
    );
}

/// directive @join__enumValue(graph: join__Graph!) repeatable on ENUM_VALUE
fn join_enum_value_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        name: name!("join__enumValue"),
        description: None,
        arguments: vec![input_value(name!("graph"), ty!(join__Graph!).into())],
        locations: vec![DirectiveLocation::EnumValue],
        repeatable: true,
    }
}

/// directive @join__field(
///   graph: join__Graph,
///   requires: join__FieldSet,
///   provides: join__FieldSet,
///   type: String,
///   external: Boolean,
///   override: String,
///   usedOverridden: Boolean
/// ) repeatable on FIELD_DEFINITION | INPUT_FIELD_DEFINITION
fn join_field_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        name: name!("join__field"),
        description: None,
        arguments: vec![
            input_value(name!("graph"), ty!(join__Graph).into()),
            input_value(name!("requires"), ty!(join__FieldSet).into()),
            input_value(name!("provides"), ty!(join__FieldSet).into()),
            input_value(name!("type"), ty!(String).into()),
            input_value(name!("external"), ty!(Boolean).into()),
            input_value(name!("override"), ty!(String).into()),
            input_value(name!("usedOverridden"), ty!(Boolean).into()),
        ],
        locations: vec![
            DirectiveLocation::FieldDefinition,
            DirectiveLocation::InputFieldDefinition,
        ],
        repeatable: true,
    }
}

fn join_field_applied_directive(
    subgraph_name: Name,
    requires: Option<&str>,
    provides: Option<&str>,
    external: bool,
) -> Directive {
    let mut join_field_directive = Directive {
        name: name!("join__field"),
        arguments: vec![Node::new(Argument {
            name: name!("graph"),
            value: Node::new(Value::Enum(subgraph_name)),
        })],
    };
    if let Some(required_fields) = requires {
        join_field_directive.arguments.push(Node::new(Argument {
            name: name!("requires"),
            value: Node::new(Value::String(required_fields.to_string())),
        }));
    }
    if let Some(provided_fields) = provides {
        join_field_directive.arguments.push(Node::new(Argument {
            name: name!("provides"),
            value: Node::new(Value::String(provided_fields.to_string())),
        }));
    }
    if external {
        join_field_directive.arguments.push(Node::new(Argument {
            name: name!("external"),
            value: Node::new(Value::Boolean(external)),
        }));
    }
    join_field_directive
}

/// directive @join__graph(name: String!, url: String!) on ENUM_VALUE
fn join_graph_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        name: name!("join__graph"),
        description: None,
        arguments: vec![
            input_value(name!("name"), ty!(String!).into()),
            input_value(name!("url"), ty!(String!).into()),
        ],
        locations: vec![DirectiveLocation::EnumValue],
        repeatable: false,
    }
}

/// directive @join__implements(graph: join__Graph!, interface: String!) repeatable on INTERFACE | OBJECT
fn join_implements_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        name: name!("join__implements"),
        description: None,
        arguments: vec![
            input_value(name!("graph"), ty!(join__Graph!).into()),
            input_value(name!("interface"), ty!(String!).into()),
        ],
        locations: vec![DirectiveLocation::Interface, DirectiveLocation::Object],
        repeatable: true,
    }
}

/// directive @join__type(
///   graph: join__Graph!,
///   key: join__FieldSet,
///   extension: Boolean! = false,
///   resolvable: Boolean! = true,
///   isInterfaceObject: Boolean! = false
/// ) repeatable on ENUM | INPUT_OBJECT | INTERFACE | OBJECT | SCALAR | UNION
fn join_type_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        name: name!("join__type"),
        description: None,
        arguments: vec![
            input_value(name!("graph"), ty!(join__Graph!).into()),
            input_value(name!("key"), ty!(join__FieldSet).into()),
            Node::new(InputValueDefinition {
                name: name!("extension"),
                description: None,
                directives: Default::default(),
                ty: ty!(Boolean!).into(),
                default_value: Some(Node::new(Value::Boolean(false))),
            }),
            Node::new(InputValueDefinition {
                name: name!("resolvable"),
                description: None,
                directives: Default::default(),
                ty: ty!(Boolean!).into(),
                default_value: Some(Node::new(Value::Boolean(true))),
            }),
            Node::new(InputValueDefinition {
                name: name!("isInterfaceObject"),
                description: None,
                directives: Default::default(),
                ty: ty!(Boolean!).into(),
                default_value: Some(Node::new(Value::Boolean(false))),
            }),
        ],
        locations: vec![
            DirectiveLocation::Enum,
            DirectiveLocation::InputObject,
            DirectiveLocation::Interface,
            DirectiveLocation::Object,
            DirectiveLocation::Scalar,
            DirectiveLocation::Union,
        ],
        repeatable: true,
    }
}

/// directive @join__unionMember(graph: join__Graph!, member: String!) repeatable on UNION
fn join_union_member_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        name: name!("join__unionMember"),
        description: None,
        arguments: vec![
            input_value(name!("graph"), ty!(join__Graph!).into()),
            input_value(name!("member"), ty!(String!).into()),
        ],
        locations: vec![DirectiveLocation::Union],
        repeatable: true,
    }
}

/// enum join__Graph, one value per subgraph
fn join_graph_enum_type(contexts: &[SubgraphContext<'_>]) -> (Name, EnumType) {
    let join_graph_enum_name = name!("join__Graph");
    let mut join_graph_enum_type = EnumType {
        description: None,
        name: join_graph_enum_name.clone(),
        directives: Default::default(),
        values: Default::default(),
    };
    for context in contexts {
        let join_graph_applied_directive = Directive {
            name: name!("join__graph"),
            arguments: vec![
                Node::new(Argument {
                    name: name!("name"),
                    value: Node::new(Value::String(context.subgraph.name.clone())),
                }),
                Node::new(Argument {
                    name: name!("url"),
                    value: Node::new(Value::String(context.subgraph.url.clone())),
                }),
            ],
        };
        let graph = EnumValueDefinition {
            description: None,
            directives: ast::DirectiveList(vec![Node::new(join_graph_applied_directive)]),
            value: context.enum_value.clone(),
        };
        join_graph_enum_type
            .values
            .insert(graph.value.clone(), Component::new(graph));
    }
    (join_graph_enum_name, join_graph_enum_type)
}

fn parse_keys<'a>(
    directives: impl Iterator<Item = &'a Component<Directive>> + Sized,
) -> std::collections::HashSet<&'a str> {
    directives
        .flat_map(|k| {
            directive_string_arg_value(k, &name!("fields"))
                .map(|field_set| field_set.split_whitespace())
                .into_iter()
                .flatten()
        })
        .collect()
}

fn merge_directive(
    supergraph_directives: &mut IndexMap<Name, Node<DirectiveDefinition>>,
    directive: &Node<DirectiveDefinition>,
) {
    if !supergraph_directives.contains_key(&directive.name) {
        supergraph_directives.insert(directive.name.clone(), directive.clone());
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn subgraph(name: &str, url: &str, sdl: &str) -> Subgraph {
        Subgraph::parse(name, url, sdl).unwrap()
    }

    #[test]
    fn merges_two_subgraphs_with_tags() {
        let products = subgraph(
            "products",
            "https://products.test",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@key", "@tag", "@inaccessible"])

              type Query {
                products: [Product]
                internalProducts: [Product] @tag(name: "internal")
              }

              type Product @key(fields: "sku") {
                sku: String!
                name: String
                cost: Int @inaccessible
              }
            "#,
        );
        let reviews = subgraph(
            "reviews",
            "https://reviews.test",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@key", "@tag"])

              type Product @key(fields: "sku") {
                sku: String!
                reviews: [Review]
              }

              type Review @tag(name: "public") {
                body: String
              }
            "#,
        );

        let result = merge_subgraphs(&[products, reviews]).unwrap();
        assert_snapshot!(result.schema.serialize(), @r###"
        schema @link(url: "https://specs.apollo.dev/link/v1.0") @link(url: "https://specs.apollo.dev/join/v0.3", for: EXECUTION) @link(url: "https://specs.apollo.dev/tag/v0.3") @link(url: "https://specs.apollo.dev/inaccessible/v0.2", for: EXECUTION) {
          query: Query
        }

        directive @link(url: String, as: String, for: link__Purpose, import: [link__Import]) repeatable on SCHEMA

        directive @join__graph(name: String!, url: String!) on ENUM_VALUE

        directive @join__type(graph: join__Graph!, key: join__FieldSet, extension: Boolean! = false, resolvable: Boolean! = true, isInterfaceObject: Boolean! = false) repeatable on ENUM | INPUT_OBJECT | INTERFACE | OBJECT | SCALAR | UNION

        directive @join__field(graph: join__Graph, requires: join__FieldSet, provides: join__FieldSet, type: String, external: Boolean, override: String, usedOverridden: Boolean) repeatable on FIELD_DEFINITION | INPUT_FIELD_DEFINITION

        directive @join__implements(graph: join__Graph!, interface: String!) repeatable on INTERFACE | OBJECT

        directive @join__unionMember(graph: join__Graph!, member: String!) repeatable on UNION

        directive @join__enumValue(graph: join__Graph!) repeatable on ENUM_VALUE

        directive @tag(name: String!) repeatable on FIELD_DEFINITION | OBJECT | INTERFACE | UNION | ARGUMENT_DEFINITION | SCALAR | ENUM | ENUM_VALUE | INPUT_OBJECT | INPUT_FIELD_DEFINITION | SCHEMA

        directive @inaccessible on FIELD_DEFINITION | OBJECT | INTERFACE | UNION | ARGUMENT_DEFINITION | SCALAR | ENUM | ENUM_VALUE | INPUT_OBJECT | INPUT_FIELD_DEFINITION

        enum link__Purpose {
          """
          SECURITY features provide metadata necessary to securely resolve fields.
          """
          SECURITY
          """EXECUTION features provide metadata necessary for operation execution."""
          EXECUTION
        }

        scalar link__Import

        scalar join__FieldSet

        enum join__Graph {
          PRODUCTS @join__graph(name: "products", url: "https://products.test")
          REVIEWS @join__graph(name: "reviews", url: "https://reviews.test")
        }

        type Query @join__type(graph: PRODUCTS) {
          products: [Product] @join__field(graph: PRODUCTS)
          internalProducts: [Product] @join__field(graph: PRODUCTS) @tag(name: "internal")
        }

        type Product @join__type(graph: PRODUCTS, key: "sku") @join__type(graph: REVIEWS, key: "sku") {
          sku: String!
          name: String @join__field(graph: PRODUCTS)
          cost: Int @join__field(graph: PRODUCTS) @inaccessible
          reviews: [Review] @join__field(graph: REVIEWS)
        }

        type Review @join__type(graph: REVIEWS) @tag(name: "public") {
          body: String
        }
        "###);
    }

    #[test]
    fn resolves_aliased_federation_directives() {
        let accounts = subgraph(
            "accounts",
            "https://accounts.test",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.0", import: [{ name: "@tag", as: "@label" }])

              type Query {
                me: User @label(name: "private")
              }

              type User {
                id: ID!
              }
            "#,
        );

        let result = merge_subgraphs(&[accounts]).unwrap();
        let schema = result.schema.into_inner();
        let ExtendedType::Object(query) = &schema.types["Query"] else {
            panic!("Query should be an object type");
        };
        let me = &query.fields["me"];
        let tag = me.directives.get_all("tag").next().unwrap();
        assert_eq!(
            tag.specified_argument_by_name("name").unwrap().as_str(),
            Some("private")
        );
        // the aliased name itself is not carried over
        assert!(!me.directives.has("label"));
    }

    #[test]
    fn carries_schema_level_tags_onto_the_supergraph() {
        let sdl = r#"
          extend schema
            @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag"])
            @tag(name: "team-a")

          type Query {
            hello: String
          }
        "#;
        let one = subgraph("one", "https://one.test", sdl);
        let two = subgraph("two", "https://two.test", sdl);

        let result = merge_subgraphs(&[one, two]).unwrap();
        let schema = result.schema.into_inner();
        let tags: Vec<_> = schema
            .schema_definition
            .directives
            .get_all("tag")
            .filter_map(|tag| tag.specified_argument_by_name("name")?.as_str())
            .collect();
        // both subgraphs declare the tag, the supergraph carries it once
        assert_eq!(tags, ["team-a"]);
        assert_eq!(crate::metadata::extract_tags(&schema), ["team-a"]);
    }

    #[test]
    fn merges_enums_unions_and_scalars() {
        let one = subgraph(
            "one",
            "",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag"])

              type Query {
                media: SearchResult
              }

              union SearchResult @tag(name: "search") = Book | Movie

              type Book { title: String }
              type Movie { title: String }

              scalar Date @tag(name: "scalars")

              enum Genre {
                FICTION @tag(name: "books")
                DRAMA
              }
            "#,
        );

        let result = merge_subgraphs(&[one]).unwrap();
        let schema = result.schema.into_inner();

        let ExtendedType::Union(search) = &schema.types["SearchResult"] else {
            panic!("SearchResult should be a union");
        };
        assert!(search.directives.has("tag"));
        assert_eq!(search.directives.get_all("join__unionMember").count(), 2);

        let ExtendedType::Scalar(date) = &schema.types["Date"] else {
            panic!("Date should be a scalar");
        };
        assert!(date.directives.has("join__type"));
        assert!(date.directives.has("tag"));

        let ExtendedType::Enum(genre) = &schema.types["Genre"] else {
            panic!("Genre should be an enum");
        };
        assert!(genre.values["FICTION"].directives.has("tag"));
        assert!(genre.values["DRAMA"].directives.has("join__enumValue"));
        assert!(!genre.values["DRAMA"].directives.has("tag"));
    }

    #[test]
    fn reports_field_type_conflicts() {
        let one = subgraph("one", "", "type Query { shared: Thing } type Thing { size: Int }");
        let two = subgraph("two", "", "type Thing { size: String }");

        let Err(failure) = merge_subgraphs(&[one, two]) else {
            panic!("conflicting field types should fail the merge");
        };
        assert!(failure.errors.iter().any(|e| e
            .message
            .contains("Field \"Thing.size\" has incompatible types across subgraphs")));
    }

    #[test]
    fn deduplicates_carried_tags() {
        let one = subgraph(
            "one",
            "",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag"])
              type Query { thing: Thing }
              type Thing @tag(name: "public") { id: ID }
            "#,
        );
        let two = subgraph(
            "two",
            "",
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@tag"])
              type Thing @tag(name: "public") @tag(name: "beta") { id: ID }
            "#,
        );

        let result = merge_subgraphs(&[one, two]).unwrap();
        let schema = result.schema.into_inner();
        let ExtendedType::Object(thing) = &schema.types["Thing"] else {
            panic!("Thing should be an object type");
        };
        let tags: Vec<_> = thing
            .directives
            .get_all("tag")
            .filter_map(|d| d.specified_argument_by_name("name")?.as_str())
            .collect();
        assert_eq!(tags, vec!["public", "beta"]);
    }
}
