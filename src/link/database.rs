use std::sync::Arc;

use apollo_compiler::Schema;

use crate::link::DEFAULT_LINK_NAME;
use crate::link::Link;
use crate::link::LinksMetadata;

/// Extracts the `@link` applications of a schema definition (and its extensions).
///
/// This never fails: an application that cannot be parsed is skipped and
/// recorded in [`LinksMetadata::warnings`]. Subgraphs authored against older
/// tooling routinely carry odd `@link` arguments and a broken link should
/// degrade name resolution, not abort composition.
pub fn links_metadata(schema: &Schema) -> LinksMetadata {
    let mut metadata = LinksMetadata::default();
    let link_name = DEFAULT_LINK_NAME;
    let applications = schema
        .schema_definition
        .directives
        .get_all(link_name.as_str());
    for application in applications {
        let link = match Link::from_directive_application(application) {
            Ok(link) => Arc::new(link),
            Err(warning) => {
                tracing::warn!(%warning, "skipping malformed @link application");
                metadata.warnings.push(warning);
                continue;
            }
        };
        metadata.links.push(Arc::clone(&link));
        // When the same specification (or the same name) is linked more than
        // once, the last application wins.
        metadata
            .by_identity
            .insert(link.url.identity.clone(), Arc::clone(&link));
        metadata
            .by_name_in_schema
            .insert(link.spec_name_in_schema().clone(), Arc::clone(&link));
        for import in &link.imports {
            let element_map = if import.is_directive {
                &mut metadata.directives_by_imported_name
            } else {
                &mut metadata.types_by_imported_name
            };
            element_map.insert(
                import.imported_name().clone(),
                (Arc::clone(&link), Arc::clone(import)),
            );
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;
    use crate::link::Import;
    use crate::link::Purpose;
    use crate::link::spec::APOLLO_SPEC_DOMAIN;
    use crate::link::spec::Identity;
    use crate::link::spec::LinkVersion;
    use crate::link::spec::Version;

    #[test]
    fn computes_link_metadata() {
        let schema = r#"
          extend schema
            @link(url: "https://specs.apollo.dev/link/v1.0", import: ["Import"])
            @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@key", { name: "@tag", as: "@legacyTag" }])
            @link(url: "https://specs.example.dev/search/v0.2", as: "lookup")
            @link(url: "https://policies.example.net/auth/v1.0", for: SECURITY)

          type Query {
            x: Int
          }

          enum link__Purpose {
            SECURITY
            EXECUTION
          }

          scalar Import

          directive @link(url: String, as: String, import: [Import], for: link__Purpose) repeatable on SCHEMA
        "#;

        let schema = Schema::parse(schema, "testSchema").unwrap();

        let meta = links_metadata(&schema);
        assert!(meta.warnings().is_empty());
        let namespaces = meta
            .all_links()
            .iter()
            .map(|l| l.spec_name_in_schema())
            .collect::<Vec<_>>();
        assert_eq!(namespaces.len(), 4);
        assert_eq!(namespaces[0], "link");
        assert_eq!(namespaces[1], "federation");
        assert_eq!(namespaces[2], "lookup");
        assert_eq!(namespaces[3], "auth");

        let link_itself = meta.for_identity(&Identity::link_identity()).unwrap();
        assert_eq!(
            link_itself.imports.first().unwrap().as_ref(),
            &Import {
                element: name!("Import"),
                is_directive: false,
                alias: None
            }
        );

        let federation_link = meta
            .for_identity(&Identity {
                domain: APOLLO_SPEC_DOMAIN.to_string(),
                name: name!("federation"),
            })
            .unwrap();
        assert_eq!(federation_link.url.version, Version { major: 2, minor: 3 });
        assert_eq!(federation_link.purpose, None);

        let imports = &federation_link.imports;
        assert_eq!(imports.len(), 2);
        assert_eq!(
            imports.first().unwrap().as_ref(),
            &Import {
                element: name!("key"),
                is_directive: true,
                alias: None
            }
        );
        assert_eq!(
            imports.get(1).unwrap().as_ref(),
            &Import {
                element: name!("tag"),
                is_directive: true,
                alias: Some(name!("legacyTag"))
            }
        );

        let auth_link = meta
            .for_identity(&Identity {
                domain: "https://policies.example.net".to_string(),
                name: name!("auth"),
            })
            .unwrap();
        assert_eq!(auth_link.purpose, Some(Purpose::SECURITY));

        let import_origin = meta.source_link_of_type(&name!("Import")).unwrap();
        assert_eq!(import_origin.link.url.identity.name, "link");
        assert!(!import_origin.import.as_ref().unwrap().is_directive);
        assert_eq!(import_origin.import.as_ref().unwrap().alias, None);

        // Purpose is not imported, so it should only be accessible in fully
        // qualified form
        assert!(meta.source_link_of_type(&name!("Purpose")).is_none());

        let purpose_origin = meta.source_link_of_type(&name!("link__Purpose")).unwrap();
        assert_eq!(purpose_origin.link.url.identity.name, "link");
        assert_eq!(purpose_origin.import, None);

        let key_origin = meta.source_link_of_directive(&name!("key")).unwrap();
        assert_eq!(key_origin.link.url.identity.name, "federation");
        assert!(key_origin.import.as_ref().unwrap().is_directive);
        assert_eq!(key_origin.import.as_ref().unwrap().alias, None);

        // tag is imported under an alias, so "tag" itself should not match
        assert!(meta.source_link_of_directive(&name!("tag")).is_none());

        let tag_origin = meta.source_link_of_directive(&name!("legacyTag")).unwrap();
        assert_eq!(tag_origin.link.url.identity.name, "federation");
        assert_eq!(tag_origin.import.as_ref().unwrap().element, "tag");
        assert!(tag_origin.import.as_ref().unwrap().is_directive);
        assert_eq!(
            tag_origin.import.as_ref().unwrap().alias,
            Some(name!("legacyTag"))
        );
    }

    #[test]
    fn resolves_import_names() {
        let schema = r#"
          extend schema
            @link(url: "https://specs.apollo.dev/federation/v2.3", import: ["@key", { name: "@tag", as: "@legacyTag" }])

          type Query {
            x: Int
          }
        "#;

        let schema = Schema::parse(schema, "testSchema").unwrap();
        let meta = links_metadata(&schema);

        let federation = Identity::federation_identity();
        assert_eq!(meta.resolve_import_name(&federation, "@key"), "key");
        assert_eq!(meta.resolve_import_name(&federation, "@tag"), "legacyTag");
        assert_eq!(
            meta.resolve_import_name(&federation, "@inaccessible"),
            "federation__inaccessible"
        );
        assert_eq!(
            meta.resolve_import_name(&federation, "FieldSet"),
            "federation__FieldSet"
        );
        // a directive named like its spec resolves to the spec's name in schema
        assert_eq!(meta.resolve_import_name(&federation, "@federation"), "federation");
        // unlinked specs resolve to the bare element name
        assert_eq!(meta.resolve_import_name(&Identity::tag_identity(), "@tag"), "tag");
    }

    #[test]
    fn respects_spec_aliases_when_resolving() {
        let schema = r#"
          extend schema
            @link(url: "https://specs.apollo.dev/federation/v2.0", as: "fed")

          type Query {
            x: Int
          }
        "#;

        let schema = Schema::parse(schema, "testSchema").unwrap();
        let meta = links_metadata(&schema);

        let federation = Identity::federation_identity();
        assert_eq!(meta.resolve_import_name(&federation, "@tag"), "fed__tag");
        assert_eq!(meta.resolve_import_name(&federation, "FieldSet"), "fed__FieldSet");
    }

    #[test]
    fn federation_version_detection() {
        let fed2 = Schema::parse(
            r#"
              extend schema @link(url: "https://specs.apollo.dev/federation/v2.3")
              type Query { x: Int }
            "#,
            "fed2.graphqls",
        )
        .unwrap();
        let meta = links_metadata(&fed2);
        assert!(meta.supports_federation_v2());
        assert!(!meta.matches_implementation(&Identity::federation_identity(), &LinkVersion::Federation1));
        assert!(meta.matches_implementation(&Identity::federation_identity(), &LinkVersion::Any));
        assert!(meta.matches_implementation(
            &Identity::federation_identity(),
            &LinkVersion::Compatible(Version { major: 2, minor: 0 })
        ));
        assert!(!meta.matches_implementation(
            &Identity::federation_identity(),
            &LinkVersion::Exact(Version { major: 2, minor: 0 })
        ));

        let fed1 = Schema::parse("type Query { x: Int }", "fed1.graphqls").unwrap();
        let meta = links_metadata(&fed1);
        assert!(!meta.supports_federation_v2());
        assert!(meta.matches_implementation(&Identity::federation_identity(), &LinkVersion::Federation1));
        assert!(!meta.matches_implementation(&Identity::federation_identity(), &LinkVersion::Any));
    }

    #[test]
    fn duplicate_links_last_one_wins() {
        let schema = r#"
          extend schema
            @link(url: "https://specs.apollo.dev/federation/v2.0", import: ["@key"])
            @link(url: "https://specs.apollo.dev/federation/v2.3", import: [{ name: "@key", as: "@primaryKey" }])

          type Query { x: Int }
        "#;

        let schema = Schema::parse(schema, "testSchema").unwrap();
        let meta = links_metadata(&schema);

        assert_eq!(meta.all_links().len(), 2);
        let fed = meta.for_identity(&Identity::federation_identity()).unwrap();
        assert_eq!(fed.url.version, Version { major: 2, minor: 3 });
        assert_eq!(
            meta.resolve_import_name(&Identity::federation_identity(), "@key"),
            "primaryKey"
        );
    }

    mod link_import {
        use super::*;

        #[test]
        fn warns_on_malformed_values() {
            let schema = r#"
                extend schema @link(
                  url: "https://specs.apollo.dev/federation/v2.0",
                  import: [
                    2,
                    { scope: "bar" },
                    { name: "@key", rename: "foo"},
                    { name: 42 },
                    { as: "bar" },
                   ]
                )

                type Query {
                  q: Int
                }
            "#;

            let schema = Schema::parse(schema, "testSchema").unwrap();
            let meta = links_metadata(&schema);
            // the application is skipped entirely, with a diagnostic
            assert!(meta.all_links().is_empty());
            assert_eq!(meta.warnings().len(), 1);
            insta::assert_snapshot!(meta.warnings()[0], @r###"invalid use of @link in schema: invalid sub-value for @link(import:) argument: values should be either strings or input object values of the form { name: "<importedElement>", as: "<alias>" }."###);
        }

        #[test]
        fn warns_on_mismatch_between_name_and_alias() {
            let schema = r#"
                extend schema @link(
                  url: "https://specs.apollo.dev/federation/v2.0",
                  import: [
                    { name: "@key", as: "myKey" },
                    { name: "FieldSet", as: "@fieldSet" },
                  ]
                )

                type Query {
                  q: Int
                }
            "#;

            let schema = Schema::parse(schema, "testSchema").unwrap();
            let meta = links_metadata(&schema);
            assert!(meta.all_links().is_empty());
            assert_eq!(meta.warnings().len(), 1);
            insta::assert_snapshot!(meta.warnings()[0], @"invalid use of @link in schema: invalid alias 'myKey' for import name '@key': should start with '@' since the imported name does");
        }

        #[test]
        fn malformed_link_does_not_hide_other_links() {
            let schema = r#"
                extend schema
                  @link(url: "not a spec url")
                  @link(url: "https://specs.apollo.dev/federation/v2.0", import: ["@tag"])

                type Query {
                  q: Int
                }
            "#;

            let schema = Schema::parse(schema, "testSchema").unwrap();
            let meta = links_metadata(&schema);
            assert_eq!(meta.all_links().len(), 1);
            assert_eq!(meta.warnings().len(), 1);
            assert_eq!(
                meta.resolve_import_name(&Identity::federation_identity(), "@tag"),
                "tag"
            );
        }
    }
}
