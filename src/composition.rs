//! End-to-end composition: parse subgraphs, compose the base supergraph,
//! derive the public SDL, then compose every requested contract variant.
//!
//! This is the crate's outward-facing entry point; the input and output
//! types serialize to the shapes the schema service exchanges over RPC.

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::api_schema::to_public_schema;
use crate::contracts::add_inaccessible_to_unreachable_types;
use crate::contracts::apply_tag_filter_on_subgraphs;
use crate::contracts::TagFilter;
use crate::error::CompositionError;
use crate::merge::merge_subgraphs;
use crate::metadata;
use crate::metadata::SchemaMetadata;
use crate::subgraph::Subgraph;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphInput {
    pub name: String,
    pub sdl: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInput {
    pub id: String,
    pub filter: FilterInput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterInput {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub remove_unreachable_types_from_public_api_schema: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CompositionResult {
    #[serde(rename_all = "camelCase")]
    Success {
        supergraph: String,
        sdl: String,
        #[serde(rename = "subgraphSDLs")]
        subgraph_sdls: IndexMap<String, String>,
        tags: Vec<String>,
        schema_metadata: SchemaMetadata,
        metadata_attributes: std::collections::BTreeMap<String, Vec<String>>,
        contracts: Vec<ContractResult>,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        errors: Vec<CompositionError>,
        contracts: Vec<ContractResult>,
    },
}

/// Outcome of one contract variant. `supergraph` and `sdl` are present
/// exactly when `errors` is empty.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractResult {
    pub id: String,
    pub supergraph: Option<String>,
    pub sdl: Option<String>,
    pub errors: Vec<CompositionError>,
}

impl ContractResult {
    fn failed(id: &str, errors: Vec<CompositionError>) -> Self {
        Self {
            id: id.to_string(),
            supergraph: None,
            sdl: None,
            errors,
        }
    }
}

const CONTRACT_SKIPPED_MESSAGE: &str =
    "Skipped contract composition, as default graph composition failed.";

pub fn compose(subgraphs: &[SubgraphInput], contracts: &[ContractInput]) -> CompositionResult {
    let mut parsed = Vec::with_capacity(subgraphs.len());
    let mut parse_errors = Vec::new();
    for input in subgraphs {
        tracing::debug!(subgraph = %input.name, "parsing subgraph");
        match Subgraph::parse(&input.name, &input.url, &input.sdl) {
            Ok(subgraph) => parsed.push(subgraph),
            Err(errors) => parse_errors.extend(errors),
        }
    }
    if !parse_errors.is_empty() {
        return CompositionResult::Failure {
            errors: parse_errors,
            contracts: skipped_contracts(contracts),
        };
    }

    let subgraph_sdls: IndexMap<String, String> = parsed
        .iter()
        .map(|subgraph| (subgraph.name.clone(), subgraph.schema.serialize().to_string()))
        .collect();

    for subgraph in &mut parsed {
        metadata::propagate_metadata(subgraph);
    }
    let schema_metadata = metadata::merge_metadata(
        parsed
            .iter()
            .map(|subgraph| metadata::extract_metadata(&subgraph.schema, &subgraph.name)),
    );
    let metadata_attributes = metadata::metadata_attributes(&schema_metadata);

    let success = match merge_subgraphs(&parsed) {
        Ok(success) => success,
        Err(failure) => {
            return CompositionResult::Failure {
                errors: failure.errors,
                contracts: skipped_contracts(contracts),
            };
        }
    };
    let public = match to_public_schema(&success.schema) {
        Ok(public) => public,
        Err(errors) => {
            return CompositionResult::Failure {
                errors,
                contracts: skipped_contracts(contracts),
            };
        }
    };
    let tags = metadata::extract_tags(&success.schema);

    let contract_results = contracts
        .iter()
        .map(|contract| compose_contract(contract, contracts, &parsed))
        .collect();

    CompositionResult::Success {
        supergraph: success.schema.serialize().to_string(),
        sdl: public.serialize().to_string(),
        subgraph_sdls,
        tags,
        schema_metadata,
        metadata_attributes,
        contracts: contract_results,
    }
}

fn skipped_contracts(contracts: &[ContractInput]) -> Vec<ContractResult> {
    contracts
        .iter()
        .map(|contract| {
            ContractResult::failed(
                &contract.id,
                vec![CompositionError::composition(
                    CONTRACT_SKIPPED_MESSAGE.to_string(),
                )],
            )
        })
        .collect()
}

fn compose_contract(
    contract: &ContractInput,
    all_contracts: &[ContractInput],
    subgraphs: &[Subgraph],
) -> ContractResult {
    tracing::debug!(contract = %contract.id, "composing contract");

    let mut errors = validate_contract_id(&contract.id, all_contracts);
    let filter = TagFilter::new(
        contract.filter.include.iter().cloned(),
        contract.filter.exclude.iter().cloned(),
    );
    errors.extend(filter.validate());
    if !errors.is_empty() {
        return ContractResult::failed(&contract.id, errors);
    }

    let filtered = apply_tag_filter_on_subgraphs(subgraphs, &filter);
    let success = match merge_subgraphs(&filtered) {
        Ok(success) => success,
        Err(failure) => return ContractResult::failed(&contract.id, failure.errors),
    };

    let supergraph = if contract.filter.remove_unreachable_types_from_public_api_schema {
        match add_inaccessible_to_unreachable_types(&success.schema) {
            Ok(pruned) => pruned,
            Err(errors) => return ContractResult::failed(&contract.id, errors),
        }
    } else {
        success.schema
    };
    let public = match to_public_schema(&supergraph) {
        Ok(public) => public,
        Err(errors) => return ContractResult::failed(&contract.id, errors),
    };

    ContractResult {
        id: contract.id.clone(),
        supergraph: Some(supergraph.serialize().to_string()),
        sdl: Some(public.serialize().to_string()),
        errors: Vec::new(),
    }
}

fn validate_contract_id(id: &str, all_contracts: &[ContractInput]) -> Vec<CompositionError> {
    let mut errors = Vec::new();
    if !(2..=64).contains(&id.len()) {
        errors.push(CompositionError::composition(format!(
            "Contract ID \"{id}\" must be 2 to 64 characters long."
        )));
    }
    if all_contracts
        .iter()
        .filter(|contract| contract.id == id)
        .count()
        > 1
    {
        errors.push(CompositionError::composition(format!(
            "Contract ID \"{id}\" is used more than once."
        )));
    }
    errors
}
