use crate::errors::{FlowgateError, Result};
use envoy_types::pb::envoy::config::listener::v3::{
    filter::ConfigType, Filter, FilterChain, Listener,
};
use prost::Message;
use std::collections::HashSet;

use super::{cluster::validate_address, helpers::{encode_check, nested}};

pub fn validate_envoy_listener(listener: &Listener) -> Result<()> {
    encode_check(listener, "Invalid listener configuration")?;

    if listener.name.is_empty() {
        return Err(FlowgateError::validation_field("Listener name cannot be empty", "name"));
    }

    match &listener.address {
        Some(address) => validate_address(address)?,
        None => {
            return Err(FlowgateError::validation_field(
                "Listener address is required",
                "address",
            ))
        }
    }

    if listener.filter_chains.is_empty() {
        return Err(FlowgateError::validation_field(
            "At least one filter chain is required",
            "filter_chains",
        ));
    }

    // Envoy NACKs listeners whose filter chains cannot be told apart.
    let mut seen_matches = HashSet::new();
    for (index, filter_chain) in listener.filter_chains.iter().enumerate() {
        validate_filter_chain(filter_chain)
            .map_err(|e| nested(format!("Filter chain {}", index), e))?;

        let key = filter_chain.filter_chain_match.clone().unwrap_or_default().encode_to_vec();
        if !seen_matches.insert(key) {
            return Err(FlowgateError::validation_field(
                format!("Filter chain {} duplicates the match of an earlier filter chain", index),
                "filter_chains",
            ));
        }
    }

    Ok(())
}

fn validate_filter_chain(filter_chain: &FilterChain) -> Result<()> {
    if filter_chain.filters.is_empty() {
        return Err(FlowgateError::validation("At least one filter is required"));
    }

    for (index, filter) in filter_chain.filters.iter().enumerate() {
        validate_filter(filter).map_err(|e| nested(format!("Filter {}", index), e))?;
    }

    Ok(())
}

fn validate_filter(filter: &Filter) -> Result<()> {
    if filter.name.is_empty() {
        return Err(FlowgateError::validation("Filter name cannot be empty"));
    }

    match &filter.config_type {
        Some(ConfigType::TypedConfig(any)) if any.type_url.is_empty() => {
            Err(FlowgateError::validation("Filter typed config requires a type URL"))
        }
        Some(_) => Ok(()),
        None => Err(FlowgateError::validation("Filter configuration is required")),
    }
}
