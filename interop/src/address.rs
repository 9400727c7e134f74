//! Canonical addresses for units of remote state.
//!
//! A query address has the form `<remote endpoint>/<network id>/<channel>:<contract>:<function>:<arg0>`
//! and a workflow address has the form `<remote endpoint>/<network id>/<cordapp address>#<cordapp id>.<flow id>:`.
//! The network segment selects a verification policy by security domain; the view segment is matched
//! against the policy's identifier patterns.

use serde::Serialize;

use crate::{
    error::{InteropError, Result},
    types::{FlowSpec, Query},
};

/// The three `/`-separated parts of an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedAddress {
    pub location_segment: String,
    pub network_segment: String,
    pub view_segment: String,
}

/// Builds a query address. Only the first call argument takes part in the address; callers that need
/// composite identifiers must encode them into that argument.
pub fn build_address(query: &Query, network_id: &str, remote_url: &str) -> String {
    let first_arg = query.args.first().map(String::as_str).unwrap_or_default();
    format!(
        "{remote_url}/{network_id}/{}:{}:{}:{first_arg}",
        query.channel, query.contract_name, query.function
    )
}

pub fn build_flow_address(flow: &FlowSpec, network_id: &str, remote_url: &str) -> String {
    format!(
        "{remote_url}/{network_id}/{}#{}.{}:",
        flow.cordapp_address, flow.cordapp_id, flow.flow_id
    )
}

pub fn parse_address(address: &str) -> Result<ParsedAddress> {
    let malformed = || InteropError::MalformedAddress(address.to_owned());

    let mut segments = address.split('/');
    let (Some(location), Some(network), Some(view), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(malformed());
    };
    if network.is_empty() || view.is_empty() {
        return Err(malformed());
    }

    Ok(ParsedAddress {
        location_segment: location.to_owned(),
        network_segment: network.to_owned(),
        view_segment: view.to_owned(),
    })
}
