use serde::{Deserialize, Serialize};

use crate::address::build_address;

/// A local or remote contract invocation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub contract_name: String,
    pub channel: String,
    #[serde(rename = "ccFunc")]
    pub function: String,
    #[serde(rename = "ccArgs", default)]
    pub args: Vec<String>,
}

/// A workflow (flow) invocation on a remote network, addressed by cordapp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSpec {
    pub cordapp_address: String,
    pub cordapp_id: String,
    pub flow_id: String,
    #[serde(default)]
    pub flow_args: Vec<String>,
}

/// Describes one remote view that the caller wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteropRequestSpec {
    pub network_id: String,
    pub remote_endpoint: String,
    pub chaincode_id: String,
    pub channel_id: String,
    pub chaincode_func: String,
    #[serde(default)]
    pub cc_args: Vec<String>,
    /// A precomputed address. When present it is used verbatim instead of the derived one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl InteropRequestSpec {
    /// The remote query this request targets.
    pub fn query(&self) -> Query {
        Query {
            contract_name: self.chaincode_id.clone(),
            channel: self.channel_id.clone(),
            function: self.chaincode_func.clone(),
            args: self.cc_args.clone(),
        }
    }

    pub fn resolve_address(&self) -> String {
        match self.address.as_deref() {
            Some(address) if !address.is_empty() => address.to_owned(),
            _ => build_address(&self.query(), &self.network_id, &self.remote_endpoint),
        }
    }
}
