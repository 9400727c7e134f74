//! Runs remote view requests for a local transaction and assembles the arguments that let the local
//! ledger verify all views and invoke its contract atomically.

use futures::{StreamExt, stream};
use serde::Serialize;
use tracing::*;

use crate::{
    crypto::Identity,
    error::{FlowError, InteropError},
    fetch::fetch_and_verify,
    gateway::{LedgerGateway, WRITE_EXTERNAL_STATE},
    relay::RelayTransport,
    types::{InteropRequestSpec, Query},
    view::View,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowOptions {
    /// Return the assembled arguments instead of submitting them.
    pub return_views_only: bool,
    /// How many remote views may be requested at once. Results always keep the request order.
    pub max_concurrent_fetches: usize,
}

impl Default for FlowOptions {
    fn default() -> Self {
        FlowOptions {
            return_views_only: false,
            max_concurrent_fetches: 1,
        }
    }
}

/// The arguments of a `WriteExternalState` transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionArgs {
    pub contract_name: String,
    pub channel: String,
    pub function: String,
    /// JSON array of the local invocation's arguments.
    pub args: String,
    /// JSON array of the positions in `args` that the views replace.
    pub arg_indices: String,
    /// JSON array of view addresses.
    pub addresses: String,
    /// JSON array of base64 encoded views.
    pub views: String,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, InteropError> {
    serde_json::to_string(value).map_err(InteropError::Serialization)
}

impl TransactionArgs {
    pub fn new(
        local: &Query,
        arg_indices: &[usize],
        addresses: &[String],
        views_base64: &[String],
    ) -> Result<Self, InteropError> {
        Ok(TransactionArgs {
            contract_name: local.contract_name.clone(),
            channel: local.channel.clone(),
            function: local.function.clone(),
            args: to_json(&local.args)?,
            arg_indices: to_json(arg_indices)?,
            addresses: to_json(addresses)?,
            views: to_json(views_base64)?,
        })
    }

    pub fn into_vec(self) -> Vec<String> {
        vec![
            self.contract_name,
            self.channel,
            self.function,
            self.args,
            self.arg_indices,
            self.addresses,
            self.views,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutput {
    /// The JSON encoded argument list, left for the caller to submit.
    Deferred(Vec<u8>),
    /// The result of the `WriteExternalState` transaction.
    Submitted(Vec<u8>),
}

#[derive(Debug)]
pub struct FlowOutcome {
    pub views: Vec<View>,
    pub addresses: Vec<String>,
    pub output: FlowOutput,
}

/// Fetches a verified view for every request and uses them in one local transaction.
///
/// `arg_indices[i]` is the position in `local.args` that the view of `requests[i]` stands for, so the two
/// must have the same length. On failure the views fetched so far are returned with the error.
pub async fn run_interop_flow<G, R>(
    gateway: &G,
    relay: &R,
    identity: &Identity,
    local: &Query,
    arg_indices: &[usize],
    requests: &[InteropRequestSpec],
    options: FlowOptions,
) -> Result<FlowOutcome, FlowError>
where
    G: LedgerGateway + ?Sized,
    R: RelayTransport + ?Sized,
{
    if arg_indices.len() != requests.len() {
        let error = InteropError::ArgumentCountMismatch {
            indices: arg_indices.len(),
            requests: requests.len(),
        };
        error!(%error, "rejecting interop flow");
        return Err(FlowError::new(vec![], error));
    }

    let mut views = Vec::with_capacity(requests.len());
    let mut addresses = Vec::with_capacity(requests.len());
    let mut views_base64 = Vec::with_capacity(requests.len());

    let mut fetches = stream::iter(requests)
        .map(|request| fetch_and_verify(gateway, relay, identity, request))
        .buffered(options.max_concurrent_fetches.max(1));
    while let Some(fetched) = fetches.next().await {
        match fetched {
            Ok((view, address)) => {
                views_base64.push(view.to_base64());
                addresses.push(address);
                views.push(view);
            }
            // Already logged by the fetch.
            Err(error) => return Err(FlowError::new(views, error)),
        }
    }

    let args = match TransactionArgs::new(local, arg_indices, &addresses, &views_base64) {
        Ok(args) => args.into_vec(),
        Err(error) => {
            error!(%error, "failed to assemble transaction arguments");
            return Err(FlowError::new(views, error));
        }
    };

    let output = if options.return_views_only {
        match serde_json::to_vec(&args) {
            Ok(encoded) => FlowOutput::Deferred(encoded),
            Err(e) => {
                let error = InteropError::Serialization(e);
                error!(%error, "failed to encode transaction arguments");
                return Err(FlowError::new(views, error));
            }
        }
    } else {
        match gateway.submit(WRITE_EXTERNAL_STATE, &args).await {
            Ok(result) => FlowOutput::Submitted(result),
            Err(source) => {
                let error = InteropError::Gateway {
                    function: WRITE_EXTERNAL_STATE,
                    source,
                };
                error!(%error, "submitting remote views failed");
                return Err(FlowError::new(views, error));
            }
        }
    };

    info!(
        views = views.len(),
        contract = %local.contract_name,
        function = %local.function,
        deferred = options.return_views_only,
        "interop flow complete"
    );
    Ok(FlowOutcome {
        views,
        addresses,
        output,
    })
}
