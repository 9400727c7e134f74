use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::*;

use crate::view::{RequestOutcome, RequestState, RequestStatus, View};

/// A request for a remote view, signed by the caller.
///
/// The signature covers exactly `address ++ nonce`, so a request can not be replayed with a different
/// nonce or redirected to another address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedRequest {
    pub address: String,
    pub policy_criteria: Vec<String>,
    pub network_id: String,
    /// PEM-encoded certificate of the requester.
    pub certificate: String,
    pub signature: String,
    pub nonce: String,
    pub org: String,
}

#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub request_id: String,
    view: View,
}

impl RelayResponse {
    pub fn new(request_id: String, view: View) -> Self {
        RelayResponse { request_id, view }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn into_view(self) -> View {
        self.view
    }
}

/// Carries a request to the remote network and waits until a view, or an error, comes back.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn process_request(&self, request: &SignedRequest) -> Result<RelayResponse>;
}

/// The two calls a local relay exposes to its clients.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Hands the request to the relay and returns the request id it was accepted under.
    async fn send_request(&self, request: &SignedRequest) -> Result<String>;

    async fn get_request(&self, request_id: &str) -> Result<RequestState>;
}

/// A [RelayTransport] which submits the request once and then polls its state until the relay reports
/// completion, an error, or `timeout` elapses.
#[derive(Debug, Clone)]
pub struct PollingRelay<C> {
    client: C,
    endpoint: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl<C: RelayClient> PollingRelay<C> {
    pub fn new(client: C, endpoint: &str, timeout: Duration, poll_interval: Duration) -> Self {
        PollingRelay {
            client,
            endpoint: endpoint.to_owned(),
            timeout,
            poll_interval,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn poll(&self, request_id: &str) -> Result<View> {
        loop {
            let state = self.client.get_request(request_id).await?;
            match state.status() {
                RequestStatus::Completed => {
                    return match state.outcome {
                        Some(RequestOutcome::View(view)) => Ok(view),
                        _ => Err(anyhow!("request {request_id} completed without a view")),
                    };
                }
                RequestStatus::Error => {
                    let message = match state.outcome {
                        Some(RequestOutcome::Error(message)) => message,
                        _ => "unknown error".to_owned(),
                    };
                    return Err(anyhow!("request {request_id} failed at relay: {message}"));
                }
                RequestStatus::PendingAck | RequestStatus::Pending => {}
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn exchange(&self, request: &SignedRequest) -> Result<RelayResponse> {
        let request_id = self.client.send_request(request).await?;
        debug!(
            endpoint = %self.endpoint,
            %request_id,
            address = %request.address,
            "relay accepted request"
        );

        let view = self.poll(&request_id).await?;
        Ok(RelayResponse::new(request_id, view))
    }
}

#[async_trait]
impl<C: RelayClient> RelayTransport for PollingRelay<C> {
    /// The whole exchange, including every call into the client, is bounded by `timeout`.
    async fn process_request(&self, request: &SignedRequest) -> Result<RelayResponse> {
        match timeout(self.timeout, self.exchange(request)).await {
            Ok(response) => response,
            Err(_) => Err(anyhow!(
                "timed out after {:?} waiting for {} at {}",
                self.timeout,
                request.address,
                self.endpoint
            )),
        }
    }
}
