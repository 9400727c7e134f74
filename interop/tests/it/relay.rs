use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use interop::{
    FlowOptions, FlowOutput, InteropError, run_interop_flow,
    error::FetchStep,
    relay::{PollingRelay, RelayClient, SignedRequest},
    view::{RequestOutcome, RequestState, RequestStatus},
};

use crate::{FakeGateway, FakeRelay, address, identity, local_query, request, view_for};

#[tokio::test]
async fn relay_failure_keeps_earlier_views() {
    let gateway = FakeGateway::default();
    let relay = FakeRelay {
        failures: HashMap::from([(address("b"), "remote network unreachable".to_owned())]),
        ..Default::default()
    };

    let error = run_interop_flow(
        &gateway,
        &relay,
        &identity(),
        &local_query(),
        &[1, 2, 3],
        &[request("a"), request("b"), request("c")],
        FlowOptions::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(error.views, vec![view_for(&address("a"))]);
    assert_eq!(error.error.step(), Some(FetchStep::DispatchToRelay));
    assert!(matches!(error.error.root(), InteropError::Relay(_)));
    assert!(error.to_string().contains("remote network unreachable"));
    // The third request is never attempted.
    assert_eq!(relay.calls(), 2);
    assert!(gateway.submissions().is_empty());
}

/// A relay that acknowledges every request and completes it on the second poll.
#[derive(Default)]
struct SlowRelay {
    polls: AtomicUsize,
}

#[async_trait]
impl RelayClient for SlowRelay {
    async fn send_request(&self, request: &SignedRequest) -> Result<String> {
        if request.signature.is_empty() {
            return Err(anyhow!("unsigned request"));
        }
        Ok(request.address.clone())
    }

    async fn get_request(&self, request_id: &str) -> Result<RequestState> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        let (status, outcome) = if poll % 2 == 0 {
            (RequestStatus::Pending, None)
        } else {
            (
                RequestStatus::Completed,
                Some(RequestOutcome::View(view_for(request_id))),
            )
        };
        Ok(RequestState {
            request_id: request_id.to_owned(),
            status: status as i32,
            outcome,
        })
    }
}

#[tokio::test]
async fn polling_relay_drives_flow() {
    let gateway = FakeGateway::default();
    let relay = PollingRelay::new(
        SlowRelay::default(),
        "localhost:9080",
        Duration::from_secs(5),
        Duration::from_millis(1),
    );

    let outcome = run_interop_flow(
        &gateway,
        &relay,
        &identity(),
        &local_query(),
        &[1, 2],
        &[request("a"), request("b")],
        FlowOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(relay.endpoint(), "localhost:9080");
    assert_eq!(outcome.views, vec![view_for(&address("a")), view_for(&address("b"))]);
    assert!(matches!(outcome.output, FlowOutput::Submitted(_)));
}
