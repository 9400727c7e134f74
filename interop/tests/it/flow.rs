use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose};
use interop::{
    FlowOptions, FlowOutput, InteropError, run_interop_flow,
    crypto::signed_message,
    error::FetchStep,
    gateway::{GET_VERIFICATION_POLICY, VERIFY_VIEW, WRITE_EXTERNAL_STATE},
};

use crate::{
    FakeGateway, FakeRelay, address, identity, local_query, request, view_for,
};

#[tokio::test]
async fn mismatched_argument_count_fails_before_any_call() {
    let gateway = FakeGateway::default();
    let relay = FakeRelay::default();

    let error = run_interop_flow(
        &gateway,
        &relay,
        &identity(),
        &local_query(),
        &[1, 2],
        &[request("a")],
        FlowOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        error.error,
        InteropError::ArgumentCountMismatch {
            indices: 2,
            requests: 1
        }
    ));
    assert!(error.views.is_empty());
    assert_eq!(gateway.calls(), 0);
    assert_eq!(relay.calls(), 0);
}

#[tokio::test]
async fn two_views_submitted_in_request_order() {
    let gateway = FakeGateway::default();
    let relay = FakeRelay::default();

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

    assert_eq!(outcome.views, vec![view_for(&address("a")), view_for(&address("b"))]);
    assert_eq!(outcome.addresses, vec![address("a"), address("b")]);
    assert_eq!(outcome.output, FlowOutput::Submitted(b"committed".to_vec()));

    assert_eq!(gateway.evaluations_of(GET_VERIFICATION_POLICY), 2);
    assert_eq!(gateway.evaluations_of(VERIFY_VIEW), 2);

    let submissions = gateway.submissions();
    assert_eq!(submissions.len(), 1);
    let (function, args) = &submissions[0];
    assert_eq!(function, WRITE_EXTERNAL_STATE);
    assert_eq!(args.len(), 7);
    assert_eq!(args[0], "simplestate");
    assert_eq!(args[1], "mychannel");
    assert_eq!(args[2], "CreateFromRemote");
    assert_eq!(args[3], r#"["local-key","",""]"#);
    assert_eq!(args[4], "[1,2]");

    let addresses: Vec<String> = serde_json::from_str(&args[5]).unwrap();
    assert_eq!(addresses, vec![address("a"), address("b")]);
    let views: Vec<String> = serde_json::from_str(&args[6]).unwrap();
    assert_eq!(
        views,
        vec![
            view_for(&address("a")).to_base64(),
            view_for(&address("b")).to_base64()
        ]
    );
}

#[tokio::test]
async fn relay_requests_are_signed_with_criteria() {
    let gateway = FakeGateway::default();
    let relay = FakeRelay::default();
    let identity = identity();

    run_interop_flow(
        &gateway,
        &relay,
        &identity,
        &local_query(),
        &[1],
        &[request("a")],
        FlowOptions::default(),
    )
    .await
    .unwrap();

    let requests = relay.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.address, address("a"));
    assert_eq!(sent.policy_criteria, vec!["Org1MSP", "Org2MSP"]);
    assert_eq!(sent.network_id, "network2");
    assert_eq!(sent.org, "Org1MSP");
    assert_eq!(sent.certificate, identity.certificate);

    let signature = general_purpose::STANDARD.decode(&sent.signature).unwrap();
    identity
        .credential
        .verify(&signed_message(&sent.address, &sent.nonce), &signature)
        .unwrap();
}

#[tokio::test]
async fn verification_failure_of_second_view_returns_first() {
    let gateway = FakeGateway::rejecting(&address("b"));
    let relay = FakeRelay::default();

    let error = run_interop_flow(
        &gateway,
        &relay,
        &identity(),
        &local_query(),
        &[1, 2],
        &[request("a"), request("b")],
        FlowOptions::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(error.views, vec![view_for(&address("a"))]);
    assert_eq!(error.error.step(), Some(FetchStep::VerifyLocally));
    assert!(matches!(
        error.error.root(),
        InteropError::ViewVerification { address: a, .. } if *a == address("b")
    ));
    assert!(gateway.submissions().is_empty());
    assert_eq!(relay.calls(), 2);
}

#[tokio::test]
async fn return_views_only_skips_submission() {
    let gateway = FakeGateway::default();
    let relay = FakeRelay::default();

    let outcome = run_interop_flow(
        &gateway,
        &relay,
        &identity(),
        &local_query(),
        &[1, 2],
        &[request("a"), request("b")],
        FlowOptions {
            return_views_only: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(gateway.submissions().is_empty());
    let FlowOutput::Deferred(encoded) = outcome.output else {
        panic!("expected deferred output");
    };
    let args: Vec<String> = serde_json::from_slice(&encoded).unwrap();
    assert_eq!(args.len(), 7);
    assert_eq!(args[0], "simplestate");
    assert_eq!(args[4], "[1,2]");
    let addresses: Vec<String> = serde_json::from_str(&args[5]).unwrap();
    assert_eq!(addresses, vec![address("a"), address("b")]);
}

#[tokio::test]
async fn concurrent_fetches_keep_request_order() {
    let gateway = FakeGateway::default();
    let relay = FakeRelay::default();
    let keys = ["a", "b", "c", "d", "e"];
    let requests: Vec<_> = keys.iter().map(|k| request(k)).collect();

    let outcome = run_interop_flow(
        &gateway,
        &relay,
        &identity(),
        &local_query(),
        &[0, 1, 2, 3, 4],
        &requests,
        FlowOptions {
            return_views_only: true,
            max_concurrent_fetches: 3,
        },
    )
    .await
    .unwrap();

    let expected: Vec<String> = keys.iter().map(|k| address(k)).collect();
    assert_eq!(outcome.addresses, expected);
    assert_eq!(
        outcome.views,
        expected.iter().map(|a| view_for(a)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn concurrent_failure_keeps_views_before_it() {
    let gateway = FakeGateway::default();
    let relay = FakeRelay {
        failures: HashMap::from([(address("b"), "remote network unreachable".to_owned())]),
        ..Default::default()
    };
    let requests: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|k| request(k)).collect();

    let error = run_interop_flow(
        &gateway,
        &relay,
        &identity(),
        &local_query(),
        &[0, 1, 2, 3, 4],
        &requests,
        FlowOptions {
            return_views_only: false,
            max_concurrent_fetches: 3,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(error.views, vec![view_for(&address("a"))]);
    assert_eq!(error.error.step(), Some(FetchStep::DispatchToRelay));
    assert!(matches!(error.error.root(), InteropError::Relay(_)));
    assert!(gateway.submissions().is_empty());
}

#[tokio::test]
async fn missing_policy_aborts_flow() {
    let gateway = FakeGateway::default();
    let relay = FakeRelay::default();
    let mut unknown = request("a");
    unknown.network_id = "network9".to_owned();

    let error = run_interop_flow(
        &gateway,
        &relay,
        &identity(),
        &local_query(),
        &[1],
        &[unknown],
        FlowOptions::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(error.error.step(), Some(FetchStep::LookupPolicy));
    assert!(matches!(
        error.error.root(),
        InteropError::PolicyNotFound { security_domain } if security_domain == "network9"
    ));
    assert_eq!(relay.calls(), 0);
}
