//! Acquisition of a single remote view.
//!
//! A request runs through the steps in [FetchStep] in order: the address is resolved, the verification
//! criteria are looked up on the local ledger, the request is signed and handed to the relay, and the
//! returned view is checked by the local ledger before anyone pays for a state-changing transaction.
//! There are no retries here; the first failing step ends the request.

use base64::{Engine as _, engine::general_purpose};
use tracing::*;

use crate::{
    address::parse_address,
    crypto::{Identity, generate_nonce, signed_message},
    error::{FetchStep, InteropError, Result},
    gateway::{LedgerGateway, VERIFY_VIEW},
    policy::get_criteria_for_address,
    relay::{RelayTransport, SignedRequest},
    types::InteropRequestSpec,
    view::View,
};

/// Wraps a step failure with its context and records it. This is the only place a fetch failure is
/// logged.
fn fail(step: FetchStep, address: &str, source: InteropError) -> InteropError {
    error!(%address, %step, error = %source, "remote view request failed");
    InteropError::Fetch {
        step,
        address: address.to_owned(),
        source: Box::new(source),
    }
}

pub fn build_signed_request(
    identity: &Identity,
    address: &str,
    policy_criteria: Vec<String>,
) -> Result<SignedRequest> {
    let nonce = generate_nonce();
    let signature = identity
        .credential
        .sign(&signed_message(address, &nonce))?;

    Ok(SignedRequest {
        address: address.to_owned(),
        policy_criteria,
        network_id: identity.network_id.clone(),
        certificate: identity.certificate.clone(),
        signature: general_purpose::STANDARD.encode(signature),
        nonce,
        org: identity.org.clone(),
    })
}

/// Asks the local ledger to check `view` against `address`.
pub async fn verify_view<G: LedgerGateway + ?Sized>(
    gateway: &G,
    view: &View,
    address: &str,
) -> Result<()> {
    gateway
        .evaluate(VERIFY_VIEW, &[view.to_base64(), address.to_owned()])
        .await
        .map_err(|source| InteropError::ViewVerification {
            address: address.to_owned(),
            source,
        })?;
    Ok(())
}

/// Fetches the view described by `request` through the relay and pre-verifies it on the local
/// ledger. Returns the view and the address it was requested under.
pub async fn fetch_and_verify<G, R>(
    gateway: &G,
    relay: &R,
    identity: &Identity,
    request: &InteropRequestSpec,
) -> Result<(View, String)>
where
    G: LedgerGateway + ?Sized,
    R: RelayTransport + ?Sized,
{
    let address = request.resolve_address();
    parse_address(&address).map_err(|e| fail(FetchStep::ResolveAddress, &address, e))?;

    let policy_criteria = get_criteria_for_address(gateway, &address)
        .await
        .map_err(|e| fail(FetchStep::LookupPolicy, &address, e))?;

    let signed = build_signed_request(identity, &address, policy_criteria)
        .map_err(|e| fail(FetchStep::Sign, &address, e))?;
    debug!(
        %address,
        criteria = ?signed.policy_criteria,
        network_id = %signed.network_id,
        org = %signed.org,
        nonce = %signed.nonce,
        "dispatching signed request to relay"
    );

    let response = relay
        .process_request(&signed)
        .await
        .map_err(|e| fail(FetchStep::DispatchToRelay, &address, InteropError::Relay(e)))?;
    let view = response.into_view();

    verify_view(gateway, &view, &address)
        .await
        .map_err(|e| fail(FetchStep::VerifyLocally, &address, e))?;

    info!(%address, protocol = ?view.protocol(), "fetched and verified remote view");
    Ok((view, address))
}
