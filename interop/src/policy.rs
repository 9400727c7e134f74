use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    address::parse_address,
    error::{InteropError, Result},
    gateway::{GET_VERIFICATION_POLICY, LedgerGateway},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierAccessPolicy {
    #[serde(rename = "type")]
    pub policy_type: String,
    #[serde(default)]
    pub criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub pattern: String,
    pub policy: IdentifierAccessPolicy,
}

/// The verification criteria of a security domain, keyed by view pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPolicy {
    pub security_domain: String,
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
}

impl VerificationPolicy {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(InteropError::PolicyDecode)
    }

    /// Finds the identifier governing `view_segment`.
    ///
    /// Identifiers are scanned in document order and the first one that either equals the view segment
    /// or is a valid wildcard matching it is selected. A longer wildcard appearing later in the document
    /// does not displace an earlier match.
    pub fn matching_identifier(&self, view_segment: &str) -> Option<&Identifier> {
        self.identifiers.iter().find(|identifier| {
            identifier.pattern == view_segment || is_match(&identifier.pattern, view_segment)
        })
    }

    /// The criteria for `view_segment`, or an empty list if no identifier matches.
    pub fn criteria_for(&self, view_segment: &str) -> Vec<String> {
        self.matching_identifier(view_segment)
            .map(|identifier| identifier.policy.criteria.clone())
            .unwrap_or_default()
    }
}

/// A pattern is valid if it has no `*`, or a single `*` as its last character.
pub fn valid_pattern(pattern: &str) -> bool {
    match pattern.matches('*').count() {
        0 => true,
        1 => pattern.ends_with('*'),
        _ => false,
    }
}

/// Checks `pattern` against `view_segment`.
///
/// A pattern without a star matches only an identical string. A pattern with a trailing star matches
/// any string containing the text before the star anywhere, so `org1*` matches `dept.org1.x`; it is a
/// containment test, not a prefix test.
pub fn is_match(pattern: &str, view_segment: &str) -> bool {
    if !valid_pattern(pattern) {
        return false;
    }
    match pattern.strip_suffix('*') {
        Some(stem) => view_segment.contains(stem),
        None => pattern == view_segment,
    }
}

/// Fetches the verification policy for the address's security domain from the ledger.
pub async fn fetch_policy<G: LedgerGateway + ?Sized>(
    gateway: &G,
    security_domain: &str,
) -> Result<VerificationPolicy> {
    let response = gateway
        .evaluate(GET_VERIFICATION_POLICY, &[security_domain.to_owned()])
        .await
        .map_err(|source| InteropError::Gateway {
            function: GET_VERIFICATION_POLICY,
            source,
        })?;

    if response.is_empty() {
        return Err(InteropError::PolicyNotFound {
            security_domain: security_domain.to_owned(),
        });
    }

    VerificationPolicy::from_json(&response)
}

/// Looks up the verification criteria that apply to `address`.
///
/// Returns an empty list if the domain's policy has no identifier matching the address; whether that
/// is acceptable is for the caller to decide.
pub async fn get_criteria_for_address<G: LedgerGateway + ?Sized>(
    gateway: &G,
    address: &str,
) -> Result<Vec<String>> {
    let parsed = parse_address(address)?;
    let policy = fetch_policy(gateway, &parsed.network_segment).await?;

    let criteria = policy.criteria_for(&parsed.view_segment);
    if criteria.is_empty() {
        warn!(
            %address,
            security_domain = %policy.security_domain,
            "no verification criteria match address"
        );
    }
    Ok(criteria)
}
