use anyhow::Result;
use async_trait::async_trait;

/// Looks up the verification policy document of a security domain.
pub const GET_VERIFICATION_POLICY: &str = "GetVerificationPolicyBySecurityDomain";
/// Checks a base64 encoded view against the address it was requested for.
pub const VERIFY_VIEW: &str = "VerifyView";
/// Verifies the supplied views on-chain and invokes the local contract with them.
pub const WRITE_EXTERNAL_STATE: &str = "WriteExternalState";

/// A client of the local ledger's interop contract.
///
/// Implementations must be safe to share between independent flows.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Runs a read-only query.
    async fn evaluate(&self, function: &str, args: &[String]) -> Result<Vec<u8>>;

    /// Submits a state-changing transaction and waits for its result.
    async fn submit(&self, function: &str, args: &[String]) -> Result<Vec<u8>>;
}
