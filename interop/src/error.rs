use std::fmt::{self, Display, Formatter};

use crate::view::View;

/// The step of a remote view request at which a failure was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStep {
    ResolveAddress,
    LookupPolicy,
    Sign,
    DispatchToRelay,
    VerifyLocally,
}

impl Display for FetchStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchStep::ResolveAddress => "resolve address",
            FetchStep::LookupPolicy => "lookup policy",
            FetchStep::Sign => "sign request",
            FetchStep::DispatchToRelay => "dispatch to relay",
            FetchStep::VerifyLocally => "verify view locally",
        };
        f.write_str(name)
    }
}

/// An error from acquiring or verifying a remote view.
///
/// Collaborator failures (the ledger gateway and the relay transport) are opaque and carried as
/// [anyhow::Error].
#[derive(thiserror::Error, Debug)]
pub enum InteropError {
    #[error("number of argument indices {indices} does not match number of view addresses {requests}")]
    ArgumentCountMismatch { indices: usize, requests: usize },
    #[error("malformed address {0:?}")]
    MalformedAddress(String),
    #[error("no verification policy for security domain {security_domain:?}")]
    PolicyNotFound { security_domain: String },
    #[error("failed to decode verification policy: {0}")]
    PolicyDecode(#[source] serde_json::Error),
    #[error("no PEM data found in signing key: {0}")]
    KeyDecode(String),
    #[error("failed to parse PKCS#8 private key: {0}")]
    KeyParse(String),
    #[error("failed to sign request: {0}")]
    Signing(#[source] k256::ecdsa::Error),
    #[error("relay error: {0:#}")]
    Relay(#[source] anyhow::Error),
    #[error("view verification failed for {address}: {source:#}")]
    ViewVerification {
        address: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("ledger gateway call {function} failed: {source:#}")]
    Gateway {
        function: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("{step} failed for {address}: {source}")]
    Fetch {
        step: FetchStep,
        address: String,
        #[source]
        source: Box<InteropError>,
    },
}

impl InteropError {
    /// The underlying error, with any [InteropError::Fetch] context removed.
    pub fn root(&self) -> &InteropError {
        match self {
            InteropError::Fetch { source, .. } => source.root(),
            other => other,
        }
    }

    /// The step at which a wrapped failure happened, if known.
    pub fn step(&self) -> Option<FetchStep> {
        match self {
            InteropError::Fetch { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub type Result<T, E = InteropError> = std::result::Result<T, E>;

/// A failed flow. The views fetched before the failure are kept, in request order.
#[derive(Debug)]
pub struct FlowError {
    pub views: Vec<View>,
    pub error: InteropError,
}

impl FlowError {
    pub fn new(views: Vec<View>, error: InteropError) -> Self {
        FlowError { views, error }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl Display for FlowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "interop flow failed after {} view(s): {}",
            self.views.len(),
            self.error
        )
    }
}
