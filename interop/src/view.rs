//! Protobuf messages exchanged with the relay.
//!
//! A [View] is an opaque piece of remote ledger state together with the proof material needed to
//! verify it. This crate never inspects `data`; it only encodes the view so it can be handed to the
//! local ledger.

use base64::{Engine as _, engine::general_purpose};
use prost::Message;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Protocol {
    Bitcoin = 0,
    Ethereum = 1,
    Fabric = 3,
    Corda = 4,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Meta {
    /// The ledger technology of the network that produced the view.
    #[prost(enumeration = "Protocol", tag = "1")]
    pub protocol: i32,
    #[prost(string, tag = "2")]
    pub timestamp: String,
    #[prost(string, tag = "3")]
    pub proof_type: String,
    #[prost(string, tag = "4")]
    pub serialization_format: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct View {
    #[prost(message, optional, tag = "1")]
    pub meta: Option<Meta>,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

impl View {
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.encode_to_vec())
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.meta
            .as_ref()
            .and_then(|meta| Protocol::try_from(meta.protocol).ok())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RequestStatus {
    PendingAck = 0,
    Pending = 1,
    Error = 2,
    Completed = 3,
}

/// The relay's view of an in-flight request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RequestState {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(enumeration = "RequestStatus", tag = "2")]
    pub status: i32,
    #[prost(oneof = "RequestOutcome", tags = "3, 4")]
    pub outcome: Option<RequestOutcome>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum RequestOutcome {
    #[prost(message, tag = "3")]
    View(View),
    #[prost(string, tag = "4")]
    Error(String),
}
