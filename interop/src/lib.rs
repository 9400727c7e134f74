pub mod address;
pub mod cfg;
pub mod crypto;
pub mod error;
pub mod fetch;
pub mod flow;
pub mod gateway;
pub mod policy;
pub mod relay;
pub mod types;
pub mod view;

pub use error::{FetchStep, FlowError, InteropError};
pub use flow::{FlowOptions, FlowOutcome, FlowOutput, run_interop_flow};
