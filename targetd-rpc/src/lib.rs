//! targetd JSON-RPC client library
//!
//! Client side of the targetd remote storage API: JSON-RPC 2.0 over HTTP(S)
//! with Basic authentication.
//!
//! The library is split into several modules:
//! - `session`: endpoint, credentials and the per-caller request id counter
//! - `transport`: HTTP transport and the seam used to swap it out in tests
//! - `protocol`: request framing and response validation
//! - `metrics`: counters and timings for RPC calls

pub mod error;
pub mod metrics;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::{Result, RpcError, TransportError};
pub use protocol::{JSONRPC_VERSION, RpcRequest, validate_response};
pub use session::{
    Credentials, DEFAULT_PATH, DEFAULT_PORT, Endpoint, FallbackPolicy, RpcSession, Scheme,
};
pub use transport::{HttpReply, HttpTransport, Transport, TransportConfig};
