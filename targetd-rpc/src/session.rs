//! Client session for the targetd JSON-RPC API.
//!
//! A session owns everything one caller needs to talk to the daemon: the
//! endpoint, the credentials and the request id counter. `call` takes
//! `&mut self`, so calls on a session are strictly sequential and ids are
//! never handed out twice.

use std::fmt;

use base64::{Engine, engine::general_purpose};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::metrics::{self, CallTimer};
use crate::protocol::{RpcRequest, validate_response};
use crate::transport::{HttpReply, Transport};

/// Default targetd API port
pub const DEFAULT_PORT: u16 = 18700;
/// Default targetd API path
pub const DEFAULT_PATH: &str = "/targetrpc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of the daemon's JSON-RPC endpoint.
///
/// Starts on plaintext HTTP unless built `with_tls`. The scheme can be
/// upgraded to HTTPS by the session but never downgraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    path: String,
    scheme: Scheme,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: DEFAULT_PATH.to_string(),
            scheme: Scheme::Http,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Start on HTTPS instead of plaintext.
    pub fn with_tls(mut self) -> Self {
        self.scheme = Scheme::Https;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn is_tls(&self) -> bool {
        self.scheme == Scheme::Https
    }

    pub fn url(&self) -> String {
        // Bare IPv6 literals need brackets in a URL
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("{}://[{}]:{}{}", self.scheme, self.host, self.port, self.path)
        } else {
            format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
        }
    }

    fn upgrade_to_tls(&mut self) {
        self.scheme = Scheme::Https;
    }
}

/// Basic authentication credentials for the daemon.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// `Authorization` header value. Encoded afresh on every call.
    pub fn authorization_header(&self) -> String {
        let pair = format!("{}:{}", self.user, self.password);
        format!("Basic {}", general_purpose::STANDARD.encode(pair.as_bytes()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What to do when a request cannot be delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Resend once over HTTPS when a plaintext attempt fails at the
    /// transport level. Same id, same body.
    #[default]
    UpgradeToTls,
    /// Surface the first transport failure.
    Disabled,
}

impl FallbackPolicy {
    /// Upper bound on transport attempts for one logical call.
    pub fn max_attempts(&self) -> u32 {
        match self {
            FallbackPolicy::UpgradeToTls => 2,
            FallbackPolicy::Disabled => 1,
        }
    }
}

/// A JSON-RPC session with one targetd daemon.
pub struct RpcSession<T> {
    endpoint: Endpoint,
    credentials: Credentials,
    next_id: u64,
    fallback: FallbackPolicy,
    transport: T,
}

impl<T: Transport> RpcSession<T> {
    pub fn new(endpoint: Endpoint, credentials: Credentials, transport: T) -> Self {
        Self {
            endpoint,
            credentials,
            next_id: 1,
            fallback: FallbackPolicy::default(),
            transport,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Id the next call will use.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Invoke `method` on the daemon and return its `result`.
    ///
    /// Consumes exactly one request id, whether or not the TLS fallback
    /// is used.
    pub async fn call(&mut self, method: &str, params: Option<Map<String, Value>>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let body = RpcRequest::new(id, method, params).to_vec()?;
        let timer = CallTimer::new(method);

        debug!(id = id, method = method, "Calling targetd");

        let reply = match self.send(method, &body).await {
            Ok(reply) => reply,
            Err(e) => {
                timer.failure("transport");
                return Err(e.into());
            }
        };

        match validate_response(reply.status, &reply.body) {
            Ok(result) => {
                timer.success();
                Ok(result)
            }
            Err(e) => {
                debug!(id = id, method = method, error = %e, "Call failed");
                timer.failure(e.kind());
                Err(e)
            }
        }
    }

    async fn send(
        &mut self,
        method: &str,
        body: &[u8],
    ) -> std::result::Result<HttpReply, TransportError> {
        let authorization = self.credentials.authorization_header();
        let max_attempts = self.fallback.max_attempts();
        let mut attempt = 1;

        loop {
            let url = self.endpoint.url();
            match self.transport.post(&url, &authorization, body).await {
                Ok(reply) => return Ok(reply),
                // Only a plaintext attempt can be retried: the retry is the upgrade
                Err(e) if attempt < max_attempts && !self.endpoint.is_tls() => {
                    warn!(url = %url, attempt = attempt, error = %e, "error, retrying with TLS");
                    metrics::record_tls_fallback(method);
                    self.endpoint.upgrade_to_tls();
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
