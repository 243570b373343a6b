//! HTTP transport for the targetd JSON-RPC endpoint.
//!
//! `RpcSession` talks to the daemon through the `Transport` trait so the
//! exchange can be replaced in tests; `HttpTransport` is the real one.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::error::TransportError;

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// One POST of a serialized request to the daemon.
///
/// Implementations return `Err` only when the exchange could not be
/// completed. Any reply, whatever its HTTP status, is returned as
/// `HttpReply` and classified by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        authorization: &str,
        body: &[u8],
    ) -> Result<HttpReply, TransportError>;
}

/// Connection settings for `HttpTransport`.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// Overall request timeout. `None` waits until the exchange resolves.
    pub timeout: Option<Duration>,
    /// Extra CA certificate (PEM) trusted for the TLS fallback.
    pub ca_cert: Option<PathBuf>,
    /// Accept self-signed or otherwise invalid daemon certificates.
    pub accept_invalid_certs: bool,
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub async fn new(
        config: &TransportConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(ca_path) = &config.ca_cert {
            let pem = tokio::fs::read(ca_path).await?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        if config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        authorization: &str,
        body: &[u8],
    ) -> Result<HttpReply, TransportError> {
        debug!(url = url, bytes = body.len(), "Posting JSON-RPC request");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, authorization)
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| TransportError::new(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(url, e))?;

        debug!(url = url, status = status, bytes = body.len(), "Received reply");
        Ok(HttpReply {
            status,
            body: body.to_vec(),
        })
    }
}
