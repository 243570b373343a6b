//! Command-line surface shared by the utilities.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tracing::{Level, debug, error};
use tracing_subscriber::FmtSubscriber;

use targetd_rpc::{
    Credentials, DEFAULT_PATH, DEFAULT_PORT, Endpoint, HttpTransport, RpcSession, TransportConfig,
};

use crate::initiator::{INITIATOR_NAME_PATH, InitiatorNameError, read_initiator_name};
use crate::workflow::{Compensation, WorkflowError};

/// Connection to the targetd API
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// The host providing the targetd API / iSCSI target
    #[arg(long, env = "TARGETD_HOST")]
    pub host: String,

    /// The port for the targetd API
    #[arg(long, env = "TARGETD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// HTTP path of the JSON-RPC endpoint
    #[arg(long, default_value = DEFAULT_PATH)]
    pub path: String,

    /// Authentication with the targetd API: username
    #[arg(long, env = "TARGETD_USER", default_value = "admin")]
    pub user: String,

    /// Authentication with the targetd API: password
    #[arg(
        long,
        env = "TARGETD_PASSWORD",
        default_value = "password",
        hide_env_values = true
    )]
    pub password: String,

    /// Start on HTTPS instead of plaintext HTTP
    #[arg(long)]
    pub ssl: bool,

    /// Request timeout in seconds (waits indefinitely if not set)
    #[arg(long, env = "TARGETD_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// CA certificate (PEM) to trust for HTTPS
    #[arg(long, env = "TARGETD_TLS_CA_CERT")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Accept invalid or self-signed daemon certificates
    #[arg(long)]
    pub tls_insecure: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl ConnectionArgs {
    pub fn endpoint(&self) -> Endpoint {
        let endpoint = Endpoint::new(self.host.clone(), self.port).with_path(self.path.clone());
        if self.ssl {
            endpoint.with_tls()
        } else {
            endpoint
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user.clone(), self.password.clone())
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout_secs.map(Duration::from_secs),
            ca_cert: self.tls_ca_cert.clone(),
            accept_invalid_certs: self.tls_insecure,
        }
    }

    /// Build the session for this invocation.
    pub async fn connect(
        &self,
    ) -> Result<RpcSession<HttpTransport>, Box<dyn std::error::Error + Send + Sync>> {
        let transport = HttpTransport::new(&self.transport_config()).await?;
        let endpoint = self.endpoint();
        debug!(url = %endpoint.url(), user = %self.user, "Using targetd endpoint");
        Ok(RpcSession::new(endpoint, self.credentials(), transport))
    }
}

/// Initiator to export to
#[derive(Args, Debug, Clone)]
pub struct InitiatorArgs {
    /// Initiator WWN; read from the initiator name file if not given
    #[arg(long = "initiator-name", alias = "initiatorName")]
    pub initiator_name: Option<String>,

    /// open-iscsi initiator name file
    #[arg(long, default_value = INITIATOR_NAME_PATH)]
    pub initiator_name_file: PathBuf,
}

impl InitiatorArgs {
    pub async fn resolve(&self) -> Result<String, InitiatorNameError> {
        match &self.initiator_name {
            Some(name) => Ok(name.clone()),
            None => read_initiator_name(&self.initiator_name_file).await,
        }
    }
}

/// Install the global tracing subscriber. Logs go to stderr so stdout only
/// carries command output.
pub fn init_tracing(log_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Common startup for every utility: logging, then the session.
pub async fn setup(
    args: &ConnectionArgs,
) -> Result<RpcSession<HttpTransport>, Box<dyn std::error::Error + Send + Sync>> {
    init_tracing(&args.log_level)
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    args.connect().await.map_err(|e| {
        error!(error = %e, "Failed to set up targetd client");
        format!("Failed to set up targetd client: {}", e).into()
    })
}

/// Print a failed workflow for the user.
pub fn report_failure(err: &WorkflowError) {
    eprintln!("{}", err);
    if let Some(Compensation {
        method,
        result: Err(e),
    }) = &err.compensation
    {
        eprintln!("Cleanup call {} also failed: {}", method, e);
    }
}

/// Process exit status for a finished workflow.
///
/// Runs `on_success` and returns 0, or reports the failure and returns 1.
pub fn finish<T>(result: Result<T, WorkflowError>, on_success: impl FnOnce(T)) -> u8 {
    match result {
        Ok(value) => {
            on_success(value);
            0
        }
        Err(e) => {
            report_failure(&e);
            1
        }
    }
}
