//! Integration tests for targetd-utils
//!
//! These tests run the provisioning workflows against a scripted transport
//! that answers each request from a queue and records what was sent.
//! Tests focus on:
//! - Which calls each workflow makes, in which order, with which params
//! - Compensating calls on rejected steps
//! - Fatal errors aborting without compensation
//! - Request id accounting across fallbacks and compensations

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use targetd_rpc::{
    Credentials, Endpoint, HttpReply, RpcError, RpcSession, Transport, TransportError,
};
use targetd_utils::{
    DestroyLunSpec, ExportSpec, FilesystemSpec, NfsExportSpec, Step, VolumeSpec, create_lun,
    destroy_lun, filesys_destroy, initiator_list, nfs_export_remove,
};

// ============================================================================
// Scripted transport
// ============================================================================

#[derive(Debug, Clone)]
struct SentRequest {
    url: String,
    body: Value,
}

impl SentRequest {
    fn method(&self) -> &str {
        self.body["method"].as_str().unwrap()
    }

    fn id(&self) -> u64 {
        self.body["id"].as_u64().unwrap()
    }

    fn params(&self) -> &Value {
        &self.body["params"]
    }
}

#[derive(Default)]
struct ScriptedDaemon {
    replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    sent: Mutex<Vec<SentRequest>>,
}

impl ScriptedDaemon {
    fn reply(&self, value: Value) -> &Self {
        let body = serde_json::to_vec(&value).unwrap();
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpReply::ok(body)));
        self
    }

    fn ok(&self) -> &Self {
        self.reply(json!({"id": 0, "jsonrpc": "2.0", "result": null}))
    }

    fn fail(&self, code: i64, message: &str) -> &Self {
        self.reply(json!({"id": 0, "jsonrpc": "2.0", "error": {"code": code, "message": message}}))
    }

    fn refuse(&self) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError::new(
                "scripted",
                std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            )));
        self
    }

    fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    fn methods(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|request| request.method().to_string())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedDaemon {
    async fn post(
        &self,
        url: &str,
        _authorization: &str,
        body: &[u8],
    ) -> Result<HttpReply, TransportError> {
        self.sent.lock().unwrap().push(SentRequest {
            url: url.to_string(),
            body: serde_json::from_slice(body).unwrap(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("workflow made an unscripted call")
    }
}

fn session() -> RpcSession<ScriptedDaemon> {
    RpcSession::new(
        Endpoint::new("host", 18700),
        Credentials::new("admin", "password"),
        ScriptedDaemon::default(),
    )
}

fn volume() -> VolumeSpec {
    VolumeSpec {
        pool: "vg0".to_string(),
        name: "v1".to_string(),
        size_bytes: 1073741824,
    }
}

fn export() -> ExportSpec {
    ExportSpec {
        pool: "vg0".to_string(),
        volume_name: "v1".to_string(),
        lun: 0,
        initiator_wwn: "iqn.x".to_string(),
    }
}

fn destroy_spec() -> DestroyLunSpec {
    DestroyLunSpec {
        pool: "vg0".to_string(),
        volume_name: "v1".to_string(),
        initiator_wwn: "iqn.x".to_string(),
    }
}

// ============================================================================
// Create workflow
// ============================================================================

#[tokio::test]
async fn test_create_lun_success() {
    let mut session = session();
    session.transport().ok().ok();

    create_lun(&mut session, &volume(), &export()).await.unwrap();

    let sent = session.transport().sent();
    assert_eq!(session.transport().methods(), vec!["vol_create", "export_create"]);
    assert_eq!(
        sent[0].params(),
        &json!({"pool": "vg0", "name": "v1", "size": 1073741824u64})
    );
    assert_eq!(
        sent[1].params(),
        &json!({"pool": "vg0", "vol": "v1", "lun": 0, "initiator_wwn": "iqn.x"})
    );
}

/// Export rejected: export_destroy cleanup runs, the volume is left alone.
#[tokio::test]
async fn test_create_lun_export_rejected() {
    let mut session = session();
    session.transport().ok().fail(-1, "lun exists").ok();

    let err = create_lun(&mut session, &volume(), &export())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Problem creating export: lun exists");
    assert_eq!(err.step, Step::ExportCreate);
    assert!(matches!(err.source, RpcError::Application { code: -1, .. }));

    let compensation = err.compensation.expect("compensation should run");
    assert_eq!(compensation.method, "export_destroy");
    assert!(compensation.succeeded());

    let sent = session.transport().sent();
    assert_eq!(
        session.transport().methods(),
        vec!["vol_create", "export_create", "export_destroy"]
    );
    assert_eq!(
        sent[2].params(),
        &json!({"pool": "vg0", "name": "v1", "initiator_wwn": "iqn.x"})
    );
}

/// Volume rejected: vol_destroy cleanup runs, export_create is never tried.
#[tokio::test]
async fn test_create_lun_volume_rejected() {
    let mut session = session();
    session.transport().fail(-5, "pool full").ok();

    let err = create_lun(&mut session, &volume(), &export())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Problem executing vol_create: pool full");
    assert_eq!(err.step, Step::VolCreate);
    assert_eq!(err.compensation.as_ref().unwrap().method, "vol_destroy");

    let sent = session.transport().sent();
    assert_eq!(session.transport().methods(), vec!["vol_create", "vol_destroy"]);
    assert_eq!(sent[1].params(), &json!({"pool": "vg0", "name": "v1"}));
}

#[tokio::test]
async fn test_failed_compensation_keeps_original_error() {
    let mut session = session();
    session
        .transport()
        .fail(-5, "pool full")
        .fail(-4, "no such volume");

    let err = create_lun(&mut session, &volume(), &export())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Problem executing vol_create: pool full");
    let compensation = err.compensation.unwrap();
    assert!(!compensation.succeeded());
    match compensation.result {
        Err(RpcError::Application { message, .. }) => assert_eq!(message, "no such volume"),
        other => panic!("unexpected compensation result: {:?}", other),
    }
}

#[tokio::test]
async fn test_protocol_error_aborts_without_compensation() {
    let mut session = session();
    session
        .transport()
        .reply(json!({"id": 1, "jsonrpc": "1.0", "error": {"code": -5, "message": "pool full"}}));

    let err = create_lun(&mut session, &volume(), &export())
        .await
        .unwrap_err();

    assert!(matches!(err.source, RpcError::Protocol(_)));
    assert!(err.compensation.is_none());
    assert_eq!(session.transport().methods(), vec!["vol_create"]);
}

#[tokio::test]
async fn test_transport_failure_aborts_without_compensation() {
    let mut session = session();
    session.transport().ok().refuse().refuse();

    let err = create_lun(&mut session, &volume(), &export())
        .await
        .unwrap_err();

    // Both the plaintext attempt and its TLS resend were refused
    assert!(matches!(err.source, RpcError::Transport(_)));
    assert!(err.compensation.is_none());

    let sent = session.transport().sent();
    assert_eq!(
        session.transport().methods(),
        vec!["vol_create", "export_create", "export_create"]
    );
    assert!(sent[1].url.starts_with("http://"));
    assert!(sent[2].url.starts_with("https://"));
    assert_eq!(sent[1].id(), sent[2].id());
}

#[tokio::test]
async fn test_anomalous_error_code_counts_as_success() {
    let mut session = session();
    session.transport().fail(3, "odd").ok();

    create_lun(&mut session, &volume(), &export()).await.unwrap();
    assert_eq!(session.transport().methods(), vec!["vol_create", "export_create"]);
}

#[tokio::test]
async fn test_ids_across_compensation() {
    let mut session = session();
    session.transport().ok().fail(-1, "lun exists").ok();

    let _ = create_lun(&mut session, &volume(), &export()).await;

    let ids: Vec<u64> = session.transport().sent().iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(session.next_id(), 4);
}

// ============================================================================
// Destroy workflow
// ============================================================================

#[tokio::test]
async fn test_destroy_lun_success() {
    let mut session = session();
    session.transport().ok().ok();

    destroy_lun(&mut session, &destroy_spec()).await.unwrap();

    let sent = session.transport().sent();
    assert_eq!(session.transport().methods(), vec!["export_destroy", "vol_destroy"]);
    assert_eq!(
        sent[0].params(),
        &json!({"pool": "vg0", "vol": "v1", "initiator_wwn": "iqn.x"})
    );
    assert_eq!(sent[1].params(), &json!({"pool": "vg0", "name": "v1"}));
}

#[tokio::test]
async fn test_destroy_lun_export_rejected() {
    let mut session = session();
    session.transport().fail(-2, "no such export");

    let err = destroy_lun(&mut session, &destroy_spec()).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Problem executing export_destroy: no such export"
    );
    assert!(err.compensation.is_none());
    assert_eq!(session.transport().methods(), vec!["export_destroy"]);
}

#[tokio::test]
async fn test_destroy_lun_volume_rejected() {
    let mut session = session();
    session.transport().ok().fail(-3, "volume busy");

    let err = destroy_lun(&mut session, &destroy_spec()).await.unwrap_err();

    assert_eq!(err.to_string(), "Problem removing volume: volume busy");
    assert_eq!(err.step, Step::VolDestroy);
    assert!(err.compensation.is_none());
    assert_eq!(session.transport().methods(), vec!["export_destroy", "vol_destroy"]);
}

// ============================================================================
// Single-call workflows
// ============================================================================

#[tokio::test]
async fn test_tls_fallback_consumes_one_id() {
    let mut session = session();
    session.transport().refuse().ok();

    let spec = FilesystemSpec {
        pool: "vg0".to_string(),
        name: "fs1".to_string(),
        client: None,
    };
    filesys_destroy(&mut session, &spec).await.unwrap();

    let sent = session.transport().sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].url, "http://host:18700/targetrpc");
    assert_eq!(sent[1].url, "https://host:18700/targetrpc");
    assert_eq!(sent[0].body, sent[1].body);
    assert_eq!(sent[1].id(), 1);
    assert_eq!(session.next_id(), 2);
    assert_eq!(sent[0].params()["client"], Value::Null);
}

#[tokio::test]
async fn test_filesys_destroy_error() {
    let mut session = session();
    session.transport().fail(-10, "filesystem not found");

    let spec = FilesystemSpec {
        pool: "vg0".to_string(),
        name: "fs1".to_string(),
        client: None,
    };
    let err = filesys_destroy(&mut session, &spec).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Problem executing filesys_destroy: filesystem not found"
    );
    assert!(err.compensation.is_none());
}

#[tokio::test]
async fn test_nfs_export_remove() {
    let mut session = session();
    session.transport().ok().fail(-400, "no such export");

    let spec = NfsExportSpec {
        client: "*".to_string(),
        pool: "vg0".to_string(),
        name: "fs1".to_string(),
    };
    nfs_export_remove(&mut session, &spec).await.unwrap();
    assert_eq!(
        session.transport().sent()[0].params(),
        &json!({"client": "*", "pool": "vg0", "name": "fs1"})
    );

    let err = nfs_export_remove(&mut session, &spec).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Problem executing nfs_export_remove: no such export"
    );
}

#[tokio::test]
async fn test_initiator_list() {
    let mut session = session();
    session.transport().reply(json!({
        "id": 1,
        "jsonrpc": "2.0",
        "result": [
            {"init_type": "iscsi", "init_id": "iqn.1994-05.com.redhat:a"},
            {"init_type": "iscsi", "init_id": "iqn.1994-05.com.redhat:b"}
        ]
    }));

    let initiators = initiator_list(&mut session).await.unwrap();
    assert_eq!(initiators.len(), 2);
    assert_eq!(initiators[0].init_type, "iscsi");
    assert_eq!(initiators[1].init_id, "iqn.1994-05.com.redhat:b");
    assert_eq!(session.transport().sent()[0].params(), &Value::Null);
}

#[tokio::test]
async fn test_initiator_list_empty_and_malformed() {
    let mut session = session();
    session
        .transport()
        .ok()
        .reply(json!({"id": 2, "jsonrpc": "2.0", "result": {"unexpected": true}}));

    assert!(initiator_list(&mut session).await.unwrap().is_empty());

    let err = initiator_list(&mut session).await.unwrap_err();
    assert_eq!(err.step, Step::InitiatorList);
    assert!(matches!(err.source, RpcError::Protocol(_)));
}
