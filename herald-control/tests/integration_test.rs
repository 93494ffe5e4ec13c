//! Integration tests for control socket client/server communication
//!
//! These tests verify the full request/response cycle between the control
//! client and server, including error handling and protocol correctness.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use herald_common::identity::{Identity, IdentityStatus};
use herald_control::{
    CommandHandler, ControlClient, ControlError, ControlServer, IdentityCommand, Request,
    RequestCommand, Response, ResponseData, ResponsePayload, Result, SchedulerCommand,
};
use herald_delivery::{SchedulerState, StatusSnapshot};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Mock command handler recording identity uploads and answering status
struct MockHandler {
    loaded: Mutex<Vec<Identity>>,
}

impl MockHandler {
    fn new() -> Self {
        Self {
            loaded: Mutex::new(Vec::new()),
        }
    }

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            state: SchedulerState::Running,
            campaign_id: None,
            campaign: Some("expo".to_string()),
            subject: Some("Invitation".to_string()),
            sent: 2,
            total: 5,
            queued_campaigns: 1,
            queued_recipients: 5,
            log: vec!["r0@example.com sent through a@example.com".to_string()],
            notifications: Vec::new(),
        }
    }
}

#[async_trait]
impl CommandHandler for MockHandler {
    async fn handle_request(&self, request: Request) -> Result<Response> {
        match request.command {
            RequestCommand::Scheduler(SchedulerCommand::Status) => {
                Ok(Response::data(ResponseData::Status(Self::snapshot())))
            }
            RequestCommand::Scheduler(SchedulerCommand::Start) => {
                Ok(Response::error("scheduler is already running"))
            }
            RequestCommand::Scheduler(_) => Ok(Response::ok()),
            RequestCommand::Identity(IdentityCommand::Load(identities)) => {
                *self.loaded.lock() = identities;
                Ok(Response::ok())
            }
            RequestCommand::Identity(_) => Ok(Response::data(ResponseData::Identities(vec![]))),
            RequestCommand::Campaign(_) => Ok(Response::data(ResponseData::Message(
                "not implemented in mock".to_string(),
            ))),
        }
    }
}

struct TestServer {
    _dir: TempDir,
    socket_path: String,
    shutdown: broadcast::Sender<herald_common::Signal>,
    handle: tokio::task::JoinHandle<()>,
}

async fn start_test_server(handler: Arc<dyn CommandHandler>) -> TestServer {
    let dir = TempDir::new().expect("tempdir");
    let socket_path = dir
        .path()
        .join("herald.sock")
        .to_string_lossy()
        .to_string();

    let server = ControlServer::new(socket_path.clone(), handler).expect("create server");
    let (shutdown, shutdown_rx) = broadcast::channel(1);

    let handle = tokio::spawn(async move {
        if let Err(e) = server.serve(shutdown_rx).await {
            eprintln!("Server error: {e}");
        }
    });

    // Wait for the socket to appear
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !std::path::Path::new(&socket_path).exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "server never bound its socket"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    TestServer {
        _dir: dir,
        socket_path,
        shutdown,
        handle,
    }
}

#[tokio::test]
async fn status_round_trip() {
    let server = start_test_server(Arc::new(MockHandler::new())).await;
    let client = ControlClient::new(&server.socket_path);

    let response = client
        .send_request(Request::new(RequestCommand::Scheduler(
            SchedulerCommand::Status,
        )))
        .await
        .expect("status request");

    match response.payload {
        ResponsePayload::Data(data) => match *data {
            ResponseData::Status(status) => {
                assert_eq!(status.state, SchedulerState::Running);
                assert_eq!(status.sent, 2);
                assert_eq!(status.total, 5);
                assert_eq!(status.campaign.as_deref(), Some("expo"));
            }
            other => panic!("unexpected data: {other:?}"),
        },
        other => panic!("unexpected payload: {other:?}"),
    }

    let _ = server.shutdown.send(herald_common::Signal::Shutdown);
    let _ = server.handle.await;
}

#[tokio::test]
async fn server_error_surfaces_as_client_error() {
    let server = start_test_server(Arc::new(MockHandler::new())).await;
    let client = ControlClient::new(&server.socket_path);

    let result = client
        .send_request(Request::new(RequestCommand::Scheduler(
            SchedulerCommand::Start,
        )))
        .await;

    match result {
        Err(ControlError::Rejected(message)) => {
            assert_eq!(message, "scheduler is already running");
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    let _ = server.shutdown.send(herald_common::Signal::Shutdown);
    let _ = server.handle.await;
}

#[tokio::test]
async fn identity_upload_round_trip() {
    let handler = Arc::new(MockHandler::new());
    let server = start_test_server(Arc::clone(&handler) as Arc<dyn CommandHandler>).await;
    let client = ControlClient::new(&server.socket_path);

    let identities = vec![
        Identity::new("a@example.com", "secret-a", "Ana"),
        Identity::new("b@example.com", "secret-b", "Ben"),
    ];
    let response = client
        .send_request(Request::new(RequestCommand::Identity(
            IdentityCommand::Load(identities),
        )))
        .await
        .expect("load request");
    assert!(response.is_success());

    let loaded = handler.loaded.lock().clone();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].address, "a@example.com");
    assert_eq!(loaded[0].status, IdentityStatus::Active);

    let _ = server.shutdown.send(herald_common::Signal::Shutdown);
    let _ = server.handle.await;
}

#[tokio::test]
async fn connecting_to_missing_socket_fails() {
    let client = ControlClient::new("/tmp/herald-test-does-not-exist.sock")
        .with_timeout(Duration::from_secs(1));
    assert!(matches!(
        client.ensure_socket(),
        Err(ControlError::MissingSocket(_))
    ));

    let result = client
        .send_request(Request::new(RequestCommand::Scheduler(
            SchedulerCommand::Status,
        )))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn shutdown_removes_socket_file() {
    let server = start_test_server(Arc::new(MockHandler::new())).await;
    let socket_path = server.socket_path.clone();

    let _ = server.shutdown.send(herald_common::Signal::Shutdown);
    let _ = server.handle.await;

    assert!(!std::path::Path::new(&socket_path).exists());
}
