// async_dispatch.rs — The pipeline behind the async transport seam.
//
//   1. allowed request is awaited, then logged with its status and duration
//   2. block mode rejects before the inner future is ever polled
//   3. a send dropped mid-flight (timeout) still leaves an "error" event
//      saying the request was cancelled

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;

use og_audit::{EnforcementAction, EventLog};
use og_intercept::{
    AsyncTransport, EnforcementMode, InboundResponse, Interceptor, InterceptorConfig,
    OutboundRequest,
};

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

const POLICY: &str = r#"
forbid(principal, action == Action::"POST", resource) when { resource.path startsWith "/admin" };
"#;

struct Req(&'static str, &'static str);

impl OutboundRequest for Req {
    fn method(&self) -> &str {
        self.0
    }
    fn url(&self) -> &str {
        self.1
    }
}

#[derive(Debug)]
struct Resp(u16);

impl InboundResponse for Resp {
    fn status(&self) -> u16 {
        self.0
    }
}

#[derive(Clone, Default)]
struct SlowTransport {
    delay: Duration,
    started: Arc<AtomicUsize>,
}

#[async_trait]
impl AsyncTransport for SlowTransport {
    type Request = Req;
    type Response = Resp;
    type Error = io::Error;

    async fn send_async(&self, _request: Req) -> Result<Resp, io::Error> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Resp(201))
    }
}

fn interceptor(log: &std::path::Path) -> Interceptor {
    Interceptor::new(
        InterceptorConfig::default()
            .with_policy_text(POLICY)
            .with_enforcement(EnforcementMode::Block)
            .with_log_file(log),
    )
}

// The lock is held across awaits only on a current-thread runtime, where
// nothing else contends for it.
#[allow(clippy::await_holding_lock)]
#[tokio::test]
async fn allowed_request_is_awaited_and_logged() {
    let _s = serial();
    let dir = tempdir().unwrap();
    let log = dir.path().join("events.jsonl");
    let interceptor = interceptor(&log);
    interceptor.install().unwrap();

    let transport = SlowTransport {
        delay: Duration::from_millis(5),
        ..Default::default()
    };
    let client = interceptor.wrap(transport.clone());

    let response = client
        .send_async(Req("POST", "https://api.example.com/items"))
        .await
        .unwrap();
    assert_eq!(response.0, 201);

    let events = EventLog::read_all(&log).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].enforcement_action, EnforcementAction::Allowed);
    assert_eq!(events[0].status, Some(201));
    assert!(events[0].duration_ms >= 5.0);
}

#[allow(clippy::await_holding_lock)]
#[tokio::test]
async fn blocked_request_never_starts() {
    let _s = serial();
    let dir = tempdir().unwrap();
    let log = dir.path().join("events.jsonl");
    let interceptor = interceptor(&log);
    interceptor.install().unwrap();

    let transport = SlowTransport::default();
    let client = interceptor.wrap(transport.clone());

    let err = client
        .send_async(Req("POST", "https://api.example.com/admin/users"))
        .await
        .unwrap_err();
    assert!(err.is_blocked());
    assert_eq!(transport.started.load(Ordering::SeqCst), 0);

    // GET to the same path is not covered by the POST rule.
    client
        .send_async(Req("GET", "https://api.example.com/admin/users"))
        .await
        .unwrap();
    assert_eq!(transport.started.load(Ordering::SeqCst), 1);
}

#[allow(clippy::await_holding_lock)]
#[tokio::test]
async fn cancelled_request_is_still_logged() {
    let _s = serial();
    let dir = tempdir().unwrap();
    let log = dir.path().join("events.jsonl");
    let interceptor = interceptor(&log);
    interceptor.install().unwrap();

    let transport = SlowTransport {
        delay: Duration::from_secs(30),
        ..Default::default()
    };
    let client = interceptor.wrap(transport.clone());

    let result = tokio::time::timeout(
        Duration::from_millis(20),
        client.send_async(Req("GET", "https://api.example.com/slow")),
    )
    .await;
    assert!(result.is_err(), "request should have timed out");
    assert_eq!(transport.started.load(Ordering::SeqCst), 1);

    let events = EventLog::read_all(&log).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].enforcement_action, EnforcementAction::Error);
    assert_eq!(
        events[0].error.as_deref(),
        Some("request cancelled before completion")
    );
    assert_eq!(events[0].status, None);
}
