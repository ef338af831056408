//! End-to-end streaming session tests against a canned HTTP server

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use vox::domain::{Assignee, MessageRole, TaskStatus};
use vox::orchestrator::{NoticeLevel, SessionController, SessionEvent, SessionStatus};
use vox::planning::TaskMaterializer;
use vox::state::StateManager;

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read one HTTP request (headers plus Content-Length body) off the socket
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = socket.read(&mut tmp).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            let header = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let content_length = header
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let mut remaining = content_length.saturating_sub(buf.len() - (pos + 4));
            while remaining > 0 {
                let n = socket.read(&mut tmp).await.unwrap();
                if n == 0 {
                    break;
                }
                remaining = remaining.saturating_sub(n);
            }
            return;
        }
    }
}

/// Serve exactly one request with a fixed response, then close
async fn serve_once(response: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });
    format!("http://{addr}")
}

fn sse_body(contents: &[&str]) -> String {
    let mut body = String::new();
    for content in contents {
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn sse_response(contents: &[&str]) -> String {
    let body = sse_body(contents);
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn error_response(status: u16, reason: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn drain(rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_streamed_plan_is_rendered_and_persisted() {
    let state = StateManager::spawn_in_memory().unwrap();
    state.ensure_default_agents("proj-1").await.unwrap();

    // The plan block is split so no single delta contains it whole
    let endpoint = serve_once(sse_response(&[
        "Here is the plan. ",
        "{\"plan\": [{\"label\": \"Research the market\", \"agent\": \"Atlas\"}, ",
        "{\"label\": \"Draft the report\", \"agent\": \"Nemo\"}]}",
        " Done.",
    ]))
    .await;

    let session = SessionController::new(&endpoint, "test-key", state.clone(), "conv-1").with_project("proj-1");
    let (tx, mut rx) = mpsc::channel(256);
    assert!(session.send("plan the launch", Vec::new(), tx).await);
    assert_eq!(session.status(), SessionStatus::Idle);

    let events = drain(&mut rx);
    let full: String = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Delta(d) => Some(d.as_str()),
            _ => None,
        })
        .collect();
    assert!(full.starts_with("Here is the plan."));
    assert!(full.ends_with(" Done."));

    let plans: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Plan(steps) => Some(steps),
            _ => None,
        })
        .collect();
    assert_eq!(plans.len(), 1, "the plan block is emitted exactly once");
    assert_eq!(plans[0].len(), 2);
    assert!(matches!(events.last(), Some(SessionEvent::Completed { .. })));

    // One user turn plus one orchestrator message
    let messages = state.list_messages("conv-1").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().any(|m| m.role == MessageRole::User));
    let reply = messages
        .iter()
        .find(|m| m.role == MessageRole::Orchestrator)
        .expect("the reply was persisted");
    assert_eq!(reply.content, full);

    // Plan steps persisted with resolved-or-null agent references
    let steps = state.list_plan_steps(&reply.id).await.unwrap();
    assert_eq!(steps.len(), 2);
    let atlas = state.find_agent(Some("proj-1"), "Atlas").await.unwrap().unwrap();
    assert_eq!(steps[0].agent_id.as_deref(), Some(atlas.id.as_str()));
    assert!(steps[1].agent_id.is_none(), "unknown agent stores a null association");
    assert!(atlas.tokens_used > 0, "the named agent is credited for the reply");

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_streamed_tasks_are_materialized_with_continuing_order() {
    let state = StateManager::spawn_in_memory().unwrap();

    // An existing task occupies order index 0
    let materializer = TaskMaterializer::new(state.clone(), "conv-1");
    materializer.add_direct("pre-existing", None, Assignee::Vox).await.unwrap();

    let endpoint = serve_once(sse_response(&[
        "Breaking this down: ",
        "{\"tasks\": [{\"title\": \"A\", \"assignee\": \"human\"}, ",
        "{\"title\": \"B\", \"assignee\": \"vox\"}]}",
    ]))
    .await;

    let session = SessionController::new(&endpoint, "test-key", state.clone(), "conv-1");
    let (tx, mut rx) = mpsc::channel(256);
    assert!(session.send("break it down", Vec::new(), tx).await);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, SessionEvent::Tasks(_))));

    let tasks = state.list_tasks(Some("conv-1")).await.unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[1].title, "A");
    assert_eq!(tasks[1].status, TaskStatus::Blocked);
    assert_eq!(tasks[1].order_index, 1);
    assert_eq!(tasks[2].title, "B");
    assert_eq!(tasks[2].status, TaskStatus::Pending);
    assert_eq!(tasks[2].order_index, 2);

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_persisted_messages_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vox.db");

    let endpoint = serve_once(sse_response(&["remember this"])).await;

    {
        let state = StateManager::spawn(&path).unwrap();
        let session = SessionController::new(&endpoint, "test-key", state.clone(), "conv-1");
        let (tx, _rx) = mpsc::channel(256);
        assert!(session.send("note it down", Vec::new(), tx).await);
        state.shutdown().await.unwrap();
    }

    let state = StateManager::spawn(&path).unwrap();
    let messages = state.list_messages("conv-1").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().any(|m| m.content == "note it down"));
    assert!(messages.iter().any(|m| m.content == "remember this"));

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rate_limit_notifies_without_deltas() {
    let state = StateManager::spawn_in_memory().unwrap();

    let endpoint = serve_once(error_response(429, "Too Many Requests", r#"{"error": "rate limited"}"#)).await;

    let session = SessionController::new(&endpoint, "test-key", state.clone(), "conv-1");
    let (tx, mut rx) = mpsc::channel(256);
    assert!(session.send("hello", Vec::new(), tx).await);
    assert_eq!(session.status(), SessionStatus::Idle);

    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Delta(_))));
    match events.last() {
        Some(SessionEvent::Failed { notice, .. }) => {
            assert_eq!(notice.title, "Rate Limited");
            assert_eq!(notice.level, NoticeLevel::Warning);
        }
        other => panic!("expected a failure event, got {other:?}"),
    }

    // The user turn persists; no reply does
    let messages = state.list_messages("conv-1").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_midstream_disconnect_fails_and_persists_no_reply() {
    let state = StateManager::spawn_in_memory().unwrap();

    // Advertise more body than is ever sent, then drop the connection so
    // the read fails partway through the stream
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        let partial = "data: {\"choices\": [{\"delta\": {\"content\": \"cut \"}}]}\n\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{partial}",
            partial.len() + 512
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        // Dropping the socket here truncates the body
    });

    let session = SessionController::new(format!("http://{addr}"), "test-key", state.clone(), "conv-1");
    let (tx, mut rx) = mpsc::channel(256);
    assert!(session.send("hello", Vec::new(), tx).await);
    assert_eq!(session.status(), SessionStatus::Idle);

    let events = drain(&mut rx);
    match events.last() {
        Some(SessionEvent::Failed { notice, .. }) => {
            assert_eq!(notice.level, NoticeLevel::Error);
        }
        other => panic!("expected a failure event, got {other:?}"),
    }

    // Only the user turn persists; the partial reply never does
    let messages = state.list_messages("conv-1").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_second_submission_while_streaming_is_ignored() {
    let state = StateManager::spawn_in_memory().unwrap();

    // A server that stalls long enough for the second submission to race in
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        let response = sse_response(&["late reply"]);
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    let session = SessionController::new(format!("http://{addr}"), "test-key", state.clone(), "conv-1");
    let (tx, mut rx) = mpsc::channel(256);

    let first = {
        let session = session.clone();
        let tx = tx.clone();
        tokio::spawn(async move { session.send("first", Vec::new(), tx).await })
    };

    // Wait for the first session to occupy the controller
    while session.status() == SessionStatus::Idle {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let (tx2, mut rx2) = mpsc::channel(256);
    assert!(!session.send("second", Vec::new(), tx2).await);
    assert!(rx2.try_recv().is_err(), "the rejected submission emits nothing");

    assert!(first.await.unwrap());
    assert_eq!(session.status(), SessionStatus::Idle);

    let events = drain(&mut rx);
    let full: String = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Delta(d) => Some(d.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(full, "late reply", "the in-flight session's buffer is unaffected");

    // Only the first user turn was persisted
    let messages = state.list_messages("conv-1").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().any(|m| m.content == "first"));
    assert!(!messages.iter().any(|m| m.content == "second"));

    state.shutdown().await.unwrap();
}
