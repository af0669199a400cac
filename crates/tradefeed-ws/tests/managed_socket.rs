//! Connection manager behavior over a scripted in-memory transport.
//!
//! Each `connect` call on the scripted connector hands the test a `Session`
//! through which it pushes inbound frames and inspects outbound ones. The
//! runtime clock is paused, so liveness and backoff timers run instantly.

use futures_util::future::BoxFuture;
use futures_util::{sink, stream};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tradefeed_ws::{
    ChannelRouter, ConnectionConfig, ConnectionManager, ConnectionState, Connector, ErrorReport,
    ErrorReporter, FrameDecoder, Inbound, MonitorSubscribe, Outbound, Transport, WsError,
    WsResult, MONITOR_CONTROL_MARKERS,
};

// ============================================================================
// Scripted transport
// ============================================================================

struct Session {
    inbound: mpsc::UnboundedSender<WsResult<Inbound>>,
    sent: Arc<Mutex<Vec<Outbound>>>,
}

impl Session {
    fn push_text(&self, text: &str) {
        self.inbound
            .send(Ok(Inbound::Text(text.to_string())))
            .expect("session stream dropped");
    }

    fn push(&self, frame: Inbound) {
        self.inbound.send(Ok(frame)).expect("session stream dropped");
    }

    fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|frame| match frame {
                Outbound::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().clone()
    }
}

/// Decrements the open-connection counter when the stream half is dropped.
struct OpenGuard(Arc<AtomicUsize>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ScriptedConnector {
    sessions: mpsc::UnboundedSender<Session>,
    open: Arc<AtomicUsize>,
    max_open: Arc<AtomicUsize>,
}

impl Connector for ScriptedConnector {
    fn connect(&self, _url: &str) -> BoxFuture<'static, WsResult<Transport>> {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));

        let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now_open, Ordering::SeqCst);
        let guard = OpenGuard(self.open.clone());

        let frames = stream::unfold((inbound_rx, guard), |(mut rx, guard)| async move {
            rx.recv().await.map(|frame| (frame, (rx, guard)))
        });

        let sink_log = sent.clone();
        let frame_sink = sink::unfold((), move |(), frame: Outbound| {
            let log = sink_log.clone();
            async move {
                log.lock().push(frame);
                Ok::<_, WsError>(())
            }
        });

        let _ = self.sessions.send(Session {
            inbound: inbound_tx,
            sent,
        });

        Box::pin(async move {
            Ok(Transport {
                sink: Box::pin(frame_sink),
                stream: Box::pin(frames),
            })
        })
    }
}

struct Harness {
    manager: Arc<ConnectionManager>,
    sessions: mpsc::UnboundedReceiver<Session>,
    max_open: Arc<AtomicUsize>,
    task: JoinHandle<WsResult<()>>,
}

impl Harness {
    fn start(manager: ConnectionManager) -> Self {
        let (sessions_tx, sessions) = mpsc::unbounded_channel();
        let max_open = Arc::new(AtomicUsize::new(0));
        let connector: Arc<dyn Connector> = Arc::new(ScriptedConnector {
            sessions: sessions_tx,
            open: Arc::new(AtomicUsize::new(0)),
            max_open: max_open.clone(),
        });

        let manager = Arc::new(manager.with_connector(connector));
        let runner = manager.clone();
        let task = tokio::spawn(async move { runner.connect().await });

        Self {
            manager,
            sessions,
            max_open,
            task,
        }
    }

    async fn next_session(&mut self) -> Session {
        self.sessions.recv().await.expect("connector dropped")
    }
}

fn config() -> ConnectionConfig {
    ConnectionConfig {
        url: "ws://scripted".to_string(),
        ..ConnectionConfig::default()
    }
}

/// Let spawned tasks drain their queues.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn collecting_reporter() -> (Arc<dyn ErrorReporter>, Arc<Mutex<Vec<ErrorReport>>>) {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = reports.clone();
    let reporter: Arc<dyn ErrorReporter> =
        Arc::new(move |report: ErrorReport| sink.lock().push(report));
    (reporter, reports)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_solana_price_end_to_end() {
    let router = ChannelRouter::new("main");
    let price = Arc::new(Mutex::new(None));
    let seen = price.clone();
    let _price = router.register("solanaPrice", move |env| {
        *seen.lock() = env.data.get("price").and_then(|p| p.as_f64());
        Ok(())
    });

    let mut harness = Harness::start(ConnectionManager::new(config(), router));
    let session = harness.next_session().await;
    settle().await;

    assert_eq!(harness.manager.state(), ConnectionState::Open);
    assert_eq!(
        session.sent_texts(),
        vec![r#"{"channel":"solanaPrice","action":"join"}"#.to_string()]
    );

    session.push_text(r#"{"channel":"solanaPrice","data":{"price":123.45}}"#);
    settle().await;

    assert_eq!(*price.lock(), Some(123.45));
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_frames_dispatched_in_arrival_order() {
    let router = ChannelRouter::new("main");
    let log = Arc::new(Mutex::new(Vec::new()));

    let first_log = log.clone();
    let _first = router.register("tracker", move |env| {
        first_log.lock().push(format!("a{}", env.data["n"]));
        Ok(())
    });
    let second_log = log.clone();
    let _second = router.register("tracker", move |env| {
        second_log.lock().push(format!("b{}", env.data["n"]));
        Ok(())
    });
    let alerts_log = log.clone();
    let _alerts = router.register("alerts", move |env| {
        alerts_log.lock().push(format!("alert{}", env.data["n"]));
        Ok(())
    });

    let mut harness = Harness::start(ConnectionManager::new(config(), router));
    let session = harness.next_session().await;

    session.push_text(r#"{"channel":"tracker","data":{"n":1}}"#);
    session.push_text(r#"{"channel":"alerts","data":{"n":2}}"#);
    session.push_text(r#"{"channel":"tracker","data":{"n":3}}"#);
    settle().await;

    assert_eq!(*log.lock(), vec!["a1", "b1", "alert2", "a3", "b3"]);
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_control_frames_never_dispatched() {
    let router = ChannelRouter::new("main");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let _ping = router.register("ping", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let mut harness = Harness::start(ConnectionManager::new(config(), router));
    let session = harness.next_session().await;

    session.push_text(r#"{"channel":"ping","success":true}"#);
    session.push_text(r#"{"success":true}"#);
    settle().await;

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(harness.manager.decoder().stats().control(), 2);
    assert_eq!(harness.manager.router().stats().dispatched(), 0);
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_parse_errors_reported_and_connection_survives() {
    let (reporter, reports) = collecting_reporter();
    let router = ChannelRouter::with_reporter("main", reporter);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let _alerts = router.register("alerts", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let mut harness = Harness::start(ConnectionManager::new(config(), router));
    let session = harness.next_session().await;

    session.push_text("{not json");
    session.push_text(r#"{"data":{}}"#);
    session.push_text(r#"{"channel":"alerts","data":{}}"#);
    settle().await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    let reports = reports.lock().clone();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.kind() == "parse" && r.socket() == "main"));
    assert_eq!(harness.manager.state(), ConnectionState::Open);
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_silence_forces_exactly_one_reconnect() {
    let (reporter, reports) = collecting_reporter();
    let router = ChannelRouter::with_reporter("main", reporter);

    let mut harness = Harness::start(ConnectionManager::new(config(), router));
    let first = harness.next_session().await;
    let opened = Instant::now();

    let second = harness.next_session().await;
    let elapsed = opened.elapsed();

    // 4000ms timeout, then the 1000ms base backoff.
    assert!(elapsed >= Duration::from_millis(5000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(5100), "{elapsed:?}");
    assert_eq!(first.sent().last(), Some(&Outbound::Close));
    assert!(matches!(
        reports.lock().as_slice(),
        [
            ErrorReport::Stale { silent_ms, .. },
            ErrorReport::Reconnect { attempt: 1, reason: "stale", .. },
        ] if *silent_ms > 4000
    ));

    // Only one replacement: nothing else opens before the new one goes quiet.
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert!(harness.sessions.try_recv().is_err());
    assert_eq!(harness.manager.open_count(), 2);
    assert_eq!(harness.manager.reconnect_count(), 0);

    drop(first);
    drop(second);
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_ping_keeps_connection_alive() {
    let mut harness = Harness::start(ConnectionManager::new(config(), ChannelRouter::new("main")));
    let session = harness.next_session().await;

    tokio::time::sleep(Duration::from_millis(3900)).await;
    session.push(Inbound::Ping(vec![7]));
    tokio::time::sleep(Duration::from_millis(3900)).await;

    assert!(harness.sessions.try_recv().is_err());
    assert_eq!(harness.manager.state(), ConnectionState::Open);
    assert!(session.sent().contains(&Outbound::Pong(vec![7])));
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_joins_resent_on_every_open() {
    let router = ChannelRouter::new("main");
    let _footer = router.register("footer", |_| Ok(()));
    let _holdings = router.register("holdings", |_| Ok(()));
    let _sniper = router.register("sniper", |_| Ok(()));
    router.set_enabled("sniper", false);

    let mut harness = Harness::start(ConnectionManager::new(config(), router));
    let expected = vec![
        r#"{"channel":"footer","action":"join"}"#.to_string(),
        r#"{"channel":"holdings","action":"join"}"#.to_string(),
    ];

    let first = harness.next_session().await;
    settle().await;
    assert_eq!(first.sent_texts(), expected);

    first.push(Inbound::Close {
        code: 1001,
        reason: "going away".to_string(),
    });
    let second = harness.next_session().await;
    settle().await;
    assert_eq!(second.sent_texts(), expected);

    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_monitor_subscribe_sent_on_open() {
    let subscribe = serde_json::to_string(
        &MonitorSubscribe::new("key-123").with_usernames(vec!["elonmusk".to_string()]),
    )
    .unwrap();
    let monitor_config = ConnectionConfig {
        name: "twitter".to_string(),
        send_joins: false,
        open_frames: vec![subscribe.clone()],
        ..config()
    };

    let router = ChannelRouter::new("twitter");
    let tweets = Arc::new(Mutex::new(Vec::new()));
    let sink = tweets.clone();
    let _tweets = router.register("twitter", move |env| {
        sink.lock().push(env.data.clone());
        Ok(())
    });

    let manager = ConnectionManager::new(monitor_config, router)
        .with_decoder(FrameDecoder::for_monitor(MONITOR_CONTROL_MARKERS, "twitter"));
    let mut harness = Harness::start(manager);
    let session = harness.next_session().await;
    settle().await;

    assert_eq!(session.sent_texts(), vec![subscribe]);

    session.push_text(r#"{"success":true,"message":"subscribed"}"#);
    session.push_text(r#"{"author":"elonmusk","text":"gm"}"#);
    settle().await;

    let tweets = tweets.lock().clone();
    assert_eq!(tweets.len(), 1);
    assert_eq!(tweets[0]["author"], "elonmusk");
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_gate_stops_reconnect() {
    let on_login = Arc::new(AtomicBool::new(false));
    let gate = on_login.clone();
    let (reporter, reports) = collecting_reporter();

    let mut harness = Harness::start(
        ConnectionManager::new(config(), ChannelRouter::with_reporter("main", reporter))
            .with_reconnect_gate(move || !gate.load(Ordering::SeqCst)),
    );
    let session = harness.next_session().await;

    on_login.store(true, Ordering::SeqCst);
    drop(session);

    let result = tokio::time::timeout(Duration::from_secs(30), &mut harness.task)
        .await
        .expect("connect loop should exit")
        .expect("task panicked");
    assert!(result.is_ok());
    assert!(harness.sessions.try_recv().is_err());
    assert_eq!(harness.manager.state(), ConnectionState::Closed);
    assert!(reports.lock().iter().all(|r| r.kind() != "reconnect"));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_reported_once_per_scheduled_attempt() {
    let (reporter, reports) = collecting_reporter();
    let mut harness = Harness::start(ConnectionManager::new(
        config(),
        ChannelRouter::with_reporter("main", reporter),
    ));

    let first = harness.next_session().await;
    first
        .inbound
        .send(Err(WsError::ConnectionFailed("reset".to_string())))
        .unwrap();
    // Dropping the session ends its stream: a clean close.
    drop(harness.next_session().await);
    let _third = harness.next_session().await;

    let reconnects: Vec<(u32, &str)> = reports
        .lock()
        .iter()
        .filter_map(|r| match r {
            ErrorReport::Reconnect {
                socket,
                attempt,
                reason,
            } if socket == "main" => Some((*attempt, *reason)),
            _ => None,
        })
        .collect();
    assert_eq!(reconnects, vec![(1, "transport"), (1, "closed")]);
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_connection_open() {
    let mut harness = Harness::start(ConnectionManager::new(config(), ChannelRouter::new("main")));

    for _ in 0..4 {
        let session = harness.next_session().await;
        session
            .inbound
            .send(Err(WsError::ConnectionFailed("reset".to_string())))
            .unwrap();
    }
    let _last = harness.next_session().await;

    assert_eq!(harness.max_open.load(Ordering::SeqCst), 1);
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_send_only_while_open() {
    let harness_manager = ConnectionManager::new(config(), ChannelRouter::new("main"));
    let handle = harness_manager.write_handle();
    assert!(handle.send_text("early".to_string()).is_err());

    let mut harness = Harness::start(harness_manager);
    let session = harness.next_session().await;
    settle().await;

    harness.manager.send(&serde_json::json!({"action": "ping"})).unwrap();
    settle().await;

    assert_eq!(session.sent_texts(), vec![r#"{"action":"ping"}"#.to_string()]);
    harness.manager.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_sends_close_and_exits() {
    let mut harness = Harness::start(ConnectionManager::new(config(), ChannelRouter::new("main")));
    let session = harness.next_session().await;
    settle().await;

    harness.manager.shutdown();
    let result = (&mut harness.task).await.expect("task panicked");

    assert!(result.is_ok());
    assert_eq!(session.sent().last(), Some(&Outbound::Close));
    assert_eq!(harness.manager.state(), ConnectionState::Closed);
}
