//! Socket group lifecycle against a real WebSocket server.
//!
//! Tests the application end to end:
//! - Join frames and the auth token on the main socket
//! - Frames reaching stores and the tracker policy
//! - Monitor subscribe and channel-less frames
//! - Missing prerequisites and graceful shutdown

mod integration;
use integration::common::mock_ws::MockWsServer;

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tradefeed_alerts::{MuteList, SoundPlayer, Toast, ToastSink};
use tradefeed_app::config::{MonitorConfig, MonitorsConfig};
use tradefeed_app::{AppConfig, Application};
use tradefeed_core::{Channel, TrackedWallet};
use tradefeed_ws::ConnectionState;

#[derive(Default)]
struct Recorder {
    sounds: Mutex<Vec<(String, f32)>>,
    toasts: Mutex<Vec<Toast>>,
}

impl SoundPlayer for Recorder {
    fn play(&self, asset: &str, volume: f32) {
        self.sounds.lock().push((asset.to_string(), volume));
    }
}

impl ToastSink for Recorder {
    fn show(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }

    fn dismiss_all(&self) {}
}

fn main_config(url: String, channels: Vec<Channel>) -> AppConfig {
    let mut config = AppConfig::default();
    config.main.url = url;
    config.main.auth_token = Some("tok".to_string());
    config.main.channels = channels;
    config
}

/// Poll `check` until it holds or two seconds pass.
async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    timeout(Duration::from_secs(2), async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}

/// `wait_until` for checks that do not await.
async fn wait_for(check: impl Fn() -> bool) -> bool {
    wait_until(|| std::future::ready(check())).await
}

#[tokio::test]
async fn test_main_socket_sends_token_and_joins() {
    let server = MockWsServer::start().await;
    let srv = &server;
    let config = main_config(server.url(), vec![Channel::SolanaPrice, Channel::Tracker]);

    let mut app = Application::new(config).unwrap();
    app.start().unwrap();

    assert!(
        wait_until(move || async move { srv.received_messages().await.len() >= 2 }).await,
        "Joins should arrive within timeout"
    );

    let joins: Vec<Value> = server
        .received_messages()
        .await
        .iter()
        .map(|m| serde_json::from_str(m).unwrap())
        .collect();
    assert_eq!(
        joins,
        vec![
            json!({"channel": "solanaPrice", "action": "join"}),
            json!({"channel": "tracker", "action": "join"}),
        ]
    );
    assert_eq!(server.paths().await, vec!["/ws?token=tok".to_string()]);
    assert_eq!(app.group("main").unwrap().manager().state(), ConnectionState::Open);

    app.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_frames_reach_stores_and_disabled_channel_is_dropped() {
    let server = MockWsServer::with_script(vec![
        json!({"channel": "alerts", "data": [{"id": 1}]}).to_string(),
        json!({"channel": "solanaPrice", "data": {"price": 187.25}}).to_string(),
    ])
    .await;
    let config = main_config(server.url(), vec![Channel::SolanaPrice]);

    let mut app = Application::new(config).unwrap();
    app.start().unwrap();

    let stores = app.stores().clone();
    assert!(wait_for(|| stores.solana_price.get().is_some()).await);

    assert_eq!(stores.solana_price.get().unwrap().price, 187.25);
    // alerts arrived first but is not enabled
    assert!(stores.alerts.is_empty());

    app.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_tracker_frame_drives_side_effects() {
    let server = MockWsServer::with_script(vec![json!({
        "channel": "tracker",
        "data": [{
            "walletAddress": "WhaleWallet111111",
            "solAmount": "1.5",
            "mint": "MintBonk",
            "symbol": "BONK",
            "type": "buy"
        }]
    })
    .to_string()])
    .await;

    let mut config = main_config(server.url(), Channel::MAIN.to_vec());
    config.alerts.mute_list = MuteList::loaded(Vec::<&str>::new());
    config.tracked_wallets = vec![TrackedWallet {
        address: "WhaleWallet111111".into(),
        name: "whale".to_string(),
        emoji: None,
    }];

    let recorder = Arc::new(Recorder::default());
    let mut app = Application::with_sinks(config, recorder.clone(), recorder.clone()).unwrap();
    app.start().unwrap();

    assert!(wait_for(|| !recorder.toasts.lock().is_empty()).await);

    let toasts = recorder.toasts.lock().clone();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, "whale");
    assert_eq!(toasts[0].body, "buy 1.50 SOL of BONK");
    assert_eq!(
        recorder.sounds.lock().clone(),
        vec![("sounds/tracker-alert.mp3".to_string(), 0.5)]
    );
    assert_eq!(app.stores().tracker.live_len(), 1);

    app.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_monitor_subscribes_and_stores_default_channel() {
    let server = MockWsServer::start().await;
    let srv = &server;

    let mut config = AppConfig::default();
    config.license_key = Some("lic-1".to_string());
    config.monitors = MonitorsConfig {
        twitter: Some(MonitorConfig {
            url: server.url(),
            usernames: Some(vec!["elonmusk".to_string()]),
            groups: None,
        }),
        ..MonitorsConfig::default()
    };

    let mut app = Application::new(config).unwrap();
    app.start().unwrap();
    assert_eq!(app.groups().len(), 1);
    assert!(app.group("main").is_none());

    assert!(wait_until(move || async move { !srv.received_messages().await.is_empty() }).await);
    let subscribe: Value = serde_json::from_str(&server.received_messages().await[0]).unwrap();
    assert_eq!(
        subscribe,
        json!({"action": "subscribe", "licenseKey": "lic-1", "usernames": ["elonmusk"]})
    );

    server.push(json!({"id": "t1", "text": "gm"}).to_string());
    server.push(json!({"type": "Ping"}).to_string());

    let stores = app.stores().clone();
    assert!(wait_for(|| stores.twitter.len() == 1).await);
    assert_eq!(stores.twitter.latest().unwrap()["text"], "gm");

    app.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_missing_prerequisites_open_nothing() {
    let server = MockWsServer::start().await;

    let mut config = AppConfig::default();
    config.main.url = server.url();
    config.monitors.discord = Some(MonitorConfig {
        url: server.url(),
        ..MonitorConfig::default()
    });

    let mut app = Application::new(config).unwrap();
    app.start().unwrap();
    assert!(app.groups().is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count().await, 0);

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_sends_close_frame() {
    let server = MockWsServer::start().await;
    let srv = &server;
    let config = main_config(server.url(), Channel::MAIN.to_vec());

    let mut app = Application::new(config).unwrap();
    app.start().unwrap();
    assert!(wait_until(move || async move { srv.connection_count().await == 1 }).await);
    assert!(wait_until(move || async move { !srv.received_messages().await.is_empty() }).await);

    app.shutdown().await;
    assert!(app.groups().is_empty());

    assert!(wait_until(move || async move { srv.close_count().await == 1 }).await);
    assert_eq!(server.connection_count().await, 1);

    server.shutdown().await;
}
