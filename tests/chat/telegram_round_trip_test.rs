//! End-to-end flow: mock Bot API -> telegram adapter -> chat engine ->
//! weather provider stub -> replies posted back to the Bot API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Utc};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stratus::chat::telegram::TelegramAdapter;
use stratus::chat::users::UserLocation;
use stratus::chat::{ChatEngine, ChatEvent, ChatReply};
use stratus::config::BotConfig;
use stratus::providers::{GeoRecord, ProviderError, ProviderHandle, WxProvider};
use stratus::wx::{
    Alert, PeriodResolution, ProviderCapabilities, ProviderDescriptor, ProviderType, RawForecast,
    RawPeriod,
};

const STUB_DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "stub",
    provider_type: ProviderType::MultiPeriod,
    period_resolution: PeriodResolution::TwelveHour,
    capabilities: ProviderCapabilities {
        use_enhanced_description: false,
        bad_weather_codes: None,
        has_precip_amount: false,
    },
    precision: 2,
    cache_ttl_secs: 3_600,
};

struct StubProvider;

#[async_trait]
impl WxProvider for StubProvider {
    fn descriptor(&self) -> ProviderDescriptor {
        STUB_DESCRIPTOR
    }

    async fn location_urls(&self, location: &UserLocation) -> Result<GeoRecord, ProviderError> {
        Ok(GeoRecord {
            forecast_url: format!("stub://forecast/{}", location.value),
            alerts_url: format!("stub://alerts/{}", location.value),
        })
    }

    async fn fetch_forecast(&self, url: &str) -> Result<RawForecast, ProviderError> {
        let today = Local::now().date_naive();
        let mut daytime = RawPeriod::new(today, true);
        daytime.temperature_value = Some(80.0);
        daytime.precip_probability = Some(20.0);
        daytime.description = "Sunny and breezy".to_owned();
        let mut night = RawPeriod::new(today, false);
        night.temperature_value = Some(40.0);
        night.precip_probability = Some(0.0);
        night.description = "Clear and cold".to_owned();

        let generated_at = Utc::now();
        Ok(RawForecast {
            provider: STUB_DESCRIPTOR,
            timezone: "America/Denver".to_owned(),
            source_url: url.to_owned(),
            generated_at,
            valid_until: generated_at + chrono::Duration::seconds(3_600),
            periods: vec![daytime, night],
        })
    }

    async fn fetch_alerts(&self, _url: &str) -> Result<Vec<Alert>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Engine wired to the stub provider, persisting users into a tempdir.
fn build_engine(dir: &tempfile::TempDir) -> Arc<ChatEngine> {
    let config = BotConfig::default();
    let handle = ProviderHandle::for_testing(
        Arc::new(StubProvider),
        config.weather.bad_weather_words.clone(),
    );
    let users_path = dir.path().join("users.json");
    let registry = stratus::chat::users::UserRegistry::load(&users_path).expect("load registry");
    Arc::new(ChatEngine::new(
        &config,
        Arc::new(handle),
        registry,
        users_path,
    ))
}

/// Bot API text payloads POSTed to sendMessage so far, in arrival order.
async fn sent_messages(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .expect("recording enabled")
        .iter()
        .filter(|r| r.url.path() == "/sendMessage")
        .map(|r| serde_json::from_slice(&r.body).expect("json body"))
        .collect()
}

async fn wait_for_sends(server: &MockServer, count: usize) -> Vec<serde_json::Value> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let sent = sent_messages(server).await;
        if sent.len() >= count {
            return sent;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {count} sendMessage calls, saw {}",
            sent.len()
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

fn update(update_id: i64, chat_id: i64, text: &str) -> serde_json::Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": { "id": chat_id, "first_name": "Alice" },
            "chat": { "id": chat_id, "type": "private" },
            "text": text
        }
    })
}

#[tokio::test]
async fn help_command_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getUpdates"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [update(900, 42, "/h")]
        })))
        .mount(&server)
        .await;
    // Later polls hold briefly and return nothing, like a real long poll.
    Mock::given(method("GET"))
        .and(path("/getUpdates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true, "result": [] }))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sendMessage"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let engine = build_engine(&dir);

    let (event_tx, event_rx) = mpsc::channel::<ChatEvent>(8);
    let (reply_tx, reply_rx) = mpsc::channel::<ChatReply>(8);

    let runner = Arc::clone(&engine);
    tokio::spawn(async move { runner.run(event_rx, reply_tx).await });
    let adapter = TelegramAdapter::with_base_url(server.uri(), 1).expect("build adapter");
    tokio::spawn(adapter.run(event_tx, reply_rx));

    let sent = wait_for_sends(&server, 1).await;
    assert_eq!(sent[0]["chat_id"], 42);
    assert_eq!(sent[0]["parse_mode"], "HTML");
    let text = sent[0]["text"].as_str().expect("text field");
    assert!(text.contains("Welcome to the weather bot!"));
}

#[tokio::test]
async fn location_then_summary_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getUpdates"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [update(500, 9, "my location is 80301")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/getUpdates"))
        .and(query_param("offset", "501"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [update(501, 9, "?")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/getUpdates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true, "result": [] }))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sendMessage"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let engine = build_engine(&dir);

    let (event_tx, event_rx) = mpsc::channel::<ChatEvent>(8);
    let (reply_tx, reply_rx) = mpsc::channel::<ChatReply>(8);

    let runner = Arc::clone(&engine);
    tokio::spawn(async move { runner.run(event_rx, reply_tx).await });
    let adapter = TelegramAdapter::with_base_url(server.uri(), 1).expect("build adapter");
    tokio::spawn(adapter.run(event_tx, reply_rx));

    // Confirmation for the location, then banner + one summary line.
    let sent = wait_for_sends(&server, 3).await;
    assert_eq!(
        sent[0]["text"],
        "Your current location is set to: Label=80301 (Location=80301)"
    );
    assert_eq!(sent[1]["text"], "Weather for <b>80301</b>");
    let summary = sent[2]["text"].as_str().expect("text field");
    assert!(summary.contains("hi:"), "summary line was: {summary}");
    assert!(summary.contains("80°"), "summary line was: {summary}");
    for message in &sent {
        assert_eq!(message["chat_id"], 9);
    }
}
