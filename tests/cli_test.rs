//! Runs the `switchboard` binary against wiremock agent endpoints

use serde_json::json;
use std::process::Output;
use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CARD_PATH: &str = "/.well-known/agent-card.json";

async fn agent_server(name: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CARD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": name,
            "description": format!("{} agent", name)
        })))
        .mount(&server)
        .await;
    server
}

/// Run with no API key in the environment and no colors or logs on the output
async fn switchboard(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_switchboard"))
        .args(args)
        .env_remove("SWITCHBOARD_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env("SWITCHBOARD__LLM__BASE_URL", "http://127.0.0.1:9")
        .env("SWITCHBOARD__LLM__MODEL", "test-model")
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "off")
        .output()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_agents_command_needs_no_api_key() {
    let weather = agent_server("weather").await;
    let math = agent_server("math").await;

    let output = switchboard(&["agents", "-u", &weather.uri(), "-u", &math.uri()]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let weather_at = stdout.find("Agent: weather").unwrap();
    let math_at = stdout.find("Agent: math").unwrap();
    assert!(weather_at < math_at);
}

#[tokio::test]
async fn test_discover_command_needs_no_api_key() {
    let weather = agent_server("weather").await;

    let output = switchboard(&["discover", "-u", &weather.uri()]).await;

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("weather agent"));
}

#[tokio::test]
async fn test_failure_prints_one_envelope_and_exits_nonzero() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CARD_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;

    let output = switchboard(&["discover", "-u", &broken.uri()]).await;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("\"code\":502").count(), 1);
    assert!(!stderr.contains("Error: "));
    let envelope: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert_eq!(envelope["code"], 502);
}
