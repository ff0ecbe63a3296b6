//! Runs the real reqwest transport against a scripted HTTP server on a
//! random local port.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lib_valorant::retrieve::{FamilyProfile, ReqwestTransport};
use lib_valorant::{ConnectionState, EndpointFamily, PlatformRouting, RequestDispatcher, RetryPolicy, ValorantClient, ValorantError};
use serde_json::json;

struct Reply {
    status: u16,
    content_type: &'static str,
    extra_headers: &'static str,
    body: String,
}

impl Reply {
    fn json(status: u16, body: serde_json::Value) -> Self {
        Reply {
            status,
            content_type: "application/json",
            extra_headers: "",
            body: body.to_string(),
        }
    }

    fn text(status: u16, content_type: &'static str, body: &str) -> Self {
        Reply {
            status,
            content_type,
            extra_headers: "",
            body: body.to_string(),
        }
    }

    fn with_headers(mut self, headers: &'static str) -> Self {
        self.extra_headers = headers;
        self
    }
}

/// Serves one reply per connection, in order, and returns the request heads
/// it saw (lower-cased).
fn serve(replies: Vec<Reply>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let origin = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

    let handle = thread::spawn(move || {
        let mut heads = Vec::new();
        for reply in replies {
            let (mut stream, _) = listener.accept().unwrap();

            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            heads.push(String::from_utf8_lossy(&raw).to_lowercase());

            let response = format!(
                "HTTP/1.1 {} Scripted\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
                reply.status,
                reply.content_type,
                reply.body.len(),
                reply.extra_headers,
                reply.body
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        }
        heads
    });

    (origin, handle)
}

fn client(origin: &str) -> ValorantClient {
    let policy = RetryPolicy {
        backoff_base: Duration::from_millis(10),
        backoff_step: Duration::from_millis(10),
        ..RetryPolicy::default()
    };
    let http = RequestDispatcher::with_transport(Arc::new(ReqwestTransport::new()), policy)
        .with_profile(
            EndpointFamily::Community,
            FamilyProfile::community(Some("community-token".into())).with_base_url(format!("{}/v1", origin)),
        )
        .with_profile(
            EndpointFamily::Riot,
            FamilyProfile::riot(PlatformRouting::Americas, Some("RGAPI-test".into())).with_base_url(origin),
        );
    ValorantClient::from_parts(http, ConnectionState::new())
}

const CEREMONY: &str = "1e71c55c-476e-24ac-0687-e48b07ef2c9c";

fn ceremony() -> serde_json::Value {
    json!({
        "status": 200,
        "data": {"uuid": CEREMONY, "displayName": "ACE", "assetPath": "ShooterGame/Content/Ceremonies/Ace"}
    })
}

#[tokio::test]
async fn bad_gateway_is_retried_over_the_wire() {
    let (origin, server) = serve(vec![
        Reply::text(502, "text/html", "<html>bad gateway</html>"),
        Reply::json(200, ceremony()),
    ]);

    let fetched = client(&origin).fetch_ceremony(CEREMONY, Some(lib_valorant::Language::French)).await.unwrap();
    assert_eq!(fetched.display_name, "ACE");

    let heads = server.join().unwrap();
    assert_eq!(heads.len(), 2);
    let expected_line = format!("get /v1/ceremonies/{}?language=fr-fr http/1.1", CEREMONY);
    assert!(heads[1].starts_with(&expected_line), "{}", heads[1]);
    assert!(heads[1].contains("authorization: community-token"));
    assert!(heads[1].contains("user-agent: valorant-rs/"));
}

#[tokio::test]
async fn unmarked_rate_limit_is_an_edge_rejection() {
    let (origin, server) = serve(vec![Reply::text(429, "text/html", "<html>blocked</html>")]);

    let err = client(&origin).fetch_ceremony(CEREMONY, None).await.unwrap_err();
    assert!(matches!(err, ValorantError::EdgeRejected(_)), "{:?}", err);
    assert_eq!(server.join().unwrap().len(), 1);
}

#[tokio::test]
async fn proxied_rate_limit_is_retried() {
    let (origin, server) = serve(vec![
        Reply::json(429, json!({"status": 429, "error": "rate limited"})).with_headers("Via: 1.1 ratelimit-proxy\r\n"),
        Reply::json(200, ceremony()),
    ]);

    let fetched = client(&origin).fetch_ceremony(CEREMONY, None).await.unwrap();
    assert_eq!(fetched.display_name, "ACE");
    assert_eq!(server.join().unwrap().len(), 2);
}

#[tokio::test]
async fn not_found_keeps_the_response_snapshot() {
    let (origin, server) = serve(vec![Reply::json(404, json!({"status": 404, "error": "the requested uuid was not found"}))]);

    let err = client(&origin).fetch_ceremony("missing", None).await.unwrap_err();
    let failure = err.failure().unwrap();
    assert_eq!(failure.status, 404);
    assert_eq!(failure.message().as_deref(), Some("the requested uuid was not found"));
    assert_eq!(server.join().unwrap().len(), 1);
}

#[tokio::test]
async fn riot_accounts_send_the_api_key_and_skip_the_envelope() {
    let (origin, server) = serve(vec![Reply::json(
        200,
        json!({"puuid": "p-1", "gameName": "Tenz", "tagLine": "0505"}),
    )]);

    let account = client(&origin).fetch_account_by_puuid("p-1").await.unwrap();
    assert_eq!(account.game_name.as_deref(), Some("Tenz"));

    let heads = server.join().unwrap();
    assert!(heads[0].starts_with("get /riot/account/v1/accounts/by-puuid/p-1 http/1.1"));
    assert!(heads[0].contains("x-riot-token: rgapi-test"));
}
