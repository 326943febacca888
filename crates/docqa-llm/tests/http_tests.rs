use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use docqa_core::config::{LlmProvider, LlmSettings};
use docqa_core::traits::LanguageModel;
use docqa_core::Error;
use docqa_llm::{OllamaClient, OpenAiClient};

/// Accept one connection, answer it with a canned response and hand back the raw request.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });
    (format!("http://{}", addr), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:").and_then(|v| v.trim().parse::<usize>().ok()))
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn settings(provider: LlmProvider, base_url: String) -> LlmSettings {
    LlmSettings { provider, base_url: Some(base_url), ..LlmSettings::default() }
}

#[tokio::test]
async fn openai_completion_round_trip() {
    let (url, server) = serve_once(
        "200 OK",
        r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Réponse: 42"}}]}"#,
    )
    .await;
    let client = OpenAiClient::new(reqwest::Client::new(), &settings(LlmProvider::OpenAi, format!("{}/v1", url)), "sk-test".to_string());

    let answer = client.complete("What is the answer?").await.expect("complete");
    assert_eq!(answer, "Réponse: 42");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
    assert!(request.contains(r#""model":"gpt-4o-mini""#));
    assert!(request.contains("What is the answer?"));
}

#[tokio::test]
async fn openai_error_status_is_provider_error() {
    let (url, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota"}}"#,
    )
    .await;
    let client = OpenAiClient::new(reqwest::Client::new(), &settings(LlmProvider::OpenAi, url), "sk-test".to_string());

    let err = client.complete("q").await.unwrap_err();
    match err {
        Error::Provider(msg) => {
            assert!(msg.contains("429"), "{msg}");
            assert!(msg.contains("exceeded your current quota"), "{msg}");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn ollama_completion_round_trip() {
    let (url, server) = serve_once("200 OK", r#"{"model":"llama3","response":"ok","done":true}"#).await;
    let client = OllamaClient::new(reqwest::Client::new(), &settings(LlmProvider::Ollama, url));

    assert_eq!(client.complete("ping").await.expect("complete"), "ok");
    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/generate"));
    assert!(request.contains(r#""stream":false"#));
}

#[tokio::test]
async fn malformed_body_is_provider_error() {
    let (url, server) = serve_once("200 OK", "not json").await;
    let client = OllamaClient::new(reqwest::Client::new(), &settings(LlmProvider::Ollama, url));
    assert!(matches!(client.complete("ping").await, Err(Error::Provider(_))));
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_provider_is_provider_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let client = OllamaClient::new(reqwest::Client::new(), &settings(LlmProvider::Ollama, url));
    assert!(matches!(client.complete("ping").await, Err(Error::Provider(_))));
}
