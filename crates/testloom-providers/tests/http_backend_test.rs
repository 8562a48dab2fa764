//! Backends against a one-shot local HTTP server

use testloom_core::{GenerationError, TextGenerator};
use testloom_providers::{GeminiClient, OpenAICompatibleClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one response, returning the base URL and the raw request
async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{}", addr), handle)
}

fn local_http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buffer).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer).to_string()
}

#[tokio::test]
async fn test_gemini_success() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"candidates": [{"content": {"parts": [{"text": " VALID"}, {"text": "_X "}]}}]}"#,
    )
    .await;

    let client = GeminiClient::new("test-key", "gemini-1.5-flash").with_base_url(base_url)
        .with_http_client(local_http());
    let fragments = client.generate("Generate a single, valid data value").await.unwrap();
    assert_eq!(fragments, vec![" VALID", "_X "]);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /models/gemini-1.5-flash:generateContent HTTP/1.1"));
    assert!(request.to_lowercase().contains("x-goog-api-key: test-key"));
    assert!(!request.contains("key=test-key"));
    assert!(request.contains("Generate a single, valid data value"));
}

#[tokio::test]
async fn test_gemini_api_error_keeps_status_and_body() {
    let (base_url, server) = serve_once("429 Too Many Requests", r#"{"error": "quota"}"#).await;

    let client = GeminiClient::new("k", "gemini-1.5-flash").with_base_url(base_url)
        .with_http_client(local_http());
    let err = client.generate("anything").await.unwrap_err();
    assert_eq!(
        err,
        GenerationError::Api {
            status: 429,
            body: r#"{"error": "quota"}"#.to_string(),
        }
    );
    server.await.unwrap();
}

#[tokio::test]
async fn test_undecodable_body() {
    let (base_url, server) = serve_once("200 OK", "<html>gateway</html>").await;

    let client = OpenAICompatibleClient::new("local", None, base_url, "llama3")
        .with_http_client(local_http());
    let err = client.generate("anything").await.unwrap_err();
    assert!(matches!(err, GenerationError::Decode(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_openai_compatible_sends_bearer_token() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"choices": [{"message": {"role": "assistant", "content": "{\"not_null\": true}"}}]}"#,
    )
    .await;

    let client = OpenAICompatibleClient::new("remote", Some("sk-test".into()), base_url, "gpt-4o-mini")
        .with_header("X-Run", "e2e")
        .with_http_client(local_http());
    let fragments = client.generate("extract rules").await.unwrap();
    assert_eq!(fragments, vec![r#"{"not_null": true}"#]);

    let request = server.await.unwrap().to_lowercase();
    assert!(request.starts_with("post /chat/completions"));
    assert!(request.contains("authorization: bearer sk-test"));
    assert!(request.contains("x-run: e2e"));
}

#[tokio::test]
async fn test_unreachable_backend_is_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OpenAICompatibleClient::new("gone", None, format!("http://{}", addr), "m")
        .with_http_client(local_http());
    let err = client.generate("anything").await.unwrap_err();
    assert!(matches!(err, GenerationError::Request(_)));
}

#[tokio::test]
async fn test_transport_error_never_carries_the_key() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GeminiClient::new("SUPERSECRETKEY", "gemini-1.5-flash")
        .with_base_url(format!("http://{}/v1beta", addr))
        .with_http_client(local_http());
    let err = client.generate("hi").await.unwrap_err();
    assert!(matches!(err, GenerationError::Request(_)));
    assert!(!err.to_string().contains("SUPERSECRETKEY"));
    assert!(!format!("{:?}", err).contains("SUPERSECRETKEY"));
}
