use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use costpilot_core::config::{ConfigError, LlmConfig};
use costpilot_core::errors::AttemptError;
use reqwest::Client as HttpClient;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One chat-completion round trip. Implementations return the first choice's message text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, AttemptError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Non-streaming chat-completions request body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatRequest {
    /// Builds a system + user request with deterministic decoding.
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                ChatMessage { role: ChatRole::System, content: system_prompt.into() },
                ChatMessage { role: ChatRole::User, content: user_prompt.into() },
            ],
            max_tokens,
            temperature: 0.0,
            stream: false,
        }
    }

    pub fn message(&self, role: ChatRole) -> Option<&str> {
        self.messages
            .iter()
            .find(|message| message.role == role)
            .map(|message| message.content.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|choice| choice.message.content)
    }
}

#[derive(Debug, Error)]
pub enum LlmSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to initialize HTTP client: {0}")]
    Http(#[source] reqwest::Error),
}

/// HTTPS chat-completions backend authenticated with a bearer credential.
pub struct ChatCompletionsClient {
    endpoint: String,
    api_key: SecretString,
    timeout: Duration,
    http: HttpClient,
}

impl ChatCompletionsClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmSetupError> {
        let api_key = config.require_api_key()?.clone();
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = HttpClient::builder().timeout(timeout).build().map_err(LlmSetupError::Http)?;

        Ok(Self { endpoint: config.endpoint.clone(), api_key, timeout, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, AttemptError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    AttemptError::Transport(format!(
                        "request timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    AttemptError::Transport(format!("request failed: {error}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Transport(format!(
                "endpoint returned {status}: {}",
                preview(&body, 300)
            )));
        }

        let payload: ChatCompletionResponse = response.json().await.map_err(|error| {
            AttemptError::Transport(format!("unreadable completion payload: {error}"))
        })?;
        payload.into_content().ok_or_else(|| {
            AttemptError::Transport("completion payload carried no message content".to_string())
        })
    }
}

/// In-memory client replaying queued replies in order; clones share the same script.
#[derive(Clone, Default)]
pub struct ScriptedLlmClient {
    replies: Arc<Mutex<VecDeque<Result<String, AttemptError>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, error: AttemptError) {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, AttemptError> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(AttemptError::Transport("no scripted reply left".to_string())))
    }
}

pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use costpilot_core::config::{ConfigError, LlmConfig};
    use costpilot_core::errors::AttemptError;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::{
        preview, ChatCompletionResponse, ChatCompletionsClient, ChatRequest, ChatRole,
        LlmClient, LlmSetupError, ScriptedLlmClient,
    };

    fn llm_config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            endpoint: "https://llm.example.test/v1/chat/completions".to_string(),
            api_key: api_key.map(|key| key.to_string().into()),
            models: vec!["model-a".to_string()],
            max_attempts: 3,
            max_tokens: 1500,
            timeout_secs: 30,
        }
    }

    #[test]
    fn request_body_matches_chat_completions_wire_format() {
        let request = ChatRequest::new("Qwen/Qwen2.5-7B-Instruct", "sys", "usr", 1500);
        let body = serde_json::to_value(&request).expect("request serializes");

        assert_eq!(
            body,
            json!({
                "model": "Qwen/Qwen2.5-7B-Instruct",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "usr"}
                ],
                "max_tokens": 1500,
                "temperature": 0.0,
                "stream": false
            })
        );
        assert_eq!(request.message(ChatRole::User), Some("usr"));
    }

    #[test]
    fn first_choice_content_is_extracted() {
        let payload: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "cmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"a\":1}"}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ]
        }))
        .expect("payload decodes");
        assert_eq!(payload.into_content().as_deref(), Some("{\"a\":1}"));

        let empty: ChatCompletionResponse =
            serde_json::from_value(json!({"choices": []})).expect("payload decodes");
        assert_eq!(empty.into_content(), None);
    }

    fn local_client(endpoint: &str, timeout_secs: u64) -> ChatCompletionsClient {
        let config = LlmConfig {
            endpoint: endpoint.to_string(),
            timeout_secs,
            ..llm_config(Some("hf_test"))
        };
        ChatCompletionsClient::from_config(&config).expect("client should build")
    }

    /// Answers exactly one request with a canned response, after `delay`, and hands back the
    /// raw request it read.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
        delay: Duration,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind local listener");
        let address = listener.local_addr().expect("listener address");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept connection");
            let request = read_request(&mut socket).await;
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{address}/v1/chat/completions"), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.unwrap_or(0);
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.trim().eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buffer.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    #[tokio::test]
    async fn http_client_returns_first_choice_content() {
        let body =
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#;
        let (endpoint, server) = serve_once("200 OK", body, Duration::ZERO).await;
        let request = ChatRequest::new("model-a", "sys", "usr", 1500);

        let content = local_client(&endpoint, 5).complete(&request).await;
        assert_eq!(content.as_deref(), Ok("{\"a\":1}"));

        let raw = server.await.expect("server task").to_ascii_lowercase();
        assert!(raw.starts_with("post /v1/chat/completions "));
        assert!(raw.contains("authorization: bearer hf_test"));
        assert!(raw.contains("\"model\":\"model-a\""));
    }

    #[tokio::test]
    async fn http_error_status_is_a_transport_failure() {
        let (endpoint, _server) =
            serve_once("503 Service Unavailable", r#"{"error":"overloaded"}"#, Duration::ZERO)
                .await;
        let request = ChatRequest::new("model-a", "sys", "usr", 1500);

        match local_client(&endpoint, 5).complete(&request).await {
            Err(AttemptError::Transport(message)) => {
                assert!(message.contains("503"), "unexpected message: {message}");
                assert!(message.contains("overloaded"), "unexpected message: {message}");
            }
            other => panic!("expected a transport failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_are_a_transport_failure() {
        let (endpoint, _server) = serve_once("200 OK", r#"{"choices":[]}"#, Duration::ZERO).await;
        let request = ChatRequest::new("model-a", "sys", "usr", 1500);

        match local_client(&endpoint, 5).complete(&request).await {
            Err(AttemptError::Transport(message)) => {
                assert!(message.contains("no message content"), "unexpected message: {message}");
            }
            other => panic!("expected a transport failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_success_body_is_a_transport_failure() {
        let (endpoint, _server) = serve_once("200 OK", "upstream busy", Duration::ZERO).await;
        let request = ChatRequest::new("model-a", "sys", "usr", 1500);

        match local_client(&endpoint, 5).complete(&request).await {
            Err(AttemptError::Transport(message)) => {
                assert!(message.contains("unreadable"), "unexpected message: {message}");
            }
            other => panic!("expected a transport failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_endpoint_times_out_as_transport_failure() {
        let (endpoint, _server) =
            serve_once("200 OK", r#"{"choices":[]}"#, Duration::from_secs(3)).await;
        let request = ChatRequest::new("model-a", "sys", "usr", 1500);

        match local_client(&endpoint, 1).complete(&request).await {
            Err(AttemptError::Transport(message)) => {
                assert!(message.contains("timed out after 1s"), "unexpected message: {message}");
            }
            other => panic!("expected a transport failure, got {other:?}"),
        }
    }

    #[test]
    fn http_client_requires_credential() {
        let result = ChatCompletionsClient::from_config(&llm_config(None));
        assert!(matches!(result, Err(LlmSetupError::Config(ConfigError::MissingCredential))));

        let blank = ChatCompletionsClient::from_config(&llm_config(Some("   ")));
        assert!(blank.is_err());
    }

    #[test]
    fn http_client_builds_with_credential() {
        let client = ChatCompletionsClient::from_config(&llm_config(Some("hf_test")))
            .expect("client should build");
        assert_eq!(client.endpoint(), "https://llm.example.test/v1/chat/completions");
    }

    #[tokio::test]
    async fn scripted_client_replays_in_order_and_counts_calls() {
        let client = ScriptedLlmClient::with_replies(["first", "second"]);
        client.push_failure(AttemptError::Transport("503".to_string()));
        let request = ChatRequest::new("m", "s", "u", 10);

        assert_eq!(client.complete(&request).await.as_deref(), Ok("first"));
        assert_eq!(client.complete(&request).await.as_deref(), Ok("second"));
        assert!(client.complete(&request).await.is_err());
        assert!(matches!(client.complete(&request).await, Err(AttemptError::Transport(_))));
        assert_eq!(client.call_count(), 4);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("short", 10), "short");
    }
}
