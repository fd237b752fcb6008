//! Prompt expander.
//!
//! Turns a short user intent into a rich generation prompt by calling a
//! hosted chat-completion model with a fixed system instruction. One
//! outbound call per expansion, no retry; the caller sees the raw failure.

use log::info;

use crate::error::{PipelineError, Result};

/// Default chat-completion endpoint.
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default chat model.
const DEFAULT_MODEL_ID: &str = "gpt-4o";

/// Default character budget for expanded prompts.
const DEFAULT_MAX_CHARS: usize = 200;

/// Request timeout. The service answers in seconds; anything past this is a
/// dead connection.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Configuration record for the expander.
///
/// The instruction text and character budget are configuration, not
/// behavior: the budget is given to the model as guidance and is not
/// enforced on the reply.
#[derive(Debug, Clone)]
pub struct ExpanderConfig {
    /// System instruction sent with every expansion.
    pub system_instruction: String,

    /// Character budget the instruction asks the model to respect.
    pub max_chars: usize,

    /// Chat model identifier.
    pub model_id: String,

    /// Chat-completion endpoint URL. Overridable so tests can point the
    /// adapter at a local stub.
    pub endpoint: String,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_instruction(DEFAULT_MAX_CHARS),
            max_chars: DEFAULT_MAX_CHARS,
            model_id: DEFAULT_MODEL_ID.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl ExpanderConfig {
    /// Creates a config with a custom character budget, regenerating the
    /// instruction to match.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self.system_instruction = default_instruction(max_chars);
        self
    }

    /// Points the adapter at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Builds the system instruction for a given character budget.
fn default_instruction(max_chars: usize) -> String {
    format!(
        "You are a musical prompt engineer. Convert user requests into detailed \
         descriptions for an AI music generator. Include style, instruments, \
         tempo, and mood. Keep it under {} characters.",
        max_chars
    )
}

/// Chat-completion adapter for prompt expansion.
pub struct PromptExpander {
    client: reqwest::blocking::Client,
    api_key: String,
    config: ExpanderConfig,
}

impl PromptExpander {
    /// Creates an expander with the given credential and configuration.
    pub fn new(api_key: impl Into<String>, config: ExpanderConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                PipelineError::upstream("chat-completion", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    /// Returns the configuration record.
    pub fn config(&self) -> &ExpanderConfig {
        &self.config
    }

    /// Expands a user intent into a generation prompt.
    ///
    /// Fails with UPSTREAM_SERVICE if the call errors, returns a non-success
    /// status, or the reply is empty or malformed.
    pub fn expand(&self, intent: &str) -> Result<String> {
        info!("expanding intent: \"{}\"", intent);

        let body = serde_json::json!({
            "model": self.config.model_id,
            "messages": [
                { "role": "system", "content": self.config.system_instruction },
                { "role": "user", "content": intent },
            ],
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| PipelineError::upstream("chat-completion", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::upstream(
                "chat-completion",
                format!("HTTP {}: {}", status, body),
            ));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| PipelineError::upstream("chat-completion", format!("malformed response: {}", e)))?;

        let prompt = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::trim)
            .unwrap_or("");

        if prompt.is_empty() {
            return Err(PipelineError::upstream(
                "chat-completion",
                "response contained no prompt text",
            ));
        }

        info!("expanded prompt: \"{}\"", prompt);
        Ok(prompt.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Serves one canned HTTP response on a local port, then exits.
    fn one_shot_server(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();

            // Drain the request: headers, then content-length body bytes.
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let mut body_len = None;
            loop {
                let n = stream.read(&mut chunk).unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = find_header_end(&buf) {
                    let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                    let len = headers
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    body_len = Some((pos + 4, len));
                }
                if let Some((body_start, len)) = body_len {
                    if buf.len() >= body_start + len {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        format!("http://{}", addr)
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    fn chat_reply(content: &str) -> String {
        serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": content } } ]
        })
        .to_string()
    }

    #[test]
    fn expand_returns_reply_within_budget() {
        let reply = "Chill lofi hip hop, mellow jazz piano, soft brushed drums, 70 BPM, cozy late-night mood";
        let endpoint = one_shot_server("HTTP/1.1 200 OK", chat_reply(reply));

        let expander = PromptExpander::new(
            "test-key",
            ExpanderConfig::default().with_endpoint(endpoint),
        )
        .unwrap();

        let prompt = expander.expand("lofi beat").unwrap();
        assert_eq!(prompt, reply);
        assert!(prompt.len() <= expander.config().max_chars);
    }

    #[test]
    fn empty_reply_is_upstream_error() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", chat_reply("   "));

        let expander = PromptExpander::new(
            "test-key",
            ExpanderConfig::default().with_endpoint(endpoint),
        )
        .unwrap();

        let err = expander.expand("lofi beat").unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamService);
    }

    #[test]
    fn error_status_is_upstream_error() {
        let endpoint = one_shot_server(
            "HTTP/1.1 500 Internal Server Error",
            "{\"error\":\"boom\"}".to_string(),
        );

        let expander = PromptExpander::new(
            "test-key",
            ExpanderConfig::default().with_endpoint(endpoint),
        )
        .unwrap();

        let err = expander.expand("lofi beat").unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamService);
        assert!(err.message.contains("500"));
    }

    #[test]
    fn malformed_body_is_upstream_error() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", "{\"choices\": []}".to_string());

        let expander = PromptExpander::new(
            "test-key",
            ExpanderConfig::default().with_endpoint(endpoint),
        )
        .unwrap();

        let err = expander.expand("lofi beat").unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamService);
    }

    #[test]
    fn custom_budget_rewrites_instruction() {
        let config = ExpanderConfig::default().with_max_chars(120);
        assert_eq!(config.max_chars, 120);
        assert!(config.system_instruction.contains("120"));
    }
}
