//! Voice-over synthesizer.
//!
//! Sends text to a hosted text-to-speech API and buffers the full audio
//! reply before persisting it. No streaming; one outbound call, no retry.

use std::path::Path;

use log::info;

use crate::error::{PipelineError, Result};
use crate::types::AudioArtifact;

/// Default speech-synthesis endpoint. The voice id is appended per request.
const DEFAULT_ENDPOINT: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Default voice.
const DEFAULT_VOICE_ID: &str = "Rachel";

/// Default speech model.
const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Request timeout; synthesis of a short clip stays well under this.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Configuration record for the synthesizer.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Voice identifier or name.
    pub voice_id: String,

    /// Speech model identifier.
    pub model_id: String,

    /// Endpoint base URL. Overridable so tests can point the adapter at a
    /// local stub.
    pub endpoint: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl VoiceConfig {
    /// Selects a different voice.
    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    /// Points the adapter at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Text-to-speech adapter.
pub struct VoiceSynthesizer {
    client: reqwest::blocking::Client,
    api_key: String,
    config: VoiceConfig,
}

impl VoiceSynthesizer {
    /// Creates a synthesizer with the given credential and configuration.
    pub fn new(api_key: impl Into<String>, config: VoiceConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                PipelineError::upstream("speech-synthesis", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    /// Returns the configuration record.
    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Synthesizes speech for the text, returning the full audio bytes.
    ///
    /// Fails with UPSTREAM_SERVICE on transport errors, non-success status,
    /// or an empty reply body.
    pub fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        info!("synthesizing voice-over: \"{}\"", text);

        let url = format!("{}/{}", self.config.endpoint, self.config.voice_id);

        let body = serde_json::json!({
            "text": text,
            "model_id": self.config.model_id,
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| PipelineError::upstream("speech-synthesis", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::upstream(
                "speech-synthesis",
                format!("HTTP {}: {}", status, body),
            ));
        }

        let audio = response
            .bytes()
            .map_err(|e| PipelineError::upstream("speech-synthesis", e.to_string()))?
            .to_vec();

        if audio.is_empty() {
            return Err(PipelineError::upstream(
                "speech-synthesis",
                "response contained no audio",
            ));
        }

        info!("received {} bytes of speech audio", audio.len());
        Ok(audio)
    }
}

/// Persists synthesized speech bytes as a voice artifact.
///
/// Fails with ENCODING_FAILED on an empty payload or an unwritable path.
pub fn save(audio: &[u8], path: &Path) -> Result<AudioArtifact> {
    if audio.is_empty() {
        return Err(PipelineError::encoding_failed("speech audio is empty"));
    }

    std::fs::write(path, audio).map_err(|e| {
        PipelineError::encoding_failed(format!("failed to write {}: {}", path.display(), e))
    })?;

    Ok(AudioArtifact::voice(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::ArtifactKind;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Serves one canned HTTP response on a local port, then exits.
    fn one_shot_server(status_line: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();

            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let mut body_len = None;
            loop {
                let n = stream.read(&mut chunk).unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
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

            let header = format!(
                "{}\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            stream.write_all(header.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });

        format!("http://{}", addr)
    }

    #[test]
    fn synthesize_returns_audio_bytes() {
        let audio = b"ID3fake-mp3-bytes".to_vec();
        let endpoint = one_shot_server("HTTP/1.1 200 OK", audio.clone());

        let synth = VoiceSynthesizer::new(
            "test-key",
            VoiceConfig::default().with_endpoint(endpoint),
        )
        .unwrap();

        let bytes = synth.synthesize("Buckle up.").unwrap();
        assert_eq!(bytes, audio);
    }

    #[test]
    fn error_status_is_upstream_error() {
        let endpoint = one_shot_server("HTTP/1.1 401 Unauthorized", b"{}".to_vec());

        let synth = VoiceSynthesizer::new(
            "bad-key",
            VoiceConfig::default().with_endpoint(endpoint),
        )
        .unwrap();

        let err = synth.synthesize("hello").unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamService);
        assert!(err.message.contains("401"));
    }

    #[test]
    fn empty_body_is_upstream_error() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", Vec::new());

        let synth = VoiceSynthesizer::new(
            "test-key",
            VoiceConfig::default().with_endpoint(endpoint),
        )
        .unwrap();

        let err = synth.synthesize("hello").unwrap_err();
        assert_eq!(err.code, ErrorCode::UpstreamService);
    }

    #[test]
    fn save_writes_voice_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intro.mp3");

        let artifact = save(b"ID3fake", &path).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Voice);
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3fake");
    }

    #[test]
    fn save_rejects_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let err = save(&[], &dir.path().join("empty.mp3")).unwrap_err();
        assert_eq!(err.code, ErrorCode::EncodingFailed);
    }

    #[test]
    fn save_rejects_unwritable_path() {
        let err = save(b"ID3", Path::new("/nonexistent-dir/v.mp3")).unwrap_err();
        assert_eq!(err.code, ErrorCode::EncodingFailed);
    }
}
