//! Narrative collaborator: the one fallible, asynchronous dependency.
//!
//! The session asks for a short message once per CONVERSATION entry. The call
//! runs on a worker thread and is polled from the frame loop. Whatever happens
//! (error, empty answer, worker crash, or no answer before the deadline) the
//! poll eventually yields a displayable string. Errors never reach the phase
//! machine.

use serde::Deserialize;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const FALLBACK_MESSAGE: &str = "Eis que faço novas todas as coisas. Entre no meu repouso.";
pub const EMPTY_RESPONSE_MESSAGE: &str =
    "As coisas velhas passaram. O meu amor faz tudo novo agora.";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const API_KEY_ENV_VAR: &str = "API_KEY";

/// Every variant means the same thing to the game: the narrative service is
/// unavailable and the fallback message is shown.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("no narrative service configured")]
    NotConfigured,
    #[error("narrative request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("narrative service returned HTTP {0}")]
    Status(u16),
    #[error("malformed narrative response: {0}")]
    Malformed(String),
    #[error("narrative worker could not start: {0}")]
    Worker(String),
}

pub trait NarrativeCollaborator: Send + Sync {
    fn generate_message(&self, collected: usize) -> Result<String, NarrativeError>;
}

/// Used when no service is configured. Always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineCollaborator;

impl NarrativeCollaborator for OfflineCollaborator {
    fn generate_message(&self, _collected: usize) -> Result<String, NarrativeError> {
        Err(NarrativeError::NotConfigured)
    }
}

pub fn build_prompt(collected: usize) -> String {
    format!(
        "O jogador está em um jogo poético cristão chamado \"Vida Nova\". \
         Ele renunciou ao seu próprio peso (ego, passado) e coletou {collected} virtudes bíblicas. \
         Agora ele encontrou a \"Vida Nova\" (representação da regeneração em Cristo). \
         Gere uma mensagem curta, solene e bíblica em Português (Brasil) sobre o fim das coisas velhas e o início das novas. \
         Máximo de 20 palavras."
    )
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Pulls the text of the first candidate out of a `generateContent` reply.
/// A well-formed reply with no text yields an empty string.
pub fn extract_text(body: &str) -> Result<String, NarrativeError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| NarrativeError::Malformed(e.to_string()))?;
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text.trim().to_string())
}

pub struct GeminiCollaborator {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl GeminiCollaborator {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, NarrativeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    /// Builds a client from `API_KEY`, or `None` if the variable is unset or
    /// empty.
    pub fn from_env(timeout: Duration) -> Option<Self> {
        let api_key = std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())?;
        match Self::new(api_key, GEMINI_DEFAULT_MODEL.to_string(), timeout) {
            Ok(collaborator) => Some(collaborator),
            Err(err) => {
                log::warn!("Narrative service disabled: {err}");
                None
            }
        }
    }
}

impl NarrativeCollaborator for GeminiCollaborator {
    fn generate_message(&self, collected: usize) -> Result<String, NarrativeError> {
        let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.model);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": build_prompt(collected) }] }]
        });
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(NarrativeError::Status(status.as_u16()));
        }
        extract_text(&response.text()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    Collaborator,
    EmptyResponse,
    Fallback,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMessage {
    pub text: String,
    pub source: MessageSource,
}

impl ResolvedMessage {
    fn fallback(source: MessageSource) -> Self {
        Self {
            text: FALLBACK_MESSAGE.to_string(),
            source,
        }
    }
}

/// Maps a collaborator result onto the message that is shown.
pub fn resolve(result: Result<String, NarrativeError>) -> ResolvedMessage {
    match result {
        Ok(text) if text.trim().is_empty() => ResolvedMessage {
            text: EMPTY_RESPONSE_MESSAGE.to_string(),
            source: MessageSource::EmptyResponse,
        },
        Ok(text) => ResolvedMessage {
            text,
            source: MessageSource::Collaborator,
        },
        Err(err) => {
            log::warn!("Narrative unavailable, using fallback: {err}");
            ResolvedMessage::fallback(MessageSource::Fallback)
        }
    }
}

/// One in-flight request. Dropping it abandons the worker's answer.
///
/// The deadline is wall time, the same clock the worker runs on, so a host
/// that runs frames faster than real time does not starve the request.
pub struct PendingMessage {
    receiver: Receiver<Result<String, NarrativeError>>,
    /// `None` when the timeout is too large to represent.
    deadline: Option<Instant>,
}

impl PendingMessage {
    pub fn spawn(
        collaborator: Arc<dyn NarrativeCollaborator>,
        collected: usize,
        timeout: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        let worker_sender = sender.clone();
        let spawned = thread::Builder::new()
            .name("narrative".to_string())
            .spawn(move || {
                let result = collaborator.generate_message(collected);
                // The session may have moved on; a closed channel is fine.
                let _ = worker_sender.send(result);
            });
        if let Err(err) = spawned {
            let _ = sender.send(Err(NarrativeError::Worker(err.to_string())));
        }
        log::debug!("Narrative request started for {collected} fragments");
        Self {
            receiver,
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Non-blocking. `None` while the request is still running and the
    /// deadline has not passed.
    pub fn poll(&self) -> Option<ResolvedMessage> {
        match self.receiver.try_recv() {
            Ok(result) => Some(resolve(result)),
            Err(TryRecvError::Disconnected) => Some(Self::worker_gone()),
            Err(TryRecvError::Empty)
                if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) =>
            {
                Some(Self::timed_out())
            }
            Err(TryRecvError::Empty) => None,
        }
    }

    /// Blocks until the worker answers or the deadline passes.
    pub fn wait(&self) -> ResolvedMessage {
        let Some(deadline) = self.deadline else {
            return match self.receiver.recv() {
                Ok(result) => resolve(result),
                Err(_) => Self::worker_gone(),
            };
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.receiver.recv_timeout(remaining) {
            Ok(result) => resolve(result),
            Err(RecvTimeoutError::Disconnected) => Self::worker_gone(),
            Err(RecvTimeoutError::Timeout) => Self::timed_out(),
        }
    }

    fn worker_gone() -> ResolvedMessage {
        log::warn!("Narrative worker exited without an answer, using fallback");
        ResolvedMessage::fallback(MessageSource::Fallback)
    }

    fn timed_out() -> ResolvedMessage {
        log::warn!("Narrative request timed out, using fallback");
        ResolvedMessage::fallback(MessageSource::TimedOut)
    }
}
