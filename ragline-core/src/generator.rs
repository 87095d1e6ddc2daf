//! Grounded answer generation through an OpenAI-compatible chat API.
//!
//! The [`Generator`] turns a question and its retrieved context into a single
//! prompt and asks a [`ChatModel`] to answer it. Generation never fails from
//! the caller's point of view: a missing credential or a failed call is
//! reported as a [`GeneratedAnswer`] variant instead.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, error, info, warn};

use crate::config::GenerationConfig;
use crate::document::RetrievedDocument;
use crate::error::{GenerationError, RagError, Result};
use crate::openai::api_error_message;

/// Answer text returned when no completion service is configured.
pub const GENERATION_DISABLED: &str =
    "LLM not available. Please set GROQ_API_KEY environment variable.";

/// System message sent with every completion request.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions based on provided context.";

/// Outcome of a generation attempt.
///
/// Serializes to the same string [`Display`](fmt::Display) produces, so HTTP
/// clients always receive a plain `answer` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedAnswer {
    /// The model answered.
    Text(String),
    /// Generation is disabled for lack of credentials.
    Unavailable,
    /// The completion call failed; carries the reason.
    Failed(String),
}

impl GeneratedAnswer {
    /// The model's answer, if there is one.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for GeneratedAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Unavailable => f.write_str(GENERATION_DISABLED),
            Self::Failed(reason) => write!(f, "Error generating answer: {reason}"),
        }
    }
}

impl Serialize for GeneratedAnswer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One message of a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// A chat-completion service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier of the model answering requests.
    fn model(&self) -> &str;

    /// Return the assistant's reply to `messages`.
    async fn complete(
        &self,
        messages: &[ChatMessage],
    ) -> std::result::Result<String, GenerationError>;
}

/// A [`ChatModel`] speaking the OpenAI `/chat/completions` protocol.
///
/// Defaults to Groq's endpoint, but any compatible server works.
pub struct OpenAiCompatibleChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleChat {
    /// Build a client from `config`, authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the HTTP client cannot be constructed.
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiCompatibleChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
    ) -> std::result::Result<String, GenerationError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(body);
            return Err(GenerationError::Api { status: status.as_u16(), message });
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationError::InvalidResponse("response contained no choices".to_string())
            })
    }
}

/// Render retrieved documents as the context block of the prompt.
pub fn format_context(context: &[RetrievedDocument]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!("[Document {} from {}]\n{}", i + 1, doc.chunk.source, doc.chunk.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The user prompt sent for `query` with `context`.
pub fn build_prompt(query: &str, context: &[RetrievedDocument]) -> String {
    format!(
        "You are a helpful assistant that answers questions based on the provided context.\n\n\
         Context:\n{}\n\n\
         Question: {query}\n\n\
         Please provide a comprehensive answer based on the context above. \
         If the context doesn't contain enough information to answer the question, say so.",
        format_context(context)
    )
}

/// Produces answers grounded in retrieved context.
#[derive(Clone, Default)]
pub struct Generator {
    model: Option<Arc<dyn ChatModel>>,
}

impl Generator {
    /// A generator that always answers [`GeneratedAnswer::Unavailable`].
    pub fn disabled() -> Self {
        Self { model: None }
    }

    /// A generator backed by `model`.
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Build from configuration. A missing or empty API key disables generation.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the HTTP client cannot be constructed.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        match config.api_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => {
                let chat = OpenAiCompatibleChat::new(config, key)?;
                info!(
                    model = %config.model,
                    base_url = %config.base_url,
                    "answer generation enabled"
                );
                Ok(Self::new(Arc::new(chat)))
            }
            None => {
                warn!("GROQ_API_KEY not set, answer generation is disabled");
                Ok(Self::disabled())
            }
        }
    }

    /// Whether a chat model is configured.
    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// Answer `query` from `context`.
    pub async fn generate(&self, query: &str, context: &[RetrievedDocument]) -> GeneratedAnswer {
        let Some(model) = &self.model else {
            return GeneratedAnswer::Unavailable;
        };

        let messages =
            [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(build_prompt(query, context))];
        debug!(model = model.model(), context_count = context.len(), "requesting completion");

        match model.complete(&messages).await {
            Ok(text) => GeneratedAnswer::Text(text),
            Err(e) => {
                error!(model = model.model(), error = %e, "answer generation failed");
                GeneratedAnswer::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;
    use std::sync::Mutex;

    struct ScriptedChat {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
        ) -> std::result::Result<String, GenerationError> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            self.reply.clone().map_err(GenerationError::Request)
        }
    }

    fn doc(text: &str, source: &str) -> RetrievedDocument {
        RetrievedDocument { chunk: Chunk::new(text, source, 0), score: 0.9 }
    }

    #[test]
    fn context_blocks_are_numbered_and_blank_line_separated() {
        let context = format_context(&[doc("Cats purr.", "a.txt"), doc("Dogs bark.", "b.txt")]);
        assert_eq!(
            context,
            "[Document 1 from a.txt]\nCats purr.\n\n[Document 2 from b.txt]\nDogs bark."
        );
    }

    #[test]
    fn prompt_contains_context_and_question() {
        let prompt = build_prompt("Do cats purr?", &[doc("Cats purr.", "a.txt")]);
        let expected = "Context:\n[Document 1 from a.txt]\nCats purr.\n\nQuestion: Do cats purr?";
        assert!(prompt.contains(expected));
        assert!(prompt.ends_with("say so."));
    }

    #[test]
    fn outcomes_render_as_strings() {
        assert_eq!(GeneratedAnswer::Unavailable.to_string(), GENERATION_DISABLED);
        assert_eq!(
            GeneratedAnswer::Failed("timeout".into()).to_string(),
            "Error generating answer: timeout"
        );
        let text = serde_json::to_value(GeneratedAnswer::Text("hi".into())).unwrap();
        assert_eq!(text, serde_json::json!("hi"));
    }

    #[tokio::test]
    async fn disabled_generator_returns_sentinel() {
        let generator = Generator::from_config(&GenerationConfig::default()).unwrap();
        assert!(!generator.is_enabled());
        assert_eq!(generator.generate("q", &[]).await, GeneratedAnswer::Unavailable);
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let chat =
            Arc::new(ScriptedChat { reply: Ok("Yes.".into()), seen: Mutex::new(Vec::new()) });
        let generator = Generator::new(chat.clone());

        let answer = generator.generate("Do cats purr?", &[doc("Cats purr.", "a.txt")]).await;
        assert_eq!(answer, GeneratedAnswer::Text("Yes.".into()));

        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ChatMessage::system(SYSTEM_PROMPT));
        assert_eq!(seen[1].role, "user");
    }

    #[tokio::test]
    async fn failures_are_reported_in_band() {
        let chat = Arc::new(ScriptedChat {
            reply: Err("connection reset".into()),
            seen: Mutex::new(Vec::new()),
        });
        let answer = Generator::new(chat).generate("q", &[]).await;
        assert_eq!(answer, GeneratedAnswer::Failed("request failed: connection reset".into()));
    }
}
