//! Grounded answer generation.
//!
//! Every answer is produced from a two-message conversation: a fixed safety
//! system prompt plus a user message that embeds the retrieved chunks as an
//! annotated reference block. There is no conversation memory; each question
//! stands alone.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::config::{Config, OpenAiConfig};
use crate::models::RetrievedChunk;
use crate::openai::ApiClient;
use crate::retrieve::Retriever;

/// Fixed system instruction sent with every request. Holds the assistant
/// persona and the non-negotiable safety rules.
pub const SYSTEM_PROMPT: &str = "\
You are a cautious, domain-aware healthcare information assistant.
You are not a doctor and you do not provide medical advice, diagnosis, or treatment.
You answer using only the provided reference materials and your general healthcare knowledge when appropriate.
You must:
- Be conservative and avoid speculation.
- Never tell users to start, stop, or change medications.
- Encourage users to consult a qualified healthcare professional.
- If the user describes symptoms that could indicate an emergency
  (e.g., chest pain, difficulty breathing, suicidal thoughts, stroke symptoms),
  urge them to seek emergency care immediately (e.g., call emergency services).

If the provided context does not contain enough information to answer safely,
say that you are unsure and recommend speaking to a healthcare professional.";

/// One message in a chat completions conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.trim().to_string(),
        }
    }

    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.trim().to_string(),
        }
    }
}

/// Render retrieved chunks as the reference block embedded in the user
/// message: one `Source:` header per chunk, sections separated by `---`.
pub fn format_context_block(contexts: &[RetrievedChunk]) -> String {
    contexts
        .iter()
        .map(|c| format!("Source: {} (chunk {})\n\n{}", c.source, c.chunk_id, c.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Assemble the full two-message conversation for a question and its
/// retrieved context.
pub fn build_messages(question: &str, contexts: &[RetrievedChunk]) -> Vec<ChatMessage> {
    let context_text = format_context_block(contexts);
    // Both slots are filled in one pass; inserted text is never rescanned.
    let user_prompt = format!(
        "\
You are answering a healthcare-related question.

Here are reference excerpts from patient-education materials:

{context_text}

User question:
{question}

Instructions:
- Base your answer primarily on the reference excerpts above.
- If the excerpts do not contain enough information, say so clearly.
- Keep your answer concise, clear, and in plain language.
- Include a brief reminder that you are not a doctor and cannot give medical advice."
    );
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(&user_prompt),
    ]
}

/// Interface to a chat completion backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a conversation and return the assistant's reply text.
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}

/// Chat backend that calls the OpenAI chat completions API.
pub struct OpenAiChat {
    api: ApiClient,
    model: String,
}

impl OpenAiChat {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": temperature,
            "messages": messages,
        });
        let json = self
            .api
            .post_json("chat/completions", &body)
            .await
            .context("Chat completion request failed")?;
        parse_chat_response(&json)
    }
}

/// Pull the assistant reply out of a chat completions response body.
pub fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            anyhow::anyhow!("Invalid chat response: missing choices[0].message.content")
        })?;
    Ok(content.trim().to_string())
}

/// A generated answer together with the chunks it was grounded on.
#[derive(Debug)]
pub struct Answer {
    pub text: String,
    pub contexts: Vec<RetrievedChunk>,
}

/// Retrieval plus generation behind one call.
pub struct AnswerEngine {
    retriever: Retriever,
    chat: Box<dyn ChatBackend>,
    temperature: f32,
}

impl AnswerEngine {
    pub fn new(retriever: Retriever, chat: Box<dyn ChatBackend>, temperature: f32) -> Self {
        Self {
            retriever,
            chat,
            temperature,
        }
    }

    /// Open the production engine. The store is loaded and validated before
    /// any API client exists.
    pub fn open(config: &Config) -> Result<Self> {
        let retriever = Retriever::open(config)?;
        let chat = Box::new(OpenAiChat::new(&config.openai)?);
        Ok(Self::new(retriever, chat, config.openai.temperature))
    }

    /// Answer one question: retrieve context, build the grounded
    /// conversation, call the chat backend. The retrieved chunks come back
    /// alongside the reply so callers can show provenance.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let contexts = self.retriever.retrieve(question, None).await?;
        let messages = build_messages(question, &contexts);
        let text = self.chat.complete(&messages, self.temperature).await?;
        Ok(Answer { text, contexts })
    }
}
