//! services/api/src/adapters/correction_llm.rs
//!
//! This module contains the adapter for the diary-correction LLM.
//! It implements the `CorrectionService` port from the `core` crate by calling an
//! OpenAI-compatible chat endpoint (Gemini's, by default) in JSON response mode.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use diary_tutor_core::{
    contract::parse_correction,
    domain::CorrectionResult,
    ports::{CorrectionService, PortError, PortResult},
    prompt::CorrectionPrompt,
};
use serde_json::Value;
use tracing::info;

/// Sampling constraints for corrections: low temperature, bounded output, JSON only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CorrectionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct GeminiCorrectionAdapter {
    /// `None` when no API key was configured.
    client: Option<Client<OpenAIConfig>>,
    model: String,
    generation: GenerationConfig,
}

impl GeminiCorrectionAdapter {
    /// Creates a new `GeminiCorrectionAdapter`. A missing key is only reported
    /// when a correction is requested.
    pub fn new(api_key: Option<&str>, base_url: &str, model: String) -> Self {
        let client = api_key.map(|key| {
            Client::with_config(
                OpenAIConfig::new()
                    .with_api_key(key)
                    .with_api_base(base_url),
            )
        });
        Self {
            client,
            model,
            generation: GenerationConfig::default(),
        }
    }

    /// Builds the chat request body. `top_k` has no typed field in the OpenAI
    /// schema, so it is added to the serialized body.
    fn request_body(&self, prompt: &CorrectionPrompt) -> PortResult<Value> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.user.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.generation.temperature)
            .top_p(self.generation.top_p)
            .max_completion_tokens(self.generation.max_output_tokens)
            .response_format(ResponseFormat::JsonObject)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut body =
            serde_json::to_value(&request).map_err(|e| PortError::Unexpected(e.to_string()))?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("top_k".to_string(), Value::from(self.generation.top_k));
        }
        Ok(body)
    }
}

//=========================================================================================
// `CorrectionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CorrectionService for GeminiCorrectionAdapter {
    /// Sends one correction request and parses the reply against the response contract.
    async fn correct(&self, prompt: &CorrectionPrompt) -> PortResult<CorrectionResult> {
        let client = self.client.as_ref().ok_or_else(|| {
            PortError::Configuration("GEMINI_API_KEY environment variable is not set".to_string())
        })?;

        // Audit trail of exactly what the model sees.
        info!(target: "llm_audit", "---- FINAL SYSTEM PROMPT SENT TO LLM ----\n{}", prompt.system);
        info!(target: "llm_audit", "---- USER PROMPT SENT TO LLM ----\n{}", prompt.user);

        let body = self.request_body(prompt)?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response: CreateChatCompletionResponse = client
            .chat()
            .create_byot(body)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::InvalidResponse(
                    "Correction LLM response contained no text content.".to_string(),
                )
            })?;

        info!("Correction LLM replied with {} bytes", text.len());
        parse_correction(&text)
    }
}
