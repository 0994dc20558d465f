use crate::error::{AIError, GameError};
use crate::message::{Message, PromptMessage, PromptRole};
use crate::prompts::{NARRATOR_PREAMBLE, RETRY_DIRECTIVE};
use crate::settings::Settings;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{Duration, timeout};

/// A text completion capability: role-annotated messages in, one text blob out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, AIError>;
}

pub struct OpenAIGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIGenerator {
    pub fn new(settings: &Settings) -> Result<Self, AIError> {
        let api_key = settings
            .openai_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AIError::MissingApiKey)?;

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = &settings.openai_base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    fn to_request_message(message: &PromptMessage) -> Result<ChatCompletionRequestMessage, AIError> {
        let content = message.content.clone();
        let request_message: ChatCompletionRequestMessage = match message.role {
            PromptRole::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()?
                .into(),
            PromptRole::User => ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()?
                .into(),
            PromptRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(content)
                .build()?
                .into(),
        };
        Ok(request_message)
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, AIError> {
        let messages = messages
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(self.max_tokens)
            .n(1)
            .temperature(self.temperature)
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(|content| content.trim().to_string())
            .ok_or(AIError::NoMessageFound)
    }
}

/// True when the text carries the three numbered choice markers.
pub fn is_well_formed(text: &str) -> bool {
    ["1.", "2.", "3."].iter().all(|marker| text.contains(marker))
}

/// Wraps a [`TextGenerator`] with the game persona, a bounded context window,
/// a per-call timeout and the one-shot retry for malformed scenarios.
///
/// Every failure of the underlying service is reported as
/// [`GameError::GenerationUnavailable`], so callers can answer with a fixed
/// apology while leaving their state untouched.
#[derive(Clone)]
pub struct Narrator {
    generator: Arc<dyn TextGenerator>,
    context_window: usize,
    call_timeout: Duration,
}

impl Narrator {
    pub fn new(generator: Arc<dyn TextGenerator>, context_window: usize, call_timeout: Duration) -> Self {
        Self {
            generator,
            context_window,
            call_timeout,
        }
    }

    pub fn from_settings(generator: Arc<dyn TextGenerator>, settings: &Settings) -> Self {
        Self::new(generator, settings.context_window, settings.generation_timeout())
    }

    // Persona first, then the task, then the trailing window of history.
    fn build_messages(&self, instruction: &str, history: &[Message]) -> Vec<PromptMessage> {
        let start = history.len().saturating_sub(self.context_window);
        let mut messages = Vec::with_capacity(2 + history.len() - start);
        messages.push(PromptMessage::system(NARRATOR_PREAMBLE.trim()));
        messages.push(PromptMessage::user(instruction));
        messages.extend(history[start..].iter().map(PromptMessage::from));
        messages
    }

    async fn call(&self, instruction: &str, history: &[Message]) -> Result<String, AIError> {
        let messages = self.build_messages(instruction, history);
        match timeout(self.call_timeout, self.generator.complete(&messages)).await {
            Ok(result) => result,
            Err(_) => Err(AIError::Timeout),
        }
    }

    /// Free-form generation, no shape check.
    pub async fn narrate(&self, instruction: &str, history: &[Message]) -> Result<String, GameError> {
        self.call(instruction, history).await.map_err(|e| {
            log::error!("Narrative generation failed: {e}");
            GameError::GenerationUnavailable
        })
    }

    /// Generates a scenario that should end with three numbered choices. A malformed
    /// answer is retried exactly once; if the retry is still malformed (or fails) the
    /// first answer is returned as-is.
    pub async fn scenario(&self, instruction: &str, history: &[Message]) -> Result<String, GameError> {
        let first = self.narrate(instruction, history).await?;
        if is_well_formed(&first) {
            return Ok(first);
        }

        log::info!("Regenerating scenario to include choices...");
        let retry_instruction = format!("{instruction}{RETRY_DIRECTIVE}");
        match self.call(&retry_instruction, history).await {
            Ok(second) if is_well_formed(&second) => Ok(second),
            Ok(second) => {
                log::warn!("Scenario still lacks numbered choices after retry");
                Ok(second)
            }
            Err(e) => {
                log::warn!("Scenario retry failed, keeping first answer: {e}");
                Ok(first)
            }
        }
    }
}
