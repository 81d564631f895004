use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::planner::{ChatMessage, ChatModel};

/// A single synchronous call to an OpenAI-compatible chat-completions
/// endpoint, keyed by `model_key` from `Settings::llm_model_key`.
///
/// This is the only place the planner crate talks to the network; the
/// prompt contract and response post-processing live entirely in
/// `HttpPlanner`, which is agnostic to which `ChatModel` backs it.
pub struct HttpChatModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpChatModel {
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("LLM gateway returned no choices"))?
            .message
            .content;

        Ok(content)
    }
}
