use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ServiceError;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIMessage {
    pub role: Role,
    pub content: String,
}


impl AIMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}


/// Body of a chat completion call.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<AIMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}


/// External completion service. Returns the raw text of the first choice.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}


pub struct OpenAiCompletion {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}


impl OpenAiCompletion {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}


#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        debug!(model = %request.model, messages = request.messages.len(), "sending completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "completion service error");
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let body = resp.text().await?;
        first_choice_text(&body)
    }
}


#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}


#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}


#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}


fn first_choice_text(body: &str) -> Result<String, ServiceError> {
    let parsed: ApiResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::Parse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ServiceError::EmptyResponse)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_in_wire_shape() {
        let request = CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                AIMessage::new(Role::System, "persona"),
                AIMessage::new(Role::User, "hi"),
            ],
            temperature: 1.2,
            max_tokens: 150,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["max_tokens"], 150);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    #[test]
    fn picks_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  hello  "}},{"message":{"content":"second"}}]}"#;
        assert_eq!(first_choice_text(body).unwrap(), "  hello  ");
    }

    #[test]
    fn missing_choices_is_an_error() {
        assert!(matches!(
            first_choice_text(r#"{"choices":[]}"#),
            Err(ServiceError::EmptyResponse)
        ));
        assert!(matches!(
            first_choice_text(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(ServiceError::EmptyResponse)
        ));
        assert!(matches!(first_choice_text("not json"), Err(ServiceError::Parse(_))));
    }
}
