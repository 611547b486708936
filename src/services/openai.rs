//! Question answering via the OpenAI Responses API
//!
//! Multi-turn context is preserved by threading the previous response id
//! as the continuation token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, Language};

use super::{AnswerReply, QuestionAnswerer, ServiceError};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/responses";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Serialize)]
struct AskRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct AskResponse {
    id: String,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

/// Answering backend talking to the OpenAI Responses API
pub struct OpenAiAnswerer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    system_message: String,
    language: Language,
    answer_word_limit: usize,
}

impl OpenAiAnswerer {
    pub fn new(api_key: String, config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            system_message: config.system_message.clone(),
            language: config.language,
            answer_word_limit: config.answer_word_limit,
        }
    }
}

#[async_trait]
impl QuestionAnswerer for OpenAiAnswerer {
    async fn ask(
        &self,
        question: &str,
        continuation: Option<&str>,
    ) -> Result<AnswerReply, ServiceError> {
        let hint = self.language.answer_length_hint(self.answer_word_limit);
        let input = format!("{question}. {hint}");

        let request = AskRequest {
            model: &self.model,
            instructions: &self.system_message,
            input: &input,
            previous_response_id: continuation,
        };

        debug!(question, ?continuation, "asking answering service");

        let response: AskResponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text: String = response
            .output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ServiceError::UnexpectedResponse(
                "answer contained no text".to_string(),
            ));
        }

        Ok(AnswerReply {
            text,
            continuation_token: response.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_skips_absent_continuation() {
        let request = AskRequest {
            model: "m",
            instructions: "sys",
            input: "q",
            previous_response_id: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("previous_response_id"));
    }

    #[test]
    fn test_request_threads_continuation() {
        let request = AskRequest {
            model: "m",
            instructions: "sys",
            input: "q",
            previous_response_id: Some("resp_123"),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""previous_response_id":"resp_123""#));
    }

    #[test]
    fn test_response_text_extraction() {
        let raw = r#"{
            "id": "resp_abc",
            "output": [
                {"content": [{"text": "It is "}, {"text": "sunny."}]}
            ]
        }"#;
        let response: AskResponse = serde_json::from_str(raw).unwrap();
        let text: String = response
            .output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter_map(|part| part.text.as_deref())
            .collect();
        assert_eq!(text, "It is sunny.");
        assert_eq!(response.id, "resp_abc");
    }
}
