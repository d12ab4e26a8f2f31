//! Minimal OpenAI-compatible client acting as the remote judge.
//!
//! We only call chat.completions and request either plain text (hints) or a
//! JSON object (verdicts). Calls are instrumented and log model names,
//! latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key or the learner's code.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};
use futures::future::BoxFuture;

use crate::config::Prompts;
use crate::error::OracleError;
use crate::oracle::{HintRequest, Oracle, ValidateRequest};
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub prompts: Prompts,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; `Ok(None)` without one.
  /// The overall call bound lives in `OracleClient`; this is a transport backstop.
  pub fn from_env(prompts: Prompts, request_timeout: std::time::Duration) -> Result<Option<Self>, OracleError> {
    let Some(api_key) = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()) else {
      return Ok(None);
    };
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model =
      std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(request_timeout)
      .build()
      .map_err(|e| {
        error!(target: "oracle", error = %e, "Failed to build HTTP client for OpenAI");
        OracleError::from(e)
      })?;

    Ok(Some(Self { client, api_key, base_url, model, prompts }))
  }

  /// Shared POST to chat.completions; returns the first choice's content.
  async fn chat(&self, req: &ChatCompletionRequest) -> Result<String, OracleError> {
    let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
    let res = self.client.post(&url)
      .header(USER_AGENT, "pyquest-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(OracleError::Http { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(target: "oracle", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| OracleError::MalformedReply("no choices in completion".into()))
  }

  /// Plain-text chat completion. Used for hints.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_plain(&self, system: &str, user: &str, temperature: f32) -> Result<String, OracleError> {
    let req = ChatCompletionRequest::new(&self.model, system, user, temperature, None);
    let text = self.chat(&req).await?;
    Ok(text.trim().to_string())
  }

  /// JSON-object chat completion. The payload is returned untyped; shape
  /// checking is the caller's job.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json(&self, system: &str, user: &str, temperature: f32) -> Result<Value, OracleError> {
    let format = Some(ResponseFormat { r#type: "json_object".into() });
    let req = ChatCompletionRequest::new(&self.model, system, user, temperature, format);
    let text = self.chat(&req).await?;
    serde_json::from_str::<Value>(&text).map_err(|e| OracleError::MalformedReply(format!("JSON parse error: {}", e)))
  }

  pub fn validation_prompt(&self, req: &ValidateRequest) -> String {
    fill_template(
      &self.prompts.validation_user_template,
      &[("topic", req.topic.as_str()), ("objective", req.objective.as_str()), ("code", req.code.as_str())],
    )
  }

  pub fn hint_prompt(&self, req: &HintRequest) -> String {
    fill_template(&self.prompts.hint_user_template, &[("objective", req.objective.as_str()), ("code", req.code.as_str())])
  }
}

impl Oracle for OpenAI {
  fn name(&self) -> &'static str { "openai" }

  fn validate<'a>(&'a self, req: &'a ValidateRequest) -> BoxFuture<'a, Result<Value, OracleError>> {
    Box::pin(async move {
      let user = self.validation_prompt(req);
      // Low temperature keeps verdicts consistent across retries.
      self.chat_json(&self.prompts.validation_system, &user, 0.1).await
    })
  }

  fn hint<'a>(&'a self, req: &'a HintRequest) -> BoxFuture<'a, Result<String, OracleError>> {
    Box::pin(async move {
      let user = self.hint_prompt(req);
      self.chat_plain(&self.prompts.hint_system, &user, 0.7).await
    })
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}

impl ChatCompletionRequest {
  fn new(model: &str, system: &str, user: &str, temperature: f32, response_format: Option<ResponseFormat>) -> Self {
    Self {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format,
    }
  }
}

#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client() -> OpenAI {
    OpenAI {
      client: reqwest::Client::new(),
      api_key: "test".into(),
      base_url: "http://localhost".into(),
      model: "gpt-4o-mini".into(),
      prompts: Prompts::default(),
    }
  }

  #[test]
  fn validation_prompt_carries_submission() {
    let oa = client();
    let p = oa.validation_prompt(&ValidateRequest {
      code: "print(f\"{status}\")".into(),
      objective: "Print the status.".into(),
      topic: "Variables & Print".into(),
    });
    assert!(p.contains("Topic: Variables & Print"));
    assert!(p.contains("Mission Objective: Print the status."));
    assert!(p.contains("print(f\"{status}\")"));
    assert!(p.contains("\"correct\": boolean"));
  }

  #[test]
  fn hint_prompt_caps_length() {
    let oa = client();
    let p = oa.hint_prompt(&HintRequest { code: "x = 1".into(), objective: "Loop.".into() });
    assert!(p.contains("Objective: Loop."));
    assert!(p.contains("Current Code: x = 1"));
    assert!(p.contains("Max 20 words"));
  }

  #[test]
  fn request_omits_absent_response_format() {
    let req = ChatCompletionRequest::new("m", "s", "u", 0.1, None);
    let v = serde_json::to_value(&req).unwrap();
    assert!(v.get("response_format").is_none());
    assert_eq!(v["messages"][1]["content"], "u");
  }

  #[test]
  fn extracts_error_message() {
    let body = r#"{"error":{"message":"Invalid API key","type":"auth"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Invalid API key"));
    assert!(extract_openai_error("<html>").is_none());
  }
}
