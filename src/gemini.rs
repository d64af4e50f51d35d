//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent` and ask for either plain
//! text or a JSON payload that we parse best-effort (markdown fences
//! stripped first). Calls are instrumented and log model names, latencies,
//! and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::Prompts;
use crate::domain::QuizQuestion;
use crate::protocol::{ChatTurn, PerformanceAnalysis, StudyPlan};
use crate::util::{fill_template, join_or};

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  /// There is no re-initialization after startup: a missing key means the
  /// AI features stay disabled for the process lifetime.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok()?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// Single-turn text generation: one user message in, raw text out.
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str) -> Result<String, String> {
    self.generate_contents(vec![Content::user(prompt)]).await
  }

  /// Multi-turn generation over an explicit content list (tutor chat).
  #[instrument(level = "info", skip(self, contents), fields(model = %self.model, turns = contents.len()))]
  async fn generate_contents(&self, contents: Vec<Content>) -> Result<String, String> {
    let url = format!(
      "{}/models/{}:generateContent?key={}",
      self.base_url, self.model, self.api_key
    );
    let req = GenerateContentRequest { contents };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "learnsphere-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req).send().await.map_err(|e| e.to_string())?;
    let elapsed = start.elapsed();

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      return Err(format!("Gemini HTTP {}: {}", status, msg));
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage_metadata {
      info!(
        prompt_tokens = ?usage.prompt_token_count,
        candidate_tokens = ?usage.candidates_token_count,
        total_tokens = ?usage.total_token_count,
        ?elapsed,
        "Gemini usage"
      );
    }

    let text = body
      .candidates
      .into_iter()
      .next()
      .map(|c| {
        c.content
          .parts
          .into_iter()
          .filter_map(|p| p.text)
          .collect::<Vec<_>>()
          .join("")
      })
      .unwrap_or_default()
      .trim()
      .to_string();

    Ok(text)
  }

  // --- High-level helpers (domain-specialized) ---

  /// Generate a batch of multiple-choice questions for one topic.
  /// Malformed model output degrades to an empty batch; N requested does
  /// not guarantee N returned.
  #[instrument(level = "info", skip(self, prompts), fields(%topic, %difficulty, count))]
  pub async fn generate_quiz_questions(
    &self,
    prompts: &Prompts,
    topic: &str,
    difficulty: &str,
    count: usize,
  ) -> Result<Vec<QuizQuestion>, String> {
    let prompt = fill_template(
      &prompts.quiz_user_template,
      &[("topic", topic), ("difficulty", difficulty), ("count", &count.to_string())],
    );
    let text = self.generate(&prompt).await?;
    let batch = parse_question_batch(&text, topic, difficulty);
    info!(target: "ai", %topic, requested = count, returned = batch.len(), "Question batch parsed");
    Ok(batch)
  }

  /// Analyze merged quiz scores and weak topics into a recommendation object.
  #[instrument(level = "info", skip(self, prompts, quiz_scores, weak_topics), fields(topics = weak_topics.len()))]
  pub async fn analyze_performance(
    &self,
    prompts: &Prompts,
    quiz_scores: &BTreeMap<String, f64>,
    weak_topics: &[String],
  ) -> Result<PerformanceAnalysis, String> {
    let scores_json = serde_json::to_string(quiz_scores).map_err(|e| e.to_string())?;
    let prompt = fill_template(
      &prompts.analysis_user_template,
      &[
        ("quiz_scores", &scores_json),
        ("weak_topics", &join_or(weak_topics, "None identified")),
      ],
    );
    let text = self.generate(&prompt).await?;
    serde_json::from_str(&extract_fenced(&text)).map_err(|e| format!("JSON parse error: {}", e))
  }

  /// One tutor exchange. The caller supplies all prior turns each time; no
  /// history is kept here. The student's message is prefixed with a system
  /// instruction assembled from their name, weak topics, and recent scores.
  #[instrument(level = "info", skip(self, prompts, message, quiz_scores, weak_topics, history), fields(%name, history_len = history.len(), msg_len = message.len()))]
  pub async fn chat_with_tutor(
    &self,
    prompts: &Prompts,
    message: &str,
    name: &str,
    weak_topics: &[String],
    quiz_scores: &BTreeMap<String, f64>,
    history: &[ChatTurn],
  ) -> Result<String, String> {
    let scores_json = serde_json::to_string(quiz_scores).map_err(|e| e.to_string())?;
    let system = fill_template(
      &prompts.tutor_system_template,
      &[
        ("name", name),
        ("weak_topics", &join_or(weak_topics, "None")),
        ("quiz_scores", &scores_json),
      ],
    );

    let mut contents: Vec<Content> = history
      .iter()
      .map(|t| Content {
        role: t.role.clone(),
        parts: vec![Part { text: Some(t.text.clone()) }],
      })
      .collect();
    contents.push(Content::user(&format!("{}\n\nStudent: {}", system, message)));

    self.generate_contents(contents).await
  }

  /// Synthesize a weekly study plan from the weak-topic set.
  #[instrument(level = "info", skip(self, prompts, weak_topics), fields(topics = weak_topics.len(), hours))]
  pub async fn generate_study_plan(
    &self,
    prompts: &Prompts,
    weak_topics: &[String],
    hours: u32,
  ) -> Result<StudyPlan, String> {
    let prompt = fill_template(
      &prompts.study_plan_user_template,
      &[
        ("weak_topics", &join_or(weak_topics, "General review")),
        ("hours", &hours.to_string()),
      ],
    );
    let text = self.generate(&prompt).await?;
    serde_json::from_str(&extract_fenced(&text)).map_err(|e| format!("JSON parse error: {}", e))
  }

  /// Free-text concept explanation; no structured parsing on this path.
  #[instrument(level = "info", skip(self, prompts), fields(%topic, %concept, %difficulty))]
  pub async fn explain_concept(
    &self,
    prompts: &Prompts,
    topic: &str,
    concept: &str,
    difficulty: &str,
  ) -> Result<String, String> {
    let prompt = fill_template(
      &prompts.explain_user_template,
      &[("topic", topic), ("concept", concept), ("difficulty", difficulty)],
    );
    self.generate(&prompt).await
  }
}

/// Strip a markdown code fence from model output.
///
/// If the text contains an opening fence (with an optional language tag),
/// the content up to the closing fence is returned; an unclosed fence yields
/// everything after the opening. Without any fence the whole trimmed text is
/// returned as-is.
pub fn extract_fenced(raw: &str) -> String {
  let t = raw.trim();
  let Some(open) = t.find("```") else {
    return t.to_string();
  };
  let rest = &t[open + 3..];
  let body = match rest.split_once('\n') {
    Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
    _ => rest,
  };
  match body.find("```") {
    Some(close) => body[..close].trim().to_string(),
    None => body.trim().to_string(),
  }
}

/// Best-effort parse of a model reply into validated quiz questions.
///
/// The reply must be a JSON array (possibly inside a code fence). Items
/// missing `question`, `options` or `correct_answer` are silently dropped;
/// `topic` and `difficulty` come from the request, `hint`/`explanation`
/// default to empty. Anything unparseable degrades to an empty batch.
pub fn parse_question_batch(raw: &str, topic: &str, difficulty: &str) -> Vec<QuizQuestion> {
  #[derive(Deserialize)]
  struct RawQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: String,
    #[serde(default)]
    hint: String,
    #[serde(default)]
    explanation: String,
  }

  let text = extract_fenced(raw);
  let items: Vec<Value> = match serde_json::from_str(&text) {
    Ok(Value::Array(items)) => items,
    Ok(_) | Err(_) => {
      warn!(target: "ai", preview = %crate::util::trunc_for_log(&text, 80), "Model reply was not a JSON array; dropping batch");
      return Vec::new();
    }
  };

  let mut out = Vec::new();
  for item in items {
    match serde_json::from_value::<RawQuestion>(item) {
      Ok(q) => out.push(QuizQuestion {
        id: Uuid::new_v4().to_string(),
        topic: topic.to_string(),
        question: q.question,
        options: q.options,
        correct_answer: q.correct_answer,
        difficulty: difficulty.to_string(),
        hint: q.hint,
        explanation: q.explanation,
      }),
      Err(e) => {
        error!(target: "ai", error = %e, "Dropping malformed question object");
      }
    }
  }
  out
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct GenerateContentRequest {
  contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
  role: String,
  parts: Vec<Part>,
}

impl Content {
  fn user(text: &str) -> Self {
    Self { role: "user".into(), parts: vec![Part { text: Some(text.to_string()) }] }
  }
}

#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(skip_serializing_if = "Option::is_none")]
  text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(rename = "usageMetadata", default)]
  usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
  content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Deserialize)]
struct UsageMetadata {
  #[serde(rename = "promptTokenCount", default)]
  prompt_token_count: Option<u32>,
  #[serde(rename = "candidatesTokenCount", default)]
  candidates_token_count: Option<u32>,
  #[serde(rename = "totalTokenCount", default)]
  total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extract_fenced_handles_json_tag() {
    let raw = "```json\n[1, 2]\n```";
    assert_eq!(extract_fenced(raw), "[1, 2]");
  }

  #[test]
  fn extract_fenced_handles_bare_fence_and_surrounding_prose() {
    let raw = "Here you go:\n```\n{\"a\": 1}\n```\nEnjoy!";
    assert_eq!(extract_fenced(raw), "{\"a\": 1}");
  }

  #[test]
  fn extract_fenced_tolerates_an_unclosed_fence() {
    assert_eq!(extract_fenced("```json\n[true]"), "[true]");
  }

  #[test]
  fn extract_fenced_passes_plain_text_through() {
    assert_eq!(extract_fenced("  [1]  "), "[1]");
  }

  #[test]
  fn question_batch_fills_request_parameters_and_defaults() {
    let raw = "```json\n[{\"question\":\"Q\",\"options\":[\"A\",\"B\",\"C\"],\"correct_answer\":\"A\"}]\n```";
    let batch = parse_question_batch(raw, "Algebra", "easy");
    assert_eq!(batch.len(), 1);
    let q = &batch[0];
    assert_eq!(q.topic, "Algebra");
    assert_eq!(q.difficulty, "easy");
    assert_eq!(q.correct_answer, "A");
    assert_eq!(q.hint, "");
    assert_eq!(q.explanation, "");
  }

  #[test]
  fn question_batch_degrades_to_empty_on_invalid_json() {
    assert!(parse_question_batch("Sorry, I can't do that.", "Algebra", "easy").is_empty());
    assert!(parse_question_batch("{\"not\": \"an array\"}", "Algebra", "easy").is_empty());
  }

  #[test]
  fn question_batch_survives_long_multibyte_refusals() {
    // A non-JSON reply in a multibyte script must degrade to an empty batch
    // even when the log preview cut lands inside a character.
    let mut raw = String::from("a");
    for _ in 0..50 {
      raw.push('é');
    }
    assert!(parse_question_batch(&raw, "Algebra", "easy").is_empty());
  }

  #[test]
  fn question_batch_drops_items_missing_required_keys() {
    let raw = r#"[
      {"question":"Q1","options":["A","B","C"],"correct_answer":"A"},
      {"question":"Q2","options":["A","B","C"]},
      {"options":["A","B","C"],"correct_answer":"A"}
    ]"#;
    let batch = parse_question_batch(raw, "Calculus", "hard");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].question, "Q1");
  }
}
