//! Loading application configuration (prompts + optional question bank) from TOML.
//!
//! See `AppConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
}

/// Question entry accepted in TOML configuration. Entries with a
/// `correct_answer` outside `options` are skipped at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  #[serde(default)] pub id: Option<String>,
  pub topic: String,
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: String,
  #[serde(default)] pub difficulty: Option<String>,
  #[serde(default)] pub hint: Option<String>,
  #[serde(default)] pub explanation: Option<String>,
}

/// Prompt templates used by the Gemini client. Defaults mirror the tone of
/// the shipped tutor; override them in TOML to tune structure or voice.
/// Placeholders use `{name}` interpolation via `util::fill_template`.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub quiz_user_template: String,
  pub analysis_user_template: String,
  pub tutor_system_template: String,
  pub study_plan_user_template: String,
  pub explain_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_user_template: r#"Generate {count} multiple choice questions about {topic} at {difficulty} difficulty level.

For each question, provide:
1. The question text
2. Exactly 3 answer options
3. The correct answer (must match one of the options exactly)
4. A helpful hint
5. A brief explanation of the correct answer

Format the response as a valid JSON array with this structure:
[
  {
    "question": "Question text here?",
    "options": ["Option A", "Option B", "Option C"],
    "correct_answer": "Option A",
    "hint": "Helpful hint here",
    "explanation": "Brief explanation of why this is correct"
  }
]

Make questions educational, clear, and appropriate for {difficulty} level students.
IMPORTANT: Return ONLY the JSON array, no markdown formatting."#.into(),

      analysis_user_template: r#"Analyze this student's performance and provide personalized recommendations:

Quiz Scores: {quiz_scores}
Weak Topics: {weak_topics}

Provide:
1. Overall performance assessment (2-3 sentences)
2. Top 3 specific recommendations for improvement
3. Priority focus areas (ranked)
4. Suggested study strategies

Format as JSON:
{
  "overall_performance": "Assessment text",
  "recommendations": ["rec1", "rec2", "rec3"],
  "focus_areas": ["topic1", "topic2"],
  "study_strategies": ["strategy1", "strategy2"]
}

IMPORTANT: Return ONLY the JSON object, no markdown formatting."#.into(),

      tutor_system_template: r#"You are LearnSphere AI, an expert and encouraging educational tutor.

Student Context:
- Name: {name}
- Weak Topics: {weak_topics}
- Recent Quiz Scores: {quiz_scores}

Guidelines:
1. Be supportive, patient, and encouraging
2. Explain concepts clearly with examples
3. Use simple language appropriate for students
4. Provide step-by-step explanations when needed
5. Ask clarifying questions if needed
6. Keep responses concise (2-4 paragraphs max)
7. Use markdown formatting for better readability (bold, lists, etc.)
8. Focus on helping the student understand, not just giving answers"#.into(),

      study_plan_user_template: r#"Create a personalized weekly study plan for a student.

Weak Topics: {weak_topics}
Available Study Time: {hours} hours per week

Provide a structured plan with:
1. Daily study schedule (which topics on which days)
2. Time allocation per topic
3. Specific learning activities
4. Milestones and checkpoints

Format as JSON:
{
  "weekly_schedule": [
    {"day": "Monday", "topic": "Algebra", "duration": 2, "activities": ["Review formulas", "Practice problems"]}
  ],
  "milestones": ["Complete 10 practice problems", "Score 80% on quiz"],
  "tips": ["Study at the same time each day", "Take breaks every 25 minutes"]
}

IMPORTANT: Return ONLY the JSON object, no markdown formatting."#.into(),

      explain_user_template: r#"Explain the concept of "{concept}" in {topic} at {difficulty} level.

Requirements:
1. Start with a simple definition
2. Provide a real-world analogy or example
3. Explain the key principles
4. Give 2-3 practice examples if applicable
5. Use clear, simple language
6. Use markdown formatting (bold, lists, etc.)

Keep the explanation concise but comprehensive (3-5 paragraphs)."#.into(),
    }
  }
}

/// Attempt to load `AppConfig` from LEARNSPHERE_CONFIG_PATH. On any
/// parsing/IO error, returns None and the compiled-in defaults apply.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("LEARNSPHERE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "learnsphere_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "learnsphere_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "learnsphere_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
