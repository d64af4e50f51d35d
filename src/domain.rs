//! Domain models: student profiles, quiz questions, achievements, notifications.
//!
//! The serde shapes here are the persisted representation: `quiz_scores` is a
//! mapping of string→number, `notes` a mapping of string→string, and the other
//! collection fields are ordered lists of strings. Keep these stable for
//! compatibility with stored rows.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-student mutable learning state. Owned exclusively by one student and
/// mutated only by that student's own requests; teacher-initiated question
/// management never touches it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StudentProfile {
  #[serde(default)] pub weak_topics: Vec<String>,
  #[serde(default)] pub quiz_scores: BTreeMap<String, f64>,
  #[serde(default)] pub completed_modules: Vec<String>,
  #[serde(default)] pub achievements: Vec<String>,
  #[serde(default)] pub final_test_score: Option<i64>,
  #[serde(default = "default_streak")] pub streak: u32,
  #[serde(default)] pub study_time: u64,
  #[serde(default)] pub notes: BTreeMap<String, String>,
  #[serde(default)] pub bookmarks: Vec<String>,
  #[serde(default)] pub last_login_date: Option<NaiveDate>,
}

fn default_streak() -> u32 { 1 }

// A fresh profile starts with a streak of 1 (registration counts as the
// first login day), matching the serde default above.
impl Default for StudentProfile {
  fn default() -> Self {
    Self {
      weak_topics: Vec::new(),
      quiz_scores: BTreeMap::new(),
      completed_modules: Vec::new(),
      achievements: Vec::new(),
      final_test_score: None,
      streak: 1,
      study_time: 0,
      notes: BTreeMap::new(),
      bookmarks: Vec::new(),
      last_login_date: None,
    }
  }
}

/// A registered student: identity plus their learning profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Student {
  pub id: String,
  pub name: String,
  pub profile: StudentProfile,
}

/// A multiple-choice question in the bank. `correct_answer` must be a member
/// of `options` at all times; enforced on create and update in `logic`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizQuestion {
  pub id: String,
  pub topic: String,
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: String,
  #[serde(default = "default_difficulty")] pub difficulty: String,
  #[serde(default)] pub hint: String,
  #[serde(default)] pub explanation: String,
}

fn default_difficulty() -> String { "medium".into() }

/// One-time, non-revocable unlock flags tied to predicates over profile state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
  FirstStep,
  QuizWhiz,
  Perfectionist,
  StreakStarter,
}

impl Achievement {
  /// Stable identifier stored in the profile's `achievements` list.
  pub const fn id(self) -> &'static str {
    match self {
      Achievement::FirstStep => "first_step",
      Achievement::QuizWhiz => "quiz_whiz",
      Achievement::Perfectionist => "perfectionist",
      Achievement::StreakStarter => "streak_starter",
    }
  }

  pub const fn title(self) -> &'static str {
    match self {
      Achievement::FirstStep => "Achievement Unlocked! 👟",
      Achievement::QuizWhiz => "Achievement Unlocked! ⭐",
      Achievement::Perfectionist => "Achievement Unlocked! 👑",
      Achievement::StreakStarter => "Achievement Unlocked! 🔥",
    }
  }

  pub const fn message(self) -> &'static str {
    match self {
      Achievement::FirstStep => "You earned the \"First Step\" badge!",
      Achievement::QuizWhiz => "You earned the \"Quiz Whiz\" badge for scoring 100%!",
      Achievement::Perfectionist => "You earned the \"Perfectionist\" badge!",
      Achievement::StreakStarter => {
        "You earned the \"Streak Starter\" badge for logging in 3 days in a row!"
      }
    }
  }
}

/// A message shown to the student (achievement unlocks for now).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
  pub id: String,
  pub title: String,
  pub message: String,
  pub read: bool,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn profile_serde_shape_round_trips() {
    let mut p = StudentProfile::default();
    p.quiz_scores.insert("Algebra".into(), 0.9);
    p.weak_topics = vec!["Calculus".into()];
    p.notes.insert("Algebra".into(), "review factoring".into());

    let v = serde_json::to_value(&p).unwrap();
    // Scores serialize as a string→number mapping, topics as a string list.
    assert_eq!(v["quiz_scores"]["Algebra"], serde_json::json!(0.9));
    assert_eq!(v["weak_topics"], serde_json::json!(["Calculus"]));
    assert_eq!(v["streak"], serde_json::json!(1));

    let back: StudentProfile = serde_json::from_value(v).unwrap();
    assert_eq!(back.quiz_scores.get("Algebra"), Some(&0.9));
  }

  #[test]
  fn achievement_ids_are_stable() {
    assert_eq!(Achievement::FirstStep.id(), "first_step");
    assert_eq!(Achievement::QuizWhiz.id(), "quiz_whiz");
    assert_eq!(Achievement::Perfectionist.id(), "perfectionist");
    assert_eq!(Achievement::StreakStarter.id(), "streak_starter");
  }
}
