//! Core behaviors shared by the HTTP handlers.
//!
//! This includes:
//!   - Login streak updates and quiz submission (merge + recompute + unlocks)
//!   - Question create/update with invariant enforcement
//!   - AI-backed operations with their documented fallback values
//!
//! AI unavailability is not an error on any path here: when the Gemini
//! client was never initialized, or its output is unusable, each operation
//! returns its fixed fallback instead of surfacing a failure.

use chrono::Utc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::domain::{Achievement, QuizQuestion, StudentProfile};
use crate::error::{ApiError, Result};
use crate::progress;
use crate::protocol::*;
use crate::state::AppState;

fn unlock_out(a: Achievement) -> UnlockOut {
  UnlockOut { id: a.id(), title: a.title(), message: a.message() }
}

async fn notify_unlocks(state: &AppState, student_id: &str, unlocks: &[UnlockOut]) {
  for u in unlocks {
    state.push_notification(student_id, u.title, u.message).await;
  }
}

/// Record a login for streak purposes. Same-day logins are a no-op on the
/// counter; a new third consecutive day unlocks the streak badge.
#[instrument(level = "info", skip(state), fields(%student_id))]
pub async fn login(state: &AppState, student_id: &str) -> Result<LoginOut> {
  let today = Utc::now().date_naive();
  let (streak, unlocked) = state
    .with_student_mut(student_id, |s| {
      let unlock = progress::update_streak(&mut s.profile, today);
      (s.profile.streak, unlock.map(unlock_out).into_iter().collect::<Vec<_>>())
    })
    .await
    .ok_or(ApiError::NotFound("student"))?;

  notify_unlocks(state, student_id, &unlocked).await;
  info!(target: "progress", %student_id, streak, unlocks = unlocked.len(), "Login recorded");
  Ok(LoginOut { message: "Login recorded".into(), streak, unlocked })
}

/// Merge a quiz result batch into the profile: last-write-wins score merge,
/// weak-topic recompute, module union, then achievement evaluation, all
/// within one exclusive-access scope on the student record.
#[instrument(level = "info", skip(state, body), fields(%student_id, scores = body.scores.len()))]
pub async fn submit_quiz(
  state: &AppState,
  student_id: &str,
  body: SubmitQuizIn,
) -> Result<SubmitQuizOut> {
  let (profile, unlocked) = state
    .with_student_mut(student_id, |s| {
      progress::merge_scores(&mut s.profile, &body.scores);
      for module in &body.completed_modules {
        if !s.profile.completed_modules.contains(module) {
          s.profile.completed_modules.push(module.clone());
        }
      }
      let unlocks: Vec<UnlockOut> = progress::evaluate_achievements(&mut s.profile)
        .into_iter()
        .map(unlock_out)
        .collect();
      (s.profile.clone(), unlocks)
    })
    .await
    .ok_or(ApiError::NotFound("student"))?;

  notify_unlocks(state, student_id, &unlocked).await;
  info!(target: "progress", %student_id, weak = profile.weak_topics.len(), unlocks = unlocked.len(), "Quiz submitted");
  Ok(SubmitQuizOut { message: "Quiz submitted".into(), profile, unlocked })
}

/// Field-wise profile update. Touching scores, modules or the final test
/// score re-runs the weak-topic recompute and achievement evaluation, so the
/// derived state stays consistent with whatever was written.
#[instrument(level = "info", skip(state, body), fields(%student_id))]
pub async fn update_profile(
  state: &AppState,
  student_id: &str,
  body: ProfileUpdateIn,
) -> Result<SubmitQuizOut> {
  let (profile, unlocked) = state
    .with_student_mut(student_id, |s| {
      let p = &mut s.profile;
      let mut derived_touched = false;

      if let Some(scores) = &body.quiz_scores {
        p.quiz_scores = scores.clone();
        progress::recompute_weak_topics(p);
        derived_touched = true;
      }
      if let Some(modules) = &body.completed_modules {
        p.completed_modules = modules.clone();
        derived_touched = true;
      }
      if let Some(score) = body.final_test_score {
        p.final_test_score = Some(score);
        derived_touched = true;
      }
      if let Some(t) = body.study_time {
        p.study_time = t;
      }
      if let Some(notes) = &body.notes {
        p.notes = notes.clone();
      }
      if let Some(bookmarks) = &body.bookmarks {
        p.bookmarks = bookmarks.clone();
      }

      let unlocks: Vec<UnlockOut> = if derived_touched {
        progress::evaluate_achievements(p).into_iter().map(unlock_out).collect()
      } else {
        Vec::new()
      };
      (p.clone(), unlocks)
    })
    .await
    .ok_or(ApiError::NotFound("student"))?;

  notify_unlocks(state, student_id, &unlocked).await;
  Ok(SubmitQuizOut { message: "Profile updated".into(), profile, unlocked })
}

// -------- Question management --------

fn require_answer_in_options(options: &[String], correct_answer: &str) -> Result<()> {
  if options.iter().any(|o| o == correct_answer) {
    Ok(())
  } else {
    Err(ApiError::ValidationFailed(
      "Correct answer must be one of the options".into(),
    ))
  }
}

#[instrument(level = "info", skip(state, body), fields(topic = %body.topic))]
pub async fn create_question(state: &AppState, body: QuestionIn) -> Result<QuizQuestion> {
  require_answer_in_options(&body.options, &body.correct_answer)?;

  let q = QuizQuestion {
    id: Uuid::new_v4().to_string(),
    topic: body.topic,
    question: body.question,
    options: body.options,
    correct_answer: body.correct_answer,
    difficulty: body.difficulty.unwrap_or_else(|| "medium".into()),
    hint: body.hint.unwrap_or_default(),
    explanation: body.explanation.unwrap_or_default(),
  };
  state.insert_question(q.clone()).await;
  Ok(q)
}

/// Partial update; the post-update state must still satisfy
/// `correct_answer ∈ options`, else nothing is applied.
#[instrument(level = "info", skip(state, body), fields(%question_id))]
pub async fn update_question(
  state: &AppState,
  question_id: &str,
  body: QuestionUpdateIn,
) -> Result<QuizQuestion> {
  state
    .with_question_mut(question_id, |q| {
      let next_options = body.options.as_ref().unwrap_or(&q.options);
      let next_answer = body.correct_answer.as_deref().unwrap_or(&q.correct_answer);
      require_answer_in_options(next_options, next_answer)?;

      if let Some(topic) = body.topic { q.topic = topic; }
      if let Some(text) = body.question { q.question = text; }
      if let Some(options) = body.options { q.options = options; }
      if let Some(answer) = body.correct_answer { q.correct_answer = answer; }
      if let Some(difficulty) = body.difficulty { q.difficulty = difficulty; }
      if let Some(hint) = body.hint { q.hint = hint; }
      if let Some(explanation) = body.explanation { q.explanation = explanation; }
      Ok(q.clone())
    })
    .await
    .ok_or(ApiError::NotFound("question"))?
}

// -------- AI-backed operations (with fallbacks) --------

/// Generate a question batch and persist the valid ones. Fallback: an empty
/// batch, both when the client is disabled or the call fails and for every
/// parsed object that is malformed or breaks the answer-membership invariant.
#[instrument(level = "info", skip(state), fields(%topic, %difficulty, count))]
pub async fn generate_questions(
  state: &AppState,
  topic: &str,
  difficulty: &str,
  count: usize,
) -> GenerateQuestionsOut {
  let batch = if let Some(g) = &state.gemini {
    match g.generate_quiz_questions(&state.prompts, topic, difficulty, count).await {
      Ok(batch) => batch,
      Err(e) => {
        error!(target: "ai", %topic, error = %e, "Question generation failed; returning empty batch");
        Vec::new()
      }
    }
  } else {
    Vec::new()
  };

  let mut saved = Vec::new();
  for q in batch {
    if !q.options.contains(&q.correct_answer) {
      error!(target: "ai", question = %q.question, "Dropping generated question: correct_answer not in options");
      continue;
    }
    state.insert_question(q.clone()).await;
    saved.push(q);
  }

  GenerateQuestionsOut {
    message: format!("{} questions generated", saved.len()),
    questions: saved,
  }
}

/// One tutor exchange. Fallback: a static apology string, both when the
/// client is disabled and when the call fails.
#[instrument(level = "info", skip(state, body), fields(%student_id, msg_len = body.message.len()))]
pub async fn tutor_chat(state: &AppState, student_id: &str, body: ChatIn) -> Result<ChatOut> {
  let student = state
    .get_student(student_id)
    .await
    .ok_or(ApiError::NotFound("student"))?;

  let Some(g) = &state.gemini else {
    return Ok(ChatOut {
      response: "AI tutor is currently unavailable. Please check your API configuration.".into(),
    });
  };

  let response = match g
    .chat_with_tutor(
      &state.prompts,
      &body.message,
      &student.name,
      &student.profile.weak_topics,
      &student.profile.quiz_scores,
      &body.history,
    )
    .await
  {
    Ok(text) => text,
    Err(e) => {
      error!(target: "ai", %student_id, error = %e, "Tutor chat failed; using canned reply");
      "I'm having trouble processing your request. Please try rephrasing your question or check back later."
        .into()
    }
  };
  Ok(ChatOut { response })
}

fn analysis_unavailable(profile: &StudentProfile) -> PerformanceAnalysis {
  PerformanceAnalysis {
    overall_performance: "N/A - AI service unavailable".into(),
    recommendations: vec![
      "Continue practicing weak topics".into(),
      "Review quiz results".into(),
    ],
    focus_areas: profile.weak_topics.clone(),
    study_strategies: vec!["Regular practice".into(), "Seek help when needed".into()],
  }
}

fn analysis_failed(profile: &StudentProfile) -> PerformanceAnalysis {
  PerformanceAnalysis {
    overall_performance: "Analysis unavailable".into(),
    recommendations: vec![
      "Continue practicing".into(),
      "Review weak topics".into(),
      "Take regular quizzes".into(),
    ],
    focus_areas: profile.weak_topics.clone(),
    study_strategies: vec!["Daily practice".into(), "Study in focused sessions".into()],
  }
}

/// Performance analysis. Fallback: a canned recommendation object keyed off
/// the current weak-topic set.
#[instrument(level = "info", skip(state), fields(%student_id))]
pub async fn analyze_performance(state: &AppState, student_id: &str) -> Result<PerformanceAnalysis> {
  let student = state
    .get_student(student_id)
    .await
    .ok_or(ApiError::NotFound("student"))?;
  let profile = &student.profile;

  let Some(g) = &state.gemini else {
    return Ok(analysis_unavailable(profile));
  };

  match g
    .analyze_performance(&state.prompts, &profile.quiz_scores, &profile.weak_topics)
    .await
  {
    Ok(analysis) => Ok(analysis),
    Err(e) => {
      error!(target: "ai", %student_id, error = %e, "Performance analysis failed; using canned object");
      Ok(analysis_failed(profile))
    }
  }
}

fn plan_fallback(weak_topics: &[String], hours: u32) -> StudyPlan {
  StudyPlan {
    weekly_schedule: vec![DayPlan {
      day: "Daily".into(),
      topic: crate::util::join_or(weak_topics, "General review"),
      duration: f64::from(hours / 7),
      activities: vec!["Review concepts".into(), "Practice problems".into()],
    }],
    milestones: vec!["Complete daily practice".into()],
    tips: vec!["Stay consistent".into(), "Ask for help when needed".into()],
  }
}

/// Weekly study plan. Fallback: a single daily-review schedule over the
/// weak-topic set.
#[instrument(level = "info", skip(state), fields(%student_id, hours))]
pub async fn study_plan(state: &AppState, student_id: &str, hours: u32) -> Result<StudyPlan> {
  let student = state
    .get_student(student_id)
    .await
    .ok_or(ApiError::NotFound("student"))?;
  let weak_topics = &student.profile.weak_topics;

  let Some(g) = &state.gemini else {
    return Ok(plan_fallback(weak_topics, hours));
  };

  match g.generate_study_plan(&state.prompts, weak_topics, hours).await {
    Ok(plan) => Ok(plan),
    Err(e) => {
      error!(target: "ai", %student_id, error = %e, "Study plan generation failed; using fallback plan");
      Ok(plan_fallback(weak_topics, hours))
    }
  }
}

/// Concept explanation. Fallback: a static pointer back to offline material.
#[instrument(level = "info", skip(state, body), fields(topic = %body.topic, concept = %body.concept))]
pub async fn explain_concept(state: &AppState, body: ExplainIn) -> ExplainOut {
  let difficulty = body.difficulty.as_deref().unwrap_or("beginner");

  let Some(g) = &state.gemini else {
    return ExplainOut {
      explanation: "AI explanation service is unavailable. Please check your API configuration."
        .into(),
    };
  };

  match g
    .explain_concept(&state.prompts, &body.topic, &body.concept, difficulty)
    .await
  {
    Ok(text) => ExplainOut { explanation: text },
    Err(e) => {
      error!(target: "ai", error = %e, "Concept explanation failed; using canned reply");
      ExplainOut {
        explanation: format!(
          "Unable to generate explanation for {}. Please try again or consult your textbook.",
          body.concept
        ),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::{BTreeMap, HashMap};
  use std::sync::Arc;

  use tokio::sync::RwLock;

  use super::*;
  use crate::config::Prompts;

  fn bare() -> AppState {
    AppState {
      students: Arc::new(RwLock::new(HashMap::new())),
      questions: Arc::new(RwLock::new(HashMap::new())),
      notifications: Arc::new(RwLock::new(HashMap::new())),
      gemini: None,
      prompts: Prompts::default(),
    }
  }

  fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(t, s)| (t.to_string(), *s)).collect()
  }

  #[tokio::test]
  async fn submit_quiz_merges_recomputes_and_notifies() {
    let state = bare();
    let s = state.register_student("Alex").await;

    let out = submit_quiz(
      &state,
      &s.id,
      SubmitQuizIn {
        scores: scores(&[("Algebra", 1.0), ("Calculus", 0.4)]),
        completed_modules: vec!["Algebra".into()],
      },
    )
    .await
    .unwrap();

    assert_eq!(out.profile.weak_topics, vec!["Calculus".to_string()]);
    let ids: Vec<&str> = out.unlocked.iter().map(|u| u.id).collect();
    assert!(ids.contains(&"first_step"));
    assert!(ids.contains(&"quiz_whiz"));

    // Each unlock produced one notification.
    let notifs = state.notifications_for(&s.id).await;
    assert_eq!(notifs.len(), 2);
  }

  #[tokio::test]
  async fn submit_quiz_for_unknown_student_is_not_found() {
    let state = bare();
    let err = submit_quiz(
      &state,
      "missing",
      SubmitQuizIn { scores: scores(&[]), completed_modules: vec![] },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[tokio::test]
  async fn profile_update_with_perfect_final_test_unlocks_perfectionist() {
    let state = bare();
    let s = state.register_student("Alex").await;

    let out = update_profile(
      &state,
      &s.id,
      ProfileUpdateIn { final_test_score: Some(100), ..Default::default() },
    )
    .await
    .unwrap();
    assert_eq!(out.unlocked.iter().map(|u| u.id).collect::<Vec<_>>(), vec!["perfectionist"]);

    // 99 on another student must not unlock it.
    let s2 = state.register_student("Sam").await;
    let out2 = update_profile(
      &state,
      &s2.id,
      ProfileUpdateIn { final_test_score: Some(99), ..Default::default() },
    )
    .await
    .unwrap();
    assert!(out2.unlocked.is_empty());
  }

  #[tokio::test]
  async fn create_question_rejects_answer_outside_options() {
    let state = bare();
    let err = create_question(
      &state,
      QuestionIn {
        topic: "Algebra".into(),
        question: "Q?".into(),
        options: vec!["A".into(), "B".into(), "C".into()],
        correct_answer: "D".into(),
        difficulty: None,
        hint: None,
        explanation: None,
      },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::ValidationFailed(_)));
    assert!(state.list_questions().await.is_empty());
  }

  #[tokio::test]
  async fn update_question_cannot_break_the_answer_invariant() {
    let state = bare();
    let q = create_question(
      &state,
      QuestionIn {
        topic: "Algebra".into(),
        question: "Q?".into(),
        options: vec!["A".into(), "B".into(), "C".into()],
        correct_answer: "A".into(),
        difficulty: None,
        hint: None,
        explanation: None,
      },
    )
    .await
    .unwrap();

    // New options that exclude the current answer are rejected.
    let err = update_question(
      &state,
      &q.id,
      QuestionUpdateIn { options: Some(vec!["X".into(), "Y".into(), "Z".into()]), ..Default::default() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::ValidationFailed(_)));

    // Swapping options and answer together is fine.
    let updated = update_question(
      &state,
      &q.id,
      QuestionUpdateIn {
        options: Some(vec!["X".into(), "Y".into(), "Z".into()]),
        correct_answer: Some("Y".into()),
        ..Default::default()
      },
    )
    .await
    .unwrap();
    assert_eq!(updated.correct_answer, "Y");
  }

  #[tokio::test]
  async fn ai_operations_fall_back_without_a_client() {
    let state = bare();
    let s = state.register_student("Alex").await;

    let gen = generate_questions(&state, "Algebra", "easy", 5).await;
    assert!(gen.questions.is_empty());

    let chat = tutor_chat(
      &state,
      &s.id,
      ChatIn { message: "help".into(), history: vec![] },
    )
    .await
    .unwrap();
    assert!(chat.response.contains("unavailable"));

    let analysis = analyze_performance(&state, &s.id).await.unwrap();
    assert_eq!(analysis.overall_performance, "N/A - AI service unavailable");
    assert_eq!(analysis.focus_areas, s.profile.weak_topics);

    let plan = study_plan(&state, &s.id, 14).await.unwrap();
    assert_eq!(plan.weekly_schedule.len(), 1);
    assert_eq!(plan.weekly_schedule[0].duration, 2.0);

    let explain = explain_concept(
      &state,
      ExplainIn { topic: "Calculus".into(), concept: "derivatives".into(), difficulty: None },
    )
    .await;
    assert!(explain.explanation.contains("unavailable"));
  }
}
