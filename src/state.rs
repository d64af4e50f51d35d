//! Application state: in-memory stores, prompts, and the optional Gemini client.
//!
//! This module owns:
//!   - the student store (profile snapshots, keyed by student id)
//!   - the question bank (config bank + built-in seeds)
//!   - per-student notification lists
//!   - the prompts struct (from TOML or defaults)
//!   - optional Gemini client
//!
//! Profile mutations go through `with_student_mut`, which holds the write
//! lock for the whole merge+evaluate+write scope so concurrent submissions
//! from the same student cannot race on the score merge.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::{load_app_config_from_env, Prompts};
use crate::domain::{Notification, QuizQuestion, Student, StudentProfile};
use crate::gemini::Gemini;
use crate::protocol::LeaderboardRow;
use crate::seeds::{seed_questions, FALLBACK_TOPIC};

/// Cap on questions served per weak topic in a personalized quiz.
const QUIZ_QUESTIONS_PER_TOPIC: usize = 5;

#[derive(Clone)]
pub struct AppState {
    pub students: Arc<RwLock<HashMap<String, Student>>>,
    pub questions: Arc<RwLock<HashMap<String, QuizQuestion>>>,
    pub notifications: Arc<RwLock<HashMap<String, Vec<Notification>>>>,
    pub gemini: Option<Gemini>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, seed the question bank, init Gemini.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg_opt = load_app_config_from_env();
        let prompts = cfg_opt
            .as_ref()
            .map(|c| c.prompts.clone())
            .unwrap_or_default();

        let mut bank = HashMap::<String, QuizQuestion>::new();

        // Insert config-bank questions (if any); invalid entries are skipped,
        // never fatal.
        if let Some(cfg) = &cfg_opt {
            for qc in &cfg.questions {
                if !qc.options.contains(&qc.correct_answer) {
                    error!(target: "learnsphere_backend", topic = %qc.topic, "Skipping bank question: correct_answer not in options.");
                    continue;
                }
                let id = qc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
                let q = QuizQuestion {
                    id: id.clone(),
                    topic: qc.topic.clone(),
                    question: qc.question.clone(),
                    options: qc.options.clone(),
                    correct_answer: qc.correct_answer.clone(),
                    difficulty: qc.difficulty.clone().unwrap_or_else(|| "medium".into()),
                    hint: qc.hint.clone().unwrap_or_default(),
                    explanation: qc.explanation.clone().unwrap_or_default(),
                };
                bank.insert(id, q);
            }
        }

        // Always insert built-in seeds, but don't overwrite existing ids.
        for q in seed_questions() {
            bank.entry(q.id.clone()).or_insert(q);
        }

        // Inventory summary by topic.
        let mut count_by_topic: HashMap<String, usize> = HashMap::new();
        for q in bank.values() {
            *count_by_topic.entry(q.topic.clone()).or_insert(0) += 1;
        }
        for (topic, count) in count_by_topic {
            info!(target: "learnsphere_backend", %topic, count, "Startup question inventory");
        }

        // Build optional Gemini client (if API key present). Availability is
        // fixed for the process lifetime after this point.
        let gemini = Gemini::from_env();
        if let Some(g) = &gemini {
            info!(target: "learnsphere_backend", base_url = %g.base_url, model = %g.model, "Gemini enabled.");
        } else {
            info!(target: "learnsphere_backend", "Gemini disabled (no GEMINI_API_KEY). AI endpoints serve fallbacks.");
        }

        Self {
            students: Arc::new(RwLock::new(HashMap::new())),
            questions: Arc::new(RwLock::new(bank)),
            notifications: Arc::new(RwLock::new(HashMap::new())),
            gemini,
            prompts,
        }
    }

    pub fn ai_available(&self) -> bool {
        self.gemini.is_some()
    }

    /// Create a student with a freshly seeded profile. The initial weak-topic
    /// set holds one bank topic (lexicographically first for determinism) so
    /// there is always something to drive quiz selection; an empty bank falls
    /// back to the constant default topic.
    #[instrument(level = "info", skip(self), fields(%name))]
    pub async fn register_student(&self, name: &str) -> Student {
        let first_topic = {
            let bank = self.questions.read().await;
            bank.values().map(|q| q.topic.clone()).min()
        }
        .unwrap_or_else(|| FALLBACK_TOPIC.to_string());

        let student = Student {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            profile: StudentProfile {
                weak_topics: vec![first_topic],
                last_login_date: Some(Utc::now().date_naive()),
                ..StudentProfile::default()
            },
        };
        self.students
            .write()
            .await
            .insert(student.id.clone(), student.clone());
        info!(target: "learnsphere_backend", id = %student.id, "Student registered");
        student
    }

    /// Read-only snapshot of a student.
    pub async fn get_student(&self, id: &str) -> Option<Student> {
        self.students.read().await.get(id).cloned()
    }

    /// Run `f` with exclusive access to one student record. This is the
    /// atomic scope for merge+evaluate+write; nothing else can observe or
    /// mutate the profile while `f` runs.
    pub async fn with_student_mut<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Student) -> T,
    ) -> Option<T> {
        let mut students = self.students.write().await;
        students.get_mut(id).map(f)
    }

    // --- Question bank ---

    pub async fn list_questions(&self) -> Vec<QuizQuestion> {
        let mut qs: Vec<_> = self.questions.read().await.values().cloned().collect();
        qs.sort_by(|a, b| (&a.topic, &a.question).cmp(&(&b.topic, &b.question)));
        qs
    }

    pub async fn insert_question(&self, q: QuizQuestion) {
        self.questions.write().await.insert(q.id.clone(), q);
    }

    pub async fn with_question_mut<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut QuizQuestion) -> T,
    ) -> Option<T> {
        let mut questions = self.questions.write().await;
        questions.get_mut(id).map(f)
    }

    pub async fn delete_question(&self, id: &str) -> bool {
        self.questions.write().await.remove(id).is_some()
    }

    /// Select up to five questions per weak topic, shuffled so repeated
    /// requests don't always serve the same batch.
    #[instrument(level = "debug", skip(self, weak_topics), fields(topics = weak_topics.len()))]
    pub async fn personalized_quiz(
        &self,
        weak_topics: &[String],
    ) -> std::collections::BTreeMap<String, Vec<QuizQuestion>> {
        let bank = self.questions.read().await;
        let mut rng = rand::thread_rng();
        let mut quiz = std::collections::BTreeMap::new();
        for topic in weak_topics {
            let mut qs: Vec<QuizQuestion> = bank
                .values()
                .filter(|q| &q.topic == topic)
                .cloned()
                .collect();
            qs.shuffle(&mut rng);
            qs.truncate(QUIZ_QUESTIONS_PER_TOPIC);
            quiz.insert(topic.clone(), qs);
        }
        quiz
    }

    // --- Notifications ---

    pub async fn push_notification(&self, student_id: &str, title: &str, message: &str) {
        let notif = Notification {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            message: message.to_string(),
            read: false,
            created_at: Utc::now(),
        };
        self.notifications
            .write()
            .await
            .entry(student_id.to_string())
            .or_default()
            .push(notif);
    }

    /// Notifications for one student, newest first.
    pub async fn notifications_for(&self, student_id: &str) -> Vec<Notification> {
        let mut list = self
            .notifications
            .read()
            .await
            .get(student_id)
            .cloned()
            .unwrap_or_default();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// Mark one notification read, or all when `id` is None.
    /// Returns false if a specific id was requested but not found.
    pub async fn mark_notifications_read(&self, student_id: &str, id: Option<&str>) -> bool {
        let mut map = self.notifications.write().await;
        let Some(list) = map.get_mut(student_id) else {
            return id.is_none();
        };
        match id {
            Some(id) => match list.iter_mut().find(|n| n.id == id) {
                Some(n) => {
                    n.read = true;
                    true
                }
                None => false,
            },
            None => {
                for n in list.iter_mut() {
                    n.read = true;
                }
                true
            }
        }
    }

    // --- Aggregates ---

    /// Average score (as a percentage), completion count and streak per
    /// student, sorted descending by (score, streak).
    pub async fn leaderboard(&self) -> Vec<LeaderboardRow> {
        let students = self.students.read().await;
        let mut rows: Vec<LeaderboardRow> = students
            .values()
            .map(|s| {
                let scores = &s.profile.quiz_scores;
                let avg = if scores.is_empty() {
                    0.0
                } else {
                    scores.values().sum::<f64>() / scores.len() as f64
                };
                LeaderboardRow {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    score: (avg * 100.0).round() as i64,
                    completed: s.profile.completed_modules.len(),
                    streak: s.profile.streak,
                }
            })
            .collect();
        rows.sort_by(|a, b| (b.score, b.streak).cmp(&(a.score, a.streak)));
        rows
    }

    pub async fn stats(&self) -> (usize, usize, Vec<String>) {
        let students = self.students.read().await.len();
        let bank = self.questions.read().await;
        let mut topics: Vec<String> = bank.values().map(|q| q.topic.clone()).collect();
        topics.sort();
        topics.dedup();
        (students, bank.len(), topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bare state with no Gemini client and an empty bank; tests insert what
    /// they need.
    fn bare() -> AppState {
        AppState {
            students: Arc::new(RwLock::new(HashMap::new())),
            questions: Arc::new(RwLock::new(HashMap::new())),
            notifications: Arc::new(RwLock::new(HashMap::new())),
            gemini: None,
            prompts: Prompts::default(),
        }
    }

    fn question(topic: &str) -> QuizQuestion {
        QuizQuestion {
            id: Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            question: "Q?".into(),
            options: vec!["A".into(), "B".into(), "C".into()],
            correct_answer: "A".into(),
            difficulty: "easy".into(),
            hint: String::new(),
            explanation: String::new(),
        }
    }

    #[tokio::test]
    async fn registration_seeds_one_weak_topic_from_the_bank() {
        let state = bare();
        state.insert_question(question("Calculus")).await;
        let s = state.register_student("Alex").await;
        assert_eq!(s.profile.weak_topics, vec!["Calculus".to_string()]);
        assert_eq!(s.profile.streak, 1);
        assert!(s.profile.last_login_date.is_some());
    }

    #[tokio::test]
    async fn registration_falls_back_to_the_default_topic_on_empty_bank() {
        let state = bare();
        let s = state.register_student("Alex").await;
        assert_eq!(s.profile.weak_topics, vec![FALLBACK_TOPIC.to_string()]);
    }

    #[tokio::test]
    async fn personalized_quiz_caps_questions_per_topic() {
        let state = bare();
        for _ in 0..8 {
            state.insert_question(question("Algebra")).await;
        }
        let quiz = state.personalized_quiz(&["Algebra".to_string()]).await;
        assert_eq!(quiz["Algebra"].len(), 5);
    }

    #[tokio::test]
    async fn mark_read_handles_single_and_all() {
        let state = bare();
        state.push_notification("s1", "T1", "M1").await;
        state.push_notification("s1", "T2", "M2").await;

        let first_id = state.notifications_for("s1").await[0].id.clone();
        assert!(state.mark_notifications_read("s1", Some(&first_id)).await);
        assert!(!state.mark_notifications_read("s1", Some("missing")).await);

        assert!(state.mark_notifications_read("s1", None).await);
        assert!(state.notifications_for("s1").await.iter().all(|n| n.read));
    }

    #[tokio::test]
    async fn leaderboard_sorts_by_score_then_streak() {
        let state = bare();
        let a = state.register_student("A").await;
        let b = state.register_student("B").await;
        state
            .with_student_mut(&a.id, |s| {
                s.profile.quiz_scores.insert("Algebra".into(), 0.5);
            })
            .await;
        state
            .with_student_mut(&b.id, |s| {
                s.profile.quiz_scores.insert("Algebra".into(), 0.9);
            })
            .await;
        let rows = state.leaderboard().await;
        assert_eq!(rows[0].name, "B");
        assert_eq!(rows[0].score, 90);
    }
}
