//! Public request/response DTOs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Notification, QuizQuestion, Student, StudentProfile};

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub ai_available: bool,
}

#[derive(Serialize)]
pub struct StatsOut {
    pub total_students: usize,
    pub total_questions: usize,
    pub topics: Vec<String>,
}

#[derive(Serialize)]
pub struct MessageOut {
    pub message: String,
}

//
// Students & profiles
//

#[derive(Deserialize)]
pub struct RegisterIn {
    pub name: String,
}

#[derive(Serialize)]
pub struct StudentOut {
    pub student: Student,
}

#[derive(Serialize)]
pub struct ProfileOut {
    pub profile: StudentProfile,
}

/// Field-wise profile update. Absent fields are untouched. Achievements are
/// server-derived and cannot be written from outside.
#[derive(Deserialize, Default)]
pub struct ProfileUpdateIn {
    pub quiz_scores: Option<BTreeMap<String, f64>>,
    pub completed_modules: Option<Vec<String>>,
    pub final_test_score: Option<i64>,
    pub study_time: Option<u64>,
    pub notes: Option<BTreeMap<String, String>>,
    pub bookmarks: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct SubmitQuizIn {
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub completed_modules: Vec<String>,
}

/// One newly unlocked achievement, ready for notification dispatch.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct UnlockOut {
    pub id: &'static str,
    pub title: &'static str,
    pub message: &'static str,
}

#[derive(Serialize, Debug)]
pub struct SubmitQuizOut {
    pub message: String,
    pub profile: StudentProfile,
    pub unlocked: Vec<UnlockOut>,
}

#[derive(Serialize)]
pub struct LoginOut {
    pub message: String,
    pub streak: u32,
    pub unlocked: Vec<UnlockOut>,
}

#[derive(Serialize)]
pub struct QuizOut {
    pub quiz: BTreeMap<String, Vec<QuizQuestion>>,
}

#[derive(Serialize)]
pub struct LeaderboardRow {
    pub id: String,
    pub name: String,
    pub score: i64,
    pub completed: usize,
    pub streak: u32,
}

#[derive(Serialize)]
pub struct LeaderboardOut {
    pub leaderboard: Vec<LeaderboardRow>,
}

//
// Notifications
//

#[derive(Serialize)]
pub struct NotificationsOut {
    pub notifications: Vec<Notification>,
}

/// Mark one notification read, or all of them when `id` is absent.
#[derive(Deserialize, Default)]
pub struct MarkReadIn {
    pub id: Option<String>,
}

//
// Question management
//

#[derive(Serialize)]
pub struct QuestionsOut {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Serialize)]
pub struct QuestionOut {
    pub message: String,
    pub question: QuizQuestion,
}

#[derive(Deserialize)]
pub struct QuestionIn {
    pub topic: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct QuestionUpdateIn {
    pub topic: Option<String>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub difficulty: Option<String>,
    pub hint: Option<String>,
    pub explanation: Option<String>,
}

//
// AI endpoints
//

#[derive(Deserialize)]
pub struct GenerateQuestionsIn {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Serialize)]
pub struct GenerateQuestionsOut {
    pub message: String,
    pub questions: Vec<QuizQuestion>,
}

/// One tutor conversation turn; the caller replays prior turns each call.
/// Roles follow the model API convention: "user" or "model".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
}

#[derive(Deserialize)]
pub struct ChatIn {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Serialize)]
pub struct ChatOut {
    pub response: String,
}

/// AI performance analysis. Parsed best-effort: absent keys default rather
/// than failing the whole object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    #[serde(default)]
    pub overall_performance: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub study_strategies: Vec<String>,
}

#[derive(Deserialize)]
pub struct StudyPlanIn {
    #[serde(default = "default_hours")]
    pub hours: u32,
}

fn default_hours() -> u32 {
    10
}

/// AI weekly study plan, parsed best-effort like the analysis object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StudyPlan {
    #[serde(default)]
    pub weekly_schedule: Vec<DayPlan>,
    #[serde(default)]
    pub milestones: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DayPlan {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub activities: Vec<String>,
}

#[derive(Deserialize)]
pub struct ExplainIn {
    pub topic: String,
    pub concept: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Serialize)]
pub struct ExplainOut {
    pub explanation: String,
}
