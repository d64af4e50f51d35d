//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; logs include parameters and basic result info.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use crate::error::Result;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthOut { ok: true, ai_available: state.ai_available() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (total_students, total_questions, topics) = state.stats().await;
    Json(StatsOut { total_students, total_questions, topics })
}

#[instrument(level = "info", skip(state, body), fields(name = %body.name))]
pub async fn http_register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterIn>,
) -> impl IntoResponse {
    let student = state.register_student(&body.name).await;
    Json(StudentOut { student })
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_login(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LoginOut>> {
    Ok(Json(logic::login(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProfileOut>> {
    let student = state
        .get_student(&id)
        .await
        .ok_or(crate::error::ApiError::NotFound("student"))?;
    Ok(Json(ProfileOut { profile: student.profile }))
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_update_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ProfileUpdateIn>,
) -> Result<Json<SubmitQuizOut>> {
    Ok(Json(logic::update_profile(&state, &id, body).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_quiz(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QuizOut>> {
    let student = state
        .get_student(&id)
        .await
        .ok_or(crate::error::ApiError::NotFound("student"))?;
    let quiz = state.personalized_quiz(&student.profile.weak_topics).await;
    info!(target: "learnsphere_backend", %id, topics = quiz.len(), "Personalized quiz served");
    Ok(Json(QuizOut { quiz }))
}

#[instrument(level = "info", skip(state, body), fields(%id, scores = body.scores.len()))]
pub async fn http_submit_quiz(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SubmitQuizIn>,
) -> Result<Json<SubmitQuizOut>> {
    Ok(Json(logic::submit_quiz(&state, &id, body).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_notifications(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    Json(NotificationsOut { notifications: state.notifications_for(&id).await })
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_mark_notifications_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<MarkReadIn>,
) -> Result<Json<MessageOut>> {
    if state.mark_notifications_read(&id, body.id.as_deref()).await {
        let message = match body.id {
            Some(_) => "Notification marked as read",
            None => "All notifications marked as read",
        };
        Ok(Json(MessageOut { message: message.into() }))
    } else {
        Err(crate::error::ApiError::NotFound("notification"))
    }
}

#[instrument(level = "info", skip(state))]
pub async fn http_leaderboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(LeaderboardOut { leaderboard: state.leaderboard().await })
}

// --- Question management ---

#[instrument(level = "info", skip(state))]
pub async fn http_list_questions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(QuestionsOut { questions: state.list_questions().await })
}

#[instrument(level = "info", skip(state, body), fields(topic = %body.topic))]
pub async fn http_create_question(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QuestionIn>,
) -> Result<Json<QuestionOut>> {
    let question = logic::create_question(&state, body).await?;
    Ok(Json(QuestionOut { message: "Question created".into(), question }))
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_update_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<QuestionUpdateIn>,
) -> Result<Json<QuestionOut>> {
    let question = logic::update_question(&state, &id, body).await?;
    Ok(Json(QuestionOut { message: "Question updated".into(), question }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageOut>> {
    if state.delete_question(&id).await {
        Ok(Json(MessageOut { message: "Question deleted".into() }))
    } else {
        Err(crate::error::ApiError::NotFound("question"))
    }
}

// --- AI endpoints ---

#[instrument(level = "info", skip(state, body))]
pub async fn http_generate_questions(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateQuestionsIn>,
) -> impl IntoResponse {
    let topic = body.topic.unwrap_or_else(|| "Algebra".into());
    let difficulty = body.difficulty.unwrap_or_else(|| "medium".into());
    let count = body.count.unwrap_or(5);
    let out = logic::generate_questions(&state, &topic, &difficulty, count).await;
    info!(target: "ai", %topic, returned = out.questions.len(), "HTTP question generation served");
    Json(out)
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_tutor_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ChatIn>,
) -> Result<Json<ChatOut>> {
    Ok(Json(logic::tutor_chat(&state, &id, body).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_analyze(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PerformanceAnalysis>> {
    Ok(Json(logic::analyze_performance(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(%id, hours = body.hours))]
pub async fn http_study_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StudyPlanIn>,
) -> Result<Json<StudyPlan>> {
    Ok(Json(logic::study_plan(&state, &id, body.hours).await?))
}

#[instrument(level = "info", skip(state, body), fields(topic = %body.topic))]
pub async fn http_explain(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExplainIn>,
) -> impl IntoResponse {
    Json(logic::explain_concept(&state, body).await)
}
