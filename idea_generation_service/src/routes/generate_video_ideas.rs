use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use chrono::Utc;
use common::helper::error_chain_fmt;
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::entities::content_plan::GenerationLogEntry;
use crate::domain::services::build_prompt::build_prompt;
use crate::domain::services::parse_video_ideas::parse_video_ideas;
use crate::repositories::{
    content_plan_postgres_repository::{
        ContentPlanPostgresRepository, ContentPlanPostgresRepositoryError,
    },
    google_access_token_repository::{
        GoogleAccessTokenRepository, GoogleAccessTokenRepositoryError,
    },
    vertex_ai_repository::{VertexAiRepository, VertexAiRepositoryError},
};

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct GenerateVideoIdeasBodyData {
    #[serde(rename = "planId")]
    pub plan_id: Uuid,
}

/// Generates additional video ideas for a content plan.
///
/// The steps run strictly sequentially: fetch the plan, build the prompt,
/// mint an access token, call Vertex AI, parse the output, persist the merged
/// results. Any failure aborts the run; nothing is retried or compensated.
#[tracing::instrument(
    name = "Generate more video ideas",
    skip(pool, plan_repository, access_token_repository, vertex_ai_repository, body),
    fields(plan_id = %body.plan_id)
)]
pub async fn generate_video_ideas(
    pool: web::Data<PgPool>,
    plan_repository: web::Data<ContentPlanPostgresRepository>,
    access_token_repository: web::Data<GoogleAccessTokenRepository>,
    vertex_ai_repository: web::Data<VertexAiRepository>,
    body: web::Json<GenerateVideoIdeasBodyData>,
) -> Result<HttpResponse, GenerateVideoIdeasError> {
    // Fetch
    let plan = plan_repository
        .get_plan(pool.get_ref(), body.plan_id)
        .await?
        .ok_or(GenerateVideoIdeasError::PlanNotFound(body.plan_id))?;

    // Prompt
    let custom_template = plan_repository
        .get_prompt_template(pool.get_ref(), plan.user_id)
        .await?;
    let prompt = build_prompt(custom_template.as_deref(), &plan);

    // Authenticate: credentials are re-read and a fresh token is minted on
    // every invocation.
    let credentials = access_token_repository.credentials()?;
    let access_token = access_token_repository
        .fetch_access_token(&credentials)
        .await?;

    // Generate
    let raw_output = vertex_ai_repository
        .generate_content(&credentials.project_id, &access_token, &prompt)
        .await?;

    // Parse
    let new_ideas = parse_video_ideas(&raw_output);
    if new_ideas.is_empty() {
        // The raw text stays server-side: it is logged for diagnosis but
        // never returned to the client.
        error!(%raw_output, "No ideas could be extracted from the model output");
        return Err(GenerateVideoIdeasError::NoIdeasExtracted);
    }

    info!(
        nb_new_ideas = new_ideas.len(),
        "Extracted new video ideas, persisting merged results"
    );

    // Persist
    let mut results = plan.results;
    results.merge_generated(
        new_ideas,
        GenerationLogEntry {
            timestamp: Utc::now(),
            action: "generate_more_video_ideas".to_string(),
            model_used: vertex_ai_repository.model().to_string(),
            prompt,
        },
    );
    plan_repository
        .update_results(pool.get_ref(), plan.id, &results)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[derive(thiserror::Error)]
pub enum GenerateVideoIdeasError {
    #[error("Content plan {0} was not found")]
    PlanNotFound(Uuid),
    #[error(transparent)]
    AuthenticationError(#[from] GoogleAccessTokenRepositoryError),
    #[error(transparent)]
    GenerationError(#[from] VertexAiRepositoryError),
    #[error("No video ideas could be extracted from the AI response")]
    NoIdeasExtracted,
    #[error(transparent)]
    RepositoryError(#[from] ContentPlanPostgresRepositoryError),
    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
}

impl std::fmt::Debug for GenerateVideoIdeasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for GenerateVideoIdeasError {
    /// Every failure class maps to the same uniform envelope: the dashboard
    /// only distinguishes success from failure and shows the error text.
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    #[tracing::instrument(name = "Response error from generate_video_ideas handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "success": false, "error": self.to_string() }))
    }
}
