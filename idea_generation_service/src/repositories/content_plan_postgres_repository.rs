use common::helper::error_chain_fmt;
use sqlx::{types::Json, PgExecutor};
use uuid::Uuid;

use crate::domain::entities::content_plan::{ContentPlan, PlanResults};

pub struct ContentPlanPostgresRepository {}

impl Default for ContentPlanPostgresRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(sqlx::FromRow)]
struct ContentPlanRow {
    id: Uuid,
    user_id: Uuid,
    strategy: Option<String>,
    pillars: Option<String>,
    target_audience: Option<String>,
    koc_info: Option<String>,
    results: Json<PlanResults>,
}

impl From<ContentPlanRow> for ContentPlan {
    fn from(row: ContentPlanRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            strategy: row.strategy,
            pillars: row.pillars,
            target_audience: row.target_audience,
            koc_info: row.koc_info,
            results: row.results.0,
        }
    }
}

impl ContentPlanPostgresRepository {
    pub fn new() -> Self {
        Self {}
    }

    #[tracing::instrument(name = "Fetching content plan from database", skip(self, db_executor))]
    pub async fn get_plan(
        &self,
        db_executor: impl PgExecutor<'_>,
        plan_id: Uuid,
    ) -> Result<Option<ContentPlan>, ContentPlanPostgresRepositoryError> {
        let row = sqlx::query_as::<_, ContentPlanRow>(
            r#"
    SELECT id, user_id, strategy, pillars, target_audience, koc_info, results
    FROM content_plans
    WHERE id = $1
            "#,
        )
        .bind(plan_id)
        .fetch_optional(db_executor)
        .await?;

        Ok(row.map(ContentPlan::from))
    }

    #[tracing::instrument(
        name = "Fetching prompt template override",
        skip(self, db_executor)
    )]
    pub async fn get_prompt_template(
        &self,
        db_executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Option<String>, ContentPlanPostgresRepositoryError> {
        let template = sqlx::query_scalar::<_, String>(
            r#"
    SELECT template FROM prompt_templates WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db_executor)
        .await?;

        Ok(template)
    }

    /// Writes the whole merged `results` document back. Last writer wins:
    /// there is no optimistic concurrency check on this column.
    #[tracing::instrument(
        name = "Persisting merged plan results",
        skip(self, db_executor, results)
    )]
    pub async fn update_results(
        &self,
        db_executor: impl PgExecutor<'_>,
        plan_id: Uuid,
        results: &PlanResults,
    ) -> Result<(), ContentPlanPostgresRepositoryError> {
        sqlx::query(
            r#"
    UPDATE content_plans SET results = $2, updated_at = now() WHERE id = $1
            "#,
        )
        .bind(plan_id)
        .bind(Json(results))
        .execute(db_executor)
        .await?;

        Ok(())
    }
}

#[derive(thiserror::Error)]
pub enum ContentPlanPostgresRepositoryError {
    #[error(transparent)]
    DBError(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl std::fmt::Debug for ContentPlanPostgresRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
