pub mod content_plan_postgres_repository;
pub mod google_access_token_repository;
pub mod vertex_ai_repository;
