pub mod content_plan;
pub mod service_account;
