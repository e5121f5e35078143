use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One structured video idea, either generated by the model or entered from
/// the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPlanIdea {
    #[serde(default)]
    pub pillar: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub description: String,
}

impl ContentPlanIdea {
    /// An idea is only usable when both its topic and its description carry text.
    pub fn is_complete(&self) -> bool {
        !self.topic.trim().is_empty() && !self.description.trim().is_empty()
    }
}

/// One entry of the append-only audit trail kept inside `results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub model_used: String,
    pub prompt: String,
}

/// The `results` JSONB document of a content plan.
///
/// Read once at the start of a generation run, merged in memory and written
/// back in full: last writer wins, there is no compare-and-swap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanResults {
    #[serde(default)]
    pub video_ideas: Vec<ContentPlanIdea>,
    /// Free-form text produced by an earlier generation pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub logs: Vec<GenerationLogEntry>,
    /// Keys written by other passes survive the full-document rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PlanResults {
    /// Appends freshly generated ideas after the existing ones, keeping both
    /// orders, and records one audit entry.
    pub fn merge_generated(
        &mut self,
        new_ideas: Vec<ContentPlanIdea>,
        log_entry: GenerationLogEntry,
    ) {
        self.video_ideas.extend(new_ideas);
        self.logs.push(log_entry);
    }
}

/// A content plan row: the strategy inputs entered from the dashboard plus the
/// generated `results` document.
#[derive(Debug, Clone)]
pub struct ContentPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub strategy: Option<String>,
    pub pillars: Option<String>,
    pub target_audience: Option<String>,
    pub koc_info: Option<String>,
    pub results: PlanResults,
}
