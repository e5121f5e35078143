use crate::domain::entities::content_plan::{ContentPlan, ContentPlanIdea};

/// Default brief sent to the model when the user has not stored their own
/// template. Written in the product locale; asks for a strict JSON array and
/// names the tag format the parser accepts as fallback.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
Bạn là chuyên gia chiến lược nội dung cho KOC ảo.

Chiến lược tổng thể: {{STRATEGY}}
Các trụ cột nội dung: {{PILLARS}}
Khách hàng mục tiêu: {{TARGET_AUDIENCE}}
Thông tin KOC: {{KOC_INFO}}

Các ý tưởng đã có (không đề xuất lại):
{{EXISTING_IDEAS}}

Hãy đề xuất 5 ý tưởng video mới. Trả về một mảng JSON thuần, mỗi phần tử có dạng
{\"pillar\": \"...\", \"topic\": \"...\", \"description\": \"...\"}.
Nếu không thể trả về JSON, hãy bọc mỗi ý tưởng trong thẻ
<IDEA><IDEA_TITLE>tiêu đề</IDEA_TITLE><IDEA_SCRIPT>kịch bản</IDEA_SCRIPT></IDEA>.
";

/// Substitutes the plan's stored inputs into the prompt template.
///
/// A non-blank `custom_template` (the user's `prompt_templates` row) overrides
/// the default. Substitution is literal: placeholder-like substrings inside
/// user content are not escaped and will corrupt the prompt (known risk,
/// inherited behavior).
pub fn build_prompt(custom_template: Option<&str>, plan: &ContentPlan) -> String {
    let template = match custom_template {
        Some(template) if !template.trim().is_empty() => template,
        _ => DEFAULT_PROMPT_TEMPLATE,
    };

    template
        .replace("{{STRATEGY}}", plan.strategy.as_deref().unwrap_or(""))
        .replace("{{PILLARS}}", plan.pillars.as_deref().unwrap_or(""))
        .replace(
            "{{TARGET_AUDIENCE}}",
            plan.target_audience.as_deref().unwrap_or(""),
        )
        .replace("{{KOC_INFO}}", plan.koc_info.as_deref().unwrap_or(""))
        .replace(
            "{{EXISTING_IDEAS}}",
            &format_existing_ideas(&plan.results.video_ideas),
        )
}

fn format_existing_ideas(ideas: &[ContentPlanIdea]) -> String {
    if ideas.is_empty() {
        return "(chưa có ý tưởng nào)".to_string();
    }

    ideas
        .iter()
        .map(|idea| format!("- {}", idea.topic))
        .collect::<Vec<_>>()
        .join("\n")
}
