//! Weekly narrative prompts: the sectioned emotional health profile and the next-week plan.

use super::fill_template;

/// Section headers the profile must use, in order.
pub const PROFILE_SECTION_HEADERS: [&str; 7] = [
    "OVERALL EMOTIONAL STATE",
    "DOMINANT EMOTIONS & PATTERNS",
    "STRESS TRIGGERS & ROOT CAUSES",
    "SOURCES OF JOY & POSITIVE ANCHORS",
    "EMOTIONAL VULNERABILITIES",
    "CLINICAL OBSERVATIONS",
    "PERSONALIZED RECOMMENDATIONS",
];

pub const DEEP_PROFILE_TEMPLATE: &str = r#"You are a senior clinical psychologist writing a comprehensive weekly emotional health report for a patient.

Session data:
{sessions}

Write a detailed, empathetic, structured emotional health profile with EXACTLY these sections (use the section names as headers, one per line, then the body):

{headers}

Rules: speak directly to the patient, be specific not generic, 3-5 sentences per section, no markdown symbols."#;

pub const DEEP_PROFILE_FALLBACK: &str =
    "Deep profile generation unavailable. Please check your API key and try again.";

pub const NEXT_WEEK_PLAN_TEMPLATE: &str = r#"You are a supportive wellness coach. Triggers this week: {triggers}. Joy sources: {joys}.
Write a warm, encouraging 1-paragraph plan for next week (under 100 words, speak directly to the user, no generic advice)."#;

pub const NEXT_WEEK_PLAN_FALLBACK: &str = "Keep going, you've shown real resilience this week. Use what brought you joy as your fuel for next week.";

/// `session_lines` is one `Date: .. | Dominant: .. | Triggers: .. | Happy: ..` line per session.
pub fn deep_profile_prompt(session_lines: &[String]) -> String {
    fill_template(
        DEEP_PROFILE_TEMPLATE,
        &[
            ("headers", &PROFILE_SECTION_HEADERS.join("\n")),
            ("sessions", &session_lines.join("\n")),
        ],
    )
}

pub fn next_week_plan_prompt(triggers: &[String], joys: &[String]) -> String {
    fill_template(
        NEXT_WEEK_PLAN_TEMPLATE,
        &[("triggers", &triggers.join(". ")), ("joys", &joys.join(". "))],
    )
}
