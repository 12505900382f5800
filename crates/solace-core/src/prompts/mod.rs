//! Prompt templates for the check-in dialog, session summary, and weekly narrative.

pub mod checkin;
pub mod summary;
pub mod weekly;

/// Substitutes `{name}` placeholders in one left-to-right pass. Inserted values are never
/// rescanned, so user text containing `{...}` stays literal. Unknown placeholders are kept.
pub(crate) fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail.find('}').and_then(|close| {
            let name = &tail[1..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub use checkin::{
    acknowledgment_prompt, dialog_reply_prompt, format_history, parse_resolution, resolution_prompt,
    DialogPrompt, PhaseInstruction, Resolution, ACKNOWLEDGMENT_FALLBACK, CLOSING_REPLY_FALLBACK,
    DIALOG_REPLY_FALLBACK,
};
pub use summary::clinical_summary_prompt;
pub use weekly::{
    deep_profile_prompt, next_week_plan_prompt, DEEP_PROFILE_FALLBACK, NEXT_WEEK_PLAN_FALLBACK,
    PROFILE_SECTION_HEADERS,
};
