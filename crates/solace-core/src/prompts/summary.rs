//! End-of-session extraction prompt: triggers, happy moments, and one suggestion as JSON.

use super::checkin::format_history;
use super::fill_template;
use crate::session::TurnRecord;

pub const CLINICAL_SUMMARY_TEMPLATE: &str = r#"You are a Clinical Data Analyst.
Analyze this therapy session.

USER SCHEDULE: {schedule}
SESSION HISTORY:
{history}

TASK: Provide the requested JSON extraction.

RULES:
- Return ONLY raw JSON without markdown markers or backticks.
- Do NOT use generic phrases.
- Be specific to the user's words.
- Triggers and happy_moments should be under 15 words.
- Suggestions should be one actionable, unique wellness tip for tomorrow.

EXPECTED JSON:
{
    "triggers": "1-2 specific events causing stress",
    "happy_moments": "Highlights mentioned by user that improved mood",
    "suggestions": "One actionable wellness tip"
}"#;

pub fn clinical_summary_prompt(schedule: &str, turns: &[TurnRecord]) -> String {
    fill_template(
        CLINICAL_SUMMARY_TEMPLATE,
        &[("history", &format_history(turns)), ("schedule", schedule)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionLabel;

    #[test]
    fn includes_schedule_and_full_transcript() {
        let turns = vec![
            TurnRecord { turn: 1, user: "work, then yoga".into(), reply: "Sounds full.".into(), emotion: EmotionLabel::Neutral },
            TurnRecord { turn: 2, user: "yoga was calm".into(), reply: "Lovely.".into(), emotion: EmotionLabel::Happiness },
        ];
        let p = clinical_summary_prompt("work, then yoga", &turns);
        assert!(p.contains("USER SCHEDULE: work, then yoga"));
        assert!(p.contains("U: work, then yoga | B: Sounds full.\nU: yoga was calm | B: Lovely."));
        assert!(p.contains("\"happy_moments\""));
    }
}
