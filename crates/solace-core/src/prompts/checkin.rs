//! Per-turn check-in prompts: schedule acknowledgment, context resolution, and the dialog reply.

use super::fill_template;
use crate::emotion::{EmotionLabel, EmotionDistribution};
use crate::session::{TurnRecord, POSITIVE_PHASE_LAST_TURN};

/// Turn 1: acknowledge the schedule and open with the best part of the day.
pub const ACKNOWLEDGMENT_TEMPLATE: &str = "The user shared this schedule: {schedule}. Briefly acknowledge it and ask first about the best part of the day, even if there was none, any moment that made the user happy (Turn 2/11). Max 40 words. DO NOT explain your instructions, JUST output the response.";

/// Used when the acknowledgment call fails.
pub const ACKNOWLEDGMENT_FALLBACK: &str =
    "Thanks for sharing your day with me. What was the best part of it, even if it was something small?";

/// Turns 2..N: resolve pronouns against recent history and estimate emotions. Requested as JSON.
pub const RESOLUTION_TEMPLATE: &str = r#"Resolve context for '{utterance}' using HISTORY: {history} and SCHEDULE: {schedule}.
Return JSON with 'resolved_text' and 'scores' for {labels}.
CONSTRAINT: Maintain the user's tone and emotions, do not exaggerate anything, just resolve pronouns such as 'this', 'that', 'such'."#;

/// Dialog reply conditioned on the detected emotion and the turn position.
pub const DIALOG_REPLY_TEMPLATE: &str = r#"User Input: "{utterance}"
Detected Emotion: {emotion}
Schedule: {schedule}

Task: Respond with professional clinical empathy. Address any hidden sarcasm or pain detected. Questions should only be answerable in a descriptive manner.
{phase_instruction}. One open-ended question only (not answerable with yes or no). You have 10 questions numbered from 2 to 11.
Ask ONLY the question appropriate for current Turn {turn}.

IF IS_FINAL_TURN=True:
DO NOT ask a question. Provide a short 2-sentence emotional summary, one short wellness exercise, and a goal for tomorrow.

CONSTRAINT: Do NOT ask repetitive questions. Do not start every response with "it sounds like". Ask one question at a time. Respond ONLY with the dialogue. DO NOT explain your instructions. Do not include the number count in the response.
IS_FINAL_TURN: {is_final} | Current turn: {turn}"#;

/// Used when a non-terminal dialog reply cannot be generated.
pub const DIALOG_REPLY_FALLBACK: &str =
    "Thank you for telling me that. Could you describe a little more about how that moment felt for you?";

/// Used when the closing summary of a terminal turn cannot be generated.
pub const CLOSING_REPLY_FALLBACK: &str = "Thank you for checking in today. Take five slow breaths before bed, and tomorrow set aside one small moment that is just for you.";

/// Early turns ask about positives; later turns ask about a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseInstruction {
    Positives,
    Challenge,
}

impl PhaseInstruction {
    pub fn for_counter(counter: u32) -> Self {
        if counter <= POSITIVE_PHASE_LAST_TURN {
            PhaseInstruction::Positives
        } else {
            PhaseInstruction::Challenge
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseInstruction::Positives => "Ask an open-ended question about what was good about the user's day",
            PhaseInstruction::Challenge => "Ask about something bad or challenging in the user's day",
        }
    }
}

/// `U: ... | B: ...` lines, oldest first.
pub fn format_history(turns: &[TurnRecord]) -> String {
    turns
        .iter()
        .map(|t| format!("U: {} | B: {}", t.user, t.reply))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn acknowledgment_prompt(schedule: &str) -> String {
    fill_template(ACKNOWLEDGMENT_TEMPLATE, &[("schedule", schedule)])
}

pub fn resolution_prompt(utterance: &str, history: &[TurnRecord], schedule: &str) -> String {
    let labels = EmotionLabel::ALL.map(|l| l.as_str()).join(", ");
    fill_template(
        RESOLUTION_TEMPLATE,
        &[
            ("labels", &labels),
            ("history", &format_history(history)),
            ("schedule", schedule),
            ("utterance", utterance),
        ],
    )
}

/// Inputs of the dialog reply prompt.
#[derive(Debug, Clone, Copy)]
pub struct DialogPrompt<'a> {
    pub utterance: &'a str,
    pub emotion: EmotionLabel,
    pub schedule: &'a str,
    pub turn: u32,
    pub instruction: PhaseInstruction,
    pub is_final: bool,
}

pub fn dialog_reply_prompt(args: &DialogPrompt<'_>) -> String {
    fill_template(
        DIALOG_REPLY_TEMPLATE,
        &[
            ("emotion", &args.emotion.as_str().to_uppercase()),
            ("phase_instruction", args.instruction.as_str()),
            ("turn", &args.turn.to_string()),
            ("is_final", if args.is_final { "True" } else { "False" }),
            ("schedule", args.schedule),
            ("utterance", args.utterance),
        ],
    )
}

/// Parsed context-resolution answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub resolved_text: String,
    pub scores: EmotionDistribution,
}

impl Resolution {
    /// Raw utterance with uniform 0.1 scores.
    pub fn fallback(utterance: &str) -> Self {
        Self {
            resolved_text: utterance.to_string(),
            scores: EmotionDistribution::uniform(0.1),
        }
    }
}

#[derive(serde::Deserialize)]
struct ResolutionBody {
    #[serde(default)]
    resolved_text: Option<String>,
    #[serde(default)]
    scores: Option<EmotionDistribution>,
}

/// Parses the model's JSON answer. A missing `resolved_text` keeps the raw utterance and
/// missing `scores` keep the uniform fallback; unparseable output is an error.
pub fn parse_resolution(raw: &str, utterance: &str) -> Result<Resolution, serde_json::Error> {
    let body: ResolutionBody = serde_json::from_str(strip_code_fence(raw))?;
    let fallback = Resolution::fallback(utterance);
    Ok(Resolution {
        resolved_text: body
            .resolved_text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(fallback.resolved_text),
        scores: body.scores.unwrap_or(fallback.scores),
    })
}

/// Strips a surrounding ```json fence some models add even in JSON mode.
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: u32, user: &str, reply: &str) -> TurnRecord {
        TurnRecord {
            turn: n,
            user: user.to_string(),
            reply: reply.to_string(),
            emotion: EmotionLabel::Neutral,
        }
    }

    #[test]
    fn phase_instruction_switches_after_turn_six() {
        assert_eq!(PhaseInstruction::for_counter(2), PhaseInstruction::Positives);
        assert_eq!(PhaseInstruction::for_counter(6), PhaseInstruction::Positives);
        assert_eq!(PhaseInstruction::for_counter(7), PhaseInstruction::Challenge);
        assert_eq!(PhaseInstruction::for_counter(11), PhaseInstruction::Challenge);
    }

    #[test]
    fn resolution_prompt_carries_history_and_labels() {
        let history = [turn(1, "work then gym", "Nice!"), turn(2, "the gym was great", "What made it great?")];
        let p = resolution_prompt("that was fun", &history, "work then gym");
        assert!(p.contains("'that was fun'"));
        assert!(p.contains("U: the gym was great | B: What made it great?"));
        assert!(p.contains("neutral, anger, disgust, fear, happiness, sadness, surprise"));
    }

    #[test]
    fn placeholder_text_from_the_user_stays_literal() {
        let history = [turn(1, "notes on {utterance} and {schedule}", "Okay.")];
        let p = resolution_prompt("it went well", &history, "plan {history}");
        assert!(p.contains("U: notes on {utterance} and {schedule} | B: Okay."));
        assert!(p.contains("SCHEDULE: plan {history}"));
        assert_eq!(p.matches("it went well").count(), 1);

        let p = dialog_reply_prompt(&DialogPrompt {
            utterance: "fine",
            emotion: EmotionLabel::Neutral,
            schedule: "gym {utterance} {turn}",
            turn: 4,
            instruction: PhaseInstruction::for_counter(4),
            is_final: false,
        });
        assert!(p.contains("Schedule: gym {utterance} {turn}"));
        assert_eq!(p.matches("\"fine\"").count(), 1);
    }

    #[test]
    fn dialog_prompt_marks_final_turn() {
        let p = dialog_reply_prompt(&DialogPrompt {
            utterance: "tired",
            emotion: EmotionLabel::Sadness,
            schedule: "meetings",
            turn: 11,
            instruction: PhaseInstruction::for_counter(11),
            is_final: true,
        });
        assert!(p.contains("Detected Emotion: SADNESS"));
        assert!(p.contains("IS_FINAL_TURN: True | Current turn: 11"));
        assert!(p.contains("challenging"));
    }

    #[test]
    fn parses_resolution_json() {
        let raw = r#"{"resolved_text": "the gym session was fun", "scores": {"happiness": 0.8, "neutral": 0.1}}"#;
        let r = parse_resolution(raw, "that was fun").unwrap();
        assert_eq!(r.resolved_text, "the gym session was fun");
        assert_eq!(r.scores.dominant(), EmotionLabel::Happiness);
        assert_eq!(r.scores.get(EmotionLabel::Anger), 0.0);
    }

    #[test]
    fn resolution_fills_missing_fields_and_strips_fences() {
        let r = parse_resolution("```json\n{\"scores\": {\"fear\": 0.4}}\n```", "raw words").unwrap();
        assert_eq!(r.resolved_text, "raw words");
        assert_eq!(r.scores.dominant(), EmotionLabel::Fear);

        let r = parse_resolution(r#"{"resolved_text": "x"}"#, "raw").unwrap();
        assert_eq!(r.scores, EmotionDistribution::uniform(0.1));

        assert!(parse_resolution("not json at all", "raw").is_err());
    }
}
