//! `POST /api/v1/chat`: one check-in turn from a multipart form.
//!
//! Fields: `session_id` (required), `text`, `audio` (file), `is_extra_phase`, `username`.

use super::ApiError;
use crate::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};
use solace_core::{TurnOutcome, TurnPhase, TurnRequest, DEFAULT_USERNAME};

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

async fn read_turn_form(mut multipart: Multipart) -> Result<TurnRequest, ApiError> {
    let mut session_id: Option<String> = None;
    let mut text: Option<String> = None;
    let mut audio: Option<Vec<u8>> = None;
    let mut extension = false;
    let mut username: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable audio: {}", e)))?;
                audio = Some(bytes.to_vec());
            }
            "session_id" | "text" | "is_extra_phase" | "username" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable field {}: {}", name, e)))?;
                match name.as_str() {
                    "session_id" => session_id = Some(value),
                    "text" => text = Some(value),
                    "is_extra_phase" => extension = parse_flag(&value),
                    _ => username = Some(value),
                }
            }
            _ => {}
        }
    }

    let session_id = session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("session_id is required".to_string()))?;
    let username = username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

    Ok(TurnRequest {
        session_id,
        text,
        audio,
        phase: TurnPhase::from_extension_flag(extension),
        username,
    })
}

pub async fn chat(State(state): State<AppState>, multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let request = read_turn_form(multipart).await?;
    tracing::debug!(
        target: "solace::gateway",
        session_id = %request.session_id,
        phase = ?request.phase,
        has_audio = request.audio.is_some(),
        "chat turn received"
    );

    let body = match state.orchestrator.handle_turn(request).await {
        TurnOutcome::Concluded { message } => json!({ "response": message, "concluded": true }),
        TurnOutcome::Reply(reply) => json!({
            "response": reply.reply,
            "emotion": reply.emotion,
            "current_turn": reply.current_turn,
            "is_final": reply.is_final,
            "analytics": reply.analytics,
            "transcribed_text": reply.resolved_text,
            "concluded": false,
        }),
    };
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn extension_flag_accepts_form_spellings() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" True "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
