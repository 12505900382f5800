//! History, per-date session, and weekly profile endpoints over the session archive.

use super::ApiError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use solace_core::{aggregate, CompletedSessionRecord, WeeklyProfile};

/// `GET /api/v1/history/:username` -> dates newest first.
pub async fn history(State(state): State<AppState>, Path(username): Path<String>) -> Result<Json<Value>, ApiError> {
    let dates = state.archive.list_dates(&username)?;
    Ok(Json(json!({ "dates": dates })))
}

/// `GET /api/v1/sessions/:username/:date` -> latest completed record on that date.
pub async fn session_for_date(
    State(state): State<AppState>,
    Path((username, date)): Path<(String, String)>,
) -> Result<Json<CompletedSessionRecord>, ApiError> {
    state
        .archive
        .load_for_date(&username, &date)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no session found for {} on {}", username, date)))
}

#[derive(Debug, Default, Deserialize)]
pub struct WeeklyQuery {
    #[serde(default)]
    pub narrative: bool,
}

/// `GET /api/v1/weekly/:username[?narrative=true]`.
pub async fn weekly(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<WeeklyQuery>,
) -> Result<Json<Value>, ApiError> {
    let records = state.archive.load_all(&username)?;
    if records.is_empty() {
        return Err(ApiError::NotFound(format!("no session logs found for {}", username)));
    }

    let profile = aggregate(&records);
    let body = match &profile {
        WeeklyProfile::Locked { days_logged } => json!({
            "status": "locked",
            "days_logged": days_logged,
            "progress": profile.progress_label(),
            "days_remaining": profile.days_remaining(),
        }),
        WeeklyProfile::Unlocked(insights) => {
            let mut body = json!({
                "status": "unlocked",
                "session_count": records.len(),
                "insights": insights,
            });
            if query.narrative {
                let narrative = state.narrator.narrate(insights).await;
                body["narrative"] = json!(narrative);
            }
            body
        }
    };
    tracing::info!(
        target: "solace::gateway",
        username = %username,
        unlocked = profile.is_unlocked(),
        narrative = query.narrative,
        "weekly profile served"
    );
    Ok(Json(body))
}
