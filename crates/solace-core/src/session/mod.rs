//! Session state, the completed-session record, and the in-memory session store.

mod record;
mod state;
mod store;

pub use record::{CompletedSessionRecord, SessionInsights, NOT_AVAILABLE};
pub use state::{
    EmotionScoreRecord, SessionStage, SessionState, TurnPhase, TurnRecord, EXTENSION_TURN_LIMIT,
    POSITIVE_PHASE_LAST_TURN, PRIMARY_TURN_LIMIT, RESOLUTION_HISTORY_TURNS,
};
pub use store::{SessionHandle, SessionStore};
