//! Sled-backed archive of completed sessions.
//!
//! Key layout: `sessions/{username}/{date}/{timestamp}_{session_id}` with JSON values, so a
//! prefix scan per user yields records in chronological order. The username segment escapes
//! `%` and `/` so one user's prefix never matches another user's keys.

use crate::error::CheckinResult;
use crate::session::CompletedSessionRecord;
use crate::traits::SessionArchive;
use sled::{Db, Tree};
use std::path::Path;

const TREE_NAME: &str = "completed_sessions";

fn user_segment(username: &str) -> String {
    username.replace('%', "%25").replace('/', "%2F")
}

fn user_prefix(username: &str) -> String {
    format!("sessions/{}/", user_segment(username))
}

fn record_key(record: &CompletedSessionRecord) -> String {
    format!(
        "{}{}/{}_{}",
        user_prefix(&record.username),
        record.date,
        record.timestamp,
        record.session_id
    )
}

pub struct SledSessionArchive {
    db: Db,
    tree: Tree,
}

impl SledSessionArchive {
    /// Opens or creates the archive at `path`.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { db, tree })
    }

    fn decode_prefix(&self, prefix: &str) -> CheckinResult<Vec<CompletedSessionRecord>> {
        let mut out = Vec::new();
        for item in self.tree.scan_prefix(prefix.as_bytes()) {
            let (key, value) = item?;
            match serde_json::from_slice::<CompletedSessionRecord>(&value) {
                Ok(record) => out.push(record),
                Err(e) => {
                    tracing::warn!(
                        target: "solace::archive",
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "skipping unreadable session record"
                    );
                }
            }
        }
        Ok(out)
    }
}

impl SessionArchive for SledSessionArchive {
    fn save(&self, record: &CompletedSessionRecord) -> CheckinResult<()> {
        let key = record_key(record);
        let value = serde_json::to_vec(record)?;
        self.tree.insert(key.as_bytes(), value)?;
        self.db.flush()?;
        tracing::info!(
            target: "solace::archive",
            key = %key,
            session_id = %record.session_id,
            "completed session saved"
        );
        Ok(())
    }

    fn list_dates(&self, username: &str) -> CheckinResult<Vec<String>> {
        let prefix = user_prefix(username);
        let mut dates: Vec<String> = Vec::new();
        for key in self.tree.scan_prefix(prefix.as_bytes()).keys() {
            let key = key?;
            let key = String::from_utf8_lossy(&key);
            if let Some(date) = key.get(prefix.len()..).and_then(|rest| rest.split('/').next()) {
                if dates.last().map(String::as_str) != Some(date) {
                    dates.push(date.to_string());
                }
            }
        }
        dates.reverse();
        Ok(dates)
    }

    fn load_for_date(&self, username: &str, date: &str) -> CheckinResult<Option<CompletedSessionRecord>> {
        let prefix = format!("{}{}/", user_prefix(username), date);
        Ok(self.decode_prefix(&prefix)?.pop())
    }

    fn load_all(&self, username: &str) -> CheckinResult<Vec<CompletedSessionRecord>> {
        self.decode_prefix(&user_prefix(username))
    }
}
