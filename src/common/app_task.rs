use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Identifies one attempt of one map task of a shuffle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppTaskAttemptId {
    pub app_id: String,
    pub app_attempt: String,
    pub shuffle_id: u32,
    pub map_id: u32,
    pub task_attempt_id: u64,
}

impl AppTaskAttemptId {
    pub fn new(
        app_id: impl Into<String>,
        app_attempt: impl Into<String>,
        shuffle_id: u32,
        map_id: u32,
        task_attempt_id: u64,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_attempt: app_attempt.into(),
            shuffle_id,
            map_id,
            task_attempt_id,
        }
    }
}

impl fmt::Display for AppTaskAttemptId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "AppTaskAttemptId{{appId={}, appAttempt={}, shuffleId={}, mapId={}, taskAttemptId={}}}",
            self.app_id, self.app_attempt, self.shuffle_id, self.map_id, self.task_attempt_id
        )
    }
}
