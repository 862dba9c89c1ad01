use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Operational settings for the score engine. The point table is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Extra attempts after an optimistic-lock conflict before giving up
    pub max_retries: u32,

    /// Days after campaign completion by which evidence is due, when the
    /// campaign does not specify its own
    pub default_evidence_deadline_days: i64,

    /// Buffer size of the score-change notification channel
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_evidence_deadline_days: 15,
            event_channel_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_evidence_deadline_days < 0 {
            return Err(CoreError::InvalidConfig(format!(
                "default_evidence_deadline_days must not be negative, got {}",
                self.default_evidence_deadline_days
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "event_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
