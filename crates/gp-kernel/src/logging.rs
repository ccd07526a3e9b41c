//! Hash-chained mutation log
//!
//! Every command a role dispatches is appended as a [`MutationEvent`]. Each
//! event stores the SHA-256 of its predecessor, so editing or dropping an
//! entry breaks [`MutationLog::verify_integrity`].

use crate::error::LogError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// One logged command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Role that issued the command
    pub role: String,
    /// Workflow state current when the command ran
    pub state: String,
    pub action: String,
    pub result: String,
    #[serde(with = "hex_bytes")]
    pub prev_hash: [u8; 32],
    #[serde(with = "hex_bytes")]
    pub hash: [u8; 32],
}

impl MutationEvent {
    /// New event; hashes are filled in on append
    #[must_use]
    pub fn new(
        role: impl Into<String>,
        state: impl Into<String>,
        action: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role: role.into(),
            state: state.into(),
            action: action.into(),
            result: result.into(),
            prev_hash: [0u8; 32],
            hash: [0u8; 32],
        }
    }

    /// Hex form of the event hash
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Append-only event log
#[derive(Debug, Default)]
pub struct MutationLog {
    inner: Mutex<Vec<MutationEvent>>,
}

impl MutationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain and append an event
    pub fn append(&self, mut event: MutationEvent) -> Uuid {
        let mut guard = self.inner.lock();
        event.prev_hash = guard.last().map_or([0u8; 32], |e| e.hash);
        event.hash = compute_hash(&event);
        let id = event.event_id;
        guard.push(event);
        id
    }

    /// Snapshot of all events
    #[must_use]
    pub fn events(&self) -> Vec<MutationEvent> {
        self.inner.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Hash of the newest event, zero for an empty log
    #[must_use]
    pub fn head(&self) -> [u8; 32] {
        self.inner.lock().last().map_or([0u8; 32], |e| e.hash)
    }

    /// Re-check every link and hash
    ///
    /// # Errors
    /// Returns `IntegrityViolation` with the first bad index
    pub fn verify_integrity(&self) -> Result<(), LogError> {
        verify_chain(&self.inner.lock())
    }

    /// Build a log from stored events, checking the chain
    ///
    /// # Errors
    /// Returns `IntegrityViolation` if the events do not chain
    pub fn from_events(events: Vec<MutationEvent>) -> Result<Self, LogError> {
        verify_chain(&events)?;
        Ok(Self {
            inner: Mutex::new(events),
        })
    }
}

fn verify_chain(events: &[MutationEvent]) -> Result<(), LogError> {
    let mut prev = [0u8; 32];
    for (index, e) in events.iter().enumerate() {
        if e.prev_hash != prev || e.hash != compute_hash(e) {
            return Err(LogError::IntegrityViolation { index });
        }
        prev = e.hash;
    }
    Ok(())
}

fn compute_hash(event: &MutationEvent) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.event_id.as_bytes());
    hasher.update(event.timestamp.timestamp_micros().to_le_bytes());
    for field in [&event.role, &event.state, &event.action, &event.result] {
        hasher.update(field.as_bytes());
        hasher.update([0]);
    }
    hasher.update(event.prev_hash);
    hasher.finalize().into()
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut out = [0u8; 32];
        hex::decode_to_slice(&text, &mut out).map_err(D::Error::custom)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_links() {
        let log = MutationLog::new();
        log.append(MutationEvent::new("Planner", "init", "update_goal", "ok"));
        log.append(MutationEvent::new("Critic", "init", "set_task_completed", "ok"));
        let events = log.events();
        assert_eq!(events[0].prev_hash, [0u8; 32]);
        assert_eq!(events[1].prev_hash, events[0].hash);
        assert_eq!(log.head(), events[1].hash);
        assert!(log.verify_integrity().is_ok());
    }

    #[test]
    fn test_detects_tampering() {
        let log = MutationLog::new();
        log.append(MutationEvent::new("Planner", "init", "update_goal", "ok"));
        log.append(MutationEvent::new("Planner", "init", "update_roles", "ok"));
        let mut events = log.events();
        events[0].result = "error".into();
        assert_eq!(
            MutationLog::from_events(events).unwrap_err(),
            LogError::IntegrityViolation { index: 0 }
        );
    }

    #[test]
    fn test_json_preserves_chain() {
        let log = MutationLog::new();
        log.append(MutationEvent::new("Manager", "init", "search_the_web", "ok"));
        let json = serde_json::to_string(&log.events()).unwrap();
        assert!(json.contains(&log.events()[0].hash_hex()));
        let events: Vec<MutationEvent> = serde_json::from_str(&json).unwrap();
        assert!(MutationLog::from_events(events).is_ok());
    }
}
