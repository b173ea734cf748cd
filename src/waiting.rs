//! The cooldown/backoff registry: suppresses re-invoking a worker for a key that recently failed.

use std::collections::HashMap;

/// One active cooldown.
#[derive(Debug, Clone, Copy)]
pub struct WaitingRecord {
	pub started_ms: u64,
	pub wait_ms: u64
}

impl WaitingRecord {
	fn is_live(&self, now_ms: u64) -> bool {
		now_ms < self.started_ms + self.wait_ms
	}
}

/// `key -> WaitingRecord` for every key currently in cooldown.
#[derive(Default)]
pub(crate) struct WaitingRegistry {
	records: HashMap<String, WaitingRecord>
}

impl WaitingRegistry {
	pub(crate) fn get(&self, key: &str) -> Option<WaitingRecord> {
		self.records.get(key).copied()
	}

	/// `true` if `key` is currently within its cooldown window.
	pub(crate) fn is_live(&self, key: &str, now_ms: u64) -> bool {
		self.records.get(key).is_some_and(|record| record.is_live(now_ms))
	}

	/// Arms (or re-arms) a cooldown after a worker failure/timeout.
	///
	/// By construction this is only ever called after a live-cooldown check has already failed (the worker would
	/// not have run otherwise), so any existing record here has already expired; this still guards against
	/// replacing a record that somehow became live again.
	pub(crate) fn arm(&mut self, key: &str, now_ms: u64, wait_ms: u64) {
		if self.records.get(key).is_some_and(|record| record.is_live(now_ms)) {
			return;
		}
		self.records.insert(key.to_string(), WaitingRecord { started_ms: now_ms, wait_ms });
	}

	/// Clears a key's cooldown, e.g. after a successful worker completion.
	pub(crate) fn clear(&mut self, key: &str) {
		self.records.remove(key);
	}
}
