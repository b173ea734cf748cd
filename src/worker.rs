//! The in-flight worker registry: coalesces concurrent `get` calls for the same key into one worker invocation.

use std::{
	collections::HashMap,
	sync::{Arc, atomic::AtomicBool}
};

use tokio::sync::watch;

use crate::store::Entry;

/// The eventual result of a single worker invocation, as seen by every attached caller.
pub(crate) enum WorkerOutcome<V, E> {
	/// Carries the full [`Entry`] (not just the value) so attached callers can build an accurate
	/// [`Outcome`][crate::Outcome] without a second store read.
	Success(Entry<V>),
	/// The worker returned `Err`, or panicked (`source` is `None` in that case).
	Failure(Option<Arc<E>>),
	/// The originator's `worker_timeout` elapsed before the worker settled.
	Timeout
}

impl<V: Clone, E> Clone for WorkerOutcome<V, E> {
	fn clone(&self) -> Self {
		match self {
			Self::Success(entry) => Self::Success(entry.clone()),
			Self::Failure(source) => Self::Failure(source.clone()),
			Self::Timeout => Self::Timeout
		}
	}
}

/// A single in-flight worker invocation shared by the originator and every attached caller.
///
/// `settled` arbitrates between the originator's timeout firing and the worker naturally completing: whichever
/// side wins the compare-exchange is the one that gets to finalize the registry/store/cooldown state. The loser's
/// result is discarded; a worker that settles after its timeout has already fired is a no-op.
pub(crate) struct WorkerHandle<V, E> {
	pub(crate) settled: AtomicBool,
	tx: watch::Sender<Option<WorkerOutcome<V, E>>>
}

impl<V, E> WorkerHandle<V, E> {
	fn new() -> (Self, watch::Receiver<Option<WorkerOutcome<V, E>>>) {
		let (tx, rx) = watch::channel(None);
		(Self { settled: AtomicBool::new(false), tx }, rx)
	}

	pub(crate) fn subscribe(&self) -> watch::Receiver<Option<WorkerOutcome<V, E>>> {
		self.tx.subscribe()
	}

	/// Publishes the final outcome to every subscriber. Only the caller that won the `settled` compare-exchange
	/// should call this.
	pub(crate) fn publish(&self, outcome: WorkerOutcome<V, E>) {
		let _ = self.tx.send(Some(outcome));
	}
}

/// `key -> in-flight WorkerHandle`, one per key with an active worker.
#[derive(Default)]
pub(crate) struct WorkerRegistry<V, E> {
	handles: HashMap<String, Arc<WorkerHandle<V, E>>>
}

impl<V, E> WorkerRegistry<V, E> {
	pub(crate) fn get(&self, key: &str) -> Option<Arc<WorkerHandle<V, E>>> {
		self.handles.get(key).cloned()
	}

	/// Registers a new handle as the originator for `key`, returning its receiver.
	///
	/// Must only be called when [`WorkerRegistry::get`] previously returned `None` for this key, under the same
	/// lock acquisition, otherwise two originators could race for the same key.
	pub(crate) fn insert(&mut self, key: String) -> (Arc<WorkerHandle<V, E>>, watch::Receiver<Option<WorkerOutcome<V, E>>>) {
		let (handle, rx) = WorkerHandle::new();
		let handle = Arc::new(handle);
		self.handles.insert(key, Arc::clone(&handle));
		(handle, rx)
	}

	/// Removes `key`'s handle, if it is still the one identified by `handle` (a handle may already have been
	/// replaced if this call lost a settlement race and a subsequent `get` started a fresh invocation).
	pub(crate) fn remove_if_current(&mut self, key: &str, handle: &Arc<WorkerHandle<V, E>>) {
		if let Some(current) = self.handles.get(key) {
			if Arc::ptr_eq(current, handle) {
				self.handles.remove(key);
			}
		}
	}
}
