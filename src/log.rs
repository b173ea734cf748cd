//! Provides the [`Log`] trait, the `log` constructor option from the cache's external interface.
//!
//! A supplied `Log` receives a `warn` call naming the key on worker timeout and on worker rejection. It is purely
//! a diagnostic sink; no cache behavior depends on it being present.

/// A diagnostic sink for [`CacheManager`][crate::CacheManager].
///
/// Implement this to route cache diagnostics into your own logging framework. If none is supplied, diagnostics are
/// only emitted via `tracing` (when the `tracing` Cargo feature is enabled).
pub trait Log: Send + Sync {
	/// Logs an informational message.
	fn info(&self, message: &str);
	/// Logs a warning, e.g. a worker timeout or rejection.
	fn warn(&self, message: &str);
	/// Logs an error.
	fn error(&self, message: &str);
	/// Logs a debug-level message, e.g. single-flight attach events.
	fn debug(&self, message: &str);
}

/// A [`Log`] that discards everything. Used when no `log` option is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLog;

impl Log for NoopLog {
	fn info(&self, _message: &str) {}
	fn warn(&self, _message: &str) {}
	fn error(&self, _message: &str) {}
	fn debug(&self, _message: &str) {}
}

#[doc(hidden)]
pub mod mock {
	use parking_lot::Mutex;

	#[derive(Default)]
	pub struct MockLog {
		pub lines: Mutex<Vec<(&'static str, String)>>
	}

	impl MockLog {
		pub fn warnings(&self) -> Vec<String> {
			self.lines.lock().iter().filter(|(level, _)| *level == "warn").map(|(_, msg)| msg.clone()).collect()
		}
	}

	impl super::Log for MockLog {
		fn info(&self, message: &str) {
			self.lines.lock().push(("info", message.to_string()));
		}
		fn warn(&self, message: &str) {
			self.lines.lock().push(("warn", message.to_string()));
		}
		fn error(&self, message: &str) {
			self.lines.lock().push(("error", message.to_string()));
		}
		fn debug(&self, message: &str) {
			self.lines.lock().push(("debug", message.to_string()));
		}
	}
}
