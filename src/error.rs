use std::{fmt, sync::Arc};

/// Any error that can result from [`CacheManager::get`][crate::CacheManager::get].
///
/// These map directly to the three error kinds the request lifecycle can surface to a caller; a worker-less read of
/// a stale or missing key is not an error. It resolves to `Ok(None)`, see [`CacheManager::get`][crate::CacheManager::get].
pub enum CacheError<E> {
	/// The worker timed out for a key with no stale entry available to fall back on.
	ColdTimeout {
		/// The key that timed out.
		key: String
	},
	/// The worker rejected (returned `Err`) or panicked for a key with no stale entry available to fall back on.
	ColdRejection {
		/// The key that failed.
		key: String,
		/// The underlying error returned by the worker, or `None` if the worker panicked.
		source: Option<Arc<E>>
	},
	/// A missing key was requested while its cooldown (armed by a previous failure) is still live.
	ColdCooldown {
		/// The key that is in cooldown.
		key: String
	}
}

impl<E> CacheError<E> {
	/// The key this error concerns.
	pub fn key(&self) -> &str {
		match self {
			Self::ColdTimeout { key } => key,
			Self::ColdRejection { key, .. } => key,
			Self::ColdCooldown { key } => key
		}
	}
}

impl<E: fmt::Debug> fmt::Debug for CacheError<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ColdTimeout { key } => f.debug_struct("CacheError::ColdTimeout").field("key", key).finish(),
			Self::ColdRejection { key, source } => f.debug_struct("CacheError::ColdRejection").field("key", key).field("source", source).finish(),
			Self::ColdCooldown { key } => f.debug_struct("CacheError::ColdCooldown").field("key", key).finish()
		}
	}
}

impl<E: fmt::Display> fmt::Display for CacheError<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ColdTimeout { key } => write!(f, "worker for key `{key}` timed out with no stale data to serve"),
			Self::ColdRejection { key, source: Some(source) } => write!(f, "worker for key `{key}` failed: {source}"),
			Self::ColdRejection { key, source: None } => write!(f, "worker for key `{key}` panicked"),
			Self::ColdCooldown { key } => write!(f, "key `{key}` is in cooldown after a previous failure")
		}
	}
}

impl<E> Clone for CacheError<E> {
	fn clone(&self) -> Self {
		match self {
			Self::ColdTimeout { key } => Self::ColdTimeout { key: key.clone() },
			Self::ColdRejection { key, source } => Self::ColdRejection { key: key.clone(), source: source.clone() },
			Self::ColdCooldown { key } => Self::ColdCooldown { key: key.clone() }
		}
	}
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for CacheError<E> {}
