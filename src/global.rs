//! Process-wide single-occupancy registry.
//!
//! [`RedisManager`] is an ordinary value: construct it once at the
//! composition root and pass clones to consumers. For callers that cannot
//! thread the handle through (plugin entry points, deeply nested call
//! sites), this module offers an explicit registry holding at most one
//! manager per process. The slot is never replaced, even by a disabled
//! manager, so occupancy doubles as the double-initialization guard.

use std::sync::OnceLock;

use crate::error::Error;
use crate::manager::RedisManager;

static INSTANCE: OnceLock<RedisManager> = OnceLock::new();

/// Installs a manager into the process-wide slot.
///
/// # Errors
///
/// [`Error::AlreadyInstalled`] if any manager, including a disabled one,
/// occupies the slot.
pub fn install(manager: RedisManager) -> Result<(), Error> {
    INSTANCE.set(manager).map_err(|_| Error::AlreadyInstalled)
}

/// Returns the installed manager.
///
/// # Errors
///
/// [`Error::NotInstalled`] if [`install`] has not run yet.
pub fn instance() -> Result<&'static RedisManager, Error> {
    INSTANCE.get().ok_or(Error::NotInstalled)
}
