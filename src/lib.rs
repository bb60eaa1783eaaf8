#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod config;
mod error;
mod global;
mod manager;

pub use crate::config::{CREDENTIALS_ENV, Credentials};
pub use crate::error::{ConfigError, Error};
pub use crate::global::{install, instance};
pub use crate::manager::{
    CommandFuture, FailurePolicy, RedisManager, RedisManagerBuilder, State,
};

/// Advisory prefix for keys stored in the shared database.
///
/// Not enforced by the manager; callers are expected to prepend it so keys
/// from different deployments stay distinguishable.
pub const KEY_PREFIX: &str = "Skylands.";

#[doc(inline)]
pub use deadpool_redis::Connection;

// Callers write commands against this exact client version, so re-export it
// rather than have them pin a matching one.
pub use redis;
