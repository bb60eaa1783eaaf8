//! Connection credentials and their wire formats.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable holding colon-delimited credentials.
pub const CREDENTIALS_ENV: &str = "REDIS_CREDS";

/// Credentials for a Redis-compatible server.
///
/// Three ways to obtain a value:
///
/// - [`Credentials::new`] from explicit parts,
/// - [`FromStr`] on the colon-delimited form `host:port:password` or
///   `host:port:user:password`,
/// - [`Credentials::from_env`], which parses the [`CREDENTIALS_ENV`]
///   environment variable.
///
/// Fields are split on the literal `:` character and no escaping is
/// supported, so a password containing `:` cannot be expressed in the
/// delimited form. Use [`Credentials::new`] for such passwords.
///
/// # Examples
///
/// ```
/// use skylands_redis::Credentials;
///
/// let creds: Credentials = "localhost:6379:admin:mypassword".parse().unwrap();
/// assert_eq!(creds.host(), "localhost");
/// assert_eq!(creds.port(), 6379);
/// assert_eq!(creds.username(), Some("admin"));
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    host: String,
    port: u16,
    #[serde(default)]
    username: Option<String>,
    password: String,
}

impl Credentials {
    /// Creates credentials from explicit parts.
    ///
    /// An empty username is normalized to `None`, matching the delimited
    /// form where the user field is simply absent.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: Option<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.filter(|user| !user.is_empty()),
            password: password.into(),
        }
    }

    /// Reads and parses credentials from the [`CREDENTIALS_ENV`] variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(CREDENTIALS_ENV)
            .map_err(|_| ConfigError::MissingEnv(CREDENTIALS_ENV))?;
        if raw.trim().is_empty() {
            return Err(ConfigError::MissingEnv(CREDENTIALS_ENV));
        }
        raw.parse()
    }

    /// Server hostname or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Username, if the server uses named users (ACL).
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Renders the `redis://` connection URL consumed by the pool.
    pub(crate) fn url(&self) -> String {
        let Self {
            host,
            port,
            username,
            password,
        } = self;
        match username {
            Some(user) => format!("redis://{user}:{password}@{host}:{port}/"),
            None => format!("redis://:{password}@{host}:{port}/"),
        }
    }

    /// `host:port` form used in diagnostics.
    pub(crate) fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for Credentials {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = value.split(':').collect();
        let (host, port, username, password) = match fields.as_slice() {
            [host, port, password] => (*host, *port, None, *password),
            [host, port, user, password] => (*host, *port, Some(*user), *password),
            other => return Err(ConfigError::FieldCount { found: other.len() }),
        };

        if host.is_empty() {
            return Err(ConfigError::EmptyField("host"));
        }
        if password.is_empty() {
            return Err(ConfigError::EmptyField("password"));
        }
        let port = port.parse().map_err(|source| ConfigError::InvalidPort {
            value: port.to_owned(),
            source,
        })?;

        Ok(Self::new(
            host,
            port,
            username.map(str::to_owned),
            password,
        ))
    }
}

// The password never appears in logs or error chains.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
