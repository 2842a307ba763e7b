//! Error types for drive-core
//!
//! One error enum covers both the drive and the data-proxy APIs. Generic HTTP
//! failures are only narrowed to a specific kind at the facade entry points
//! that know which status codes mean something for them.

use http::StatusCode;
use thiserror::Error;

/// Result type alias for drive-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for drive-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Response status outside the accepted set
    #[error("HTTP error [{status}]: {message}")]
    Http { status: StatusCode, message: String },

    /// 401 on a user-facing operation
    #[error(
        "Unauthorized. This could be a result of either incorrect path or insufficient privilege. {0}"
    )]
    Unauthorized(String),

    /// 404 on a path or id lookup
    #[error("Not found: {0}")]
    NotFound(String),

    /// The access token's `exp` claim lies in the past
    #[error("Access token has expired")]
    TokenExpired,

    /// A create operation found a name collision
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A pagination sweep saw the same resumption key twice
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid logical path or URL pattern
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Token is not a three-part JWT or its claims cannot be read
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The server accepted the request but reported a failed operation
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile not found in the configuration
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport-level failure (connect, TLS, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Status code carried by an unclassified HTTP error
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is an unclassified HTTP error with the given status
    pub fn is_status(&self, status: StatusCode) -> bool {
        self.status() == Some(status)
    }
}

/// Status-to-error translation for facade entry points
pub trait ResultExt<T> {
    /// Replace an `Error::Http` carrying `status` with the error built by `f`.
    /// Every other error passes through untouched.
    fn on_status<F>(self, status: StatusCode, f: F) -> Result<T>
    where
        F: FnOnce() -> Error;

    /// Shorthand for mapping 401 to [`Error::Unauthorized`]
    fn on_unauthorized(self, msg: &str) -> Result<T>;

    /// Shorthand for mapping 404 to [`Error::NotFound`]
    fn on_not_found(self, msg: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn on_status<F>(self, status: StatusCode, f: F) -> Result<T>
    where
        F: FnOnce() -> Error,
    {
        self.map_err(|e| translate(e, status, f))
    }

    fn on_unauthorized(self, msg: &str) -> Result<T> {
        self.on_status(StatusCode::UNAUTHORIZED, || {
            Error::Unauthorized(msg.to_string())
        })
    }

    fn on_not_found(self, msg: &str) -> Result<T> {
        self.on_status(StatusCode::NOT_FOUND, || Error::NotFound(msg.to_string()))
    }
}

/// Error-level form of [`ResultExt::on_status`], usable with
/// `TryStreamExt::map_err` so that each resumption point of a listing is
/// translated the same way.
pub fn translate<F>(err: Error, status: StatusCode, f: F) -> Error
where
    F: FnOnce() -> Error,
{
    if err.is_status(status) { f() } else { err }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: StatusCode) -> Error {
        Error::Http {
            status,
            message: "boom".into(),
        }
    }

    #[test]
    fn test_on_unauthorized_translates_401_only() {
        let res: Result<()> = Err(http(StatusCode::UNAUTHORIZED));
        assert!(matches!(
            res.on_unauthorized("no access"),
            Err(Error::Unauthorized(msg)) if msg == "no access"
        ));

        let res: Result<()> = Err(http(StatusCode::FORBIDDEN));
        assert!(matches!(
            res.on_unauthorized("no access"),
            Err(Error::Http { status, .. }) if status == StatusCode::FORBIDDEN
        ));
    }

    #[test]
    fn test_on_not_found_leaves_other_errors() {
        let res: Result<()> = Err(Error::TokenExpired);
        assert!(matches!(res.on_not_found("gone"), Err(Error::TokenExpired)));

        let res: Result<()> = Err(http(StatusCode::NOT_FOUND));
        assert!(matches!(res.on_not_found("gone"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_ok_passes_through() {
        let res: Result<u32> = Ok(7);
        assert_eq!(res.on_unauthorized("x").unwrap(), 7);
    }

    #[test]
    fn test_error_display() {
        let err = http(StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "HTTP error [404 Not Found]: boom");

        let err = Error::AlreadyExists("notes.md".into());
        assert_eq!(err.to_string(), "Already exists: notes.md");
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(http(StatusCode::CONFLICT).status(), Some(StatusCode::CONFLICT));
        assert_eq!(Error::General("x".into()).status(), None);
    }
}
