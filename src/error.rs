use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    /// Login rejected or session token refused (HTTP 401/403).
    Unauthorized,
    NotLoggedIn,
    Api { status: u16, message: String },
    Protocol(String),
    OutOfRange { parameter: &'static str, value: f64, min: f64, max: f64 },
    InvalidMode(String),
    UnknownDevice(String),
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Unauthorized => write!(f, "authentication rejected"),
            Error::NotLoggedIn => write!(f, "not logged in"),
            Error::Api { status, message } => write!(f, "API error {status}: {message}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::OutOfRange { parameter, value, min, max } => {
                write!(f, "{parameter}: {value} out of range {min}..={max}")
            }
            Error::InvalidMode(mode) => write!(f, "invalid mode: {mode}"),
            Error::UnknownDevice(id) => write!(f, "unknown device: {id}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a failed poll, split the way the host reacts to it.
#[derive(Debug)]
pub enum UpdateError {
    /// Credentials no longer work; the user has to log in again.
    ReauthRequired(String),
    /// Transient failure; the next interval retries.
    UpdateFailed(Error),
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::ReauthRequired(reason) => write!(f, "reauthentication required: {reason}"),
            UpdateError::UpdateFailed(e) => write!(f, "error communicating with API: {e}"),
        }
    }
}

impl std::error::Error for UpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpdateError::UpdateFailed(e) => Some(e),
            UpdateError::ReauthRequired(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_display_names_parameter() {
        let err = Error::OutOfRange {
            parameter: "hot_tank_min_temp",
            value: 250.0,
            min: 35.0,
            max: 200.0,
        };
        assert_eq!(err.to_string(), "hot_tank_min_temp: 250 out of range 35..=200");
    }

    #[test]
    fn update_failed_exposes_source() {
        use std::error::Error as _;
        let err = UpdateError::UpdateFailed(Error::Io(std::io::Error::other("refused")));
        assert!(err.source().is_some());
        assert!(UpdateError::ReauthRequired("no profile".into()).source().is_none());
    }
}
