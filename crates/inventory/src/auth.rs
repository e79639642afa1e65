//! Access tokens for the Cloud Asset API.
//!
//! [`GcloudToken`] shells out to the Cloud SDK, the same way a user would
//! run `gcloud auth print-access-token`. [`StaticToken`] wraps a token the
//! caller already has.

use std::process::Command;

use crate::error::{Error, Result};

/// Source of OAuth2 bearer tokens.
pub trait TokenSource: Send + Sync {
    /// Return a token valid for the next request.
    fn token(&self) -> Result<String>;
}

/// A fixed, caller-supplied token.
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Result<String> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(Error::Auth("access token is empty".to_string()));
        }
        Ok(token.to_string())
    }
}

/// Tokens minted by `gcloud auth print-access-token`.
pub struct GcloudToken {
    program: String,
}

impl GcloudToken {
    /// Use `gcloud` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("gcloud")
    }

    /// Use a specific gcloud executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GcloudToken {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for GcloudToken {
    fn token(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(["auth", "print-access-token"])
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::Auth(format!(
                        "{} not found; install the Google Cloud SDK or pass an access token",
                        self.program
                    ))
                } else {
                    Error::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Auth(format!(
                "{} auth print-access-token failed: {}",
                self.program,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(Error::Auth(format!(
                "{} returned an empty access token",
                self.program
            )));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_trims() {
        let source = StaticToken::new("  ya29.token\n");
        assert_eq!(source.token().unwrap(), "ya29.token");
    }

    #[test]
    fn test_static_token_empty() {
        let source = StaticToken::new("   ");
        assert!(matches!(source.token(), Err(Error::Auth(_))));
    }

    #[test]
    fn test_gcloud_missing_binary() {
        let source = GcloudToken::with_program("gcloud-does-not-exist-for-tests");
        match source.token() {
            Err(Error::Auth(message)) => assert!(message.contains("not found")),
            other => panic!("Expected Error::Auth, got {other:?}"),
        }
    }
}
