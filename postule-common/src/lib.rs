//! Shared error taxonomy and observability helpers for the Postule workspace.
//!
//! Every other crate depends on this one for two things: the [`PostuleError`]
//! taxonomy (with its [`Result`] alias) and the [`observability`] module that
//! centralises `tracing` initialisation. It is intentionally lightweight so
//! that all crates can depend on it without heavy transitive costs.
//!
//! # Overview
//!
//! - [`PostuleError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! Fatal-versus-recoverable is encoded in the taxonomy itself: navigation and
//! session loss end a run, while everything a single candidate can trip over
//! stays inside the engine as an application outcome and never surfaces here.
//!
//! # Examples
//!
//! ```rust
//! use postule_common::{PostuleError, Result};
//!
//! fn require_key(key: Option<&str>) -> Result<&str> {
//!     key.ok_or_else(|| PostuleError::Config("missing api key".into()))
//! }
//!
//! assert!(require_key(Some("k")).is_ok());
//! assert!(matches!(require_key(None), Err(PostuleError::Config(_))));
//! ```

pub mod observability;

/// Error types used across the Postule system.
#[derive(thiserror::Error, Debug)]
pub enum PostuleError {
    /// The search results view never reached a recognizable state.
    /// Fatal to the run: nothing downstream can proceed without a listing.
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// The site rejected the persisted session (login wall, checkpoint).
    /// Fatal to the run: re-login must happen out-of-band.
    #[error("Session invalidated: {0}")]
    SessionInvalid(String),

    /// A driver (browser, network, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`PostuleError`].
pub type Result<T> = std::result::Result<T, PostuleError>;

impl PostuleError {
    /// Whether this error must end the whole run rather than one candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PostuleError::Navigation(_) | PostuleError::SessionInvalid(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification_covers_run_enders_only() {
        assert!(PostuleError::Navigation("no results list".into()).is_fatal());
        assert!(PostuleError::SessionInvalid("authwall".into()).is_fatal());
        assert!(!PostuleError::Config("bad key".into()).is_fatal());
        assert!(!PostuleError::Driver(anyhow::anyhow!("click failed")).is_fatal());
    }

    #[test]
    fn driver_errors_convert_from_anyhow() {
        fn click() -> anyhow::Result<()> {
            Err(anyhow::anyhow!("element gone"))
        }
        fn wrapped() -> Result<()> {
            click()?;
            Ok(())
        }
        assert!(matches!(wrapped(), Err(PostuleError::Driver(_))));
    }
}
