//! In-process collaborators: accounts, rosters, question stages and the
//! roster cache sitting in front of them

use serde::Serialize;
use thiserror::Error;

pub mod auth;
pub mod cache;
pub mod roster;
pub mod stages;

/// Errors returned by the collaborator stores
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A request was missing required fields or had invalid values
    #[error("{0}")]
    Validation(String),
    /// No matching record
    #[error("{0} not found")]
    NotFound(String),
    /// A record with the same key already exists
    #[error("{0} already exists")]
    Conflict(String),
    /// Username or password did not match
    #[error("invalid credentials")]
    InvalidCredentials,
    /// A password could not be hashed
    #[error("password hashing failed: {0}")]
    Hashing(String),
    /// The backing source could not be reached
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl From<garde::Report> for Error {
    fn from(report: garde::Report) -> Self {
        Self::Validation(report.to_string())
    }
}
