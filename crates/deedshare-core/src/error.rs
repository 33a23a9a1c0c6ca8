//! # Error Hierarchy
//!
//! Structured error types for the domain, built with `thiserror`.
//!
//! The five categories the service exposes are: invalid input
//! ([`DomainError::Validation`]), missing records ([`DomainError::NotFound`]),
//! uniqueness conflicts ([`DomainError::UsernameTaken`],
//! [`DomainError::EmailInUse`]), refused deletions
//! ([`DomainError::DeleteForbidden`]) and over-drawn transfers
//! ([`DomainError::InsufficientShares`]).

use thiserror::Error;

/// Top-level error type for domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A request field is missing, malformed, or refers to an unknown user.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// A user or property key does not exist.
    #[error("{kind} {key} not found")]
    NotFound {
        /// Which table was searched.
        kind: RecordKind,
        /// The key that was looked up.
        key: String,
    },

    /// Registration with a username that already exists.
    #[error("username {0} is already registered")]
    UsernameTaken(String),

    /// Registration with an email another user already has.
    #[error("email {0} is already in use")]
    EmailInUse(String),

    /// Deletion refused because the caller is not the sole shareholder and owner.
    #[error("{caller} may not delete property {property_id}: {reason}")]
    DeleteForbidden {
        /// The property the caller tried to delete.
        property_id: String,
        /// The username asking for the deletion.
        caller: String,
        /// Why the deletion was refused.
        reason: ForbiddenReason,
    },

    /// The source holder does not hold enough shares for the transfer.
    #[error("insufficient shares: {holder} holds {held}, transfer requires {requested}")]
    InsufficientShares {
        /// The debited holder.
        holder: String,
        /// Shares currently held (zero when the holder has no entry).
        held: u64,
        /// Shares the transfer asked for.
        requested: u64,
    },
}

impl DomainError {
    /// Shorthand for a missing user.
    pub fn user_not_found(username: impl Into<String>) -> Self {
        Self::NotFound {
            kind: RecordKind::User,
            key: username.into(),
        }
    }

    /// Shorthand for a missing property.
    pub fn property_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: RecordKind::Property,
            key: id.into(),
        }
    }
}

/// The two tables of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// The username-keyed user table.
    User,
    /// The id-keyed property table.
    Property,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Property => f.write_str("property"),
        }
    }
}

/// Why a property deletion was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// The caller is not the current owner.
    NotOwner {
        /// The property's current owner.
        owner: String,
    },
    /// Shares are spread across more than one holder.
    MultipleShareholders {
        /// Number of entries in the share map.
        holders: usize,
    },
}

impl std::fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOwner { owner } => write!(f, "the property is owned by {owner}"),
            Self::MultipleShareholders { holders } => {
                write!(f, "shares are held by {holders} holders")
            }
        }
    }
}

/// Validation failures for request fields and domain primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A required string field was empty or whitespace.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Email address is not of the form `local@domain`.
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    /// A token amount was neither a JSON number nor a numeric string.
    #[error("amount must be a number, got {0}")]
    NonNumericAmount(String),

    /// A token amount has more decimal places than a token can be split into.
    #[error("amount {0} has more than 6 decimal places")]
    AmountPrecision(String),

    /// A token amount was zero or negative.
    #[error("amount must be greater than 0")]
    NonPositiveAmount,

    /// A deposit would push the balance past the representable maximum.
    #[error("deposit would overflow the wallet balance")]
    BalanceOverflow,

    /// A share count was zero.
    #[error("{0} must be at least 1")]
    ZeroShares(&'static str),

    /// Crediting a holder would overflow the share counter.
    #[error("share count overflow for holder {0}")]
    ShareOverflow(String),

    /// Source and destination of a transfer are the same holder.
    #[error("cannot transfer shares from {0} to itself")]
    SelfTransfer(String),

    /// A username in the request does not belong to any registered user.
    #[error("{role} {username} is not a registered user")]
    UnregisteredUser {
        /// The request field that carried the username.
        role: &'static str,
        /// The unknown username.
        username: String,
    },
}
