#![deny(missing_docs)]

//! # deedshare-core — Domain Model for Fractional Property Ownership
//!
//! This crate holds everything the service knows about users, properties and
//! shares, with no I/O. It depends only on `serde`, `serde_json`, `thiserror`,
//! `chrono`, and `uuid`.
//!
//! ## Design Principles
//!
//! 1. **Newtype identifiers.** [`Username`], [`Email`] and [`PropertyId`] are
//!    distinct types validated on construction. Records refer to each other
//!    only through these keys, never by embedding one another.
//!
//! 2. **[`ShareLedger`] owns the share arithmetic.** Credits, debits and the
//!    majority-holder scan live in one place. The ledger preserves insertion
//!    order because ownership ties are broken in favour of the earliest holder.
//!
//! 3. **Validate, then mutate.** Every operation on [`Property`] and [`User`]
//!    checks all of its preconditions before touching state, so a failed
//!    operation leaves the record exactly as it was.
//!
//! 4. **[`DomainError`] hierarchy.** Every failure is a typed variant. No
//!    panics, no `.unwrap()` outside tests.

pub mod error;
pub mod event;
pub mod identity;
pub mod ledger;
pub mod property;
pub mod user;

pub use error::{DomainError, ForbiddenReason, RecordKind, ValidationError};
pub use event::LedgerEvent;
pub use identity::{Email, PropertyId, Username};
pub use ledger::{ShareHolding, ShareLedger};
pub use property::{Property, PropertyDetails, TransferReceipt};
pub use user::{Password, TokenAmount, Tokens, User, TOKEN_DECIMALS};
