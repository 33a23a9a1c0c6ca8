//! # Ledger Events
//!
//! Entries of a property's transaction history. The history is stored as
//! plain strings; [`LedgerEvent`] is the single place that decides their
//! wording.

use std::fmt;

use crate::identity::Username;

/// Something that changed a property's share ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// The property was created and its full supply issued to the creator.
    Created {
        /// The creating owner.
        owner: Username,
        /// Shares issued.
        shares: u64,
    },
    /// Shares moved from one holder to another.
    Transferred {
        /// Shares moved.
        shares: u64,
        /// Debited holder.
        from: Username,
        /// Credited holder.
        to: Username,
    },
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { owner, shares } => {
                write!(f, "Property created by {owner} with {shares} shares")
            }
            Self::Transferred { shares, from, to } => {
                write!(f, "Transferred {shares} shares from {from} to {to}")
            }
        }
    }
}
