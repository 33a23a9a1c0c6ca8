//! # Property Entity
//!
//! A tokenized property: its descriptive details, the [`ShareLedger`] of
//! fractional holdings, the append-only transaction history and the current
//! owner.
//!
//! ## Ownership
//!
//! `owner` is derived state. It is set to the creator at creation and
//! recomputed from the ledger after every transfer, so it always names the
//! majority holder. [`Property::update_details`] never changes it.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──► { Updated | TransferredShares }* ──► Deleted
//! ```
//!
//! Deletion is only reachable when a single holder remains and that holder is
//! both the caller and the owner; see [`Property::ensure_deletable_by`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, ForbiddenReason, ValidationError};
use crate::event::LedgerEvent;
use crate::identity::{PropertyId, Username};
use crate::ledger::ShareLedger;

/// Validated address and deed reference of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDetails {
    address: String,
    deed_url: String,
}

impl PropertyDetails {
    /// Both fields must be non-empty after trimming; they are stored trimmed.
    pub fn new(address: impl Into<String>, deed_url: impl Into<String>) -> Result<Self, ValidationError> {
        let address = non_empty(address.into(), "address")?;
        let deed_url = non_empty(deed_url.into(), "deedURL")?;
        Ok(Self { address, deed_url })
    }
}

fn non_empty(raw: String, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

/// A tokenized property record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    id: PropertyId,
    address: String,
    owner: Username,
    #[serde(rename = "deedURL")]
    deed_url: String,
    tokenized_shares: ShareLedger,
    transaction_history: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

/// Outcome of a successful share transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Shares moved.
    pub shares: u64,
    /// Owner before the transfer.
    pub previous_owner: Username,
    /// Owner after the transfer.
    pub owner: Username,
}

impl TransferReceipt {
    /// Whether the transfer moved ownership to a different holder.
    pub fn owner_changed(&self) -> bool {
        self.previous_owner != self.owner
    }
}

impl Property {
    /// Create a property with a fresh id, issuing `supply` shares to `owner`.
    ///
    /// The caller is responsible for checking that `owner` is a registered
    /// user.
    pub fn create(details: PropertyDetails, owner: Username, supply: u64) -> Result<Self, ValidationError> {
        let tokenized_shares = ShareLedger::issue(owner.clone(), supply)?;
        let created = LedgerEvent::Created {
            owner: owner.clone(),
            shares: supply,
        };
        Ok(Self {
            id: PropertyId::generate(),
            address: details.address,
            owner,
            deed_url: details.deed_url,
            tokenized_shares,
            transaction_history: vec![created.to_string()],
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    /// Primary key.
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// Street address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current majority holder.
    pub fn owner(&self) -> &Username {
        &self.owner
    }

    /// Opaque deed document reference.
    pub fn deed_url(&self) -> &str {
        &self.deed_url
    }

    /// The share ledger.
    pub fn shares(&self) -> &ShareLedger {
        &self.tokenized_shares
    }

    /// Transaction history, oldest first.
    pub fn history(&self) -> &[String] {
        &self.transaction_history
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last details update, if any.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Replace address and deed reference, stamping `updatedAt`.
    pub fn update_details(&mut self, details: PropertyDetails) {
        self.address = details.address;
        self.deed_url = details.deed_url;
        self.updated_at = Some(Utc::now());
    }

    /// Move `shares` from `from` to `to`, record the transfer and recompute
    /// the owner.
    ///
    /// On error the property is unchanged.
    pub fn transfer_shares(
        &mut self,
        from: &Username,
        to: &Username,
        shares: u64,
    ) -> Result<TransferReceipt, DomainError> {
        self.tokenized_shares.transfer(from, to, shares)?;

        let event = LedgerEvent::Transferred {
            shares,
            from: from.clone(),
            to: to.clone(),
        };
        self.transaction_history.push(event.to_string());

        let previous_owner = self.owner.clone();
        if let Some(majority) = self.tokenized_shares.majority_holder() {
            self.owner = majority.clone();
        }

        Ok(TransferReceipt {
            shares,
            previous_owner,
            owner: self.owner.clone(),
        })
    }

    /// Check that `caller` may delete this property: they must be the owner
    /// and the only entry in the ledger.
    pub fn ensure_deletable_by(&self, caller: &Username) -> Result<(), DomainError> {
        let forbidden = |reason| DomainError::DeleteForbidden {
            property_id: self.id.to_string(),
            caller: caller.to_string(),
            reason,
        };

        if &self.owner != caller {
            return Err(forbidden(ForbiddenReason::NotOwner {
                owner: self.owner.to_string(),
            }));
        }
        match self.tokenized_shares.sole_holder() {
            Some(holder) if holder == caller => Ok(()),
            Some(holder) => Err(forbidden(ForbiddenReason::NotOwner {
                owner: holder.to_string(),
            })),
            None => Err(forbidden(ForbiddenReason::MultipleShareholders {
                holders: self.tokenized_shares.len(),
            })),
        }
    }
}
