//! # Share Ledger
//!
//! The tokenized-share map of a property: username → share count, kept in
//! insertion order.
//!
//! ## Invariants
//!
//! - The sum of all holdings equals the supply issued at creation. Transfers
//!   move shares between holders and never mint or burn.
//! - Every entry holds at least one share. A holder debited to zero is
//!   removed, so `len()` is the number of actual shareholders.
//! - Entries keep the order in which holders first received shares. A holder
//!   who is pruned and later credited again is appended at the end.
//!
//! ## Majority Holder
//!
//! [`ShareLedger::majority_holder`] scans entries in order and keeps the first
//! entry whose count is strictly greater than the running maximum. Among equal
//! maxima the earliest-inserted holder therefore wins, which is why the ledger
//! is a `Vec` and not a hash map.
//!
//! ## Encoding
//!
//! Serializes as a JSON object whose key order is the ledger order, e.g.
//! `{"alice": 40, "bob": 60}`. Deserialization keeps document order and
//! rejects duplicate or zero entries.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, ValidationError};
use crate::identity::Username;

/// One entry of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareHolding {
    /// The holder's username.
    pub holder: Username,
    /// Shares held, always at least one.
    pub shares: u64,
}

/// Insertion-ordered share map of a single property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShareLedger {
    holdings: Vec<ShareHolding>,
}

impl ShareLedger {
    /// Issue the full supply of a new property to its creator.
    pub fn issue(holder: Username, supply: u64) -> Result<Self, ValidationError> {
        if supply == 0 {
            return Err(ValidationError::ZeroShares("shares"));
        }
        Ok(Self {
            holdings: vec![ShareHolding {
                holder,
                shares: supply,
            }],
        })
    }

    /// Shares held by `holder`, or `None` if they have no entry.
    pub fn get(&self, holder: &Username) -> Option<u64> {
        self.position(holder).map(|i| self.holdings[i].shares)
    }

    /// Number of shareholders.
    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    /// Whether the ledger has no holders.
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ShareHolding> {
        self.holdings.iter()
    }

    /// Sum of all holdings.
    pub fn total(&self) -> u128 {
        self.holdings.iter().map(|h| u128::from(h.shares)).sum()
    }

    /// The only holder, if exactly one exists.
    pub fn sole_holder(&self) -> Option<&Username> {
        match self.holdings.as_slice() {
            [only] => Some(&only.holder),
            _ => None,
        }
    }

    /// Holder with the strictly greatest share count; earliest entry wins ties.
    pub fn majority_holder(&self) -> Option<&Username> {
        let mut best: Option<&ShareHolding> = None;
        for holding in &self.holdings {
            let running_max = best.map_or(0, |b| b.shares);
            if holding.shares > running_max {
                best = Some(holding);
            }
        }
        best.map(|h| &h.holder)
    }

    /// Move `shares` from `from` to `to`.
    ///
    /// All checks run before any entry is touched; on error the ledger is
    /// unchanged.
    pub fn transfer(&mut self, from: &Username, to: &Username, shares: u64) -> Result<(), DomainError> {
        if shares == 0 {
            return Err(ValidationError::ZeroShares("shares").into());
        }
        if from == to {
            return Err(ValidationError::SelfTransfer(from.to_string()).into());
        }

        let from_idx = self.position(from);
        let held = from_idx.map_or(0, |i| self.holdings[i].shares);
        let from_idx = match from_idx {
            Some(i) if held >= shares => i,
            _ => {
                return Err(DomainError::InsufficientShares {
                    holder: from.to_string(),
                    held,
                    requested: shares,
                })
            }
        };

        let to_idx = self.position(to);
        let credited = to_idx
            .map_or(0, |i| self.holdings[i].shares)
            .checked_add(shares)
            .ok_or_else(|| ValidationError::ShareOverflow(to.to_string()))?;

        match to_idx {
            Some(i) => self.holdings[i].shares = credited,
            None => self.holdings.push(ShareHolding {
                holder: to.clone(),
                shares: credited,
            }),
        }

        let remaining = held - shares;
        if remaining == 0 {
            self.holdings.remove(from_idx);
        } else {
            self.holdings[from_idx].shares = remaining;
        }
        Ok(())
    }

    fn position(&self, holder: &Username) -> Option<usize> {
        self.holdings.iter().position(|h| &h.holder == holder)
    }
}

impl Serialize for ShareLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.holdings.len()))?;
        for holding in &self.holdings {
            map.serialize_entry(holding.holder.as_str(), &holding.shares)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ShareLedger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LedgerVisitor;

        impl<'de> Visitor<'de> for LedgerVisitor {
            type Value = ShareLedger;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of username to positive share count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut holdings: Vec<ShareHolding> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((holder, shares)) = access.next_entry::<Username, u64>()? {
                    if shares == 0 {
                        return Err(serde::de::Error::custom(format!(
                            "holder {holder} has a zero share entry"
                        )));
                    }
                    if holdings.iter().any(|h| h.holder == holder) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate holder {holder}"
                        )));
                    }
                    holdings.push(ShareHolding { holder, shares });
                }
                Ok(ShareLedger { holdings })
            }
        }

        deserializer.deserialize_map(LedgerVisitor)
    }
}
