//! # User Registry Records
//!
//! A registered user and their token wallet. Users are created by
//! registration, changed only by deposits and never deleted.
//!
//! Token quantities are fixed-point: [`Tokens`] counts millionths of a token
//! in a `u64`, so fractional deposits add up exactly.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{DomainError, ValidationError};
use crate::identity::{Email, Username};

/// Account password, stored as given.
///
/// `Debug` output is redacted so the value never reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    /// Reject empty or whitespace-only passwords. The value is kept verbatim.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyField("password"));
        }
        Ok(Self(raw))
    }

    /// The stored password.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// Decimal places carried by token quantities.
pub const TOKEN_DECIMALS: usize = 6;

const TOKEN_SCALE: u64 = 1_000_000;

/// A non-negative token quantity, held as a whole number of millionths.
///
/// Whole quantities encode as JSON integers (`30`), fractional ones as JSON
/// numbers (`2.5`). Decoding accepts integers, numbers with at most
/// [`TOKEN_DECIMALS`] decimal places and strings of the same form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tokens(u64);

impl Tokens {
    /// The empty balance.
    pub const ZERO: Self = Self(0);

    /// Wrap a count of millionths of a token.
    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// The quantity in millionths of a token.
    pub fn micros(self) -> u64 {
        self.0
    }

    /// A whole number of tokens.
    pub fn whole(units: u64) -> Result<Self, ValidationError> {
        units
            .checked_mul(TOKEN_SCALE)
            .map(Self)
            .ok_or(ValidationError::BalanceOverflow)
    }

    /// Whether the quantity has no fractional part.
    pub fn is_whole(self) -> bool {
        self.0 % TOKEN_SCALE == 0
    }

    /// Sum, or `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Parse a decimal such as `"12"`, `"2.5"` or `"0.000001"`.
    ///
    /// A leading `-` on an otherwise valid number is
    /// [`ValidationError::NonPositiveAmount`]; more than [`TOKEN_DECIMALS`]
    /// significant decimal places is [`ValidationError::AmountPrecision`].
    pub fn parse_decimal(raw: &str) -> Result<Self, ValidationError> {
        let s = raw.trim();
        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(ValidationError::NonNumericAmount(format!("{raw:?}")));
        }
        if negative {
            return Err(ValidationError::NonPositiveAmount);
        }

        let frac_digits = frac_part.trim_end_matches('0');
        if frac_digits.len() > TOKEN_DECIMALS {
            return Err(ValidationError::AmountPrecision(s.to_string()));
        }
        let whole = match int_part {
            "" => 0,
            digits => digits
                .parse::<u64>()
                .map_err(|_| ValidationError::BalanceOverflow)?,
        };
        let frac = match frac_digits {
            "" => 0,
            digits => format!("{digits:0<width$}", width = TOKEN_DECIMALS)
                .parse::<u64>()
                .map_err(|_| ValidationError::NonNumericAmount(format!("{raw:?}")))?,
        };

        whole
            .checked_mul(TOKEN_SCALE)
            .and_then(|micros| micros.checked_add(frac))
            .map(Self)
            .ok_or(ValidationError::BalanceOverflow)
    }

    /// Convert a JSON float. Goes through the shortest decimal rendering of
    /// `value`, so `2.5` is exactly 2.5 tokens.
    pub fn from_f64(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonNumericAmount(value.to_string()));
        }
        Self::parse_decimal(&value.to_string())
    }

    fn as_f64(self) -> f64 {
        self.0 as f64 / TOKEN_SCALE as f64
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / TOKEN_SCALE;
        let frac = self.0 % TOKEN_SCALE;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:0width$}", width = TOKEN_DECIMALS);
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl Serialize for Tokens {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_whole() {
            serializer.serialize_u64(self.0 / TOKEN_SCALE)
        } else {
            serializer.serialize_f64(self.as_f64())
        }
    }
}

impl<'de> Deserialize<'de> for Tokens {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TokensVisitor;

        impl<'de> Visitor<'de> for TokensVisitor {
            type Value = Tokens;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative token quantity")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Tokens, E> {
                Tokens::whole(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Tokens, E> {
                let v = u64::try_from(v).map_err(|_| E::custom(ValidationError::NonPositiveAmount))?;
                self.visit_u64(v)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Tokens, E> {
                Tokens::from_f64(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Tokens, E> {
                Tokens::parse_decimal(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(TokensVisitor)
    }
}

/// A strictly positive deposit amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokenAmount(Tokens);

impl TokenAmount {
    /// Wrap a positive quantity.
    pub fn new(amount: Tokens) -> Result<Self, ValidationError> {
        if amount == Tokens::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        Ok(Self(amount))
    }

    /// Parse the `amount` field of a deposit request.
    ///
    /// Accepts a JSON number or a numeric string, whole or fractional.
    /// Absent or `null` is [`ValidationError::MissingField`]; zero and
    /// negatives are [`ValidationError::NonPositiveAmount`]; other strings and
    /// other JSON types are [`ValidationError::NonNumericAmount`].
    pub fn from_json(value: Option<&Value>) -> Result<Self, ValidationError> {
        match value {
            None | Some(Value::Null) => Err(ValidationError::MissingField("amount")),
            Some(Value::Number(n)) => {
                let tokens = if let Some(whole) = n.as_u64() {
                    Tokens::whole(whole)?
                } else if n.as_i64().is_some() {
                    return Err(ValidationError::NonPositiveAmount);
                } else {
                    match n.as_f64() {
                        Some(f) => Tokens::from_f64(f)?,
                        None => return Err(ValidationError::NonNumericAmount(n.to_string())),
                    }
                };
                Self::new(tokens)
            }
            Some(Value::String(s)) => {
                if s.trim().is_empty() {
                    return Err(ValidationError::EmptyField("amount"));
                }
                Self::new(Tokens::parse_decimal(s)?)
            }
            Some(other) => Err(ValidationError::NonNumericAmount(other.to_string())),
        }
    }

    /// The amount as a token quantity.
    pub fn get(self) -> Tokens {
        self.0
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    username: Username,
    email: Email,
    password: Password,
    wallet_tokens: Tokens,
}

impl User {
    /// A new user with an empty wallet.
    pub fn register(username: Username, email: Email, password: Password) -> Self {
        Self {
            username,
            email,
            password,
            wallet_tokens: Tokens::ZERO,
        }
    }

    /// Primary key.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Contact address.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Stored password.
    pub fn password(&self) -> &Password {
        &self.password
    }

    /// Token balance.
    pub fn wallet_tokens(&self) -> Tokens {
        self.wallet_tokens
    }

    /// Fail with a conflict if any of `existing` already uses this user's
    /// username or email.
    pub fn ensure_unique<'a>(&self, existing: impl IntoIterator<Item = &'a User>) -> Result<(), DomainError> {
        for other in existing {
            if other.username == self.username {
                return Err(DomainError::UsernameTaken(self.username.to_string()));
            }
            if other.email.same_mailbox(&self.email) {
                return Err(DomainError::EmailInUse(self.email.to_string()));
            }
        }
        Ok(())
    }

    /// Add `amount` to the balance and return the new balance.
    pub fn deposit(&mut self, amount: TokenAmount) -> Result<Tokens, ValidationError> {
        let balance = self
            .wallet_tokens
            .checked_add(amount.get())
            .ok_or(ValidationError::BalanceOverflow)?;
        self.wallet_tokens = balance;
        Ok(balance)
    }
}
