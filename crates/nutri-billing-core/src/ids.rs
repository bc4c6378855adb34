//! Identifier types for nutri-billing.
//!
//! All identifiers in this system are minted by someone else: user ids come from
//! Telegram, event ids from the payment gateways, plan ids from the catalog
//! configuration. They are therefore opaque strings, validated once at the edge.
//!
//! # Macro-based ID Types
//!
//! The `string_id_type!` macro reduces boilerplate for string-backed identifier
//! types, ensuring consistent implementation of serialization, parsing, and
//! display traits.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Maximum identifier length in bytes.
pub const MAX_ID_LEN: usize = 128;

/// Macro to define a string-based identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `String` with implementations for:
/// - `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Serialize`, `Deserialize` (as a validated string)
/// - `FromStr`, `Display`, `Debug`
/// - `TryFrom<String>`, `Into<String>`
/// - `AsRef<str>`, `Borrow<str>`
///
/// # Example
///
/// ```ignore
/// string_id_type!(MyId, "A custom identifier type.");
/// let id = MyId::new("abc").unwrap();
/// let parsed: MyId = id.to_string().parse().unwrap();
/// ```
macro_rules! string_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier, validating its contents.
            ///
            /// # Errors
            ///
            /// Returns an error if the value is empty, longer than
            /// [`MAX_ID_LEN`] bytes, or contains control characters.
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                validate(&value)?;
                Ok(Self(value))
            }

            /// Return the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the raw bytes of the identifier.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id_type!(UserId, "A user identifier.\n\nThe external platform's stable user id (the Telegram user id for bot users).");
string_id_type!(PlanId, "A plan identifier from the plan catalog (e.g. `basic`, `pro`).");
string_id_type!(EventId, "A payment event identifier assigned by the payment gateway.\n\nStable across redeliveries of the same real-world charge.");

impl UserId {
    /// Build a user id from a numeric Telegram user id.
    #[must_use]
    pub fn from_telegram(telegram_id: i64) -> Self {
        Self(telegram_id.to_string())
    }
}

impl PlanId {
    /// Build a plan id from a compile-time literal known to be valid.
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(validate(value).is_ok());
        Self(value.to_string())
    }
}

fn validate(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.len() > MAX_ID_LEN {
        return Err(IdError::TooLong {
            len: value.len(),
            max: MAX_ID_LEN,
        });
    }
    if value.chars().any(char::is_control) {
        return Err(IdError::InvalidCharacter);
    }
    Ok(())
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is empty.
    #[error("identifier is empty")]
    Empty,

    /// The input exceeds the maximum length.
    #[error("identifier too long: {len} bytes (max {max})")]
    TooLong {
        /// Actual length in bytes.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// The input contains a control character.
    #[error("identifier contains control characters")]
    InvalidCharacter,
}
