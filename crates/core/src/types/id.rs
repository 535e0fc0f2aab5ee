//! Newtype IDs for type-safe entity references.
//!
//! Supabase issues keys that may be `bigint` or `uuid` columns depending on
//! the table, so every ID is kept as an opaque string. Ordering is ordinal
//! (byte-wise) string comparison, never numeric: `"10"` sorts before `"2"`.

use serde::{Deserialize, Deserializer};

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` with `#[serde(transparent)]`
/// - `Deserialize` from either a JSON string or a JSON integer
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
///
/// # Example
///
/// ```rust
/// # use panaderia_core::define_id;
/// define_id!(ShelfId);
/// define_id!(TrayId);
///
/// let shelf = ShelfId::new("1");
/// let tray = TrayId::new("1");
///
/// // These are different types, so this won't compile:
/// // let _: ShelfId = tray;
/// # let _ = (shelf, tray);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
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

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::deserialize_opaque(deserializer).map(Self)
            }
        }
    };
}

/// Wire forms accepted for an opaque ID.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

/// Deserialize an ID that may arrive as a string or an integer.
///
/// Integers are rendered in decimal, so a `bigint` key `12` and the string
/// `"12"` produce the same ID.
#[doc(hidden)]
pub fn deserialize_opaque<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

define_id!(CategoryId);
define_id!(ProductId);
define_id!(UserId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_string_and_integer() {
        let from_text: ProductId = serde_json::from_str(r#""12""#).unwrap();
        let from_int: ProductId = serde_json::from_str("12").unwrap();
        assert_eq!(from_text, from_int);
        assert_eq!(from_int.as_str(), "12");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = CategoryId::new("c1");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""c1""#);
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut ids = vec![ProductId::new("10"), ProductId::new("2"), ProductId::new("1")];
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
        assert_eq!(ordered, ["1", "10", "2"]);
    }

    #[test]
    fn test_rejects_non_scalar() {
        assert!(serde_json::from_str::<UserId>("{}").is_err());
        assert!(serde_json::from_str::<UserId>("1.5").is_err());
    }
}
