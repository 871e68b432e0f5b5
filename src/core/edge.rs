//! Edge and node identities
//!
//! Map extracts carry way and node ids as integers while trip traces carry
//! them as strings. Both are normalised to their decimal string form so the
//! two sources agree on identity.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

macro_rules! token_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(TokenVisitor).map(Self)
            }
        }
    };
}

token_id!(
    /// Identity of a canonical road segment (an OSM way id in practice)
    EdgeId
);

/// Lets histograms keyed by owned or borrowed edges share one assembler
impl AsRef<EdgeId> for EdgeId {
    fn as_ref(&self) -> &EdgeId {
        self
    }
}

token_id!(
    /// Identity of a map node
    NodeId
);

token_id!(
    /// Identity of a vehicle in the trip corpus
    VehicleId
);

/// Ordered pair of adjacent map nodes as traversed by a vehicle
pub type SubEdge = (NodeId, NodeId);

/// Accepts either a JSON string or a JSON integer.
struct TokenVisitor;

impl<'de> Visitor<'de> for TokenVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }
}
