//! `serde` support.
//!
//! [`OrderedId`] serializes as its text and is validated on the way back in.
//! Use [`as_number`] for stores that keep numeric ids.

use crate::OrderedId;
use core::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

impl Serialize for OrderedId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderedId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl de::Visitor<'_> for IdVisitor {
            type Value = OrderedId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an id made of characters '0'..='z'")
            }

            #[inline]
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                OrderedId::new(v).map_err(de::Error::custom)
            }

            #[inline]
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(OrderedId::from(v))
            }
        }

        d.deserialize_str(IdVisitor)
    }
}

/// (De)serializes an [`OrderedId`] as an unsigned integer.
///
/// ```ignore
/// #[serde(with = "feedline::as_number")]
/// id: OrderedId,
/// ```
pub mod as_number {
    use super::*;

    pub fn serialize<S: Serializer>(id: &OrderedId, s: S) -> Result<S::Ok, S::Error> {
        let n: u64 = id
            .as_str()
            .parse()
            .map_err(|_| serde::ser::Error::custom(format!("id {id} is not numeric")))?;
        n.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OrderedId, D::Error> {
        u64::deserialize(d).map(OrderedId::from)
    }
}
