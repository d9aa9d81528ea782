use crate::{Error, Result};
use core::{cmp::Ordering, fmt, str::FromStr};
use std::sync::Arc;

/// Smallest character an id may contain.
pub const MIN_ID_CHAR: u8 = b'0';

/// Largest character an id may contain.
pub const MAX_ID_CHAR: u8 = b'z';

/// An opaque, immutable record identifier with a total order.
///
/// Feeds hand out snowflake-style ids as decimal (or alphanumeric) strings.
/// Comparing those strings directly breaks as soon as two ids have a different
/// number of digits, so `OrderedId` orders by length first and only compares
/// lexicographically when lengths match:
///
/// ```text
///   "9" < "10" < "99" < "100"
/// ```
///
/// Ids are cheap to clone; the text is shared behind an [`Arc`].
///
/// Every character must lie in `'0'..='z'`. [`Self::successor`] and
/// [`Self::predecessor`] step through that alphabet by code point to
/// synthesize gap keys that sort between real ids.
///
/// # Example
/// ```
/// use feedline::OrderedId;
///
/// let a: OrderedId = "99".parse().unwrap();
/// let b = OrderedId::from(100_u64);
/// assert!(a < b);
/// assert!(b.predecessor() < b);
/// assert!(b < b.successor());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OrderedId(Arc<str>);

impl OrderedId {
    /// Validates and wraps `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if `raw` is empty or contains a character
    /// outside `'0'..='z'`.
    pub fn new(raw: impl Into<Arc<str>>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(Error::InvalidId {
                reason: "empty id".into(),
            });
        }
        if let Some(c) = raw
            .bytes()
            .find(|c| !(MIN_ID_CHAR..=MAX_ID_CHAR).contains(c))
        {
            return Err(Error::InvalidId {
                reason: format!("{raw:?} contains {:?}", char::from(c)),
            });
        }
        Ok(Self(raw))
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the id.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Only a synthesized bound (the predecessor of `"0"`) is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an id strictly greater than `self`.
    ///
    /// The last character is bumped by one code point. A `'z'` wraps to `'0'`
    /// and carries into the character to its left. When every character
    /// carries, the result is one character longer: `"1"` followed by zeros.
    ///
    /// This synthesizes a sentinel that sorts directly above `self`; it is not
    /// arithmetic and does not invert [`Self::predecessor`] in every case.
    #[must_use]
    pub fn successor(&self) -> Self {
        let mut bytes = self.0.as_bytes().to_vec();
        for i in (0..bytes.len()).rev() {
            if bytes[i] < MAX_ID_CHAR {
                bytes[i] += 1;
                return Self::from_ascii(bytes);
            }
            bytes[i] = MIN_ID_CHAR;
        }
        let mut carried = Vec::with_capacity(bytes.len() + 1);
        carried.push(b'1');
        carried.extend(core::iter::repeat_n(MIN_ID_CHAR, bytes.len()));
        Self::from_ascii(carried)
    }

    /// Returns an id strictly less than `self`.
    ///
    /// The last character is lowered by one code point. A `'0'` wraps to `'z'`
    /// and borrows from the character to its left. When every character
    /// borrows, the leading character is dropped and the result is one
    /// character shorter.
    ///
    /// `predecessor` of a single `"0"` is the empty string, which sorts below
    /// every valid id. It is only ever used as a bound, never stored.
    #[must_use]
    pub fn predecessor(&self) -> Self {
        let mut bytes = self.0.as_bytes().to_vec();
        for i in (0..bytes.len()).rev() {
            if bytes[i] > MIN_ID_CHAR {
                bytes[i] -= 1;
                return Self::from_ascii(bytes);
            }
            bytes[i] = MAX_ID_CHAR;
        }
        bytes.remove(0);
        Self::from_ascii(bytes)
    }

    fn from_ascii(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.iter().all(u8::is_ascii));
        // Only ever called with bytes drawn from '0'..='z'.
        Self(bytes.into_iter().map(char::from).collect::<String>().into())
    }
}

impl Ord for OrderedId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.as_bytes().cmp(other.0.as_bytes()))
    }
}

impl PartialOrd for OrderedId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for OrderedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for OrderedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderedId({})", self.0)
    }
}

impl AsRef<str> for OrderedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for OrderedId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for OrderedId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl From<u64> for OrderedId {
    fn from(value: u64) -> Self {
        Self(value.to_string().into())
    }
}

impl FromStr for OrderedId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for OrderedId {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for OrderedId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> OrderedId {
        s.parse().unwrap()
    }

    #[test]
    fn shorter_ids_sort_first() {
        assert!(id("9") < id("10"));
        assert!(id("99") < id("100"));
        assert!(id("zz") < id("000"));
        assert_eq!(id("42").cmp(&id("42")), Ordering::Equal);
    }

    #[test]
    fn equal_length_compares_lexicographically() {
        assert!(id("109") < id("110"));
        assert!(id("1a") > id("19"));
        assert!(id("A0") < id("a0"));
    }

    #[test]
    fn rejects_empty_and_out_of_alphabet() {
        assert!(matches!(OrderedId::new(""), Err(Error::InvalidId { .. })));
        assert!(matches!(
            OrderedId::new("12-3"),
            Err(Error::InvalidId { .. })
        ));
        assert!(matches!(
            OrderedId::try_from(String::from("{")),
            Err(Error::InvalidId { .. })
        ));
        assert!(OrderedId::new("01aZ").is_ok());
    }

    #[test]
    fn successor_bumps_last_char() {
        assert_eq!(id("71").successor(), "72");
        assert_eq!(id("19").successor(), "1:");
        assert_eq!(id("1y").successor(), "1z");
    }

    #[test]
    fn successor_carries_and_grows() {
        assert_eq!(id("1z").successor(), "20");
        assert_eq!(id("zz").successor(), "100");
        assert_eq!(id("z").successor(), "10");
    }

    #[test]
    fn predecessor_lowers_last_char() {
        assert_eq!(id("72").predecessor(), "71");
        assert_eq!(id("1a").predecessor(), "1`");
    }

    #[test]
    fn predecessor_borrows_and_shrinks() {
        assert_eq!(id("10").predecessor(), "0z");
        assert_eq!(id("100").predecessor(), "0zz");
        assert_eq!(id("000").predecessor(), "zz");
        assert_eq!(id("0").predecessor(), "");
    }

    #[test]
    fn predecessor_and_successor_are_monotonic() {
        let samples = [
            "0", "1", "9", "z", "10", "0z", "z0", "zz", "100", "000", "abc", "1999",
            "109999999999999999", "110000000000000000", "99999999999999999",
        ];
        for s in samples {
            let x = id(s);
            assert_eq!(x.predecessor().cmp(&x), Ordering::Less, "predecessor({s})");
            assert_eq!(x.successor().cmp(&x), Ordering::Greater, "successor({s})");
        }
    }

    #[test]
    fn from_u64_matches_parse() {
        assert_eq!(OrderedId::from(1234_u64), id("1234"));
        assert!(OrderedId::from(99_u64) < OrderedId::from(100_u64));
    }

    #[test]
    fn display_and_debug() {
        let x = id("123");
        assert_eq!(x.to_string(), "123");
        assert_eq!(format!("{x:?}"), "OrderedId(123)");
    }
}
