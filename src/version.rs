//! Ordered version tokens.
//!
//! A [`Version`] keeps the exact string it was parsed from and compares by
//! segments: numeric segments as integers, everything else as
//! case-insensitive text. `1.2.0 < 1.2.1 < 1.10.0` holds, which plain string
//! ordering gets wrong.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

const SEPARATORS: [char; 2] = ['.', '-'];

#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
}

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Segments between `.` and `-` separators, in order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.raw.split(SEPARATORS).filter(|t| !t.is_empty())
    }
}

fn compare_segments(left: &str, right: &str) -> Ordering {
    let mut a = left.split(SEPARATORS);
    let mut b = right.split(SEPARATORS);
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(ln), Ok(rn)) => ln.cmp(&rn),
                    _ => compare_text(l, r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_text(left: &str, right: &str) -> Ordering {
    left.chars()
        .map(|c| c.to_ascii_lowercase())
        .cmp(right.chars().map(|c| c.to_ascii_lowercase()))
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Tie-break on the raw string so the order is total and agrees with Eq.
        compare_segments(&self.raw, &other.raw).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VersionVisitor;

        impl Visitor<'_> for VersionVisitor {
            type Value = Version;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a version string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Version, E> {
                Ok(Version::new(value))
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}
