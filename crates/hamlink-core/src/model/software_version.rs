// ── Software versions ──
//
// Firmware strings differ wildly between vendors ("XW.ar934x.v6.1.7.32555",
// "6.45.9 (long-term)", "4.19.0-amd64"). Only the dotted numeric part is
// kept; comparison pads missing components with zero.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const MAX_COMPONENTS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SoftwareVersion {
    parts: Vec<u32>,
}

impl SoftwareVersion {
    pub fn new(parts: impl Into<Vec<u32>>) -> Self {
        let mut parts = parts.into();
        if parts.is_empty() {
            parts.push(0);
        }
        Self { parts }
    }

    /// Extracts the first version number from a vendor firmware string.
    ///
    /// A number qualifies when it starts the string, follows a
    /// non-alphanumeric character, or follows a `v`/`V` that itself starts
    /// a token, so `ar934x` is skipped while `v6.1.7` and `6.45.9` match.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let bytes = raw.as_bytes();
        let starts_token = |idx: usize| idx == 0 || !bytes[idx - 1].is_ascii_alphanumeric();

        let start = (0..bytes.len()).find(|&i| {
            bytes[i].is_ascii_digit()
                && (starts_token(i)
                    || (matches!(bytes[i - 1], b'v' | b'V') && starts_token(i - 1)))
        })?;

        let mut parts = Vec::new();
        for component in raw[start..].split('.') {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            let Ok(value) = digits.parse::<u32>() else {
                break;
            };
            parts.push(value);
            if parts.len() == MAX_COMPONENTS || digits.len() != component.len() {
                break;
            }
        }
        (!parts.is_empty()).then(|| Self::new(parts))
    }

    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    fn significant(&self) -> &[u32] {
        let len = self
            .parts
            .iter()
            .rposition(|&p| p != 0)
            .map_or(0, |idx| idx + 1);
        &self.parts[..len]
    }
}

impl PartialEq for SoftwareVersion {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for SoftwareVersion {}

impl Hash for SoftwareVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl PartialOrd for SoftwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SoftwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| {
                let a = self.parts.get(i).copied().unwrap_or(0);
                let b = other.parts.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for SoftwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.parts.iter().map(u32::to_string).collect();
        f.write_str(&text.join("."))
    }
}

impl FromStr for SoftwareVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| CoreError::ValidationFailed {
            message: format!("'{s}' contains no version number"),
        })
    }
}

impl TryFrom<String> for SoftwareVersion {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SoftwareVersion> for String {
    fn from(v: SoftwareVersion) -> Self {
        v.to_string()
    }
}

/// Half-open version interval `[minimum, maximum)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    pub minimum: SoftwareVersion,
    pub maximum: SoftwareVersion,
}

impl VersionRange {
    pub fn new(minimum: SoftwareVersion, maximum: SoftwareVersion) -> Self {
        Self { minimum, maximum }
    }

    pub fn contains(&self, version: &SoftwareVersion) -> bool {
        &self.minimum <= version && version < &self.maximum
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.minimum, self.maximum)
    }
}
