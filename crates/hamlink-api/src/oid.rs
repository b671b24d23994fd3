// ── Object identifiers ──
//
// Owned, ordered OID type used throughout the workspace. The snmp2 wire
// type borrows from the PDU buffer, so values are converted at the session
// boundary and never leak past it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A dotted object identifier such as `1.3.6.1.2.1.1.1.0`.
///
/// Ordering is lexicographic over the arcs, which matches the agent's
/// GETNEXT ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn from_arcs(arcs: impl Into<Vec<u32>>) -> Self {
        Self(arcs.into())
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `self` lies inside the subtree rooted at `root`.
    pub fn starts_with(&self, root: &Oid) -> bool {
        self.0.starts_with(&root.0)
    }

    /// Arcs following `root`, or `None` if `self` is outside that subtree.
    pub fn suffix_after(&self, root: &Oid) -> Option<&[u32]> {
        self.0.strip_prefix(root.0.as_slice())
    }

    /// New OID with `suffix` appended (table index, `.0` instance, ...).
    pub fn join(&self, suffix: &[u32]) -> Self {
        let mut arcs = Vec::with_capacity(self.0.len() + suffix.len());
        arcs.extend_from_slice(&self.0);
        arcs.extend_from_slice(suffix);
        Self(arcs)
    }

    pub fn child(&self, arc: u32) -> Self {
        self.join(&[arc])
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = Error;

    /// Accepts `1.3.6.1` as well as the `.1.3.6.1` form printed by net-snmp.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if body.is_empty() {
            return Err(Error::InvalidOid { input: s.to_owned() });
        }
        body.split('.')
            .map(|arc| arc.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
            .map_err(|_| Error::InvalidOid { input: s.to_owned() })
    }
}

impl TryFrom<String> for Oid {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.to_string()
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self(arcs.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_dot_and_displays_canonical() {
        let oid: Oid = ".1.3.6.1.2.1.1.1.0".parse().unwrap();
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.1.0");
        assert_eq!(oid.len(), 9);
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Oid>().is_err());
        assert!("1.3.x.1".parse::<Oid>().is_err());
        assert!("1..3".parse::<Oid>().is_err());
    }

    #[test]
    fn subtree_membership_and_suffix() {
        let root: Oid = "1.3.6.1.4.1.14988.1.1.1.2.1.1".parse().unwrap();
        let row = root.join(&[0, 12, 66, 1, 2, 3, 5]);
        assert!(row.starts_with(&root));
        assert_eq!(row.suffix_after(&root).unwrap(), &[0, 12, 66, 1, 2, 3, 5]);

        let sibling: Oid = "1.3.6.1.4.1.14988.1.1.1.2.1.2.0".parse().unwrap();
        assert!(!sibling.starts_with(&root));
        assert!(sibling.suffix_after(&root).is_none());
    }

    #[test]
    fn ordering_follows_getnext_order() {
        let a: Oid = "1.3.6.1.2.1.2.2.1.1.2".parse().unwrap();
        let b: Oid = "1.3.6.1.2.1.2.2.1.1.10".parse().unwrap();
        let c: Oid = "1.3.6.1.2.1.2.2.1.2".parse().unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn child_appends_instance_arc() {
        let sys_descr: Oid = "1.3.6.1.2.1.1.1".parse().unwrap();
        assert_eq!(sys_descr.child(0).to_string(), "1.3.6.1.2.1.1.1.0");
    }
}
