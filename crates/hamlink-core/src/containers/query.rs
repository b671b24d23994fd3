// ── Value queries ──
//
// A resolved recipe for one field: which OIDs to read and how to turn the
// answers into a value. Recipes are what the cache keeps for volatile
// fields, so a cached device can be re-read without resolving anything.

use std::collections::HashMap;
use std::time::Duration;

use hamlink_api::{Oid, SnmpValue};
use serde::{Deserialize, Serialize};

use super::decibel;
use crate::model::{MacAddress, ValueMeaning};
use crate::oid_table::LayeredLookup;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueQuery {
    /// The device has no query path for this field.
    #[default]
    Unsupported,
    Scalar {
        oid: Oid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scaling: Option<f64>,
    },
    /// Per-stream levels combined in the power domain.
    DecibelSum {
        oids: Vec<Oid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scaling: Option<f64>,
    },
}

impl ValueQuery {
    /// Resolves `meaning` and appends `suffix` to its OID.
    pub fn resolve(lookup: &LayeredLookup, meaning: ValueMeaning, suffix: &[u32]) -> Self {
        match lookup.resolve(meaning) {
            Some(entry) => Self::Scalar {
                oid: entry.oid.join(suffix),
                scaling: entry.scaling,
            },
            None => Self::Unsupported,
        }
    }

    /// Per-stream meanings when the device has any of them, the aggregate
    /// meaning otherwise.
    pub fn streams(
        lookup: &LayeredLookup,
        per_stream: &[ValueMeaning],
        aggregate: ValueMeaning,
        suffix: &[u32],
    ) -> Self {
        let entries: Vec<_> = per_stream
            .iter()
            .filter_map(|&meaning| lookup.resolve(meaning))
            .collect();
        if entries.is_empty() {
            return Self::resolve(lookup, aggregate, suffix);
        }
        Self::DecibelSum {
            scaling: entries.first().and_then(|e| e.scaling),
            oids: entries.iter().map(|e| e.oid.join(suffix)).collect(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    pub fn oids(&self) -> Vec<Oid> {
        match self {
            Self::Unsupported => Vec::new(),
            Self::Scalar { oid, .. } => vec![oid.clone()],
            Self::DecibelSum { oids, .. } => oids.clone(),
        }
    }

    fn scaling(&self) -> f64 {
        match self {
            Self::Unsupported => 1.0,
            Self::Scalar { scaling, .. } | Self::DecibelSum { scaling, .. } => {
                scaling.unwrap_or(1.0)
            }
        }
    }

    fn scalar<'v>(&self, values: &'v HashMap<Oid, SnmpValue>) -> Option<&'v SnmpValue> {
        match self {
            Self::Scalar { oid, .. } => values.get(oid).filter(|v| !v.is_exception()),
            _ => None,
        }
    }

    // ── Decoding ────────────────────────────────────────────────────

    pub fn decode_f64(&self, values: &HashMap<Oid, SnmpValue>) -> Option<f64> {
        let scaling = self.scaling();
        match self {
            Self::Unsupported => None,
            Self::Scalar { .. } => self.scalar(values)?.as_f64().map(|v| v * scaling),
            Self::DecibelSum { oids, .. } => decibel::combine(
                oids.iter()
                    .filter_map(|oid| values.get(oid))
                    .filter_map(SnmpValue::as_f64)
                    .map(|v| v * scaling),
            ),
        }
    }

    /// `TimeTicks` convert directly; plain numbers are seconds times the
    /// scaling factor.
    pub fn decode_duration(&self, values: &HashMap<Oid, SnmpValue>) -> Option<Duration> {
        let value = self.scalar(values)?;
        if let Some(duration) = value.as_duration() {
            return Some(duration);
        }
        let seconds = value.as_f64()? * self.scaling();
        (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
    }

    pub fn decode_text(&self, values: &HashMap<Oid, SnmpValue>) -> Option<String> {
        self.scalar(values)?
            .as_text()
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
    }

    pub fn decode_int(&self, values: &HashMap<Oid, SnmpValue>) -> Option<i64> {
        self.scalar(values)?.as_i64()
    }

    pub fn decode_oid(&self, values: &HashMap<Oid, SnmpValue>) -> Option<Oid> {
        self.scalar(values)?.as_oid().cloned()
    }

    /// Raw six-byte strings, or a printable MAC in any common notation.
    pub fn decode_mac(&self, values: &HashMap<Oid, SnmpValue>) -> Option<MacAddress> {
        let value = self.scalar(values)?;
        decode_mac_value(value)
    }
}

pub(crate) fn decode_mac_value(value: &SnmpValue) -> Option<MacAddress> {
    let bytes = value.as_bytes()?;
    MacAddress::from_bytes(bytes)
        .or_else(|| std::str::from_utf8(bytes).ok()?.trim().parse().ok())
        .filter(|mac| !mac.is_zero())
}
