// ── SNMP values ──
//
// Owned mirror of the wire value types. Typed accessors return `None`
// instead of failing so callers decide whether a mismatch is an error.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;
use crate::oid::Oid;

#[derive(Debug, Clone, PartialEq)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    ObjectIdentifier(Oid),
    IpAddress(Ipv4Addr),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Counter64(u64),
    Opaque(Vec<u8>),
    Null,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl SnmpValue {
    /// Exception values carry no data for the requested OID.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "INTEGER",
            Self::OctetString(_) => "STRING",
            Self::ObjectIdentifier(_) => "OID",
            Self::IpAddress(_) => "IpAddress",
            Self::Counter32(_) => "Counter32",
            Self::Gauge32(_) => "Gauge32",
            Self::TimeTicks(_) => "Timeticks",
            Self::Counter64(_) => "Counter64",
            Self::Opaque(_) => "Opaque",
            Self::Null => "NULL",
            Self::NoSuchObject => "noSuchObject",
            Self::NoSuchInstance => "noSuchInstance",
            Self::EndOfMibView => "endOfMibView",
        }
    }

    /// Numeric view. Some agents report numbers as strings, so trimmed
    /// decimal octet strings are accepted too.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Counter32(v) | Self::Gauge32(v) | Self::TimeTicks(v) => Some(i64::from(*v)),
            Self::Counter64(v) => i64::try_from(*v).ok(),
            Self::OctetString(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Counter64(v) => Some(*v as f64),
            Self::OctetString(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Text view with trailing NULs stripped; numbers are rendered in decimal.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::OctetString(bytes) | Self::Opaque(bytes) => Some(
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .trim()
                    .to_owned(),
            ),
            Self::ObjectIdentifier(oid) => Some(oid.to_string()),
            Self::IpAddress(ip) => Some(ip.to_string()),
            Self::Integer(_)
            | Self::Counter32(_)
            | Self::Gauge32(_)
            | Self::TimeTicks(_)
            | Self::Counter64(_) => self.as_i64().map(|v| v.to_string()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::OctetString(bytes) | Self::Opaque(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Self::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    /// TimeTicks are hundredths of a second.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::TimeTicks(ticks) => Some(Duration::from_millis(u64::from(*ticks) * 10)),
            _ => None,
        }
    }
}

impl fmt::Display for SnmpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OctetString(bytes) if bytes.iter().all(|b| !b.is_ascii_control()) => {
                write!(f, "STRING: \"{}\"", String::from_utf8_lossy(bytes))
            }
            Self::OctetString(bytes) | Self::Opaque(bytes) => {
                f.write_str("Hex-STRING:")?;
                for b in bytes {
                    write!(f, " {b:02X}")?;
                }
                Ok(())
            }
            Self::TimeTicks(ticks) => write!(f, "Timeticks: ({ticks})"),
            Self::IpAddress(ip) => write!(f, "IpAddress: {ip}"),
            Self::ObjectIdentifier(oid) => write!(f, "OID: .{oid}"),
            Self::Integer(v) => write!(f, "INTEGER: {v}"),
            Self::Counter32(v) => write!(f, "Counter32: {v}"),
            Self::Gauge32(v) => write!(f, "Gauge32: {v}"),
            Self::Counter64(v) => write!(f, "Counter64: {v}"),
            _ => f.write_str(self.type_name()),
        }
    }
}

impl From<&str> for SnmpValue {
    fn from(s: &str) -> Self {
        Self::OctetString(s.as_bytes().to_vec())
    }
}

impl From<i64> for SnmpValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<Oid> for SnmpValue {
    fn from(oid: Oid) -> Self {
        Self::ObjectIdentifier(oid)
    }
}

// ── net-snmp text form ──────────────────────────────────────────────

/// Parses the right-hand side of an `snmpwalk -On` line, e.g.
/// `STRING: "RouterOS RB2011UiAS"`, `INTEGER: ap(2)`, `Timeticks: (4711) 0:00:47.11`.
impl FromStr for SnmpValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("No Such Object") {
            return Ok(Self::NoSuchObject);
        }
        if s.starts_with("No Such Instance") {
            return Ok(Self::NoSuchInstance);
        }
        if s.starts_with("No more variables") {
            return Ok(Self::EndOfMibView);
        }
        if s == "\"\"" {
            return Ok(Self::OctetString(Vec::new()));
        }
        if s.eq_ignore_ascii_case("NULL") {
            return Ok(Self::Null);
        }

        let Some((kind, raw)) = s.split_once(':') else {
            return Err(format!("missing type prefix in '{s}'"));
        };
        let raw = raw.trim();
        let number = |text: &str| -> Result<i64, String> {
            // Enumerated integers print as `label(value)`.
            let inner = match (text.find('('), text.find(')')) {
                (Some(open), Some(close)) if open < close => &text[open + 1..close],
                _ => text.split_whitespace().next().unwrap_or_default(),
            };
            inner
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("bad number '{text}': {e}"))
        };
        let unsigned = |text: &str| -> Result<u32, String> {
            let value = number(text)?;
            u32::try_from(value).map_err(|_| format!("{value} out of range"))
        };

        match kind.trim() {
            "STRING" => Ok(Self::OctetString(
                raw.trim_matches('"').as_bytes().to_vec(),
            )),
            "Hex-STRING" => raw
                .split_whitespace()
                .map(|b| u8::from_str_radix(b, 16).map_err(|e| format!("bad hex '{b}': {e}")))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::OctetString),
            "INTEGER" => number(raw).map(Self::Integer),
            "Counter32" => unsigned(raw).map(Self::Counter32),
            "Gauge32" | "Unsigned32" => unsigned(raw).map(Self::Gauge32),
            "Timeticks" => unsigned(raw).map(Self::TimeTicks),
            "Counter64" => raw
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .parse::<u64>()
                .map(Self::Counter64)
                .map_err(|e| format!("bad Counter64 '{raw}': {e}")),
            "OID" => raw
                .parse::<Oid>()
                .map(Self::ObjectIdentifier)
                .map_err(|e: Error| e.to_string()),
            "IpAddress" => raw
                .parse::<Ipv4Addr>()
                .map(Self::IpAddress)
                .map_err(|e| format!("bad IpAddress '{raw}': {e}")),
            other => Err(format!("unsupported value type '{other}'")),
        }
    }
}
