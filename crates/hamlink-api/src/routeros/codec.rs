// ── RouterOS API word codec ──
//
// A sentence is a sequence of length-prefixed words terminated by an
// empty word. Lengths use a 1 to 5 byte prefix.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Error;

/// Appends the length prefix for a word of `len` bytes.
pub fn encode_length(len: usize, out: &mut Vec<u8>) {
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    let bytes = len.to_be_bytes();
    match len {
        0..0x80 => out.push(bytes[3]),
        0x80..0x4000 => out.extend_from_slice(&(len | 0x8000).to_be_bytes()[2..]),
        0x4000..0x20_0000 => out.extend_from_slice(&(len | 0xC0_0000).to_be_bytes()[1..]),
        0x20_0000..0x1000_0000 => out.extend_from_slice(&(len | 0xE000_0000).to_be_bytes()),
        _ => {
            out.push(0xF0);
            out.extend_from_slice(&bytes);
        }
    }
}

/// Encodes one sentence including the terminating empty word.
pub fn encode_sentence(words: &[&str]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.iter().map(|w| w.len() + 2).sum::<usize>() + 1);
    for word in words {
        encode_length(word.len(), &mut out);
        out.extend_from_slice(word.as_bytes());
    }
    out.push(0);
    out
}

async fn read_length<R: AsyncRead + Unpin>(reader: &mut R) -> Result<usize, Error> {
    let first = reader.read_u8().await?;
    let (mut value, extra) = match first {
        b if b & 0x80 == 0 => (u32::from(b), 0),
        b if b & 0xC0 == 0x80 => (u32::from(b & 0x3F), 1),
        b if b & 0xE0 == 0xC0 => (u32::from(b & 0x1F), 2),
        b if b & 0xF0 == 0xE0 => (u32::from(b & 0x0F), 3),
        0xF0 => (0, 4),
        other => {
            return Err(Error::VendorProtocol(format!(
                "invalid length prefix byte {other:#04x}"
            )));
        }
    };
    for _ in 0..extra {
        value = (value << 8) | u32::from(reader.read_u8().await?);
    }
    usize::try_from(value).map_err(|_| Error::VendorProtocol("word too long".into()))
}

/// Reads one sentence; the terminating empty word is not returned.
pub async fn read_sentence<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<String>, Error> {
    let mut words = Vec::new();
    loop {
        let len = read_length(reader).await?;
        if len == 0 {
            return Ok(words);
        }
        let mut buf = vec![0; len];
        reader.read_exact(&mut buf).await?;
        words.push(String::from_utf8_lossy(&buf).into_owned());
    }
}

/// Splits an attribute word `=name=value` into its parts.
pub fn parse_attribute(word: &str) -> Option<(&str, &str)> {
    word.strip_prefix('=')?.split_once('=')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn prefix(len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        encode_length(len, &mut out);
        out
    }

    #[test]
    fn length_prefix_boundaries() {
        assert_eq!(prefix(0x7F), vec![0x7F]);
        assert_eq!(prefix(0x80), vec![0x80, 0x80]);
        assert_eq!(prefix(0x3FFF), vec![0xBF, 0xFF]);
        assert_eq!(prefix(0x4000), vec![0xC0, 0x40, 0x00]);
        assert_eq!(prefix(0x20_0000), vec![0xE0, 0x20, 0x00, 0x00]);
        assert_eq!(prefix(0x1000_0000), vec![0xF0, 0x10, 0x00, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn sentence_round_trip() {
        let long = "x".repeat(300);
        let bytes = encode_sentence(&["/login", "=name=admin", &long]);
        let mut reader = bytes.as_slice();
        let words = read_sentence(&mut reader).await.unwrap();
        assert_eq!(words, vec!["/login".to_owned(), "=name=admin".to_owned(), long]);
        assert!(reader.is_empty());
    }

    #[test]
    fn attribute_values_may_contain_equals() {
        assert_eq!(parse_attribute("=comment=a=b"), Some(("comment", "a=b")));
        assert_eq!(parse_attribute("!re"), None);
    }
}
