//! IEEE 488.2 binary blocks.
//!
//! Setups and screenshots come back as arbitrary block data:
//! `#<n><len><payload>` where `<n>` is the number of digits in `<len>`, or
//! the indefinite form `#0<payload>\n`.

use crate::error::{IviError, IviResult};
use std::io::Read;

/// Wrap `payload` in a definite-length block header.
pub fn encode_block(payload: &[u8]) -> Vec<u8> {
    let len = payload.len().to_string();
    let mut block = Vec::with_capacity(2 + len.len() + payload.len());
    block.push(b'#');
    block.extend_from_slice(len.len().to_string().as_bytes());
    block.extend_from_slice(len.as_bytes());
    block.extend_from_slice(payload);
    block
}

/// Extract the payload of a block. Leading whitespace and anything after the
/// payload (typically a line terminator) is ignored.
///
/// # Errors
///
/// [`IviError::MalformedResponse`] when the header is missing or invalid, or
/// when the data ends before the declared length.
pub fn decode_block(data: &[u8]) -> IviResult<Vec<u8>> {
    let malformed = |reason: &str| IviError::malformed("binary block", reason);

    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or_else(|| malformed("empty reply"))?;
    let data = &data[start..];
    if data.first() != Some(&b'#') {
        return Err(malformed("missing '#' header"));
    }

    let digits = data
        .get(1)
        .filter(|b| b.is_ascii_digit())
        .map(|b| usize::from(b - b'0'))
        .ok_or_else(|| malformed("invalid header digit count"))?;

    if digits == 0 {
        let payload = &data[2..];
        let end = payload
            .iter()
            .rposition(|&b| b != b'\n' && b != b'\r')
            .map_or(0, |p| p + 1);
        return Ok(payload[..end].to_vec());
    }

    let len_field = data
        .get(2..2 + digits)
        .ok_or_else(|| malformed("truncated header"))?;
    let len: usize = std::str::from_utf8(len_field)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed("invalid block length"))?;

    let body_start = 2 + digits;
    data.get(body_start..body_start + len)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| malformed("block shorter than its header"))
}

/// Total message length implied by a definite block header, once the header
/// is complete.
fn block_extent(data: &[u8]) -> Option<usize> {
    let digits = usize::from(data.get(1)?.checked_sub(b'0')?);
    if digits == 0 || digits > 9 {
        return None;
    }
    let len: usize = std::str::from_utf8(data.get(2..2 + digits)?).ok()?.parse().ok()?;
    Some(2 + digits + len)
}

fn message_complete(data: &[u8]) -> bool {
    if data.first() == Some(&b'#') && data.get(1) != Some(&b'0') {
        return block_extent(data).is_some_and(|end| data.len() >= end);
    }
    data.ends_with(b"\n")
}

/// Read one reply from a byte stream: a whole binary block, or one line.
pub(crate) fn read_message<R: Read + ?Sized>(reader: &mut R) -> anyhow::Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
        if message_complete(&data) {
            break;
        }
    }
    if data.is_empty() {
        anyhow::bail!("instrument sent no data");
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_definite_block() {
        assert_eq!(decode_block(b"#15hello\n").unwrap(), b"hello".to_vec());
        assert_eq!(decode_block(b"  #210abcdefghij").unwrap(), b"abcdefghij".to_vec());
    }

    #[test]
    fn test_decode_indefinite_block() {
        assert_eq!(decode_block(b"#0PNGDATA\r\n").unwrap(), b"PNGDATA".to_vec());
    }

    #[test]
    fn test_decode_rejects_bad_blocks() {
        assert!(decode_block(b"hello").is_err());
        assert!(decode_block(b"#x5hello").is_err());
        assert!(decode_block(b"#19abc").is_err());
        assert!(decode_block(b"").is_err());
    }

    #[test]
    fn test_encode_block() {
        assert_eq!(encode_block(b"setup"), b"#15setup".to_vec());
        let payload = vec![0u8; 1234];
        let block = encode_block(&payload);
        assert!(block.starts_with(b"#41234"));
        assert_eq!(decode_block(&block).unwrap(), payload);
    }

    #[test]
    fn test_read_message_waits_for_whole_block() {
        let mut reader: &[u8] = b"#211hello world";
        assert_eq!(read_message(&mut reader).unwrap(), b"#211hello world".to_vec());

        let mut reader: &[u8] = b"1.234\n";
        assert_eq!(read_message(&mut reader).unwrap(), b"1.234\n".to_vec());

        let mut reader: &[u8] = b"";
        assert!(read_message(&mut reader).is_err());
    }
}
