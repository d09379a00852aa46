//! Archive payload decoding.
//!
//! Hosts hand the archive over as base64 text. Decoding walks the text in
//! fixed-size chunks so only one chunk of cleaned input is buffered next to
//! the output, regardless of archive size.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use bytes::Bytes;

use crate::error::DecodeError;

/// Base64 characters decoded per chunk. A multiple of 4, so only the final
/// chunk can carry padding.
pub const DECODE_CHUNK_CHARS: usize = 512;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded archive bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveBlob(Bytes);

impl ArchiveBlob {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl std::fmt::Debug for ArchiveBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArchiveBlob(<{} bytes>)", self.0.len())
    }
}

/// Decode a base64 archive payload.
///
/// ASCII whitespace is skipped and trailing padding is optional. Offsets in
/// errors refer to the original text.
pub fn decode_archive(payload: &str) -> Result<ArchiveBlob, DecodeError> {
    let input = payload.as_bytes();
    let mut out = Vec::with_capacity(base64::decoded_len_estimate(input.len()));
    let mut chunk = Vec::with_capacity(DECODE_CHUNK_CHARS);
    let mut positions = Vec::with_capacity(DECODE_CHUNK_CHARS);

    for (pos, &byte) in input.iter().enumerate() {
        if byte.is_ascii_whitespace() {
            continue;
        }
        chunk.push(byte);
        positions.push(pos);

        if chunk.len() == DECODE_CHUNK_CHARS {
            // A full chunk is final only if nothing but whitespace follows.
            let last = input[pos + 1..].iter().all(u8::is_ascii_whitespace);
            decode_chunk(&chunk, &positions, last, &mut out)?;
            chunk.clear();
            positions.clear();
        }
    }

    if !chunk.is_empty() {
        decode_chunk(&chunk, &positions, true, &mut out)?;
    }

    tracing::trace!(
        encoded = input.len(),
        decoded = out.len(),
        "decoded archive payload"
    );
    Ok(ArchiveBlob(Bytes::from(out)))
}

/// Encode archive bytes the way hosts store them.
pub fn encode_archive(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn decode_chunk(
    chunk: &[u8],
    positions: &[usize],
    last: bool,
    out: &mut Vec<u8>,
) -> Result<(), DecodeError> {
    if !last && chunk.last() == Some(&b'=') {
        let offset = positions[chunk.len() - 1];
        return Err(DecodeError::Invalid {
            offset,
            reason: "padding before end of payload".to_string(),
        });
    }

    LENIENT.decode_vec(chunk, out).map_err(|err| match err {
        base64::DecodeError::InvalidByte(index, byte) => DecodeError::InvalidByte {
            offset: positions[index],
            byte,
        },
        base64::DecodeError::InvalidLength(_) => DecodeError::Truncated {
            trailing: chunk.len() % 4,
        },
        other => DecodeError::Invalid {
            offset: positions[0],
            reason: other.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn decodes_exactly_across_chunk_boundaries() {
        // 384 bytes encode to exactly one 512-character chunk.
        for len in [0, 1, 2, 3, 383, 384, 385, 511, 512, 768, 769, 1025, 4096] {
            let bytes = sample(len);
            let blob = decode_archive(&encode_archive(&bytes))
                .unwrap_or_else(|err| panic!("len {len}: {err}"));
            assert_eq!(blob.as_bytes(), bytes.as_slice(), "len {len}");
        }
    }

    #[test]
    fn line_wrapped_payload_decodes() {
        let bytes = sample(2000);
        let encoded = encode_archive(&bytes);
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let blob = decode_archive(&format!("{wrapped}\n")).unwrap();
        assert_eq!(blob.as_bytes(), bytes.as_slice());
    }

    #[test]
    fn missing_padding_is_tolerated() {
        let blob = decode_archive("UEs").unwrap();
        assert_eq!(blob.as_bytes(), b"PK");
    }

    #[test]
    fn invalid_byte_reports_original_offset() {
        let err = decode_archive("UEsD\nBA!=").unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidByte {
                offset: 7,
                byte: b'!'
            }
        );
    }

    #[test]
    fn dangling_character_is_truncated() {
        assert_eq!(
            decode_archive("UEsDB").unwrap_err(),
            DecodeError::Truncated { trailing: 1 }
        );
    }

    #[test]
    fn padding_inside_payload_is_rejected() {
        let mut text = "A".repeat(DECODE_CHUNK_CHARS - 2);
        text.push_str("==");
        text.push_str("QUJD");
        assert!(decode_archive(&text).is_err());
    }

    #[test]
    fn padding_at_end_of_full_chunk_is_fine() {
        // 382 bytes encode to 512 characters ending in "==".
        let bytes = sample(382);
        let encoded = encode_archive(&bytes);
        assert_eq!(encoded.len(), DECODE_CHUNK_CHARS);
        assert!(encoded.ends_with("=="));

        let blob = decode_archive(&format!("{encoded}\r\n")).unwrap();
        assert_eq!(blob.as_bytes(), bytes.as_slice());
    }
}
