//! A single chunk slot as stored on disk

use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::format::{sectors_for, Compression, CHUNK_HEADER_SIZE, SECTOR_SIZE};

/// Raw sectors of one chunk: header, compressed payload and padding.
///
/// Kept chunks are written back byte-for-byte, so the payload is only
/// decompressed on demand for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    raw: Vec<u8>,
}

impl Chunk {
    /// Build a chunk from the sectors referenced by a location entry.
    ///
    /// A slice cut short by the end of the file is zero-padded to the next
    /// sector boundary, as long as the declared payload is fully present.
    pub fn from_sectors(bytes: &[u8]) -> DomainResult<Self> {
        if bytes.len() < CHUNK_HEADER_SIZE {
            return Err(DomainError::truncated(format!(
                "chunk header needs {} bytes, got {}",
                CHUNK_HEADER_SIZE,
                bytes.len()
            )));
        }
        let length = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if length == 0 {
            return Err(DomainError::InvalidChunk {
                message: "declared length is zero".into(),
            });
        }
        // length counts the compression byte
        let end = CHUNK_HEADER_SIZE - 1 + length;
        if end > bytes.len() {
            return Err(DomainError::truncated(format!(
                "chunk declares {} bytes but only {} are available",
                length,
                bytes.len() - (CHUNK_HEADER_SIZE - 1)
            )));
        }

        let mut raw = bytes.to_vec();
        raw.resize(sectors_for(raw.len()) * SECTOR_SIZE, 0);
        Ok(Self { raw })
    }

    /// Build a chunk around an already compressed payload.
    pub fn from_payload(compression: Compression, payload: &[u8]) -> Self {
        let length = (payload.len() + 1) as u32;
        let mut raw = Vec::with_capacity(CHUNK_HEADER_SIZE + payload.len());
        raw.extend_from_slice(&length.to_be_bytes());
        raw.push(compression.to_byte());
        raw.extend_from_slice(payload);
        raw.resize(sectors_for(raw.len()) * SECTOR_SIZE, 0);
        Self { raw }
    }

    fn declared_length(&self) -> usize {
        u32::from_be_bytes([self.raw[0], self.raw[1], self.raw[2], self.raw[3]]) as usize
    }

    pub fn compression(&self) -> Compression {
        Compression::from_byte(self.raw[4])
    }

    /// Compressed payload without header and padding.
    pub fn payload(&self) -> &[u8] {
        &self.raw[CHUNK_HEADER_SIZE..CHUNK_HEADER_SIZE - 1 + self.declared_length()]
    }

    pub fn sectors(&self) -> usize {
        self.raw.len() / SECTOR_SIZE
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Inflate the payload into raw NBT bytes.
    pub fn decompress(&self) -> DomainResult<Vec<u8>> {
        let payload = self.payload();
        let mut out = Vec::new();
        match self.compression() {
            Compression::Zlib => {
                ZlibDecoder::new(payload)
                    .read_to_end(&mut out)
                    .map_err(DomainError::Decompress)?;
            }
            Compression::Gzip => {
                GzDecoder::new(payload)
                    .read_to_end(&mut out)
                    .map_err(DomainError::Decompress)?;
            }
            Compression::Uncompressed => out.extend_from_slice(payload),
            other => return Err(DomainError::UnsupportedCompression(other.to_string())),
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::zlib;

    #[test]
    fn given_short_slice_when_parsing_then_errors_truncated() {
        let result = Chunk::from_sectors(&[0, 0, 0]);
        assert!(matches!(result, Err(DomainError::Truncated { .. })));
    }

    #[test]
    fn given_zero_length_when_parsing_then_errors_invalid() {
        let result = Chunk::from_sectors(&[0, 0, 0, 0, 2, 0, 0]);
        assert!(matches!(result, Err(DomainError::InvalidChunk { .. })));
    }

    #[test]
    fn given_length_past_end_when_parsing_then_errors_truncated() {
        let result = Chunk::from_sectors(&[0, 0, 0, 10, 2, 1, 2]);
        assert!(matches!(result, Err(DomainError::Truncated { .. })));
    }

    #[test]
    fn given_unaligned_tail_when_parsing_then_pads_to_sector() {
        let result = Chunk::from_sectors(&[0, 0, 0, 3, 3, 0xAB, 0xCD]).unwrap();
        assert_eq!(result.sectors(), 1);
        assert_eq!(result.as_bytes().len(), SECTOR_SIZE);
        assert_eq!(result.payload(), &[0xAB, 0xCD]);
    }

    #[test]
    fn given_zlib_payload_when_decompressing_then_returns_original() {
        let chunk = Chunk::from_payload(Compression::Zlib, &zlib(b"hello nbt"));
        assert_eq!(chunk.compression(), Compression::Zlib);
        assert_eq!(chunk.decompress().unwrap(), b"hello nbt");
    }

    #[test]
    fn given_lz4_payload_when_decompressing_then_unsupported() {
        let chunk = Chunk::from_payload(Compression::Lz4, b"xx");
        assert!(matches!(
            chunk.decompress(),
            Err(DomainError::UnsupportedCompression(_))
        ));
    }

    #[test]
    fn given_corrupt_zlib_when_decompressing_then_errors() {
        let chunk = Chunk::from_payload(Compression::Zlib, b"not zlib at all");
        assert!(matches!(chunk.decompress(), Err(DomainError::Decompress(_))));
    }

    #[test]
    fn given_uncompressed_payload_when_decompressing_then_returns_it_as_is() {
        let chunk = Chunk::from_payload(Compression::Uncompressed, b"\x0a\x00\x00\x00");
        assert_eq!(chunk.compression(), Compression::Uncompressed);
        assert_eq!(chunk.decompress().unwrap(), b"\x0a\x00\x00\x00");
    }

    #[test]
    fn given_external_chunk_when_decompressing_then_unsupported() {
        let chunk = Chunk::from_payload(Compression::External(2), &[]);
        assert_eq!(chunk.compression(), Compression::External(2));
        assert!(matches!(
            chunk.decompress(),
            Err(DomainError::UnsupportedCompression(_))
        ));
    }
}
