//! Anvil container layout: header tables, sector arithmetic, compression ids

use std::fmt;

/// Size of one sector; all offsets and chunk lengths are sector-aligned.
pub const SECTOR_SIZE: usize = 4096;
/// Chunk slots per container (32 x 32).
pub const CHUNKS_PER_REGION: usize = 1024;
pub const LOCATION_TABLE_SIZE: usize = 4 * CHUNKS_PER_REGION;
pub const TIMESTAMP_TABLE_SIZE: usize = 4 * CHUNKS_PER_REGION;
pub const HEADER_SIZE: usize = LOCATION_TABLE_SIZE + TIMESTAMP_TABLE_SIZE;
/// 4-byte big-endian length followed by the compression id.
pub const CHUNK_HEADER_SIZE: usize = 5;
/// The two header tables occupy sectors 0 and 1.
pub const FIRST_DATA_SECTOR: u32 = (HEADER_SIZE / SECTOR_SIZE) as u32;
/// Largest offset expressible in the 3-byte location field.
pub const MAX_SECTOR_OFFSET: u32 = 0x00FF_FFFF;

/// Location table entry: 3-byte sector offset, 1-byte sector count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkLocation {
    pub offset: u32,
    pub sectors: u8,
}

impl ChunkLocation {
    pub const EMPTY: ChunkLocation = ChunkLocation {
        offset: 0,
        sectors: 0,
    };

    pub fn new(offset: u32, sectors: u8) -> Self {
        debug_assert!(offset <= MAX_SECTOR_OFFSET);
        Self { offset, sectors }
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            offset: u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]),
            sectors: bytes[3],
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let [_, a, b, c] = self.offset.to_be_bytes();
        [a, b, c, self.sectors]
    }

    pub fn is_present(&self) -> bool {
        self.sectors > 0
    }

    /// Byte range covered by this entry within the container.
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize * SECTOR_SIZE;
        start..start + self.sectors as usize * SECTOR_SIZE
    }
}

/// Last-modified time of a chunk slot, epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct Timestamp(pub u32);

impl Timestamp {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

/// Compression scheme byte of a chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
    Uncompressed,
    Lz4,
    Custom,
    /// Payload lives in a separate `c.<x>.<z>.mcc` file.
    External(u8),
    Unknown(u8),
}

impl Compression {
    const EXTERNAL_FLAG: u8 = 0x80;

    pub fn from_byte(byte: u8) -> Self {
        if byte & Self::EXTERNAL_FLAG != 0 {
            return Compression::External(byte & !Self::EXTERNAL_FLAG);
        }
        match byte {
            1 => Compression::Gzip,
            2 => Compression::Zlib,
            3 => Compression::Uncompressed,
            4 => Compression::Lz4,
            127 => Compression::Custom,
            other => Compression::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Compression::Gzip => 1,
            Compression::Zlib => 2,
            Compression::Uncompressed => 3,
            Compression::Lz4 => 4,
            Compression::Custom => 127,
            Compression::External(inner) => inner | Self::EXTERNAL_FLAG,
            Compression::Unknown(b) => b,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::Gzip => write!(f, "gzip"),
            Compression::Zlib => write!(f, "zlib"),
            Compression::Uncompressed => write!(f, "uncompressed"),
            Compression::Lz4 => write!(f, "lz4"),
            Compression::Custom => write!(f, "custom"),
            Compression::External(inner) => write!(f, "external({})", inner),
            Compression::Unknown(b) => write!(f, "unknown({})", b),
        }
    }
}

/// Number of whole sectors needed to hold `len` bytes.
pub fn sectors_for(len: usize) -> usize {
    len.div_ceil(SECTOR_SIZE)
}
