//! Anvil container (`*.mca`) parsing, trimming and compacted serialization
//!
//! The same container format is used for terrain (`region/`), entity
//! (`entities/`) and point-of-interest (`poi/`) data.

use std::fmt;

use crate::domain::chunk::Chunk;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::format::{
    ChunkLocation, Timestamp, CHUNKS_PER_REGION, FIRST_DATA_SECTOR, HEADER_SIZE,
    LOCATION_TABLE_SIZE, SECTOR_SIZE,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    chunk: Chunk,
    timestamp: Timestamp,
    /// Sector offset in the source file; fixes the output order.
    source_offset: u32,
}

/// In-memory container with up to 1024 chunk slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFile {
    slots: Vec<Option<Slot>>,
}

impl Default for RegionFile {
    fn default() -> Self {
        Self {
            slots: vec![None; CHUNKS_PER_REGION],
        }
    }
}

impl RegionFile {
    /// Parse a container. A zero-length file is a valid empty container.
    pub fn parse(data: &[u8]) -> DomainResult<Self> {
        if data.is_empty() {
            return Ok(Self::default());
        }
        if data.len() < HEADER_SIZE {
            return Err(DomainError::truncated(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                data.len()
            )));
        }

        let mut region = Self::default();
        for index in 0..CHUNKS_PER_REGION {
            let loc_at = index * 4;
            let ts_at = LOCATION_TABLE_SIZE + index * 4;
            let location = ChunkLocation::from_bytes(read4(data, loc_at));
            if !location.is_present() {
                continue;
            }
            if location.offset < FIRST_DATA_SECTOR {
                return Err(DomainError::CorruptHeader {
                    index,
                    message: format!("offset {} overlaps the header", location.offset),
                });
            }

            let range = location.byte_range();
            if range.start >= data.len() {
                return Err(DomainError::Truncated {
                    message: format!(
                        "chunk {} starts at byte {} beyond end of file ({})",
                        index,
                        range.start,
                        data.len()
                    ),
                });
            }
            let end = range.end.min(data.len());
            let chunk = Chunk::from_sectors(&data[range.start..end])?;

            region.slots[index] = Some(Slot {
                chunk,
                timestamp: Timestamp::from_bytes(read4(data, ts_at)),
                source_offset: location.offset,
            });
        }
        Ok(region)
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.slots.get(index)?.as_ref().map(|s| &s.chunk)
    }

    pub fn timestamp(&self, index: usize) -> Option<Timestamp> {
        self.slots.get(index)?.as_ref().map(|s| s.timestamp)
    }

    /// Present chunks in index order.
    pub fn chunks(&self) -> impl Iterator<Item = (usize, &Chunk)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|slot| (i, &slot.chunk)))
    }

    /// Number of present chunks.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Keep chunks for which `keep` returns true; returns the removed indices.
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<usize>
    where
        F: FnMut(usize, &Chunk) -> bool,
    {
        let mut removed = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(s) = slot {
                if !keep(index, &s.chunk) {
                    *slot = None;
                    removed.push(index);
                }
            }
        }
        removed
    }

    /// Remove the given slots; returns those that were actually present.
    pub fn remove(&mut self, indices: &[usize]) -> Vec<usize> {
        let mut removed = Vec::new();
        for &index in indices {
            if let Some(slot) = self.slots.get_mut(index) {
                if slot.take().is_some() {
                    removed.push(index);
                }
            }
        }
        removed.sort_unstable();
        removed
    }

    /// Serialize with chunks packed contiguously from sector 2.
    ///
    /// Chunks keep their relative on-disk order, so an already compact file
    /// round-trips unchanged.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut order: Vec<(usize, &Slot)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|slot| (i, slot)))
            .collect();
        order.sort_by_key(|(i, s)| (s.source_offset, *i));

        let data_sectors: usize = order.iter().map(|(_, s)| s.chunk.sectors()).sum();
        let mut out = vec![0u8; HEADER_SIZE];
        out.reserve(data_sectors * SECTOR_SIZE);

        let mut offset = FIRST_DATA_SECTOR;
        for (index, slot) in order {
            let sectors = slot.chunk.sectors();
            let location = ChunkLocation::new(offset, sectors.min(u8::MAX as usize) as u8);

            let loc_at = index * 4;
            let ts_at = LOCATION_TABLE_SIZE + index * 4;
            out[loc_at..loc_at + 4].copy_from_slice(&location.to_bytes());
            out[ts_at..ts_at + 4].copy_from_slice(&slot.timestamp.to_bytes());
            out.extend_from_slice(slot.chunk.as_bytes());

            offset += sectors as u32;
        }
        out
    }
}

impl fmt::Display for RegionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sectors: usize = self.chunks().map(|(_, c)| c.sectors()).sum();
        write!(f, "{} chunks in {} sectors", self.len(), sectors)
    }
}

fn read4(data: &[u8], at: usize) -> [u8; 4] {
    [data[at], data[at + 1], data[at + 2], data[at + 3]]
}

/// Region coordinates parsed from a `r.<x>.<z>.mca` file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionPosition {
    pub x: i32,
    pub z: i32,
}

impl RegionPosition {
    pub fn from_file_name(name: &str) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidRegionName(name.to_string());
        let mut parts = name.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("r"), Some(x), Some(z), Some("mca"), None) => Ok(Self {
                x: x.parse().map_err(|_| invalid())?,
                z: z.parse().map_err(|_| invalid())?,
            }),
            _ => Err(invalid()),
        }
    }

    /// Absolute chunk coordinates of a slot index.
    pub fn chunk_coords(&self, index: usize) -> (i32, i32) {
        let local_x = (index % 32) as i32;
        let local_z = (index / 32) as i32;
        (self.x * 32 + local_x, self.z * 32 + local_z)
    }

    /// Slot index of an absolute chunk position.
    pub fn index_of(chunk_x: i32, chunk_z: i32) -> usize {
        ((chunk_x & 31) + (chunk_z & 31) * 32) as usize
    }
}

impl fmt::Display for RegionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r.{}.{}.mca", self.x, self.z)
    }
}
