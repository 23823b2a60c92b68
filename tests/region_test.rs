//! Tests for region container parsing, compaction and chunk selection

use rstest::rstest;

use mctrimmer::domain::format::{ChunkLocation, HEADER_SIZE, SECTOR_SIZE};
use mctrimmer::domain::{ChunkSummary, Criterion, DomainError, RegionFile, RegionPosition, Timestamp};
use mctrimmer::util::testing::{chunk_nbt, region_with, NbtWriter, RegionBuilder};

fn location(data: &[u8], index: usize) -> ChunkLocation {
    let at = index * 4;
    ChunkLocation::from_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn trim(region: &mut RegionFile, criterion: Criterion) -> Vec<usize> {
    region.retain(|_, chunk| {
        let summary = chunk
            .decompress()
            .and_then(|nbt| ChunkSummary::read(&nbt))
            .unwrap();
        !criterion.matches(&summary)
    })
}

#[test]
fn given_fragmented_file_when_compacting_then_chunks_follow_original_order() {
    // Arrange: slot 5 is stored before slot 2, with unused sectors in between
    let data = RegionBuilder::new()
        .gap(3)
        .chunk(5, chunk_nbt(5, 0, 0), 11)
        .gap(2)
        .chunk(2, chunk_nbt(2, 0, 90_000), 22)
        .chunk(9, chunk_nbt(9, 0, 90_000), 33)
        .build();
    let mut region = RegionFile::parse(&data).unwrap();

    // Act
    let removed = trim(&mut region, Criterion::InhabitedUnder1m);
    let out = region.to_bytes();

    // Assert
    assert_eq!(removed, vec![5]);
    assert_eq!(out.len(), HEADER_SIZE + 2 * SECTOR_SIZE);
    assert_eq!(location(&out, 5), ChunkLocation::EMPTY);
    assert_eq!(location(&out, 2), ChunkLocation::new(2, 1));
    assert_eq!(location(&out, 9), ChunkLocation::new(3, 1));

    let reparsed = RegionFile::parse(&out).unwrap();
    assert_eq!(reparsed.timestamp(2), Some(Timestamp(22)));
    assert_eq!(reparsed.timestamp(9), Some(Timestamp(33)));
    assert_eq!(reparsed.timestamp(5), None);
    assert_eq!(reparsed.chunk(2), region.chunk(2));
}

#[rstest]
#[case(Criterion::InhabitedUnder1m, vec![0, 1])]
#[case(Criterion::InhabitedUnder5m, vec![0, 1, 2, 3])]
#[case(Criterion::InhabitedUnder10m, vec![0, 1, 2, 3, 4, 5])]
fn given_threshold_chunks_when_trimming_then_bound_is_inclusive(
    #[case] criterion: Criterion,
    #[case] expected: Vec<usize>,
) {
    let data = region_with(&[
        (0, 0),
        (1, 1200),
        (2, 1201),
        (3, 6000),
        (4, 6001),
        (5, 12_000),
        (6, 12_001),
    ]);
    let mut region = RegionFile::parse(&data).unwrap();

    let removed = trim(&mut region, criterion);

    assert_eq!(removed, expected);
    assert!(region.chunk(6).is_some());
}

#[test]
fn given_legacy_chunk_when_trimming_then_level_inhabited_time_is_used() {
    let mut legacy = NbtWriter::root();
    legacy.int("DataVersion", 1343);
    legacy.begin_compound("Level");
    legacy.int("xPos", 0).int("zPos", 0).long("InhabitedTime", 30);
    legacy.end();
    let data = RegionBuilder::new().chunk(0, legacy.finish(), 1).build();
    let mut region = RegionFile::parse(&data).unwrap();

    let removed = trim(&mut region, Criterion::InhabitedUnder1m);

    assert_eq!(removed, vec![0]);
    assert!(region.is_empty());
}

#[test]
fn given_chunk_without_inhabited_time_when_trimming_then_kept() {
    let mut nbt = NbtWriter::root();
    nbt.int("xPos", 0).int("zPos", 0);
    let data = RegionBuilder::new().chunk(0, nbt.finish(), 1).build();
    let mut region = RegionFile::parse(&data).unwrap();

    assert!(trim(&mut region, Criterion::InhabitedUnder10m).is_empty());
}

#[test]
fn given_location_past_end_of_file_when_parsing_then_truncated() {
    let mut data = region_with(&[(0, 0)]);
    data[..4].copy_from_slice(&ChunkLocation::new(40, 1).to_bytes());

    let result = RegionFile::parse(&data);

    assert!(matches!(result, Err(DomainError::Truncated { .. })));
}

#[test]
fn given_chunk_positions_when_mapping_indices_then_match_region_name() {
    let position = RegionPosition::from_file_name("r.-1.2.mca").unwrap();
    let data = region_with(&[(33, 0)]);
    let region = RegionFile::parse(&data).unwrap();
    let (_, chunk) = region.chunks().next().unwrap();
    let summary = ChunkSummary::read(&chunk.decompress().unwrap()).unwrap();

    // fixture writes local coordinates: index 33 is (1, 1)
    assert_eq!((summary.x_pos, summary.z_pos), (Some(1), Some(1)));
    assert_eq!(position.chunk_coords(33), (-31, 65));
    assert_eq!(RegionPosition::index_of(-31, 65), 33);
}
