//! Shared test setup and world-data fixtures

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use flate2::write::ZlibEncoder;
use flate2::Compression as ZlibLevel;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::format::{
    sectors_for, ChunkLocation, Compression, Timestamp, CHUNKS_PER_REGION, FIRST_DATA_SECTOR,
    HEADER_SIZE, LOCATION_TABLE_SIZE, SECTOR_SIZE,
};
use crate::domain::nbt::TagKind;
use crate::domain::Chunk;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    let noisy_modules = [""];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| !name.is_empty() && metadata.target().starts_with(name))
    });

    let env_filter = match env::var("RUST_LOG") {
        Ok(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        Err(_) => EnvFilter::new("trace"),
    };

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Zlib-compress bytes the way the game does for chunk payloads.
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), ZlibLevel::default());
    encoder.write_all(data).expect("write to zlib encoder");
    encoder.finish().expect("finish zlib stream")
}

/// Minimal NBT writer for building fixtures.
///
/// Starts inside an unnamed root compound; `finish` closes it.
pub struct NbtWriter {
    buf: Vec<u8>,
}

impl NbtWriter {
    pub fn root() -> Self {
        let mut w = Self { buf: Vec::new() };
        w.header(TagKind::Compound, "");
        w
    }

    fn header(&mut self, kind: TagKind, name: &str) {
        self.buf.push(kind.id());
        self.buf
            .extend_from_slice(&(name.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(name.as_bytes());
    }

    pub fn byte(&mut self, name: &str, v: i8) -> &mut Self {
        self.header(TagKind::Byte, name);
        self.buf.push(v as u8);
        self
    }

    pub fn int(&mut self, name: &str, v: i32) -> &mut Self {
        self.header(TagKind::Int, name);
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn long(&mut self, name: &str, v: i64) -> &mut Self {
        self.header(TagKind::Long, name);
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn string(&mut self, name: &str, v: &str) -> &mut Self {
        self.header(TagKind::String, name);
        self.buf.extend_from_slice(&(v.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(v.as_bytes());
        self
    }

    pub fn byte_array(&mut self, name: &str, v: &[u8]) -> &mut Self {
        self.header(TagKind::ByteArray, name);
        self.buf.extend_from_slice(&(v.len() as i32).to_be_bytes());
        self.buf.extend_from_slice(v);
        self
    }

    pub fn long_array(&mut self, name: &str, v: &[i64]) -> &mut Self {
        self.header(TagKind::LongArray, name);
        self.buf.extend_from_slice(&(v.len() as i32).to_be_bytes());
        for x in v {
            self.buf.extend_from_slice(&x.to_be_bytes());
        }
        self
    }

    pub fn begin_compound(&mut self, name: &str) -> &mut Self {
        self.header(TagKind::Compound, name);
        self
    }

    /// Opens a list of `len` compounds; close each element with `end`.
    pub fn begin_list_of_compounds(&mut self, name: &str, len: i32) -> &mut Self {
        self.header(TagKind::List, name);
        self.buf.push(TagKind::Compound.id());
        self.buf.extend_from_slice(&len.to_be_bytes());
        self
    }

    pub fn end(&mut self) -> &mut Self {
        self.buf.push(TagKind::End.id());
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.end();
        self.buf
    }
}

/// NBT of a 1.18+ style chunk with position and inhabited time.
pub fn chunk_nbt(x: i32, z: i32, inhabited_time: i64) -> Vec<u8> {
    let mut w = NbtWriter::root();
    w.int("DataVersion", 3465)
        .int("xPos", x)
        .int("yPos", -4)
        .int("zPos", z)
        .string("Status", "minecraft:full")
        .long("LastUpdate", 81234);
    w.begin_list_of_compounds("sections", 1)
        .byte("Y", -4)
        .long_array("BlockStates", &[0, 1, 2, 3])
        .end();
    w.long("InhabitedTime", inhabited_time);
    w.finish()
}

/// Builds container bytes with chunks laid out in call order.
pub struct RegionBuilder {
    locations: Vec<ChunkLocation>,
    timestamps: Vec<Timestamp>,
    body: Vec<u8>,
    next_sector: u32,
}

impl Default for RegionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self {
            locations: vec![ChunkLocation::EMPTY; CHUNKS_PER_REGION],
            timestamps: vec![Timestamp::default(); CHUNKS_PER_REGION],
            body: Vec::new(),
            next_sector: FIRST_DATA_SECTOR,
        }
    }

    /// Add a zlib-compressed chunk built from raw NBT.
    pub fn chunk(self, index: usize, nbt: Vec<u8>, timestamp: u32) -> Self {
        let chunk = Chunk::from_payload(Compression::Zlib, &zlib(&nbt));
        self.raw_chunk(index, chunk.as_bytes(), timestamp)
    }

    /// Add pre-encoded chunk sectors (header included).
    pub fn raw_chunk(mut self, index: usize, bytes: &[u8], timestamp: u32) -> Self {
        let sectors = sectors_for(bytes.len());
        self.locations[index] = ChunkLocation::new(self.next_sector, sectors as u8);
        self.timestamps[index] = Timestamp(timestamp);
        self.body.extend_from_slice(bytes);
        self.body.resize(self.body.len() + (sectors * SECTOR_SIZE - bytes.len()), 0);
        self.next_sector += sectors as u32;
        self
    }

    /// Leave `sectors` unused sectors before the next chunk.
    pub fn gap(mut self, sectors: usize) -> Self {
        self.body.resize(self.body.len() + sectors * SECTOR_SIZE, 0);
        self.next_sector += sectors as u32;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE];
        for i in 0..CHUNKS_PER_REGION {
            out[i * 4..i * 4 + 4].copy_from_slice(&self.locations[i].to_bytes());
            let ts = LOCATION_TABLE_SIZE + i * 4;
            out[ts..ts + 4].copy_from_slice(&self.timestamps[i].to_bytes());
        }
        out.extend_from_slice(&self.body);
        out
    }
}

/// Container with one chunk per `(index, inhabited_time)` pair.
pub fn region_with(chunks: &[(usize, i64)]) -> Vec<u8> {
    chunks
        .iter()
        .fold(RegionBuilder::new(), |b, &(index, ticks)| {
            let x = (index % 32) as i32;
            let z = (index / 32) as i32;
            b.chunk(index, chunk_nbt(x, z, ticks), 1_700_000_000 + index as u32)
        })
        .build()
}

/// Real filesystem that fails reads or writes below a named directory.
///
/// A path matches when one of its components equals the configured name,
/// e.g. `"poi"` hits every file in a dimension's `poi/` folder.
#[derive(Debug, Default)]
pub struct FaultyFileSystem {
    fail_reads_in: Option<&'static str>,
    fail_writes_in: Option<&'static str>,
    reads: AtomicUsize,
}

impl FaultyFileSystem {
    pub fn failing_reads_in(dir: &'static str) -> Self {
        Self {
            fail_reads_in: Some(dir),
            ..Default::default()
        }
    }

    pub fn failing_writes_in(dir: &'static str) -> Self {
        Self {
            fail_writes_in: Some(dir),
            ..Default::default()
        }
    }

    /// Number of `read` calls seen so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check(fault: Option<&'static str>, path: &Path) -> io::Result<()> {
        match fault {
            Some(dir) if path.components().any(|c| c.as_os_str() == dir) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("injected fault: {}", path.display()),
            )),
            _ => Ok(()),
        }
    }
}

impl FileSystem for FaultyFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Self::check(self.fail_reads_in, path)?;
        RealFileSystem.read(path)
    }

    fn write_atomic(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        Self::check(self.fail_writes_in, path)?;
        RealFileSystem.write_atomic(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        RealFileSystem.exists(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        RealFileSystem.is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        RealFileSystem.is_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        RealFileSystem.create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        Self::check(self.fail_writes_in, path)?;
        RealFileSystem.remove_file(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        Self::check(self.fail_reads_in, from)?;
        Self::check(self.fail_writes_in, to)?;
        RealFileSystem.copy(from, to)
    }

    fn list_files(&self, dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
        RealFileSystem.list_files(dir, extension)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        RealFileSystem.ensure_parent(path)
    }

    fn absolute(&self, path: &Path) -> io::Result<PathBuf> {
        RealFileSystem.absolute(path)
    }
}
