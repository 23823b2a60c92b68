//! Read-only NBT scalar lookup
//!
//! Walks the binary tag tree just far enough to pull scalar fields out of
//! a chunk. Unneeded values are skipped structurally, so a field name that
//! also appears inside nested data cannot produce a false match.

use crate::domain::error::{DomainError, DomainResult};

const MAX_DEPTH: usize = 512;

/// NBT tag ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    End,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    ByteArray,
    String,
    List,
    Compound,
    IntArray,
    LongArray,
}

impl TagKind {
    pub fn from_id(id: u8) -> DomainResult<Self> {
        Ok(match id {
            0 => TagKind::End,
            1 => TagKind::Byte,
            2 => TagKind::Short,
            3 => TagKind::Int,
            4 => TagKind::Long,
            5 => TagKind::Float,
            6 => TagKind::Double,
            7 => TagKind::ByteArray,
            8 => TagKind::String,
            9 => TagKind::List,
            10 => TagKind::Compound,
            11 => TagKind::IntArray,
            12 => TagKind::LongArray,
            other => return Err(DomainError::nbt(format!("unknown tag id {}", other))),
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Encoded size of a numeric tag's payload.
    fn fixed_width(self) -> Option<usize> {
        match self {
            TagKind::Byte => Some(1),
            TagKind::Short => Some(2),
            TagKind::Int | TagKind::Float => Some(4),
            TagKind::Long | TagKind::Double => Some(8),
            _ => None,
        }
    }
}

/// A numeric tag value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NbtScalar {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl NbtScalar {
    /// Integer value, widened; `None` for floating point tags.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            NbtScalar::Byte(v) => Some(v as i64),
            NbtScalar::Short(v) => Some(v as i64),
            NbtScalar::Int(v) => Some(v as i64),
            NbtScalar::Long(v) => Some(v),
            NbtScalar::Float(_) | NbtScalar::Double(_) => None,
        }
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> DomainResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                DomainError::nbt(format!(
                    "need {} bytes at offset {}, only {} left",
                    n,
                    self.pos,
                    self.data.len().saturating_sub(self.pos)
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> DomainResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> DomainResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> DomainResult<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn len_i32(&mut self) -> DomainResult<usize> {
        let len = i32::from_be_bytes(self.array()?);
        usize::try_from(len).map_err(|_| DomainError::nbt(format!("negative length {}", len)))
    }

    fn name(&mut self) -> DomainResult<&'a [u8]> {
        let len = self.u16()? as usize;
        self.take(len)
    }

    fn scalar(&mut self, kind: TagKind) -> DomainResult<Option<NbtScalar>> {
        Ok(Some(match kind {
            TagKind::Byte => NbtScalar::Byte(self.u8()? as i8),
            TagKind::Short => NbtScalar::Short(i16::from_be_bytes(self.array()?)),
            TagKind::Int => NbtScalar::Int(i32::from_be_bytes(self.array()?)),
            TagKind::Long => NbtScalar::Long(i64::from_be_bytes(self.array()?)),
            TagKind::Float => NbtScalar::Float(f32::from_be_bytes(self.array()?)),
            TagKind::Double => NbtScalar::Double(f64::from_be_bytes(self.array()?)),
            _ => return Ok(None),
        }))
    }

    /// Skip one value of type `kind`.
    ///
    /// Nested lists and compounds are walked with an explicit stack, so
    /// hostile nesting hits `MAX_DEPTH` instead of the thread's stack.
    fn skip(&mut self, kind: TagKind) -> DomainResult<()> {
        let mut stack = Vec::new();
        self.open(kind, &mut stack)?;
        while let Some(top) = stack.last_mut() {
            let next = match top {
                Frame::Compound => {
                    let tag = TagKind::from_id(self.u8()?)?;
                    if tag != TagKind::End {
                        self.name()?;
                    }
                    tag
                }
                Frame::List { element, remaining } => {
                    if *remaining == 0 {
                        TagKind::End
                    } else {
                        *remaining -= 1;
                        *element
                    }
                }
            };
            if next == TagKind::End {
                stack.pop();
            } else {
                self.open(next, &mut stack)?;
            }
        }
        Ok(())
    }

    /// Consume a leaf value, or push a frame for a container.
    fn open(&mut self, kind: TagKind, stack: &mut Vec<Frame>) -> DomainResult<()> {
        match kind {
            TagKind::End => {}
            TagKind::ByteArray => {
                let n = self.len_i32()?;
                self.take(n)?;
            }
            TagKind::IntArray => {
                let n = self.len_i32()?;
                self.take(n.saturating_mul(4))?;
            }
            TagKind::LongArray => {
                let n = self.len_i32()?;
                self.take(n.saturating_mul(8))?;
            }
            TagKind::String => {
                self.name()?;
            }
            TagKind::List => {
                let element = TagKind::from_id(self.u8()?)?;
                let n = self.len_i32()?;
                if let Some(width) = element.fixed_width() {
                    self.take(n.saturating_mul(width))?;
                } else if element == TagKind::End {
                    if n > 0 {
                        return Err(DomainError::nbt(format!(
                            "list of {} end tags",
                            n
                        )));
                    }
                } else if n > 0 {
                    push(stack, Frame::List { element, remaining: n })?;
                }
            }
            TagKind::Compound => push(stack, Frame::Compound)?,
            scalar => {
                // fixed_width is Some for every remaining kind
                self.take(scalar.fixed_width().unwrap_or(0))?;
            }
        }
        Ok(())
    }

    /// Search the current compound for `path`, consuming up to the match.
    fn find(&mut self, path: &[&str], depth: usize) -> DomainResult<Option<NbtScalar>> {
        if depth > MAX_DEPTH {
            return Err(DomainError::nbt("nesting too deep"));
        }
        let Some((head, rest)) = path.split_first() else {
            return Ok(None);
        };
        loop {
            let tag = TagKind::from_id(self.u8()?)?;
            if tag == TagKind::End {
                return Ok(None);
            }
            let name = self.name()?;
            if name != head.as_bytes() {
                self.skip(tag)?;
                continue;
            }
            return match (rest.is_empty(), tag) {
                (true, _) => self.scalar(tag),
                (false, TagKind::Compound) => self.find(rest, depth + 1),
                (false, _) => Ok(None),
            };
        }
    }
}

/// Open container while skipping.
enum Frame {
    Compound,
    List { element: TagKind, remaining: usize },
}

fn push(stack: &mut Vec<Frame>, frame: Frame) -> DomainResult<()> {
    if stack.len() >= MAX_DEPTH {
        return Err(DomainError::nbt("nesting too deep"));
    }
    stack.push(frame);
    Ok(())
}

/// Look up a scalar by path of compound keys, starting below the root tag.
///
/// Returns `Ok(None)` if the path is absent or ends on a non-scalar tag.
pub fn find_scalar(data: &[u8], path: &[&str]) -> DomainResult<Option<NbtScalar>> {
    let mut reader = Reader::new(data);
    let root = TagKind::from_id(reader.u8()?)?;
    if root != TagKind::Compound {
        return Err(DomainError::nbt(format!(
            "root tag must be a compound, found {:?}",
            root
        )));
    }
    reader.name()?;
    reader.find(path, 0)
}

/// Fields of a chunk relevant to trimming decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkSummary {
    /// Cumulative ticks players have spent in the chunk.
    pub inhabited_time: Option<i64>,
    pub x_pos: Option<i32>,
    pub z_pos: Option<i32>,
}

impl ChunkSummary {
    /// Read from decompressed chunk NBT.
    ///
    /// Fields are looked up at the root first (1.18+) and then inside the
    /// legacy `Level` compound.
    pub fn read(data: &[u8]) -> DomainResult<Self> {
        let lookup = |name: &str| -> DomainResult<Option<i64>> {
            if let Some(v) = find_scalar(data, &[name])? {
                return Ok(v.as_i64());
            }
            Ok(find_scalar(data, &["Level", name])?.and_then(|v| v.as_i64()))
        };
        Ok(Self {
            inhabited_time: lookup("InhabitedTime")?,
            x_pos: lookup("xPos")?.and_then(|v| i32::try_from(v).ok()),
            z_pos: lookup("zPos")?.and_then(|v| i32::try_from(v).ok()),
        })
    }
}
