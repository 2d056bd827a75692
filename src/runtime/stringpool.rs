//! # String Pool
//!
//! Append-only byte arena backing every string produced while a unit of work runs.
//!
//! Strings are addressed through [`MStr`] handles (region + offset + length) rather than raw
//! addresses, so growing the arena by reallocate-and-copy never invalidates a live value.
//! A pool is versioned by *generation*: [`StringPool::reset`] drops every pool string at once,
//! and handles minted by an older generation resolve to [`Error::StaleString`].
//!
//! ```text
//! literals:  [ "abc" | "," | ... ]            never reset, outside the pool extent
//! pool:      [ used bytes ......... | free ]   base ≤ handle ranges < free ≤ capacity
//! side table [ root₀, root₁, ... ]             descriptors to fix up during compaction
//! ```
//!
//! The side table (`stp_array` in older runtimes) is grown separately from the byte arena:
//! see [`SideTable::expand`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::runtime::value::Mval;

/// Longest string any operation may produce (1 MiB)
pub const MAX_STRLEN: usize = 1 << 20;

/// Increment used when doubling the side table would overflow its capacity type
pub const SIDE_TABLE_FALLBACK_INCREMENT: u64 = i32::MAX as u64;

/// Where the bytes of a string live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Inside the pool, valid for one generation
    Pool {
        /// Generation the handle was minted in
        generation: u32,
    },
    /// Static literal storage outside the pool extent
    Literal,
}

/// String descriptor: a stable handle to a byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MStr {
    region: Region,
    offset: u32,
    len: u32,
}

impl MStr {
    /// The empty string. Every empty string is interchangeable with this one.
    pub const EMPTY: MStr = MStr {
        region: Region::Literal,
        offset: 0,
        len: 0,
    };

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True for the empty string
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Region holding the bytes
    pub fn region(&self) -> Region {
        self.region
    }

    /// Byte offset inside the region
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    /// True when both descriptors name the very same bytes (same "address")
    pub fn same_range(&self, other: &MStr) -> bool {
        self.region == other.region && self.offset == other.offset && self.len == other.len
    }

    pub(crate) fn is_pool(&self) -> bool {
        matches!(self.region, Region::Pool { .. })
    }
}

/// Growth policy of the side table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GrowthPolicy {
    /// Double the capacity; fall back to a fixed increment if doubling would overflow
    #[default]
    Doubling,
    /// Add a fixed number of slots every time
    FixedIncrement(u64),
}

/// String pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Initial byte capacity of the pool
    pub initial_capacity: usize,
    /// Hard ceiling on the pool's byte capacity
    pub max_capacity: usize,
    /// Initial number of side-table slots
    pub side_table_initial: u64,
    /// How the side table grows
    pub side_table_growth: GrowthPolicy,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            initial_capacity: 64 * 1024,
            max_capacity: 1 << 30,
            side_table_initial: 64,
            side_table_growth: GrowthPolicy::Doubling,
        }
    }
}

impl PoolOptions {
    /// Load options from a JSON document; missing fields keep their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Side table of string descriptors awaiting relocation fix-up
///
/// Entries are indices into the root set handed to [`StringPool::compact`]. Capacity is
/// managed by hand: when every slot is used, [`SideTable::expand`] allocates a strictly larger
/// array, bulk-copies the old entries in order and releases the old array.
#[derive(Debug, Clone)]
pub struct SideTable {
    entries: Vec<u32>,
    capacity: u64,
    policy: GrowthPolicy,
    expansions: u32,
}

impl SideTable {
    /// Create a side table with `capacity` slots
    pub fn new(capacity: u64, policy: GrowthPolicy) -> Result<Self> {
        let capacity = capacity.max(1);
        let entries = allocate_slots(capacity)?;
        Ok(Self {
            entries,
            capacity,
            policy,
            expansions: 0,
        })
    }

    /// Number of slots in use
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no slot is in use
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of slots available before the next expansion
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// How many times the table has been expanded
    pub fn expansions(&self) -> u32 {
        self.expansions
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Record a descriptor, expanding the table when it is full
    pub fn push(&mut self, root: u32) -> Result<()> {
        if self.entries.len() as u64 >= self.capacity {
            self.expand()?;
        }
        self.entries.push(root);
        Ok(())
    }

    /// Drop every entry; capacity is kept
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Grow to a strictly larger capacity, preserving entry order and content
    ///
    /// Failure to allocate is [`Error::ResourceExhaustion`], which is fatal.
    pub fn expand(&mut self) -> Result<()> {
        let old = self.capacity;
        let grown = match self.policy {
            GrowthPolicy::Doubling if old < SIDE_TABLE_FALLBACK_INCREMENT => old.checked_mul(2),
            GrowthPolicy::Doubling => old.checked_add(SIDE_TABLE_FALLBACK_INCREMENT),
            GrowthPolicy::FixedIncrement(step) => old.checked_add(step.max(1)),
        };
        let capacity = grown.ok_or(Error::ResourceExhaustion {
            what: "string side table",
            requested: usize::MAX,
        })?;
        debug_assert!(capacity > old, "side table must grow");

        let mut entries = allocate_slots(capacity)?;
        entries.extend_from_slice(&self.entries);
        self.entries = entries;
        self.capacity = capacity;
        self.expansions += 1;
        tracing::debug!(from = old, to = capacity, "expanded string side table");
        Ok(())
    }
}

fn allocate_slots(capacity: u64) -> Result<Vec<u32>> {
    let exhausted = || Error::ResourceExhaustion {
        what: "string side table",
        requested: usize::try_from(capacity)
            .unwrap_or(usize::MAX)
            .saturating_mul(std::mem::size_of::<u32>()),
    };
    let slots = usize::try_from(capacity).map_err(|_| exhausted())?;
    let mut entries = Vec::new();
    entries.try_reserve_exact(slots).map_err(|_| exhausted())?;
    Ok(entries)
}

/// The string arena
#[derive(Debug, Clone)]
pub struct StringPool {
    /// Pool bytes; `buf.len()` is the free pointer
    buf: Vec<u8>,
    /// Logical capacity of the current allocation
    capacity: usize,
    /// Literal storage, never reset
    literals: Vec<u8>,
    generation: u32,
    side_table: SideTable,
    options: PoolOptions,
    growths: u32,
}

impl StringPool {
    /// Create a pool with the given options
    pub fn new(options: PoolOptions) -> Result<Self> {
        let capacity = options.initial_capacity.min(options.max_capacity).max(1);
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| Error::ResourceExhaustion {
                what: "string pool",
                requested: capacity,
            })?;
        let side_table = SideTable::new(options.side_table_initial, options.side_table_growth)?;
        Ok(Self {
            buf,
            capacity,
            literals: Vec::new(),
            generation: 0,
            side_table,
            options,
            growths: 0,
        })
    }

    /// Bytes in use
    pub fn free(&self) -> usize {
        self.buf.len()
    }

    /// Current byte capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current generation
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of reallocations performed so far
    pub fn growths(&self) -> u32 {
        self.growths
    }

    /// The relocation side table
    pub fn side_table(&self) -> &SideTable {
        &self.side_table
    }

    /// Options the pool was created with
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Make sure `n` more bytes fit, reallocating (and copying) if needed
    pub fn ensure_free_space(&mut self, n: usize) -> Result<()> {
        let needed = self.buf.len().checked_add(n).ok_or(Error::ResourceExhaustion {
            what: "string pool",
            requested: usize::MAX,
        })?;
        if needed <= self.capacity {
            return Ok(());
        }
        if needed > self.options.max_capacity {
            return Err(Error::ResourceExhaustion {
                what: "string pool",
                requested: needed,
            });
        }
        let capacity = self
            .capacity
            .saturating_mul(2)
            .max(needed)
            .min(self.options.max_capacity);

        let mut next = Vec::new();
        next.try_reserve_exact(capacity)
            .map_err(|_| Error::ResourceExhaustion {
                what: "string pool",
                requested: capacity,
            })?;
        next.extend_from_slice(&self.buf);
        self.buf = next;
        tracing::debug!(from = self.capacity, to = capacity, used = self.buf.len(), "grew string pool");
        self.capacity = capacity;
        self.growths += 1;
        Ok(())
    }

    /// Copy `bytes` into the pool
    pub fn alloc(&mut self, bytes: &[u8]) -> Result<MStr> {
        if bytes.is_empty() {
            return Ok(MStr::EMPTY);
        }
        self.check_len(bytes.len())?;
        self.ensure_free_space(bytes.len())?;
        let offset = self.buf.len();
        self.buf.extend_from_slice(bytes);
        Ok(self.pool_handle(offset, bytes.len()))
    }

    /// Allocate `pad` spaces followed by the bytes of `src`
    pub fn alloc_padded(&mut self, pad: usize, src: &MStr) -> Result<MStr> {
        let size = pad + src.len();
        if size == 0 {
            return Ok(MStr::EMPTY);
        }
        self.check_len(size)?;
        self.check_live(src)?;
        self.ensure_free_space(size)?;
        let offset = self.buf.len();
        self.buf.resize(offset + pad, b' ');
        let range = src.offset()..src.offset() + src.len();
        match src.region {
            Region::Pool { .. } => self.buf.extend_from_within(range),
            Region::Literal => self.buf.extend_from_slice(&self.literals[range]),
        }
        Ok(self.pool_handle(offset, size))
    }

    /// Concatenate two strings into a new pool string
    pub fn concat(&mut self, a: &MStr, b: &MStr) -> Result<MStr> {
        let mut joined = Vec::with_capacity(a.len() + b.len());
        joined.extend_from_slice(self.bytes(a)?);
        joined.extend_from_slice(self.bytes(b)?);
        self.alloc(&joined)
    }

    /// Store `bytes` in literal storage; the handle survives [`StringPool::reset`]
    pub fn literal(&mut self, bytes: &[u8]) -> Result<MStr> {
        if bytes.is_empty() {
            return Ok(MStr::EMPTY);
        }
        self.check_len(bytes.len())?;
        let offset = u32::try_from(self.literals.len()).map_err(|_| Error::ResourceExhaustion {
            what: "literal storage",
            requested: self.literals.len() + bytes.len(),
        })?;
        self.literals.extend_from_slice(bytes);
        Ok(MStr {
            region: Region::Literal,
            offset,
            len: bytes.len() as u32,
        })
    }

    /// Resolve a handle to its bytes
    pub fn bytes(&self, s: &MStr) -> Result<&[u8]> {
        if s.is_empty() {
            return Ok(&[]);
        }
        self.check_live(s)?;
        let range = s.offset()..s.offset() + s.len();
        let bytes = match s.region {
            Region::Pool { .. } => self.buf.get(range),
            Region::Literal => self.literals.get(range),
        };
        bytes.ok_or(Error::StaleString {
            handle: self.generation,
            current: self.generation,
        })
    }

    /// True when the handle still resolves
    pub fn is_live(&self, s: &MStr) -> bool {
        self.check_live(s).is_ok()
    }

    /// Drop every pool string and start a new generation
    pub fn reset(&mut self) {
        tracing::debug!(generation = self.generation, used = self.buf.len(), "resetting string pool");
        self.buf.clear();
        self.side_table.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Grow the relocation side table (the `stp_expand_array` entry point)
    pub fn grow_string_side_table(&mut self) -> Result<()> {
        self.side_table.expand()
    }

    /// Compact the pool so it holds only strings reachable from `roots`
    ///
    /// Every root's pool descriptor is registered in the side table, the table is ordered by
    /// offset, and overlapping or adjacent ranges are moved down together so shared substrings
    /// stay shared. Compaction starts a new generation: surviving roots are restamped, and any
    /// other pool handle resolves to [`Error::StaleString`]. Returns the number of bytes reclaimed.
    pub fn compact(&mut self, roots: &mut [&mut Mval]) -> Result<usize> {
        self.side_table.clear();
        for (i, root) in roots.iter().enumerate() {
            let tracked = root
                .pool_str()
                .is_some_and(|s| !s.is_empty() && self.check_live(&s).is_ok());
            if tracked {
                let index = u32::try_from(i).map_err(|_| Error::ResourceExhaustion {
                    what: "string side table",
                    requested: i,
                })?;
                self.side_table.push(index)?;
            }
        }

        let mut order: Vec<(usize, usize, usize)> = Vec::with_capacity(self.side_table.len());
        for &i in self.side_table.entries() {
            if let Some(s) = roots[i as usize].pool_str() {
                order.push((s.offset(), s.len(), i as usize));
            }
        }
        order.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut next = Vec::new();
        next.try_reserve_exact(self.capacity)
            .map_err(|_| Error::ResourceExhaustion {
                what: "string pool",
                requested: self.capacity,
            })?;

        let generation = self.generation.wrapping_add(1);
        // (old start, old end, new start) of the block being gathered
        let mut block: Option<(usize, usize, usize)> = None;
        for (offset, len, root) in order {
            let (start, end, base) = match block {
                Some((start, end, base)) if offset <= end => (start, end.max(offset + len), base),
                previous => {
                    if let Some((start, end, _)) = previous {
                        next.extend_from_slice(&self.buf[start..end]);
                    }
                    (offset, offset + len, next.len())
                }
            };
            block = Some((start, end, base));
            if let Some(s) = roots[root].pool_str_mut() {
                s.offset = (base + (offset - start)) as u32;
                s.region = Region::Pool { generation };
            }
        }
        if let Some((start, end, _)) = block {
            next.extend_from_slice(&self.buf[start..end]);
        }

        let reclaimed = self.buf.len() - next.len();
        tracing::debug!(
            live = self.side_table.len(),
            reclaimed,
            generation,
            "compacted string pool"
        );
        self.buf = next;
        self.generation = generation;
        Ok(reclaimed)
    }

    fn pool_handle(&self, offset: usize, len: usize) -> MStr {
        MStr {
            region: Region::Pool {
                generation: self.generation,
            },
            offset: offset as u32,
            len: len as u32,
        }
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len > MAX_STRLEN {
            return Err(Error::MaxStringLength {
                requested: len,
                limit: MAX_STRLEN,
            });
        }
        Ok(())
    }

    fn check_live(&self, s: &MStr) -> Result<()> {
        match s.region {
            Region::Pool { generation } if generation != self.generation => Err(Error::StaleString {
                handle: generation,
                current: self.generation,
            }),
            Region::Pool { .. } if s.offset() + s.len() > self.buf.len() => Err(Error::StaleString {
                handle: self.generation,
                current: self.generation,
            }),
            _ => Ok(()),
        }
    }
}
