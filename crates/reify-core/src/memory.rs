//! The memory-reader seam and an in-memory image implementation.
//!
//! The reader abstracts over how bytes of the inspected process are
//! obtained: ptrace, a core dump, a crash-report snapshot, or — for tests —
//! an [`MemoryImage`] assembled in this process. Read failures are ordinary
//! `anyhow` errors here; the engine converts them into latched
//! [`Memory`](reify_types::Failure::Memory) failures with the faulting
//! address attached.

use anyhow::{bail, Context, Result};
use reify_types::RemoteAddress;
use std::collections::BTreeMap;

/// Longest NUL-terminated string [`MemoryReader::read_string`] will chase
/// before giving up. Mangled names are short; anything longer is corrupt.
const MAX_STRING_LEN: usize = 4096;

/// Byte-level access to the inspected address space.
///
/// The handle is shared (the transport may be used elsewhere concurrently),
/// so implementations take `&self` and must be `Send + Sync`. Liveness of a
/// read that never returns is owed by the transport, not modeled here.
pub trait MemoryReader: Send + Sync {
    /// Read exactly `len` bytes starting at `address`.
    fn read_bytes(&self, address: RemoteAddress, len: usize) -> Result<Vec<u8>>;

    /// Read a NUL-terminated UTF-8 string starting at `address`, without the
    /// terminator.
    fn read_string(&self, address: RemoteAddress) -> Result<String> {
        let mut collected = Vec::new();
        while collected.len() < MAX_STRING_LEN {
            let chunk = self.read_bytes(address.offset(collected.len() as u64), 32)?;
            if let Some(nul) = chunk.iter().position(|&b| b == 0) {
                collected.extend_from_slice(&chunk[..nul]);
                return String::from_utf8(collected).context("string is not valid UTF-8");
            }
            collected.extend_from_slice(&chunk);
        }
        bail!("unterminated string at {address}")
    }
}

/// An in-memory address space: disjoint segments of bytes at fixed
/// addresses.
///
/// Useful for tests and for inspecting captured snapshots. Reads that cross
/// a segment boundary or touch unmapped addresses fail.
#[derive(Debug, Default)]
pub struct MemoryImage {
    segments: BTreeMap<u64, Vec<u8>>,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `bytes` at `address`. Overlap with an existing segment is the
    /// caller's bug and is not detected.
    pub fn map(&mut self, address: RemoteAddress, bytes: Vec<u8>) {
        self.segments.insert(address.0, bytes);
    }
}

impl MemoryReader for MemoryImage {
    fn read_bytes(&self, address: RemoteAddress, len: usize) -> Result<Vec<u8>> {
        let (&base, segment) = self
            .segments
            .range(..=address.0)
            .next_back()
            .with_context(|| format!("unmapped address {address}"))?;
        let start = (address.0 - base) as usize;
        let end = start.checked_add(len).context("read length overflow")?;
        if end > segment.len() {
            bail!("read of {len} bytes at {address} runs past the segment");
        }
        Ok(segment[start..end].to_vec())
    }
}
