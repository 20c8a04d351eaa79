//! Shared fixtures for the remote-query integration tests: a small symbol
//! table and a builder for laying out metadata records in a `MemoryImage`.

use reify_core::engine::PointerWidth;
use reify_core::memory::MemoryImage;
use reify_types::decl::{DeclCategory, DeclId, DeclTable};
use reify_types::RemoteAddress;

pub const WIDTHS: [PointerWidth; 2] = [PointerWidth::Bits32, PointerWidth::Bits64];

/// Symbol table fixture: module `Lib` with a few declarations, plus the
/// foreign bridge module `__C`.
pub struct HostFixture {
    pub table: DeclTable,
    pub point: DeclId,
    pub boxed: DeclId,
    pub int: DeclId,
    pub display: DeclId,
}

pub fn host_fixture() -> HostFixture {
    let mut table = DeclTable::new();
    let lib = table.add_module("Lib");
    let point = table.add_nominal(DeclCategory::Struct, lib, "Point", 0);
    let boxed = table.add_nominal(DeclCategory::Struct, lib, "Box", 1);
    let int = table.add_nominal(DeclCategory::Struct, lib, "Int", 0);
    let bridge = table.add_module("__C");
    let display = table.add_nominal(DeclCategory::Class, bridge, "CADisplay", 0);
    HostFixture {
        table,
        point,
        boxed,
        int,
        display,
    }
}

/// Sequentially lays out records and strings at fixed addresses, one
/// segment per allocation so an over-long read fails instead of drifting
/// into a neighbor.
pub struct ImageBuilder {
    image: MemoryImage,
    width: PointerWidth,
    next: u64,
}

impl ImageBuilder {
    pub fn new(width: PointerWidth) -> Self {
        Self {
            image: MemoryImage::new(),
            width,
            next: 0x1000,
        }
    }

    /// Allocate a record of pointer-width words.
    pub fn words(&mut self, words: &[u64]) -> RemoteAddress {
        let mut bytes = Vec::new();
        for &word in words {
            match self.width {
                PointerWidth::Bits32 => {
                    assert!(word <= u64::from(u32::MAX), "word out of 32-bit range");
                    bytes.extend_from_slice(&(word as u32).to_le_bytes());
                }
                PointerWidth::Bits64 => bytes.extend_from_slice(&word.to_le_bytes()),
            }
        }
        self.alloc(bytes)
    }

    /// Allocate a NUL-terminated string, padded so chunked reads stay in
    /// the segment.
    pub fn string(&mut self, s: &str) -> RemoteAddress {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        while bytes.len() % 32 != 0 {
            bytes.push(0);
        }
        self.alloc(bytes)
    }

    /// A nominal type descriptor: mangled name pointer, then the generic
    /// parameter count.
    pub fn descriptor(&mut self, mangled: &str, params: u64) -> RemoteAddress {
        let name = self.string(mangled);
        self.words(&[name.0, params])
    }

    pub fn finish(self) -> MemoryImage {
        self.image
    }

    fn alloc(&mut self, bytes: Vec<u8>) -> RemoteAddress {
        let address = RemoteAddress(self.next);
        self.next += bytes.len() as u64;
        // Keep allocations apart on a cache-line boundary.
        self.next = (self.next + 0x3f) & !0x3f;
        self.image.map(address, bytes);
        address
    }
}
