//! End-to-end translation through hand-built systems.

mod common;

use std::cell::Cell;

use common::SparseMemory;
use xlat::{
    AddressSpace, Capabilities, ConfigError, Context, CustomTranslate, Error, ErrorKind,
    FullAddress, LookupEntry, Map, MapEntry, MemoryRead, Method, PagingForm, PteFormat,
    ReadCache, ReadError, Slot, SysMap, SysMethod, System,
};

fn whole(meth: SysMethod) -> Map {
    Map::from_entries(&[MapEntry::new(0, u64::MAX, Some(meth))]).unwrap()
}

/// A three-level table: root at 0x1000, entry 3 -> 0x2000, entry 5 -> frame 0x3000.
fn populated_tables() -> SparseMemory {
    let mut memory = SparseMemory::new();
    memory.put(FullAddress::kphys(0x1000 + 3 * 8), 0x2);
    memory.put(FullAddress::kphys(0x2000 + 5 * 8), 0x3);
    memory
}

fn pfn_system() -> System {
    let mut sys = System::new();
    sys.set_method(
        SysMethod::Pgt,
        Method::pgt(
            AddressSpace::KPhysAddr,
            FullAddress::kphys(0x1000),
            PagingForm::new(PteFormat::Pfn64, [9, 9, 12]).unwrap(),
        ),
    );
    sys.set_map(SysMap::KvPhys, whole(SysMethod::Pgt));
    sys
}

#[test]
fn page_table_walk() {
    let memory = populated_tables();
    let ctx = Context::new().with_memory(&memory);
    let sys = pfn_system();

    assert_eq!(
        sys.translate(&ctx, FullAddress::kv(0x60_5040), AddressSpace::KPhysAddr),
        Ok(FullAddress::kphys(0x3040))
    );
}

#[test]
fn cleared_intermediate_entry() {
    let mut memory = populated_tables();
    memory.put(FullAddress::kphys(0x1000 + 3 * 8), 0);
    let ctx = Context::new().with_memory(&memory);
    let sys = pfn_system();

    assert_eq!(
        sys.translate(&ctx, FullAddress::kv(0x60_5040), AddressSpace::KPhysAddr),
        Err(Error::InvalidEntry {
            level: 2,
            index: 3,
            pte: 0
        })
    );
}

#[test]
fn unreadable_table() {
    let memory = populated_tables().readable(Capabilities::MACHPHYS);
    let ctx = Context::new().with_memory(&memory);
    let sys = pfn_system();

    let err = sys
        .translate(&ctx, FullAddress::kv(0x60_5040), AddressSpace::KPhysAddr)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unconfigured);
}

#[test]
fn linear_wraps_around() {
    let ctx = Context::new();

    assert_eq!(
        Method::linear(AddressSpace::KPhysAddr, 1).apply(&ctx, None, FullAddress::kv(u64::MAX)),
        Ok(FullAddress::kphys(0))
    );
    assert_eq!(
        Method::linear(AddressSpace::KPhysAddr, -0x1000).apply(&ctx, None, FullAddress::kv(0x800)),
        Ok(FullAddress::kphys(0xFFFF_FFFF_FFFF_F800))
    );
    assert_eq!(
        Method::linear(AddressSpace::KPhysAddr, i64::MIN)
            .apply(&ctx, None, FullAddress::kv(0x8000_0000_0000_0000)),
        Ok(FullAddress::kphys(0))
    );
}

#[test]
fn lookup_boundaries() {
    let ctx = Context::new();
    let meth = Method::lookup(
        AddressSpace::MachPhysAddr,
        0xFFF,
        vec![
            LookupEntry {
                orig: 0x10_0000,
                dest: 0x7000,
            },
            LookupEntry {
                orig: 0x4000,
                dest: 0x9000,
            },
        ],
    );

    assert_eq!(
        meth.apply(&ctx, None, FullAddress::kphys(0x4FFF)),
        Ok(FullAddress::machphys(0x9FFF))
    );
    assert_eq!(
        meth.apply(&ctx, None, FullAddress::kphys(0x5000)),
        Err(Error::NotFound { addr: 0x5000 })
    );
    assert_eq!(
        meth.apply(&ctx, None, FullAddress::kphys(0x10_0123)),
        Ok(FullAddress::machphys(0x7123))
    );
    assert_eq!(
        meth.apply(&ctx, None, FullAddress::kphys(0x3FFF)),
        Err(Error::NotFound { addr: 0x3FFF })
    );
}

#[test]
fn overlapping_ranges_are_rejected() {
    assert_eq!(
        Map::from_entries(&[
            MapEntry::new(0, 0xFFF, Some(SysMethod::Pgt)),
            MapEntry::new(0, 0xFFF, Some(SysMethod::Direct)),
        ]),
        Err(ConfigError::Overlap {
            start: 0,
            end: 0xFFF
        })
    );
}

#[test]
fn ranges_select_methods() {
    let map = Map::from_entries(&[
        MapEntry::new(0, 0xFFF, Some(SysMethod::Pgt)),
        MapEntry::new(0x1000, 0x1FFF, Some(SysMethod::Direct)),
        MapEntry::new(0x2000, 0x2FFF, Some(SysMethod::Ktext)),
    ])
    .unwrap();

    assert_eq!(map.lookup(0x500), Some(SysMethod::Pgt));
    assert_eq!(map.lookup(0x1500), Some(SysMethod::Direct));
    assert_eq!(map.lookup(0x2500), Some(SysMethod::Ktext));
    assert_eq!(map.lookup(0x3000), None);
}

#[test]
fn empty_slots_are_unconfigured() {
    let ctx = Context::new();
    let mut sys = System::new();

    assert_eq!(
        sys.translate(&ctx, FullAddress::kv(0x1000), AddressSpace::MachPhysAddr),
        Err(Error::Unconfigured {
            slot: Slot::Map(SysMap::Hw)
        })
    );

    sys.set_map(SysMap::Hw, whole(SysMethod::Pgt));
    assert_eq!(
        sys.translate(&ctx, FullAddress::kv(0x1000), AddressSpace::MachPhysAddr),
        Err(Error::Unconfigured {
            slot: Slot::Method(Some(SysMethod::Pgt))
        })
    );

    assert_eq!(
        sys.translate(&ctx, FullAddress::NONE, AddressSpace::KVAddr),
        Ok(FullAddress::NONE)
    );

    assert!(sys.clear_map(SysMap::Hw).is_some());
    assert!(sys.clear_map(SysMap::Hw).is_none());
    assert_eq!(
        sys.translate(&ctx, FullAddress::kv(0x1000), AddressSpace::MachPhysAddr),
        Err(Error::Unconfigured {
            slot: Slot::Map(SysMap::Hw)
        })
    );
}

#[test]
fn routing_back_is_a_cycle() {
    let ctx = Context::new();
    let mut sys = System::new();
    sys.set_method(
        SysMethod::Direct,
        Method::linear(AddressSpace::KVAddr, 0x1000),
    );
    sys.set_map(SysMap::KvPhys, whole(SysMethod::Direct));

    let err = sys
        .translate(&ctx, FullAddress::kv(0), AddressSpace::KPhysAddr)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CycleDetected);
}

/// Doubles kernel physical addresses into machine physical addresses.
struct Doubler;

impl CustomTranslate for Doubler {
    fn translate(&self, _: &Context<'_>, addr: FullAddress) -> Result<FullAddress, Error> {
        Ok(FullAddress::machphys(addr.value().wrapping_mul(2)))
    }
}

#[test]
fn custom_method_in_a_chain() {
    let ctx = Context::new();
    let mut sys = System::new();
    sys.set_method(
        SysMethod::Direct,
        Method::linear(AddressSpace::KPhysAddr, -0x8000),
    );
    sys.set_method(
        SysMethod::KphysMachphys,
        Method::custom(AddressSpace::MachPhysAddr, Doubler),
    );
    sys.set_map(SysMap::Hw, whole(SysMethod::Direct));
    sys.set_map(SysMap::KphysMachphys, whole(SysMethod::KphysMachphys));

    assert_eq!(
        sys.translate(&ctx, FullAddress::kv(0x8100), AddressSpace::MachPhysAddr),
        Ok(FullAddress::machphys(0x200))
    );
}

#[test]
fn memory_array_through_system() {
    let mut memory = SparseMemory::new();
    // Frame table: entry i holds the machine frame of kernel frame i.
    memory.put(FullAddress::machphys(0x9000 + 2 * 8), 0x77);
    let ctx = Context::new().with_memory(&memory);

    let mut sys = System::new();
    sys.set_method(
        SysMethod::KphysMachphys,
        Method::memarr(
            AddressSpace::MachPhysAddr,
            FullAddress::machphys(0x9000),
            12,
            8,
            8,
        )
        .unwrap(),
    );
    sys.set_map(SysMap::KphysMachphys, whole(SysMethod::KphysMachphys));

    assert_eq!(
        sys.translate(&ctx, FullAddress::kphys(0x2ABC), AddressSpace::MachPhysAddr),
        Ok(FullAddress::machphys(0x77))
    );
}

/// Kernel physical memory from address 0, counting calls to [`MemoryRead::read`].
struct CountingMemory {
    bytes: Vec<u8>,
    reads: Cell<usize>,
}

impl CountingMemory {
    fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
            reads: Cell::new(0),
        }
    }

    fn put(&mut self, addr: usize, value: u64) {
        self.bytes[addr..addr + 8].copy_from_slice(&value.to_le_bytes());
    }
}

impl MemoryRead for CountingMemory {
    fn read(&self, address: FullAddress, buffer: &mut [u8]) -> Result<(), ReadError> {
        self.reads.set(self.reads.get() + 1);
        let start = usize::try_from(address.value()).unwrap();
        let bytes = self
            .bytes
            .get(start..start + buffer.len())
            .ok_or(ReadError::NoData(address))?;
        buffer.copy_from_slice(bytes);
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::KPHYS
    }
}

#[test]
fn repeated_walks_hit_the_read_cache() {
    let mut memory = CountingMemory::new(0x4000);
    memory.put(0x1000 + 3 * 8, 0x2);
    memory.put(0x2000 + 5 * 8, 0x3);
    memory.put(0x2000 + 6 * 8, 0x3);
    let sys = pfn_system();

    let ctx = Context::new().with_memory(&memory);
    for _ in 0..2 {
        assert_eq!(
            sys.translate(&ctx, FullAddress::kv(0x60_5040), AddressSpace::KPhysAddr),
            Ok(FullAddress::kphys(0x3040))
        );
    }
    assert_eq!(memory.reads.get(), 4);

    memory.reads.set(0);
    let cache = ReadCache::new();
    let ctx = Context::new().with_memory(&memory).with_cache(&cache);
    for addr in [0x60_5040, 0x60_5040, 0x60_6040] {
        assert_eq!(
            sys.translate(&ctx, FullAddress::kv(addr), AddressSpace::KPhysAddr),
            Ok(FullAddress::kphys(0x3040))
        );
    }
    // One fetch per table page, whatever the number of walks.
    assert_eq!(memory.reads.get(), 2);
    assert!(cache.contains(FullAddress::kphys(0x1000)));
    assert!(cache.contains(FullAddress::kphys(0x2000)));
}
