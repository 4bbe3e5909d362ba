//! The registry of translation methods and maps.

use core::fmt;

use memory::address::{AddressSpace, FullAddress};

use crate::{context::Context, error::Error, map::Map, method::Method, walk};

/// The method roles of a [`System`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum SysMethod {
    /// Kernel page tables.
    Pgt,
    /// User-space page tables.
    Upgt,
    /// Direct mapping of physical memory.
    Direct,
    /// Kernel text mapping.
    Ktext,
    /// Virtual memory map (`struct page` array).
    Vmemmap,
    /// Reverse of [`SysMethod::Direct`].
    Rdirect,
    /// Machine physical to kernel physical.
    MachphysKphys,
    /// Kernel physical to machine physical.
    KphysMachphys,
}

impl SysMethod {
    /// The number of method roles.
    pub const COUNT: usize = 8;

    /// All method roles, in display order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Pgt,
        Self::Upgt,
        Self::Direct,
        Self::Ktext,
        Self::Vmemmap,
        Self::Rdirect,
        Self::MachphysKphys,
        Self::KphysMachphys,
    ];

    /// Returns the stable name of the role.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pgt => "PGT",
            Self::Upgt => "UPGT",
            Self::Direct => "DIRECT",
            Self::Ktext => "KTEXT",
            Self::Vmemmap => "VMEMMAP",
            Self::Rdirect => "RDIRECT",
            Self::MachphysKphys => "MACHPHYS_KPHYS",
            Self::KphysMachphys => "KPHYS_MACHPHYS",
        }
    }

    /// Returns the slot index of the role.
    #[expect(clippy::as_conversions)]
    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SysMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The map roles of a [`System`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum SysMap {
    /// Hardware translation from kernel virtual to machine physical addresses.
    Hw,
    /// Kernel virtual to kernel physical addresses.
    KvPhys,
    /// Kernel physical to kernel virtual addresses.
    KphysDirect,
    /// Machine physical to kernel physical addresses.
    MachphysKphys,
    /// Kernel physical to machine physical addresses.
    KphysMachphys,
}

impl SysMap {
    /// The number of map roles.
    pub const COUNT: usize = 5;

    /// All map roles, in display order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Hw,
        Self::KvPhys,
        Self::KphysDirect,
        Self::MachphysKphys,
        Self::KphysMachphys,
    ];

    /// Returns the stable name of the role.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hw => "HW",
            Self::KvPhys => "KV_PHYS",
            Self::KphysDirect => "KPHYS_DIRECT",
            Self::MachphysKphys => "MACHPHYS_KPHYS",
            Self::KphysMachphys => "KPHYS_MACHPHYS",
        }
    }

    /// Returns the map that translates addresses from `from` towards `goal`.
    pub const fn route(from: AddressSpace, goal: AddressSpace) -> Option<Self> {
        match (from, goal) {
            (AddressSpace::KVAddr, AddressSpace::MachPhysAddr) => Some(Self::Hw),
            (AddressSpace::KVAddr, AddressSpace::KPhysAddr) => Some(Self::KvPhys),
            (AddressSpace::KPhysAddr, AddressSpace::MachPhysAddr) => Some(Self::KphysMachphys),
            (AddressSpace::KPhysAddr, AddressSpace::KVAddr) => Some(Self::KphysDirect),
            (AddressSpace::MachPhysAddr, AddressSpace::KPhysAddr | AddressSpace::KVAddr) => {
                Some(Self::MachphysKphys)
            }
            _ => None,
        }
    }

    /// Returns the slot index of the role.
    #[expect(clippy::as_conversions)]
    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SysMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed registry of translation methods and maps.
///
/// A [`System`] is populated once by a [`Configurator`][crate::Configurator] and then used
/// read-only; any number of translations may share it.
#[derive(Clone, Debug, Default)]
pub struct System {
    /// Method slots, indexed by [`SysMethod`].
    methods: [Method; SysMethod::COUNT],
    /// Map slots, indexed by [`SysMap`].
    maps: [Option<Map>; SysMap::COUNT],
}

impl System {
    /// Constructs an empty [`System`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the method bound to `role`, which is [`Method::NoMeth`] if unset.
    pub fn method(&self, role: SysMethod) -> &Method {
        &self.methods[role.index()]
    }

    /// Binds `method` to `role`, replacing any previous binding.
    pub fn set_method(&mut self, role: SysMethod, method: Method) {
        log::debug!("METH_{role}: {}", method.kind());
        self.methods[role.index()] = method;
    }

    /// Returns the map bound to `role`, if any.
    pub fn map(&self, role: SysMap) -> Option<&Map> {
        self.maps[role.index()].as_ref()
    }

    /// Returns a mutable reference to the map bound to `role`, binding an empty map first if
    /// necessary.
    pub fn map_mut(&mut self, role: SysMap) -> &mut Map {
        self.maps[role.index()].get_or_insert_with(Map::new)
    }

    /// Binds `map` to `role`, replacing any previous binding.
    pub fn set_map(&mut self, role: SysMap, map: Map) {
        log::debug!("MAP_{role}: {} ranges", map.len());
        self.maps[role.index()] = Some(map);
    }

    /// Removes the map bound to `role`, returning it.
    pub fn clear_map(&mut self, role: SysMap) -> Option<Map> {
        self.maps[role.index()].take()
    }

    /// Returns the configured method roles and their methods, skipping unset slots.
    pub fn methods(&self) -> impl Iterator<Item = (SysMethod, &Method)> {
        SysMethod::ALL
            .into_iter()
            .map(|role| (role, self.method(role)))
            .filter(|(_, method)| !matches!(method, Method::NoMeth))
    }

    /// Returns the configured map roles and their maps, skipping unset slots.
    pub fn maps(&self) -> impl Iterator<Item = (SysMap, &Map)> {
        SysMap::ALL
            .into_iter()
            .filter_map(|role| self.map(role).map(|map| (role, map)))
    }

    /// Translates `addr` into the `goal` address space.
    ///
    /// # Errors
    ///
    /// - [`Error::Unconfigured`]: Returned if a required map or method slot is empty.
    /// - [`Error::NoMatch`]: Returned if a map has no method for an intermediate address.
    /// - [`Error::CycleDetected`]: Returned if the goal is not reached within the step bound.
    /// - Any error produced by executing a method.
    pub fn translate(
        &self,
        ctx: &Context<'_>,
        addr: FullAddress,
        goal: AddressSpace,
    ) -> Result<FullAddress, Error> {
        walk::translate(self, ctx, addr, goal, 0)
    }
}
