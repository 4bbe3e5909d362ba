//! Helpers that populate a [`System`] from a description of an OS memory layout.

use memory::address::AddressSpace;

use crate::{
    error::ConfigError,
    map::MapEntry,
    method::Method,
    system::{SysMap, SysMethod, System},
};

/// A region of an OS virtual memory layout.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Region {
    /// The first address of the region.
    pub first: u64,
    /// The last address of the region.
    pub last: u64,
    /// The method role that translates the region.
    pub meth: SysMethod,
    /// Whether the region is the direct mapping of physical memory.
    pub direct: bool,
}

impl Region {
    /// Constructs a new [`Region`] covering `[first, last]`.
    pub const fn new(first: u64, last: u64, meth: SysMethod) -> Self {
        Self {
            first,
            last,
            meth,
            direct: false,
        }
    }

    /// Marks the [`Region`] as the direct mapping of physical memory.
    #[must_use]
    pub const fn direct(mut self) -> Self {
        self.direct = true;
        self
    }
}

impl System {
    /// Overlays `regions` on the map bound to `role`.
    ///
    /// For a region marked [`Region::direct`] whose [`SysMethod::Direct`] method is linear, the
    /// reverse mapping is derived as well: [`SysMethod::Rdirect`] is bound to the inverse offset
    /// and the physical image of the region is bound to it in [`SysMap::KphysDirect`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Inverted`] if a region, or the physical image of a direct region,
    /// ends before it starts.
    pub fn set_layout(&mut self, role: SysMap, regions: &[Region]) -> Result<(), ConfigError> {
        for region in regions {
            self.map_mut(role)
                .set(MapEntry::new(region.first, region.last, Some(region.meth)))?;

            if region.direct {
                self.set_reverse_direct(region)?;
            }
        }

        Ok(())
    }

    /// Derives [`SysMethod::Rdirect`] from the linear [`SysMethod::Direct`] method.
    fn set_reverse_direct(&mut self, region: &Region) -> Result<(), ConfigError> {
        let Method::Linear(direct) = self.method(SysMethod::Direct) else {
            log::debug!("METH_DIRECT is not linear; no reverse mapping derived");
            return Ok(());
        };

        let off = direct.off;
        self.set_method(
            SysMethod::Rdirect,
            Method::linear(AddressSpace::KVAddr, off.wrapping_neg()),
        );
        self.map_mut(SysMap::KphysDirect).set(MapEntry::new(
            region.first.wrapping_add_signed(off),
            region.last.wrapping_add_signed(off),
            Some(SysMethod::Rdirect),
        ))
    }

    /// Binds identity mappings between kernel physical and machine physical addresses up to and
    /// including `max_addr`.
    ///
    /// # Errors
    ///
    /// Never fails in practice; map updates are propagated.
    pub fn set_physmaps(&mut self, max_addr: u64) -> Result<(), ConfigError> {
        self.set_method(
            SysMethod::MachphysKphys,
            Method::linear(AddressSpace::KPhysAddr, 0),
        );
        self.set_method(
            SysMethod::KphysMachphys,
            Method::linear(AddressSpace::MachPhysAddr, 0),
        );

        self.map_mut(SysMap::MachphysKphys).set(MapEntry::new(
            0,
            max_addr,
            Some(SysMethod::MachphysKphys),
        ))?;
        self.map_mut(SysMap::KphysMachphys).set(MapEntry::new(
            0,
            max_addr,
            Some(SysMethod::KphysMachphys),
        ))
    }
}
