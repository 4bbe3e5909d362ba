//! Long mode page-table entries (4-level and 5-level paging).

#![expect(
    clippy::missing_docs_in_private_items,
    reason = "bit shift/masking is documented in `TranslationDescriptor`"
)]

/// The size, in bytes, of a single [`TranslationDescriptor`].
pub const TRANSLATION_DESCRIPTOR_SIZE: u64 = 8;

/// The number of virtual address bits translated by 5-level paging.
pub const VIRTUAL_ADDRESS_BITS_5_LEVEL: u8 = 57;

const MAX_PHYSICAL_ADDRESS_SHIFT: u32 = 52;

const PRESENT_SHIFT: u32 = 0;
const PRESENT_BIT: u64 = 1 << PRESENT_SHIFT;

const WRITABLE_SHIFT: u32 = 1;
const WRITABLE_BIT: u64 = 1 << WRITABLE_SHIFT;

const XD_SHIFT: u32 = 63;
const XD_BIT: u64 = 1 << XD_SHIFT;

// Table-related constants.
const TABLE_ADDRESS_MASK_SHIFT: u32 = 12;
const TABLE_ADDRESS_MASK_SIZE: u32 = MAX_PHYSICAL_ADDRESS_SHIFT - TABLE_ADDRESS_MASK_SHIFT;
const TABLE_ADDRESS_MASK: u64 = ((1 << TABLE_ADDRESS_MASK_SIZE) - 1) << TABLE_ADDRESS_MASK_SHIFT;

// Block-related constants.
const BLOCK_SHIFT: u32 = 7;
const BLOCK_BIT: u64 = 1 << BLOCK_SHIFT;

const BLOCK_PML3_ADDRESS_MASK_SHIFT: u32 = 30;
const BLOCK_PML3_ADDRESS_MASK_SIZE: u32 =
    MAX_PHYSICAL_ADDRESS_SHIFT - BLOCK_PML3_ADDRESS_MASK_SHIFT;
const BLOCK_PML3_ADDRESS_MASK: u64 =
    ((1 << BLOCK_PML3_ADDRESS_MASK_SIZE) - 1) << BLOCK_PML3_ADDRESS_MASK_SHIFT;

const BLOCK_PML2_ADDRESS_MASK_SHIFT: u32 = 21;
const BLOCK_PML2_ADDRESS_MASK_SIZE: u32 =
    MAX_PHYSICAL_ADDRESS_SHIFT - BLOCK_PML2_ADDRESS_MASK_SHIFT;
const BLOCK_PML2_ADDRESS_MASK: u64 =
    ((1 << BLOCK_PML2_ADDRESS_MASK_SIZE) - 1) << BLOCK_PML2_ADDRESS_MASK_SHIFT;

// Page-related constants.
const PAGE_ADDRESS_MASK_SHIFT: u32 = 12;
const PAGE_ADDRESS_MASK_SIZE: u32 = MAX_PHYSICAL_ADDRESS_SHIFT - PAGE_ADDRESS_MASK_SHIFT;
const PAGE_ADDRESS_MASK: u64 = ((1 << PAGE_ADDRESS_MASK_SIZE) - 1) << PAGE_ADDRESS_MASK_SHIFT;

/// The level of a long mode paging structure, counted from the leaf page table.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Page table; entries map 4 KiB pages.
    Pml1,
    /// Page directory; entries may map 2 MiB blocks.
    Pml2,
    /// Page-directory-pointer table; entries may map 1 GiB blocks.
    Pml3,
    /// PML4 table.
    Pml4,
    /// PML5 table (5-level paging only).
    Pml5,
}

impl Level {
    /// Returns the [`Level`] of the table that is `remaining` tables away from the leaf, where
    /// `1` is the page table.
    pub const fn from_remaining(remaining: usize) -> Option<Self> {
        match remaining {
            1 => Some(Self::Pml1),
            2 => Some(Self::Pml2),
            3 => Some(Self::Pml3),
            4 => Some(Self::Pml4),
            5 => Some(Self::Pml5),
            _ => None,
        }
    }

    /// Returns `true` if entries at this [`Level`] may map a block.
    pub const fn supports_block(self) -> bool {
        matches!(self, Self::Pml2 | Self::Pml3)
    }
}

/// A generic long mode translation descriptor.
///
/// This representation performs no validity checking.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TranslationDescriptor(u64);

impl TranslationDescriptor {
    /// Creates a new [`TranslationDescriptor`] that is not present.
    pub const fn non_present() -> Self {
        Self(0)
    }

    /// Creates a new present table [`TranslationDescriptor`] pointing at `physical_address`.
    pub const fn new_table(physical_address: u64) -> Self {
        Self::non_present()
            .set_present(true)
            .set_writable(true)
            .set_table_address(physical_address)
    }

    /// Creates a new present 2 MiB block [`TranslationDescriptor`].
    pub const fn new_block_pml2(physical_address: u64) -> Self {
        Self::non_present()
            .set_present(true)
            .set_writable(true)
            .set_block(true)
            .set_block_address(Level::Pml2, physical_address)
    }

    /// Creates a new present 4 KiB page [`TranslationDescriptor`].
    pub const fn new_page(physical_address: u64) -> Self {
        Self::non_present()
            .set_present(true)
            .set_writable(true)
            .set_page_address(physical_address)
    }

    /// Constructs a new [`TranslationDescriptor`] from the bit representation.
    pub const fn from_bits(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the bit representation of the [`TranslationDescriptor`].
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if the [`TranslationDescriptor`] describes a present descriptor.
    pub const fn present(self) -> bool {
        self.0 & PRESENT_BIT == PRESENT_BIT
    }

    /// Sets whether the [`TranslationDescriptor`] is present.
    pub const fn set_present(self, present: bool) -> Self {
        Self((self.0 & !PRESENT_BIT) | (bool_as_u64(present) << PRESENT_SHIFT))
    }

    /// Returns `true` if the region of memory controlled by the [`TranslationDescriptor`]
    /// is writable.
    pub const fn writable(self) -> bool {
        self.0 & WRITABLE_BIT == WRITABLE_BIT
    }

    /// Sets whether the region of memory controlled by the [`TranslationDescriptor`] is writable.
    pub const fn set_writable(self, writable: bool) -> Self {
        Self((self.0 & !WRITABLE_BIT) | (bool_as_u64(writable) << WRITABLE_SHIFT))
    }

    /// Returns `true` if instruction fetches are disallowed.
    pub const fn xd(self) -> bool {
        self.0 & XD_BIT == XD_BIT
    }

    // Table descriptor utilities.

    /// Returns the physical address of the next table in the translation hierarchy.
    ///
    /// This should only be used on table descriptors.
    pub const fn table_address(self) -> u64 {
        self.0 & TABLE_ADDRESS_MASK
    }

    /// Sets the physical address of the next table in the translation hierarchy.
    pub const fn set_table_address(self, address: u64) -> Self {
        Self((self.0 & !TABLE_ADDRESS_MASK) | (address & TABLE_ADDRESS_MASK))
    }

    // Block descriptor utilities.

    /// Returns `true` if the page-size bit is set.
    ///
    /// This is only meaningful at [`Level::Pml3`] and [`Level::Pml2`].
    pub const fn block(self) -> bool {
        self.0 & BLOCK_BIT == BLOCK_BIT
    }

    /// Sets the page-size bit.
    pub const fn set_block(self, block: bool) -> Self {
        Self((self.0 & !BLOCK_BIT) | (bool_as_u64(block) << BLOCK_SHIFT))
    }

    /// Returns `true` if this descriptor maps a block when found at `level`.
    pub const fn is_block_at(self, level: Level) -> bool {
        level.supports_block() && self.block()
    }

    /// Returns the physical address of the block mapped at `level`.
    ///
    /// Returns `0` for levels that cannot map a block.
    pub const fn block_address(self, level: Level) -> u64 {
        match level {
            Level::Pml3 => self.0 & BLOCK_PML3_ADDRESS_MASK,
            Level::Pml2 => self.0 & BLOCK_PML2_ADDRESS_MASK,
            _ => 0,
        }
    }

    /// Sets the physical address of the block mapped at `level`.
    pub const fn set_block_address(self, level: Level, address: u64) -> Self {
        let mask = match level {
            Level::Pml3 => BLOCK_PML3_ADDRESS_MASK,
            Level::Pml2 => BLOCK_PML2_ADDRESS_MASK,
            _ => 0,
        };

        Self((self.0 & !mask) | (address & mask))
    }

    // Page descriptor utilities.

    /// Returns the physical address of the 4 KiB page.
    ///
    /// This should only be used on page descriptors.
    pub const fn page_address(self) -> u64 {
        self.0 & PAGE_ADDRESS_MASK
    }

    /// Sets the physical address of the 4 KiB page.
    pub const fn set_page_address(self, address: u64) -> Self {
        Self((self.0 & !PAGE_ADDRESS_MASK) | (address & PAGE_ADDRESS_MASK))
    }
}

/// Converts a [`bool`] into a [`u64`].
const fn bool_as_u64(value: bool) -> u64 {
    if value { 1 } else { 0 }
}
