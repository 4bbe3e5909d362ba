//! 32-bit paging entries, including PSE-36 4 MiB pages.

#![expect(
    missing_docs,
    reason = "bit shift/masking is documented in `TranslationDescriptor`"
)]

/// The size, in bytes, of a single [`TranslationDescriptor`].
pub const TRANSLATION_DESCRIPTOR_SIZE: u64 = 4;

pub const PRESENT_SHIFT: u32 = 0;
pub const PRESENT_BIT: u32 = 1 << PRESENT_SHIFT;

pub const WRITABLE_SHIFT: u32 = 1;
pub const WRITABLE_BIT: u32 = 1 << WRITABLE_SHIFT;

// Table-related constants.
pub const TABLE_ADDRESS_MASK: u32 = 0xFFFF_F000;

// Block-related constants.
pub const BLOCK_SHIFT: u32 = 7;
pub const BLOCK_BIT: u32 = 1 << BLOCK_SHIFT;

pub const BLOCK_LOWER_ADDRESS_MASK_SHIFT: u32 = 22;
pub const BLOCK_LOWER_ADDRESS_MASK: u32 = 0x3FF << BLOCK_LOWER_ADDRESS_MASK_SHIFT;

pub const BLOCK_UPPER_ADDRESS_MASK_SHIFT: u32 = 13;
pub const BLOCK_UPPER_ADDRESS_MASK_SIZE: u32 = 8;
pub const BLOCK_UPPER_ADDRESS_MASK: u32 =
    ((1 << BLOCK_UPPER_ADDRESS_MASK_SIZE) - 1) << BLOCK_UPPER_ADDRESS_MASK_SHIFT;

// Page-related constants.
pub const PAGE_ADDRESS_MASK: u32 = 0xFFFF_F000;

/// A generic 32-bit translation descriptor.
///
/// This representation performs no validity checking.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TranslationDescriptor(u32);

impl TranslationDescriptor {
    /// Creates a new [`TranslationDescriptor`] that is not present.
    pub const fn non_present() -> Self {
        Self(0)
    }

    /// Creates a new present table [`TranslationDescriptor`] pointing at `physical_address`.
    pub const fn new_table(physical_address: u32) -> Self {
        Self(PRESENT_BIT | WRITABLE_BIT | (physical_address & TABLE_ADDRESS_MASK))
    }

    /// Creates a new present 4 MiB block [`TranslationDescriptor`] at `physical_address`.
    ///
    /// Bits 39:32 of `physical_address` are stored in the PSE-36 field.
    pub const fn new_block(physical_address: u64) -> Self {
        Self(PRESENT_BIT | WRITABLE_BIT | BLOCK_BIT).set_block_address(physical_address)
    }

    /// Creates a new present 4 KiB page [`TranslationDescriptor`] at `physical_address`.
    pub const fn new_page(physical_address: u32) -> Self {
        Self(PRESENT_BIT | WRITABLE_BIT | (physical_address & PAGE_ADDRESS_MASK))
    }

    /// Constructs a new [`TranslationDescriptor`] from the bit representation.
    pub const fn from_bits(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the bit representation of the [`TranslationDescriptor`].
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if the [`TranslationDescriptor`] describes a present descriptor.
    pub const fn present(self) -> bool {
        self.0 & PRESENT_BIT == PRESENT_BIT
    }

    /// Returns `true` if the region of memory controlled by the [`TranslationDescriptor`]
    /// is writable.
    pub const fn writable(self) -> bool {
        self.0 & WRITABLE_BIT == WRITABLE_BIT
    }

    /// Returns the physical address of the page table.
    ///
    /// This should only be used on table descriptors.
    pub const fn table_address(self) -> u64 {
        (self.0 & TABLE_ADDRESS_MASK) as u64
    }

    /// Returns `true` if the [`TranslationDescriptor`] is a block descriptor.
    ///
    /// This should only be used on page directory entries.
    pub const fn block(self) -> bool {
        self.0 & BLOCK_BIT == BLOCK_BIT
    }

    /// Returns the physical address of the 4 MiB block.
    ///
    /// This should only be used on block descriptors.
    pub const fn block_address(self) -> u64 {
        (self.0 & BLOCK_LOWER_ADDRESS_MASK) as u64
            | (((self.0 & BLOCK_UPPER_ADDRESS_MASK) as u64) << (32 - BLOCK_UPPER_ADDRESS_MASK_SHIFT))
    }

    /// Sets the physical address of the 4 MiB block.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "both halves are masked to 32 bits before the cast"
    )]
    pub const fn set_block_address(self, address: u64) -> Self {
        let non_address_bits = self.0 & !(BLOCK_LOWER_ADDRESS_MASK | BLOCK_UPPER_ADDRESS_MASK);
        let lower = (address & 0xFFFF_FFFF) as u32 & BLOCK_LOWER_ADDRESS_MASK;
        let upper = ((address >> (32 - BLOCK_UPPER_ADDRESS_MASK_SHIFT)) & 0xFFFF_FFFF) as u32
            & BLOCK_UPPER_ADDRESS_MASK;

        Self(non_address_bits | lower | upper)
    }

    /// Returns the physical address of the 4 KiB page.
    ///
    /// This should only be used on page descriptors.
    pub const fn page_address(self) -> u64 {
        (self.0 & PAGE_ADDRESS_MASK) as u64
    }

    /// Sets whether the [`TranslationDescriptor`] is present.
    pub const fn set_present(self, present: bool) -> Self {
        Self((self.0 & !PRESENT_BIT) | (bool_as_u32(present) << PRESENT_SHIFT))
    }
}

/// Converts a [`bool`] into a [`u32`].
const fn bool_as_u32(value: bool) -> u32 {
    if value { 1 } else { 0 }
}
