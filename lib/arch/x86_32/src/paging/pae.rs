//! PAE paging entries.

#![expect(
    missing_docs,
    reason = "bit shift/masking is documented in `TranslationDescriptor`"
)]

/// The size, in bytes, of both [`PdpteDescriptor`] and [`TranslationDescriptor`].
pub const TRANSLATION_DESCRIPTOR_SIZE: u64 = 8;

pub const MAX_PHYSICAL_ADDRESS_SHIFT: u32 = 52;

pub const PRESENT_SHIFT: u32 = 0;
pub const PRESENT_BIT: u64 = 1 << PRESENT_SHIFT;

pub const WRITABLE_SHIFT: u32 = 1;
pub const WRITABLE_BIT: u64 = 1 << WRITABLE_SHIFT;

// Table-related constants.
pub const TABLE_ADDRESS_SHIFT: u32 = 12;
pub const TABLE_ADDRESS_SIZE: u32 = MAX_PHYSICAL_ADDRESS_SHIFT - TABLE_ADDRESS_SHIFT;
pub const TABLE_ADDRESS_MASK: u64 = ((1 << TABLE_ADDRESS_SIZE) - 1) << TABLE_ADDRESS_SHIFT;

// Block-related constants.
pub const BLOCK_SHIFT: u32 = 7;
pub const BLOCK_BIT: u64 = 1 << BLOCK_SHIFT;

pub const BLOCK_ADDRESS_SHIFT: u32 = 21;
pub const BLOCK_ADDRESS_SIZE: u32 = MAX_PHYSICAL_ADDRESS_SHIFT - BLOCK_ADDRESS_SHIFT;
pub const BLOCK_ADDRESS_MASK: u64 = ((1 << BLOCK_ADDRESS_SIZE) - 1) << BLOCK_ADDRESS_SHIFT;

// Page-related constants.
pub const PAGE_ADDRESS_MASK: u64 = TABLE_ADDRESS_MASK;

/// A PDPTE paging descriptor.
///
/// This representation performs no validity checking.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdpteDescriptor(u64);

impl PdpteDescriptor {
    /// Creates a new present [`PdpteDescriptor`] pointing at the page directory at
    /// `physical_address`.
    pub const fn new(physical_address: u64) -> Self {
        Self(PRESENT_BIT | (physical_address & TABLE_ADDRESS_MASK))
    }

    /// Constructs a new [`PdpteDescriptor`] from the bit representation.
    pub const fn from_bits(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the bit representation of the [`PdpteDescriptor`].
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if the [`PdpteDescriptor`] is present.
    pub const fn present(self) -> bool {
        self.0 & PRESENT_BIT == PRESENT_BIT
    }

    /// Returns the physical address of the page directory.
    pub const fn address(self) -> u64 {
        self.0 & TABLE_ADDRESS_MASK
    }
}

/// A generic PAE paging descriptor, which can either be a table descriptor, a block descriptor, or
/// a page descriptor.
///
/// This representation performs no validity checking.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TranslationDescriptor(u64);

impl TranslationDescriptor {
    /// Creates a new present table [`TranslationDescriptor`] pointing at `physical_address`.
    pub const fn new_table(physical_address: u64) -> Self {
        Self(PRESENT_BIT | WRITABLE_BIT | (physical_address & TABLE_ADDRESS_MASK))
    }

    /// Creates a new present 2 MiB block [`TranslationDescriptor`] at `physical_address`.
    pub const fn new_block(physical_address: u64) -> Self {
        Self(PRESENT_BIT | WRITABLE_BIT | BLOCK_BIT | (physical_address & BLOCK_ADDRESS_MASK))
    }

    /// Creates a new present 4 KiB page [`TranslationDescriptor`] at `physical_address`.
    pub const fn new_page(physical_address: u64) -> Self {
        Self(PRESENT_BIT | WRITABLE_BIT | (physical_address & PAGE_ADDRESS_MASK))
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

    /// Returns `true` if the region of memory controlled by the [`TranslationDescriptor`]
    /// is writable.
    pub const fn writable(self) -> bool {
        self.0 & WRITABLE_BIT == WRITABLE_BIT
    }

    /// Returns the physical address of the next table in the translation hierarchy.
    ///
    /// This should only be used on table descriptors.
    pub const fn table_address(self) -> u64 {
        self.0 & TABLE_ADDRESS_MASK
    }

    /// Returns `true` if the [`TranslationDescriptor`] is a block descriptor.
    ///
    /// This should only be used on page directory entries.
    pub const fn block(self) -> bool {
        self.0 & BLOCK_BIT == BLOCK_BIT
    }

    /// Returns the physical address of the 2 MiB block.
    ///
    /// This should only be used on block descriptors.
    pub const fn block_address(self) -> u64 {
        self.0 & BLOCK_ADDRESS_MASK
    }

    /// Returns the physical address of the 4 KiB page.
    ///
    /// This should only be used on page descriptors.
    pub const fn page_address(self) -> u64 {
        self.0 & PAGE_ADDRESS_MASK
    }
}
