//! Linux page-table entries for 64-bit POWER.
//!
//! Tables are referenced by kernel virtual address. A non-final entry is either a table pointer,
//! a huge page, or a huge page directory (hugepd) whose low bits encode the huge page size.

#![expect(
    missing_docs,
    reason = "bit shift/masking is documented in `TranslationDescriptor`"
)]

/// The size, in bytes, of a single [`TranslationDescriptor`].
pub const TRANSLATION_DESCRIPTOR_SIZE: u64 = 8;

/// Base-two logarithm of [`TRANSLATION_DESCRIPTOR_SIZE`].
pub const TRANSLATION_DESCRIPTOR_SHIFT: u32 = 3;

/// The RPN shift used by Linux for 64 KiB pages.
pub const RPN_SHIFT_30: u32 = 30;

pub const PD_HUGE_SHIFT: u32 = 63;
pub const PD_HUGE_BIT: u64 = 1 << PD_HUGE_SHIFT;

pub const HUGEPD_SHIFT_MASK: u64 = 0x3F;

pub const HUGE_PTE_MASK: u64 = 0b11;

/// Page shifts indexed by MMU page size.
pub const MMU_PAGE_SHIFTS: [u32; 14] = [
    12, // 4K
    14, // 16K
    16, // 64K
    16, // 64K "admixed pages"
    18, // 256K
    20, // 1M
    22, // 4M
    23, // 8M
    24, // 16M
    26, // 64M
    28, // 256M
    30, // 1G
    34, // 16G
    36, // 64G
];

/// A Linux page-table entry.
///
/// This representation performs no validity checking.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TranslationDescriptor(u64);

impl TranslationDescriptor {
    /// Constructs a new [`TranslationDescriptor`] from the bit representation.
    pub const fn from_bits(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the bit representation of the [`TranslationDescriptor`].
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if the [`TranslationDescriptor`] is none (all bits zero).
    pub const fn none(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if a non-final [`TranslationDescriptor`] maps a huge page.
    pub const fn huge_pte(self) -> bool {
        self.0 & HUGE_PTE_MASK != 0
    }

    /// Returns `true` if a non-final [`TranslationDescriptor`] points at a huge page directory.
    pub const fn hugepd(self) -> bool {
        self.0 & PD_HUGE_BIT == 0
    }

    /// Returns the huge page shift encoded in a hugepd entry, or [`None`] if the encoded MMU page
    /// size is unknown.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the MMU page size field is four bits wide"
    )]
    pub const fn hugepd_shift(self) -> Option<u32> {
        let psize = ((self.0 & HUGEPD_SHIFT_MASK) >> 2) as usize;
        if psize < MMU_PAGE_SHIFTS.len() {
            Some(MMU_PAGE_SHIFTS[psize])
        } else {
            None
        }
    }

    /// Returns the kernel virtual address of the huge page directory.
    pub const fn hugepd_address(self) -> u64 {
        (self.0 & !HUGEPD_SHIFT_MASK) | PD_HUGE_BIT
    }

    /// Returns the kernel virtual address of the next table, whose entries are indexed by
    /// `index_bits` bits.
    pub const fn table_address(self, index_bits: u32) -> u64 {
        match 1u64.checked_shl(TRANSLATION_DESCRIPTOR_SHIFT + index_bits) {
            Some(table_size) => self.0 & !(table_size - 1),
            None => 0,
        }
    }

    /// Returns the physical address of the page frame, for pages of `page_shift` bits.
    pub const fn page_address(self, rpn_shift: u32, page_shift: u32) -> u64 {
        (self.0 >> rpn_shift) << page_shift
    }
}
