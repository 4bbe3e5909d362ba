//! VMSAv8-64 stage 1 translation table descriptors.
//!
//! Supports the 4 KiB, 16 KiB and 64 KiB translation granules, with 48-bit output addresses,
//! 52-bit output addresses using `FEAT_LPA` (64 KiB granule) and 52-bit output addresses using
//! `FEAT_LPA2`.

#![expect(
    clippy::missing_docs_in_private_items,
    reason = "bit shift/masking is documented in `TranslationDescriptor`"
)]

/// The size, in bytes, of a single [`TranslationDescriptor`].
pub const TRANSLATION_DESCRIPTOR_SIZE: u64 = 8;

const VALID_SHIFT: u32 = 0;
const VALID_BIT: u64 = 1 << VALID_SHIFT;

const TABLE_SHIFT: u32 = 1;
const TABLE_BIT: u64 = 1 << TABLE_SHIFT;

const ACCESS_FLAG_SHIFT: u32 = 10;
const ACCESS_FLAG_BIT: u64 = 1 << ACCESS_FLAG_SHIFT;

// 48-bit output address.
const ADDRESS_48_MASK: u64 = 0x0000_FFFF_FFFF_F000;

// FEAT_LPA: OA[51:48] are held in descriptor bits 15:12.
const LPA_ADDRESS_MASK: u64 = 0x0000_FFFF_FFFF_0000;
const LPA_HIGH_MASK: u64 = 0xF << 12;
const LPA_HIGH_SHIFT: u32 = 48 - 12;

// FEAT_LPA2: OA[49:12] in place and OA[51:50] in descriptor bits 9:8.
const LPA2_ADDRESS_MASK: u64 = 0x0003_FFFF_FFFF_F000;
const LPA2_HIGH_MASK: u64 = 0b11 << 8;
const LPA2_HIGH_SHIFT: u32 = 50 - 8;

/// The encoding of output addresses within a [`TranslationDescriptor`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum AddressFormat {
    /// Output address bits 47:granule held in place.
    Bits48,
    /// `FEAT_LPA` 52-bit output addresses (64 KiB granule only).
    Lpa,
    /// `FEAT_LPA2` 52-bit output addresses.
    Lpa2,
}

/// A VMSAv8-64 stage 1 descriptor, which can either be a table, block or page descriptor.
///
/// This representation performs no validity checking.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TranslationDescriptor(u64);

impl TranslationDescriptor {
    /// Creates a new [`TranslationDescriptor`] that is invalid.
    pub const fn invalid() -> Self {
        Self(0)
    }

    /// Creates a new table [`TranslationDescriptor`] pointing at `address` using the 48-bit
    /// output address format.
    pub const fn new_table(address: u64) -> Self {
        Self(VALID_BIT | TABLE_BIT | (address & ADDRESS_48_MASK))
    }

    /// Creates a new block [`TranslationDescriptor`] at `address` using the 48-bit output
    /// address format.
    pub const fn new_block(address: u64) -> Self {
        Self(VALID_BIT | ACCESS_FLAG_BIT | (address & ADDRESS_48_MASK))
    }

    /// Creates a new page [`TranslationDescriptor`] at `address` using the 48-bit output address
    /// format.
    pub const fn new_page(address: u64) -> Self {
        Self(VALID_BIT | TABLE_BIT | ACCESS_FLAG_BIT | (address & ADDRESS_48_MASK))
    }

    /// Constructs a new [`TranslationDescriptor`] from the bit representation.
    pub const fn from_bits(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the bit representation of the [`TranslationDescriptor`].
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if the [`TranslationDescriptor`] is valid.
    pub const fn valid(self) -> bool {
        self.0 & VALID_BIT == VALID_BIT
    }

    /// Returns `true` if the table bit is set.
    ///
    /// At a non-final lookup level this marks a table descriptor, a cleared bit marks a block
    /// descriptor. At the final lookup level the bit must be set for a page descriptor.
    pub const fn table(self) -> bool {
        self.0 & TABLE_BIT == TABLE_BIT
    }

    /// Returns `true` if the access flag is set.
    pub const fn access_flag(self) -> bool {
        self.0 & ACCESS_FLAG_BIT == ACCESS_FLAG_BIT
    }

    /// Returns the output address held in the [`TranslationDescriptor`], aligned to the
    /// translation granule of `granule_shift` bits.
    pub const fn output_address(self, format: AddressFormat, granule_shift: u32) -> u64 {
        let address = match format {
            AddressFormat::Bits48 => self.0 & ADDRESS_48_MASK,
            AddressFormat::Lpa => {
                (self.0 & LPA_ADDRESS_MASK) | ((self.0 & LPA_HIGH_MASK) << LPA_HIGH_SHIFT)
            }
            AddressFormat::Lpa2 => {
                (self.0 & LPA2_ADDRESS_MASK) | ((self.0 & LPA2_HIGH_MASK) << LPA2_HIGH_SHIFT)
            }
        };

        if granule_shift >= 64 {
            0
        } else {
            address & !((1u64 << granule_shift) - 1)
        }
    }
}
