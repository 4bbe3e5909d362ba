//! Decoding of page-table entries for every [`PteFormat`].

use aarch64::paging::{AddressFormat, TranslationDescriptor as Aarch64Descriptor};
use memory::address::{AddressSpace, FullAddress};
use ppc64::paging::{RPN_SHIFT_30, TranslationDescriptor as Ppc64Descriptor};
use s390x::paging::{PageEntry, TableEntry, TableType};
use x86_32::paging::{bits_32, pae};
use x86_64::paging::{Level, TranslationDescriptor as X86_64Descriptor};

use crate::method::PteFormat;

/// The meaning of a single page-table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Decoded {
    /// The entry points at the next-lower table.
    Table(FullAddress),
    /// The entry of a last-level table maps a page frame.
    Page(u64),
    /// The entry maps a block spanning all lower levels.
    Huge(u64),
    /// The entry points at a POWER huge page directory whose entries map `1 << shift` bytes.
    HugeDirectory {
        /// The address of the huge page directory.
        table: FullAddress,
        /// The huge page shift.
        shift: u32,
    },
    /// The entry is not present or not valid.
    NotPresent,
}

/// Returns the address space in which tables of `format` are located.
pub(crate) const fn table_space(format: PteFormat, target_as: AddressSpace) -> AddressSpace {
    match format {
        PteFormat::Ppc64LinuxRpn30 => AddressSpace::KVAddr,
        _ => target_as,
    }
}

/// Decodes `pte`, read from a table at `level` (where `1` is the last-level table).
///
/// `fields` holds the field widths least significant first, so `fields[0]` is the page shift and
/// `fields[level]` indexes the table at `level`.
pub(crate) fn decode(
    format: PteFormat,
    pte: u64,
    level: usize,
    fields: &[u8],
    target_as: AddressSpace,
) -> Decoded {
    let page_shift = u32::from(fields.first().copied().unwrap_or(0));
    let space = table_space(format, target_as);
    let table = |addr: u64| Decoded::Table(FullAddress::new(space, addr));

    match format {
        PteFormat::None => Decoded::NotPresent,
        PteFormat::Pfn32 | PteFormat::Pfn64 => {
            if pte == 0 {
                Decoded::NotPresent
            } else if level > 1 {
                table(pte << page_shift)
            } else {
                Decoded::Page(pte << page_shift)
            }
        }
        PteFormat::Ia32 => {
            let Ok(raw) = u32::try_from(pte) else {
                return Decoded::NotPresent;
            };
            let desc = bits_32::TranslationDescriptor::from_bits(raw);

            if !desc.present() {
                Decoded::NotPresent
            } else if level == 2 && desc.block() {
                Decoded::Huge(desc.block_address())
            } else if level > 1 {
                table(desc.table_address())
            } else {
                Decoded::Page(desc.page_address())
            }
        }
        PteFormat::Ia32Pae => {
            if level == 3 {
                let pdpte = pae::PdpteDescriptor::from_bits(pte);
                return if pdpte.present() {
                    table(pdpte.address())
                } else {
                    Decoded::NotPresent
                };
            }

            let desc = pae::TranslationDescriptor::from_bits(pte);
            if !desc.present() {
                Decoded::NotPresent
            } else if level == 2 && desc.block() {
                Decoded::Huge(desc.block_address())
            } else if level > 1 {
                table(desc.table_address())
            } else {
                Decoded::Page(desc.page_address())
            }
        }
        PteFormat::X86_64 => {
            let desc = X86_64Descriptor::from_bits(pte);
            if !desc.present() {
                return Decoded::NotPresent;
            }

            match Level::from_remaining(level) {
                Some(level) if desc.is_block_at(level) => Decoded::Huge(desc.block_address(level)),
                Some(Level::Pml1) => Decoded::Page(desc.page_address()),
                _ => table(desc.table_address()),
            }
        }
        PteFormat::Aarch64 | PteFormat::Aarch64Lpa | PteFormat::Aarch64Lpa2 => {
            let address_format = match format {
                PteFormat::Aarch64Lpa => AddressFormat::Lpa,
                PteFormat::Aarch64Lpa2 => AddressFormat::Lpa2,
                _ => AddressFormat::Bits48,
            };
            let desc = Aarch64Descriptor::from_bits(pte);
            let output = desc.output_address(address_format, page_shift);

            match (desc.valid(), desc.table(), level > 1) {
                (false, _, _) => Decoded::NotPresent,
                (true, true, true) => table(output),
                (true, false, true) => Decoded::Huge(output),
                (true, true, false) => Decoded::Page(output),
                // Reserved encoding at the final level.
                (true, false, false) => Decoded::NotPresent,
            }
        }
        PteFormat::S390x => {
            if level == 1 {
                let entry = PageEntry::from_bits(pte);
                return if entry.invalid() {
                    Decoded::NotPresent
                } else {
                    Decoded::Page(entry.frame())
                };
            }

            let Some(table_type) = TableType::from_remaining(level - 1) else {
                return Decoded::NotPresent;
            };
            let entry = TableEntry::from_bits(pte);
            if entry.invalid() || !entry.has_type(table_type) {
                Decoded::NotPresent
            } else if entry.is_large_at(table_type) {
                Decoded::Huge(entry.large_frame(table_type))
            } else {
                table(entry.origin(table_type))
            }
        }
        PteFormat::Ppc64LinuxRpn30 => {
            let desc = Ppc64Descriptor::from_bits(pte);
            if desc.none() {
                return Decoded::NotPresent;
            }
            if level == 1 || desc.huge_pte() {
                let frame = desc.page_address(RPN_SHIFT_30, page_shift);
                return if level == 1 {
                    Decoded::Page(frame)
                } else {
                    Decoded::Huge(frame)
                };
            }

            if desc.hugepd() {
                match desc.hugepd_shift() {
                    Some(shift) => Decoded::HugeDirectory {
                        table: FullAddress::kv(desc.hugepd_address()),
                        shift,
                    },
                    None => Decoded::NotPresent,
                }
            } else {
                let index_bits = u32::from(fields.get(level - 1).copied().unwrap_or(0));
                table(desc.table_address(index_bits))
            }
        }
    }
}
