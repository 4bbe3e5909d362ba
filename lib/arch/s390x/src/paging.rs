//! z/Architecture dynamic address translation entries.
//!
//! A full walk uses up to three region tables, a segment table and a page table. Region-third and
//! segment entries may map large frames directly when the format-control bit is set.

#![expect(
    missing_docs,
    reason = "bit shift/masking is documented in `TableEntry` and `PageEntry`"
)]

/// The size, in bytes, of a single table entry.
pub const ENTRY_SIZE: u64 = 8;

// Region and segment table entries.
pub const TABLE_INVALID_SHIFT: u32 = 5;
pub const TABLE_INVALID_BIT: u64 = 1 << TABLE_INVALID_SHIFT;

pub const TABLE_TYPE_SHIFT: u32 = 2;
pub const TABLE_TYPE_MASK: u64 = 0b11 << TABLE_TYPE_SHIFT;

pub const FORMAT_CONTROL_SHIFT: u32 = 10;
pub const FORMAT_CONTROL_BIT: u64 = 1 << FORMAT_CONTROL_SHIFT;

pub const REGION_ORIGIN_MASK: u64 = !0xFFF;
pub const SEGMENT_ORIGIN_MASK: u64 = !0x7FF;

pub const REGION_THIRD_FRAME_MASK: u64 = !((1 << 31) - 1);
pub const SEGMENT_FRAME_MASK: u64 = !((1 << 20) - 1);

// Page table entries.
pub const PAGE_INVALID_SHIFT: u32 = 10;
pub const PAGE_INVALID_BIT: u64 = 1 << PAGE_INVALID_SHIFT;

pub const PAGE_FRAME_MASK: u64 = !0xFFF;

/// The type of a DAT table, as encoded in the table-type field of its entries.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableType {
    /// Segment table; entries point at page tables or map 1 MiB frames.
    Segment = 0,
    /// Region-third table; entries point at segment tables or map 2 GiB frames.
    RegionThird = 1,
    /// Region-second table.
    RegionSecond = 2,
    /// Region-first table.
    RegionFirst = 3,
}

impl TableType {
    /// Returns the [`TableType`] of a table that is `remaining` tables above the page table,
    /// where `1` is the segment table.
    pub const fn from_remaining(remaining: usize) -> Option<Self> {
        match remaining {
            1 => Some(Self::Segment),
            2 => Some(Self::RegionThird),
            3 => Some(Self::RegionSecond),
            4 => Some(Self::RegionFirst),
            _ => None,
        }
    }

    /// Returns `true` if entries of this [`TableType`] may map a large frame.
    pub const fn supports_large(self) -> bool {
        matches!(self, Self::Segment | Self::RegionThird)
    }
}

/// A region-table or segment-table entry.
///
/// This representation performs no validity checking.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TableEntry(u64);

impl TableEntry {
    /// Creates a new [`TableEntry`] of type `table_type` pointing at the next table at `origin`.
    #[expect(clippy::as_conversions)]
    pub const fn new_table(table_type: TableType, origin: u64) -> Self {
        let mask = match table_type {
            TableType::Segment => SEGMENT_ORIGIN_MASK,
            _ => REGION_ORIGIN_MASK,
        };

        Self((origin & mask) | ((table_type as u64) << TABLE_TYPE_SHIFT))
    }

    /// Creates a new [`TableEntry`] of type `table_type` mapping the large frame at `frame`.
    #[expect(clippy::as_conversions)]
    pub const fn new_large(table_type: TableType, frame: u64) -> Self {
        Self(
            (frame & large_frame_mask(table_type))
                | FORMAT_CONTROL_BIT
                | ((table_type as u64) << TABLE_TYPE_SHIFT),
        )
    }

    /// Constructs a new [`TableEntry`] from the bit representation.
    pub const fn from_bits(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the bit representation of the [`TableEntry`].
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if the invalid bit is set.
    pub const fn invalid(self) -> bool {
        self.0 & TABLE_INVALID_BIT == TABLE_INVALID_BIT
    }

    /// Returns the raw value of the table-type field.
    pub const fn table_type_bits(self) -> u64 {
        (self.0 & TABLE_TYPE_MASK) >> TABLE_TYPE_SHIFT
    }

    /// Returns `true` if the table-type field matches `table_type`.
    #[expect(clippy::as_conversions)]
    pub const fn has_type(self, table_type: TableType) -> bool {
        self.table_type_bits() == table_type as u64
    }

    /// Returns `true` if the format-control bit is set.
    pub const fn format_control(self) -> bool {
        self.0 & FORMAT_CONTROL_BIT == FORMAT_CONTROL_BIT
    }

    /// Returns `true` if this entry maps a large frame when found in a table of `table_type`.
    pub const fn is_large_at(self, table_type: TableType) -> bool {
        table_type.supports_large() && self.format_control()
    }

    /// Returns the origin of the next-lower table referenced by an entry of `table_type`.
    pub const fn origin(self, table_type: TableType) -> u64 {
        match table_type {
            TableType::Segment => self.0 & SEGMENT_ORIGIN_MASK,
            _ => self.0 & REGION_ORIGIN_MASK,
        }
    }

    /// Returns the large frame address mapped by an entry of `table_type`.
    pub const fn large_frame(self, table_type: TableType) -> u64 {
        self.0 & large_frame_mask(table_type)
    }
}

/// Returns the frame mask of a large entry of `table_type`.
const fn large_frame_mask(table_type: TableType) -> u64 {
    match table_type {
        TableType::RegionThird => REGION_THIRD_FRAME_MASK,
        TableType::Segment => SEGMENT_FRAME_MASK,
        _ => 0,
    }
}

/// A page-table entry.
///
/// This representation performs no validity checking.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageEntry(u64);

impl PageEntry {
    /// Creates a new valid [`PageEntry`] mapping the 4 KiB frame at `frame`.
    pub const fn new(frame: u64) -> Self {
        Self(frame & PAGE_FRAME_MASK)
    }

    /// Constructs a new [`PageEntry`] from the bit representation.
    pub const fn from_bits(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the bit representation of the [`PageEntry`].
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if the invalid bit is set.
    pub const fn invalid(self) -> bool {
        self.0 & PAGE_INVALID_BIT == PAGE_INVALID_BIT
    }

    /// Returns the address of the mapped 4 KiB frame.
    pub const fn frame(self) -> u64 {
        self.0 & PAGE_FRAME_MASK
    }
}

#[cfg(test)]
mod test {
    use super::{PageEntry, TableEntry, TableType};

    #[test]
    fn region_entry_type_and_origin() {
        let entry = TableEntry::from_bits(0x0000_0000_0012_300C);

        assert!(!entry.invalid());
        assert!(entry.has_type(TableType::RegionFirst));
        assert_eq!(entry.origin(TableType::RegionFirst), 0x12_3000);
    }

    #[test]
    fn segment_origin_is_2k_aligned() {
        let entry = TableEntry::new_table(TableType::Segment, 0x4_5800);

        assert!(entry.has_type(TableType::Segment));
        assert_eq!(entry.origin(TableType::Segment), 0x4_5800);
    }

    #[test]
    fn large_frames() {
        let segment = TableEntry::new_large(TableType::Segment, 0x1230_0000);
        let region = TableEntry::new_large(TableType::RegionThird, 0x8000_0000);

        assert!(segment.is_large_at(TableType::Segment));
        assert_eq!(segment.large_frame(TableType::Segment), 0x1230_0000);
        assert!(region.is_large_at(TableType::RegionThird));
        assert_eq!(region.large_frame(TableType::RegionThird), 0x8000_0000);
        assert!(!region.is_large_at(TableType::RegionSecond));
    }

    #[test]
    fn page_invalid_bit() {
        assert!(PageEntry::from_bits(0x1400).invalid());
        assert_eq!(PageEntry::new(0x1234_5678).frame(), 0x1234_5000);
    }
}
