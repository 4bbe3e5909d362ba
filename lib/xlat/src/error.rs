//! Translation and configuration errors.

use core::fmt;

use alloc::string::String;
use memory::{
    access::ReadError,
    address::{AddressSpace, FullAddress},
};

use crate::system::{SysMap, SysMethod};

/// The category of an [`Error`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required map, method, root or callback is not configured.
    Unconfigured,
    /// The memory or register callback failed.
    ReadError,
    /// A page-table entry is not present or not valid.
    InvalidEntry,
    /// No lookup table entry covers the address.
    NotFound,
    /// No range of a map covers the address.
    NoMatch,
    /// Translation did not reach its goal within the step bound.
    CycleDetected,
    /// The input address is not valid for the method.
    InvalidAddress,
    /// The requested operation is not implemented.
    NotImplemented,
}

/// The configuration slot reported by [`Error::Unconfigured`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Slot {
    /// A map role of the [`System`][crate::System].
    Map(SysMap),
    /// A method role of the [`System`][crate::System], or [`None`] for a method executed
    /// directly.
    Method(Option<SysMethod>),
    /// No map translates between the two address spaces.
    Route {
        /// The source address space.
        from: AddressSpace,
        /// The goal address space.
        to: AddressSpace,
    },
    /// The root of a page-table method.
    Root,
    /// The memory read callback.
    Memory,
    /// The register read callback.
    Registers,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(map) => write!(f, "MAP_{map}"),
            Self::Method(Some(meth)) => write!(f, "METH_{meth}"),
            Self::Method(None) => f.write_str("translation method"),
            Self::Route { from, to } => write!(f, "translation from {from} to {to}"),
            Self::Root => f.write_str("page table root"),
            Self::Memory => f.write_str("read callback"),
            Self::Registers => f.write_str("register callback"),
        }
    }
}

/// Various errors that can occur while translating an address.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A required slot is empty.
    #[error("{slot} is not configured")]
    Unconfigured {
        /// The empty slot.
        slot: Slot,
    },
    /// Reading memory failed.
    #[error("cannot read {width}-bit {what} at {addr}")]
    Read {
        /// The address being read.
        addr: FullAddress,
        /// The width of the value, in bits.
        width: u8,
        /// What the value was read for.
        what: &'static str,
        /// The failure reported by the callback.
        #[source]
        source: ReadError,
    },
    /// Reading a register failed.
    #[error("cannot read register \"{name}\"")]
    Register {
        /// The register name.
        name: String,
        /// The failure reported by the callback.
        #[source]
        source: ReadError,
    },
    /// A page-table entry is not present or not valid.
    #[error("level {level} entry [{index}] is not present: {pte:#x}")]
    InvalidEntry {
        /// The table level, where `1` is the last-level page table.
        level: usize,
        /// The index into the table.
        index: u64,
        /// The raw entry after masking.
        pte: u64,
    },
    /// No lookup table entry covers the address.
    #[error("no lookup entry covers {addr:#x}")]
    NotFound {
        /// The unresolved address.
        addr: u64,
    },
    /// No range of a map covers the address.
    #[error("no range of MAP_{map} covers {addr:#x}")]
    NoMatch {
        /// The map that was searched.
        map: SysMap,
        /// The unresolved address.
        addr: u64,
    },
    /// Translation did not reach its goal within the step bound.
    #[error("translation of {start} did not terminate within {limit} steps")]
    CycleDetected {
        /// The address whose translation was requested.
        start: FullAddress,
        /// The exceeded bound.
        limit: usize,
    },
    /// The input address is not valid for the method.
    #[error("{addr:#x} is not a valid input address")]
    InvalidAddress {
        /// The rejected address.
        addr: u64,
    },
    /// The requested operation is not implemented.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl Error {
    /// Returns the [`ErrorKind`] of this [`Error`].
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unconfigured { .. } => ErrorKind::Unconfigured,
            Self::Read { .. } | Self::Register { .. } => ErrorKind::ReadError,
            Self::InvalidEntry { .. } => ErrorKind::InvalidEntry,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NoMatch { .. } => ErrorKind::NoMatch,
            Self::CycleDetected { .. } => ErrorKind::CycleDetected,
            Self::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }
}

/// Various errors that can occur while building or configuring a [`System`][crate::System].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A range starts before the end of the previous range.
    #[error("range {start:#x}-{end:#x} overlaps the previous range")]
    Overlap {
        /// The start of the offending range.
        start: u64,
        /// The end of the offending range.
        end: u64,
    },
    /// A range does not start right after the previous range.
    #[error("gap before range starting at {start:#x}")]
    Gap {
        /// The start of the offending range.
        start: u64,
    },
    /// A range ends before it starts.
    #[error("range {start:#x}-{end:#x} ends before it starts")]
    Inverted {
        /// The start of the offending range.
        start: u64,
        /// The end of the offending range.
        end: u64,
    },
    /// A range follows a range that already reaches the end of the address space.
    #[error("range starting at {start:#x} lies past the end of the address space")]
    Overflow {
        /// The start of the offending range.
        start: u64,
    },
    /// A paging form has too few or too many fields.
    #[error("paging form needs 2 to {max} fields, got {count}")]
    FieldCount {
        /// The number of fields given.
        count: usize,
        /// The maximum number of fields.
        max: usize,
    },
    /// A paging form field is empty or the fields do not fit in 64 bits.
    #[error("paging form fields must be non-empty and total at most 64 bits, got {0:?}")]
    FieldBits(alloc::vec::Vec<u8>),
    /// A memory array method has invalid parameters.
    #[error("invalid memory array: {0}")]
    BadMemArr(&'static str),
    /// An option key is not recognized.
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    /// An option requires a value but none was given.
    #[error("Missing value for option '{0}'")]
    MissingValue(String),
    /// An option value cannot be parsed.
    #[error("'{value}' is not a valid value for option '{key}'")]
    BadValue {
        /// The option key.
        key: String,
        /// The rejected value.
        value: String,
    },
    /// An option string ends inside a quoted section.
    #[error("Unterminated {0} quotes")]
    Unterminated(&'static str),
    /// The configurator does not support the requested setup.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),
}
