//! Typed addresses and the address spaces they live in.

use core::{fmt, str::FromStr};

/// The address spaces found in a kernel memory snapshot.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum AddressSpace {
    /// Kernel physical address space.
    KPhysAddr,
    /// Machine physical address space.
    ///
    /// Differs from [`AddressSpace::KPhysAddr`] only under paravirtualized hypervisors.
    MachPhysAddr,
    /// Kernel virtual address space.
    KVAddr,
    /// Sentinel for "no address". Never dereferenced.
    NoAddr,
}

impl AddressSpace {
    /// Returns the canonical upper-case name of the [`AddressSpace`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::KPhysAddr => "KPHYSADDR",
            Self::MachPhysAddr => "MACHPHYSADDR",
            Self::KVAddr => "KVADDR",
            Self::NoAddr => "NOADDR",
        }
    }

    /// Returns the numeric code of the [`AddressSpace`], or [`None`] for
    /// [`AddressSpace::NoAddr`].
    pub const fn code(self) -> Option<u8> {
        match self {
            Self::KPhysAddr => Some(0),
            Self::MachPhysAddr => Some(1),
            Self::KVAddr => Some(2),
            Self::NoAddr => None,
        }
    }

    /// Returns the [`AddressSpace`] with the given numeric code.
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::KPhysAddr),
            1 => Some(Self::MachPhysAddr),
            2 => Some(Self::KVAddr),
            _ => None,
        }
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AddressSpace {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let candidates = [
            Self::KPhysAddr,
            Self::MachPhysAddr,
            Self::KVAddr,
            Self::NoAddr,
        ];
        if let Some(space) = candidates
            .into_iter()
            .find(|space| space.name().eq_ignore_ascii_case(s))
        {
            return Ok(space);
        }

        parse_number(s)
            .and_then(Self::from_code)
            .ok_or(ParseAddressError::UnknownSpace)
    }
}

/// An address value tagged with the [`AddressSpace`] it belongs to.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct FullAddress {
    /// The address space the value is interpreted in.
    space: AddressSpace,
    /// The raw address value.
    value: u64,
}

impl FullAddress {
    /// The "no address" sentinel.
    pub const NONE: Self = Self::new(AddressSpace::NoAddr, 0);

    /// Constructs a new [`FullAddress`].
    pub const fn new(space: AddressSpace, value: u64) -> Self {
        Self { space, value }
    }

    /// Constructs a new kernel physical [`FullAddress`].
    pub const fn kphys(value: u64) -> Self {
        Self::new(AddressSpace::KPhysAddr, value)
    }

    /// Constructs a new machine physical [`FullAddress`].
    pub const fn machphys(value: u64) -> Self {
        Self::new(AddressSpace::MachPhysAddr, value)
    }

    /// Constructs a new kernel virtual [`FullAddress`].
    pub const fn kv(value: u64) -> Self {
        Self::new(AddressSpace::KVAddr, value)
    }

    /// Returns the [`AddressSpace`] of this [`FullAddress`].
    pub const fn space(self) -> AddressSpace {
        self.space
    }

    /// Returns the raw value of this [`FullAddress`].
    pub const fn value(self) -> u64 {
        self.value
    }

    /// Returns `true` if this [`FullAddress`] is the "no address" sentinel.
    pub const fn is_none(self) -> bool {
        matches!(self.space, AddressSpace::NoAddr)
    }

    /// Returns a [`FullAddress`] in the same space, advanced by `offset` modulo 2^64.
    #[must_use]
    pub const fn wrapping_add(self, offset: u64) -> Self {
        Self::new(self.space, self.value.wrapping_add(offset))
    }

    /// Returns a [`FullAddress`] in the same space with `value` replacing the current value.
    #[must_use]
    pub const fn with_value(self, value: u64) -> Self {
        Self::new(self.space, value)
    }
}

impl fmt::Display for FullAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str(AddressSpace::NoAddr.name())
        } else {
            write!(f, "{}:{:#x}", self.space, self.value)
        }
    }
}

impl FromStr for FullAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(AddressSpace::NoAddr.name()) {
            return Ok(Self::NONE);
        }

        let (space, value) = s.split_once(':').ok_or(ParseAddressError::MissingSeparator)?;
        let space = space.parse::<AddressSpace>()?;
        let value = parse_number(value).ok_or(ParseAddressError::InvalidValue)?;
        Ok(Self::new(space, value))
    }
}

/// Various errors that can occur when parsing an [`AddressSpace`] or a [`FullAddress`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, thiserror::Error)]
pub enum ParseAddressError {
    /// The address space is neither a known name nor a known numeric code.
    #[error("unknown address space")]
    UnknownSpace,
    /// The `SPACE:value` separator is missing.
    #[error("missing ':' between address space and value")]
    MissingSeparator,
    /// The value is not a number.
    #[error("invalid address value")]
    InvalidValue,
}

/// Parses an unsigned number, accepting a `0x` prefix for hexadecimal and a leading `0` for
/// octal.
pub fn parse_number(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8).ok()
    } else {
        s.parse::<u64>().ok()
    }
}

/// A description of which values are valid inputs to an address space.
///
/// Used to decide whether a virtual address fits a paging form, either as a zero-extended or as a
/// sign-extended canonical value.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct AddressSpaceDescriptor {
    /// The number of valid bits in the address space.
    implemented_bits: u8,
    /// If `true`, the upper bits must replicate bit `implemented_bits - 1`.
    sign_extend_canonical: bool,
}

impl AddressSpaceDescriptor {
    /// Constructs a new [`AddressSpaceDescriptor`].
    ///
    /// Values of `implemented_bits` above 64 are clamped to 64.
    pub const fn new(implemented_bits: u8, sign_extend_canonical: bool) -> Self {
        let implemented_bits = if implemented_bits > 64 {
            64
        } else {
            implemented_bits
        };

        Self {
            implemented_bits,
            sign_extend_canonical,
        }
    }

    /// Returns the number of implemented bits.
    pub const fn implemented_bits(self) -> u8 {
        self.implemented_bits
    }

    /// Returns `true` if canonical values are sign extended.
    pub const fn sign_extended_canonical(self) -> bool {
        self.sign_extend_canonical
    }

    /// Returns `true` if `address` is a valid value of the described address space.
    pub const fn is_valid(self, address: u64) -> bool {
        if self.implemented_bits == 64 {
            return true;
        } else if self.implemented_bits == 0 {
            return address == 0;
        }

        let mask = (1u64 << self.implemented_bits) - 1;
        if !self.sign_extend_canonical {
            return address <= mask;
        }

        let upper_bits = address & !mask;
        if address & (1u64 << (self.implemented_bits - 1)) == 0 {
            upper_bits == 0
        } else {
            upper_bits == !mask
        }
    }

    /// Returns `address` with the bits above the implemented width cleared.
    pub const fn truncate(self, address: u64) -> u64 {
        if self.implemented_bits == 64 {
            address
        } else {
            address & ((1u64 << self.implemented_bits) - 1)
        }
    }

    /// Returns the inclusive ranges of valid values.
    ///
    /// A zero-extended space has a single range, in which case the second entry is [`None`].
    pub const fn valid_ranges(self) -> [Option<(u64, u64)>; 2] {
        if self.implemented_bits == 64 {
            return [Some((0, u64::MAX)), None];
        } else if self.implemented_bits == 0 {
            return [Some((0, 0)), None];
        }

        if !self.sign_extend_canonical {
            return [Some((0, (1u64 << self.implemented_bits) - 1)), None];
        }

        let sign_bit = 1u64 << (self.implemented_bits - 1);
        [
            Some((0, sign_bit - 1)),
            Some(((!0u64) << (self.implemented_bits - 1), u64::MAX)),
        ]
    }
}
