//! Translation methods.

use core::{fmt, str::FromStr};

use alloc::{sync::Arc, vec::Vec};
use memory::address::{AddressSpace, AddressSpaceDescriptor, FullAddress};

use crate::{
    context::Context,
    error::{ConfigError, Error},
    step::Step,
    system::System,
};

/// The maximum number of fields in a [`PagingForm`].
pub const FIELDS_MAX: usize = 8;

/// The kind of a [`Method`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum MethodKind {
    /// Unconfigured slot.
    NoMeth,
    /// Caller-supplied resolver.
    Custom,
    /// Fixed offset.
    Linear,
    /// Page-table walk.
    Pgt,
    /// Table lookup.
    Lookup,
    /// Memory array indirection.
    MemArr,
}

impl MethodKind {
    /// Returns the upper-case name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoMeth => "NOMETH",
            Self::Custom => "CUSTOM",
            Self::Linear => "LINEAR",
            Self::Pgt => "PGT",
            Self::Lookup => "LOOKUP",
            Self::MemArr => "MEMARR",
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A page-table entry format.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum PteFormat {
    /// No format; walking fails with [`Error::NotImplemented`].
    None,
    /// 32-bit page frame numbers.
    Pfn32,
    /// 64-bit page frame numbers.
    Pfn64,
    /// AArch64 with 48-bit output addresses.
    Aarch64,
    /// AArch64 with `FEAT_LPA` 52-bit output addresses.
    Aarch64Lpa,
    /// AArch64 with `FEAT_LPA2` 52-bit output addresses.
    Aarch64Lpa2,
    /// IA-32 non-PAE paging.
    Ia32,
    /// IA-32 PAE paging.
    Ia32Pae,
    /// x86-64 long mode paging.
    X86_64,
    /// z/Architecture dynamic address translation.
    S390x,
    /// 64-bit POWER Linux page tables with an RPN shift of 30.
    Ppc64LinuxRpn30,
}

impl PteFormat {
    /// All formats.
    pub const ALL: [Self; 11] = [
        Self::None,
        Self::Pfn32,
        Self::Pfn64,
        Self::Aarch64,
        Self::Aarch64Lpa,
        Self::Aarch64Lpa2,
        Self::Ia32,
        Self::Ia32Pae,
        Self::X86_64,
        Self::S390x,
        Self::Ppc64LinuxRpn30,
    ];

    /// Returns the lower-case name of the format.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pfn32 => "pfn32",
            Self::Pfn64 => "pfn64",
            Self::Aarch64 => "aarch64",
            Self::Aarch64Lpa => "aarch64_lpa",
            Self::Aarch64Lpa2 => "aarch64_lpa2",
            Self::Ia32 => "ia32",
            Self::Ia32Pae => "ia32_pae",
            Self::X86_64 => "x86_64",
            Self::S390x => "s390x",
            Self::Ppc64LinuxRpn30 => "ppc64_linux_rpn30",
        }
    }

    /// Returns the size of a single entry, in bytes.
    pub const fn entry_size(self) -> u8 {
        match self {
            Self::Pfn32 | Self::Ia32 => 4,
            _ => 8,
        }
    }

    /// Returns `true` if input addresses are sign-extended canonical values.
    pub const fn sign_extended(self) -> bool {
        matches!(
            self,
            Self::X86_64 | Self::Aarch64 | Self::Aarch64Lpa | Self::Aarch64Lpa2
        )
    }

    /// Returns `true` if input bits above the paging form are ignored rather than validated.
    pub const fn ignores_high_bits(self) -> bool {
        matches!(self, Self::Ppc64LinuxRpn30)
    }
}

impl fmt::Display for PteFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PteFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::Unsupported(alloc::format!("PTE format {s}")))
    }
}

/// The shape of a page-table walk: an entry format and the bit widths of the address fields.
///
/// Fields are ordered most significant first; the last field is the in-page offset.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PagingForm {
    /// The page-table entry format.
    format: PteFormat,
    /// Field widths, most significant first.
    fields: Vec<u8>,
}

impl PagingForm {
    /// Constructs a new [`PagingForm`].
    ///
    /// # Errors
    ///
    /// - [`ConfigError::FieldCount`]: Returned if there are fewer than 2 or more than
    ///   [`FIELDS_MAX`] fields.
    /// - [`ConfigError::FieldBits`]: Returned if a field is empty or the fields total more than
    ///   64 bits.
    pub fn new(format: PteFormat, fields: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let fields = fields.into();
        if !(2..=FIELDS_MAX).contains(&fields.len()) {
            return Err(ConfigError::FieldCount {
                count: fields.len(),
                max: FIELDS_MAX,
            });
        }

        let total = fields.iter().map(|&bits| u32::from(bits)).sum::<u32>();
        if fields.contains(&0) || total > 64 {
            return Err(ConfigError::FieldBits(fields));
        }

        Ok(Self { format, fields })
    }

    /// Returns the page-table entry format.
    pub const fn format(&self) -> PteFormat {
        self.format
    }

    /// Returns the field widths, most significant first.
    pub fn fields(&self) -> &[u8] {
        &self.fields
    }

    /// Returns the number of table levels.
    pub fn levels(&self) -> usize {
        self.fields.len() - 1
    }

    /// Returns the width of the in-page offset.
    pub fn page_shift(&self) -> u8 {
        self.fields.last().copied().unwrap_or(0)
    }

    /// Returns the total number of translated address bits.
    pub fn total_bits(&self) -> u8 {
        self.fields.iter().sum()
    }

    /// Returns the [`AddressSpaceDescriptor`] of valid input addresses.
    pub fn input_descriptor(&self) -> AddressSpaceDescriptor {
        AddressSpaceDescriptor::new(self.total_bits(), self.format.sign_extended())
    }
}

/// Parameters of [`Method::Linear`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct LinearParams {
    /// The output address space.
    pub target_as: AddressSpace,
    /// The offset added to the input address, modulo 2^64.
    pub off: i64,
}

/// Parameters of [`Method::Pgt`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct PgtParams {
    /// The output address space.
    pub target_as: AddressSpace,
    /// The address of the top-level table.
    pub root: FullAddress,
    /// Bits cleared from every entry before decoding.
    pub pte_mask: u64,
    /// The entry format and field widths.
    pub form: PagingForm,
}

/// One entry of a [`Method::Lookup`] table.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct LookupEntry {
    /// The first input address covered by the entry.
    pub orig: u64,
    /// The output address of `orig`.
    pub dest: u64,
}

/// Parameters of [`Method::Lookup`].
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct LookupParams {
    /// The output address space.
    pub target_as: AddressSpace,
    /// The largest offset from an entry's `orig` that the entry still covers.
    pub endoff: u64,
    /// Entries sorted by `orig`.
    table: Vec<LookupEntry>,
}

impl LookupParams {
    /// Returns the entries, sorted by `orig`.
    pub fn table(&self) -> &[LookupEntry] {
        &self.table
    }

    /// Returns the output for `addr`, or [`None`] if no entry covers it.
    pub fn resolve(&self, addr: u64) -> Option<u64> {
        let count = self.table.partition_point(|entry| entry.orig <= addr);
        let entry = self.table[..count].last()?;

        let delta = addr - entry.orig;
        (delta <= self.endoff).then(|| entry.dest.wrapping_add(delta))
    }
}

/// Parameters of [`Method::MemArr`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct MemArrParams {
    /// The output address space.
    pub target_as: AddressSpace,
    /// The address of the first array element.
    pub base: FullAddress,
    /// The input address is shifted right by this many bits to get the index.
    pub shift: u8,
    /// The size of each element, in bytes.
    pub elemsz: u64,
    /// The size of the value stored in each element, in bytes.
    pub valsz: u8,
}

/// A caller-supplied resolver.
pub trait CustomTranslate {
    /// Translates `addr`.
    ///
    /// # Errors
    ///
    /// Returns any [`Error`]; it aborts the translation in progress.
    fn translate(&self, ctx: &Context<'_>, addr: FullAddress) -> Result<FullAddress, Error>;
}

/// Parameters of [`Method::Custom`].
#[derive(Clone)]
pub struct CustomMethod {
    /// The output address space, informational only.
    pub target_as: AddressSpace,
    /// The resolver.
    resolver: Arc<dyn CustomTranslate + Send + Sync>,
}

impl CustomMethod {
    /// Invokes the resolver.
    ///
    /// # Errors
    ///
    /// Returns whatever the resolver returns.
    pub fn translate(&self, ctx: &Context<'_>, addr: FullAddress) -> Result<FullAddress, Error> {
        self.resolver.translate(ctx, addr)
    }
}

impl fmt::Debug for CustomMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomMethod")
            .field("target_as", &self.target_as)
            .finish_non_exhaustive()
    }
}

/// A translation method.
#[derive(Clone, Debug, Default)]
pub enum Method {
    /// Unconfigured slot.
    #[default]
    NoMeth,
    /// Caller-supplied resolver.
    Custom(CustomMethod),
    /// Adds a fixed offset.
    Linear(LinearParams),
    /// Walks a page table.
    Pgt(PgtParams),
    /// Looks the address up in a sorted table.
    Lookup(LookupParams),
    /// Reads the output from an in-memory array indexed by the input.
    MemArr(MemArrParams),
}

impl Method {
    /// Constructs a [`Method::Linear`].
    pub const fn linear(target_as: AddressSpace, off: i64) -> Self {
        Self::Linear(LinearParams { target_as, off })
    }

    /// Constructs a [`Method::Pgt`] with an empty PTE mask.
    pub const fn pgt(target_as: AddressSpace, root: FullAddress, form: PagingForm) -> Self {
        Self::Pgt(PgtParams {
            target_as,
            root,
            pte_mask: 0,
            form,
        })
    }

    /// Constructs a [`Method::Lookup`], sorting `table` by `orig`.
    pub fn lookup(target_as: AddressSpace, endoff: u64, mut table: Vec<LookupEntry>) -> Self {
        table.sort_unstable();
        Self::Lookup(LookupParams {
            target_as,
            endoff,
            table,
        })
    }

    /// Constructs a [`Method::MemArr`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BadMemArr`] if `valsz` is not 1, 2, 4 or 8, exceeds `elemsz`, or
    /// if `shift` is 64 or more.
    pub fn memarr(
        target_as: AddressSpace,
        base: FullAddress,
        shift: u8,
        elemsz: u64,
        valsz: u8,
    ) -> Result<Self, ConfigError> {
        if !matches!(valsz, 1 | 2 | 4 | 8) {
            return Err(ConfigError::BadMemArr("value size must be 1, 2, 4 or 8"));
        }
        if u64::from(valsz) > elemsz {
            return Err(ConfigError::BadMemArr("value size exceeds element size"));
        }
        if shift >= 64 {
            return Err(ConfigError::BadMemArr("shift must be below 64"));
        }

        Ok(Self::MemArr(MemArrParams {
            target_as,
            base,
            shift,
            elemsz,
            valsz,
        }))
    }

    /// Constructs a [`Method::Custom`].
    pub fn custom(
        target_as: AddressSpace,
        resolver: impl CustomTranslate + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(CustomMethod {
            target_as,
            resolver: Arc::new(resolver),
        })
    }

    /// Returns the [`MethodKind`] of this [`Method`].
    pub const fn kind(&self) -> MethodKind {
        match self {
            Self::NoMeth => MethodKind::NoMeth,
            Self::Custom(_) => MethodKind::Custom,
            Self::Linear(_) => MethodKind::Linear,
            Self::Pgt(_) => MethodKind::Pgt,
            Self::Lookup(_) => MethodKind::Lookup,
            Self::MemArr(_) => MethodKind::MemArr,
        }
    }

    /// Returns the output address space, or [`None`] for [`Method::NoMeth`].
    pub const fn target_as(&self) -> Option<AddressSpace> {
        match self {
            Self::NoMeth => None,
            Self::Custom(params) => Some(params.target_as),
            Self::Linear(params) => Some(params.target_as),
            Self::Pgt(params) => Some(params.target_as),
            Self::Lookup(params) => Some(params.target_as),
            Self::MemArr(params) => Some(params.target_as),
        }
    }

    /// Executes this [`Method`] on `input`.
    ///
    /// `sys` is consulted only for memory reads in address spaces the read callback cannot
    /// access directly.
    ///
    /// # Errors
    ///
    /// Returns any error produced while executing the method; see [`Step`].
    pub fn apply(
        &self,
        ctx: &Context<'_>,
        sys: Option<&System>,
        input: FullAddress,
    ) -> Result<FullAddress, Error> {
        let mut step = Step::new(ctx, sys, self);
        step.launch(input)?;
        step.walk()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())?;
        match self {
            Self::NoMeth | Self::Custom(_) => Ok(()),
            Self::Linear(params) => {
                write!(f, "\n  target_as={}", params.target_as)?;
                write!(f, "\n  off={:#x}", params.off)
            }
            Self::Pgt(params) => {
                write!(f, "\n  target_as={}", params.target_as)?;
                write!(f, "\n  root={}", params.root)?;
                write!(f, "\n  pte_format={}", params.form.format())?;
                if params.pte_mask != 0 {
                    write!(f, "\n  pte_mask={:#x}", params.pte_mask)?;
                }
                f.write_str("\n  fields=")?;
                for (i, bits) in params.form.fields().iter().enumerate() {
                    if i != 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{bits}")?;
                }
                Ok(())
            }
            Self::Lookup(params) => {
                write!(f, "\n  target_as={}", params.target_as)?;
                write!(f, "\n  endoff={:#x}", params.endoff)?;
                for entry in params.table() {
                    write!(f, "\n  {:x} -> {:x}", entry.orig, entry.dest)?;
                }
                Ok(())
            }
            Self::MemArr(params) => {
                write!(f, "\n  target_as={}", params.target_as)?;
                write!(f, "\n  base={}", params.base)?;
                write!(f, "\n  shift={}", params.shift)?;
                write!(f, "\n  elemsz={}", params.elemsz)?;
                write!(f, "\n  valsz={}", params.valsz)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use alloc::{string::ToString, vec};
    use memory::address::{AddressSpace, FullAddress};

    use super::{LookupEntry, Method, PagingForm, PteFormat};
    use crate::{context::Context, error::ConfigError, error::ErrorKind};

    #[test]
    fn linear_wraps_around() {
        let ctx = Context::new();
        let meth = Method::linear(AddressSpace::KPhysAddr, 0x10);

        assert_eq!(
            meth.apply(&ctx, None, FullAddress::kv(0xFFFF_FFFF_FFFF_FFF8)),
            Ok(FullAddress::kphys(0x8))
        );

        let meth = Method::linear(AddressSpace::KPhysAddr, -0x10);
        assert_eq!(
            meth.apply(&ctx, None, FullAddress::kv(0x8)),
            Ok(FullAddress::kphys(0xFFFF_FFFF_FFFF_FFF8))
        );
    }

    #[test]
    fn lookup_boundaries() {
        let ctx = Context::new();
        let meth = Method::lookup(
            AddressSpace::KPhysAddr,
            0xFFF,
            vec![
                LookupEntry {
                    orig: 0x5000,
                    dest: 0x9000,
                },
                LookupEntry {
                    orig: 0x1000,
                    dest: 0x7000,
                },
            ],
        );

        assert_eq!(
            meth.apply(&ctx, None, FullAddress::kv(0x1FFF)),
            Ok(FullAddress::kphys(0x7FFF))
        );
        assert_eq!(
            meth.apply(&ctx, None, FullAddress::kv(0x2000))
                .map_err(|err| err.kind()),
            Err(ErrorKind::NotFound)
        );
        assert_eq!(
            meth.apply(&ctx, None, FullAddress::kv(0xFFF))
                .map_err(|err| err.kind()),
            Err(ErrorKind::NotFound)
        );
        assert_eq!(
            meth.apply(&ctx, None, FullAddress::kv(0x5123)),
            Ok(FullAddress::kphys(0x9123))
        );
    }

    #[test]
    fn paging_form_validation() {
        assert!(PagingForm::new(PteFormat::X86_64, [9, 9, 9, 9, 12]).is_ok());
        assert_eq!(
            PagingForm::new(PteFormat::Pfn64, [12]),
            Err(ConfigError::FieldCount { count: 1, max: 8 })
        );
        assert!(matches!(
            PagingForm::new(PteFormat::Pfn64, [32, 32, 1]),
            Err(ConfigError::FieldBits(_))
        ));

        let form = PagingForm::new(PteFormat::Ia32Pae, [2, 9, 9, 12]).unwrap();
        assert_eq!(form.levels(), 3);
        assert_eq!(form.page_shift(), 12);
        assert_eq!(form.total_bits(), 32);
    }

    #[test]
    fn memarr_validation() {
        let base = FullAddress::kphys(0);

        assert!(Method::memarr(AddressSpace::KPhysAddr, base, 12, 8, 4).is_ok());
        assert!(Method::memarr(AddressSpace::KPhysAddr, base, 12, 8, 3).is_err());
        assert!(Method::memarr(AddressSpace::KPhysAddr, base, 12, 2, 4).is_err());
        assert!(Method::memarr(AddressSpace::KPhysAddr, base, 64, 8, 8).is_err());
    }

    #[test]
    fn pte_format_names() {
        for format in PteFormat::ALL {
            assert_eq!(format.name().parse::<PteFormat>(), Ok(format));
        }
        assert_eq!("X86_64".parse::<PteFormat>(), Ok(PteFormat::X86_64));
    }

    #[test]
    fn display() {
        let meth = Method::pgt(
            AddressSpace::MachPhysAddr,
            FullAddress::machphys(0x1000),
            PagingForm::new(PteFormat::X86_64, [9, 9, 9, 9, 12]).unwrap(),
        );
        assert_eq!(
            meth.to_string(),
            "PGT\n  target_as=MACHPHYSADDR\n  root=MACHPHYSADDR:0x1000\n  \
             pte_format=x86_64\n  fields=9,9,9,9,12"
        );

        let meth = Method::linear(AddressSpace::KPhysAddr, -0x1000);
        assert_eq!(
            meth.to_string(),
            "LINEAR\n  target_as=KPHYSADDR\n  off=0xfffffffffffff000"
        );
    }
}
