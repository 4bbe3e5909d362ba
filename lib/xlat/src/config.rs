//! Configurators that populate a [`System`] for a particular snapshot.

use alloc::{format, string::String, vec, vec::Vec};
use memory::address::{AddressSpace, FullAddress};

use crate::{
    context::Context,
    error::ConfigError,
    layout::Region,
    map::MapEntry,
    method::{Method, PagingForm, PgtParams, PteFormat},
    options::{Arch, OsType, Options},
    system::{SysMap, SysMethod, System},
};

/// Populates the methods and maps of a [`System`].
pub trait Configurator {
    /// Configures `system` according to `options`.
    ///
    /// `ctx` may be used to read registers or probe memory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the options describe a setup the configurator does not
    /// support.
    fn configure(
        &self,
        system: &mut System,
        ctx: &Context<'_>,
        options: &Options,
    ) -> Result<(), ConfigError>;
}

/// An OS-agnostic [`Configurator`] that needs no kernel symbols.
///
/// It installs a [`Method::Pgt`] for the architecture, binds the whole canonical virtual address
/// space to it and maps kernel physical addresses 1:1 to machine physical addresses. For Linux
/// it additionally installs the fixed kernel mappings it can derive from the options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Generic;

impl Configurator for Generic {
    fn configure(
        &self,
        system: &mut System,
        ctx: &Context<'_>,
        options: &Options,
    ) -> Result<(), ConfigError> {
        let arch = options
            .arch
            .ok_or_else(|| ConfigError::MissingValue("arch".into()))?;

        if options.os_type == Some(OsType::Xen)
            || options.xen_p2m_mfn.is_some()
            || options.xen_xlat.is_some()
        {
            log::debug!("Xen translation options are ignored");
        }

        let phys_bits = options.phys_bits.unwrap_or(default_phys_bits(arch));
        if phys_bits == 0 || phys_bits > 64 {
            return Err(unsupported(format!("{phys_bits} physical address bits")));
        }
        let max_phys = if arch == Arch::Ppc64 && options.os_type == Some(OsType::Linux) {
            PPC64_LINUX_MAX_PHYS
        } else {
            low_mask(phys_bits)
        };
        system.set_physmaps(max_phys)?;
        log::debug!("{arch}: physical maps cover 0x0-{max_phys:#x}");

        let root = root_table(arch, ctx, options);
        let form = match arch {
            Arch::X86_64 => x86_64_form(options)?,
            Arch::Ia32 => fixed_page_size(options, 0x1000, arch)
                .and_then(|()| PagingForm::new(PteFormat::Ia32, [10, 10, 12]))?,
            Arch::Ia32Pae => fixed_page_size(options, 0x1000, arch)
                .and_then(|()| PagingForm::new(PteFormat::Ia32Pae, [2, 9, 9, 12]))?,
            Arch::Aarch64 => aarch64_form(options, phys_bits)?,
            Arch::S390x => s390x_form(system, ctx, options, root)?,
            Arch::Ppc64 => fixed_page_size(options, 0x1_0000, arch)
                .and_then(|()| PagingForm::new(PteFormat::Ppc64LinuxRpn30, [4, 12, 12, 16]))?,
        };
        log::debug!(
            "{arch}: {} paging with fields {:?}, root {root}",
            form.format(),
            form.fields()
        );

        let pgt = PgtParams {
            target_as: AddressSpace::MachPhysAddr,
            root,
            pte_mask: options.pte_mask.unwrap_or(0),
            form,
        };
        let ranges = if pgt.form.format().ignores_high_bits() {
            [Some((0, u64::MAX)), None]
        } else {
            pgt.form.input_descriptor().valid_ranges()
        };

        match (arch, options.os_type) {
            (Arch::Ppc64, Some(OsType::Linux)) => {
                let mut user = pgt.clone();
                user.root = FullAddress::NONE;
                system.set_method(SysMethod::Pgt, Method::Pgt(pgt));
                system.set_method(SysMethod::Upgt, Method::Pgt(user));
                system.set_method(
                    SysMethod::Direct,
                    Method::linear(AddressSpace::KPhysAddr, PPC64_LINUX_DIRECT_OFFSET),
                );

                system.set_layout(SysMap::KvPhys, &PPC64_LINUX_LAYOUT)?;
                system.set_layout(SysMap::Hw, &PPC64_LINUX_LAYOUT)?;
            }
            _ => {
                system.set_method(SysMethod::Pgt, Method::Pgt(pgt));
                for (first, last) in ranges.into_iter().flatten() {
                    log::debug!("binding {first:#x}-{last:#x} to METH_PGT");
                    for role in [SysMap::KvPhys, SysMap::Hw] {
                        system
                            .map_mut(role)
                            .set(MapEntry::new(first, last, Some(SysMethod::Pgt)))?;
                    }
                }
            }
        }

        if let (Arch::X86_64, Some(OsType::Linux), Some(phys_base)) =
            (arch, options.os_type, options.phys_base)
        {
            let off = wrapping_offset(X86_64_KTEXT_START, phys_base);
            log::debug!("kernel text mapped at phys_base {phys_base:#x}");
            system.set_method(
                SysMethod::Ktext,
                Method::linear(AddressSpace::KPhysAddr, off),
            );
            system.map_mut(SysMap::KvPhys).set(MapEntry::new(
                X86_64_KTEXT_START,
                X86_64_KTEXT_END,
                Some(SysMethod::Ktext),
            ))?;
        }

        Ok(())
    }
}

/// The start of the x86-64 Linux kernel text mapping.
const X86_64_KTEXT_START: u64 = 0xFFFF_FFFF_8000_0000;
/// The last address of the x86-64 Linux kernel text mapping.
const X86_64_KTEXT_END: u64 = 0xFFFF_FFFF_BFFF_FFFF;

/// The offset from the POWER Linux direct mapping to physical addresses.
const PPC64_LINUX_DIRECT_OFFSET: i64 = 0x4000_0000_0000_0000;
/// The highest physical address reachable with 30-bit real page numbers.
const PPC64_LINUX_MAX_PHYS: u64 = (1 << 50) - 1;

/// The POWER Linux kernel virtual address layout.
const PPC64_LINUX_LAYOUT: [Region; 5] = [
    Region::new(0x0000_0000_0000_0000, 0x0000_0FFF_FFFF_FFFF, SysMethod::Upgt),
    Region::new(0xC000_0000_0000_0000, 0xCFFF_FFFF_FFFF_FFFF, SysMethod::Direct).direct(),
    Region::new(0xD000_0000_0000_0000, 0xD000_07FF_FFFF_FFFF, SysMethod::Pgt),
    Region::new(0xD000_0800_0000_0000, 0xD000_0FFF_FFFF_FFFF, SysMethod::Pgt),
    Region::new(0xF000_0000_0000_0000, 0xFFFF_FFFF_FFFF_FFFF, SysMethod::Vmemmap),
];

// Control register masks of the top-level table address.
const X86_64_CR3_MASK: u64 = 0x000F_FFFF_FFFF_F000;
const IA32_CR3_MASK: u64 = 0xFFFF_F000;
const IA32_PAE_CR3_MASK: u64 = 0xFFFF_FFE0;
const AARCH64_TTBR_BADDR_MASK: u64 = 0x0000_FFFF_FFFF_FFFE;
const AARCH64_TTBR_BADDR_LPA_MASK: u64 = 0x0000_FFFF_FFFF_FFC0;
const AARCH64_TTBR_BADDR_HIGH_MASK: u64 = 0x3C;
const AARCH64_TTBR_BADDR_HIGH_SHIFT: u32 = 46;
const S390X_ASCE_ORIGIN_MASK: u64 = !0xFFF;

/// The number of entries in an s390x region or segment table.
const S390X_TABLE_ENTRIES: u64 = 2048;

/// Returns the number of physical address bits assumed for `arch`.
const fn default_phys_bits(arch: Arch) -> u8 {
    match arch {
        Arch::X86_64 | Arch::Ia32Pae => 52,
        Arch::Ia32 => 32,
        Arch::Aarch64 => 48,
        Arch::S390x => 64,
        Arch::Ppc64 => 50,
    }
}

/// Returns the top-level table, from `rootpgt` or the architecture's translation base register.
fn root_table(arch: Arch, ctx: &Context<'_>, options: &Options) -> FullAddress {
    if let Some(root) = options.root_pgt {
        return root;
    }

    let register = match arch {
        Arch::X86_64 | Arch::Ia32 | Arch::Ia32Pae => "cr3",
        Arch::Aarch64 => "ttbr1_el1",
        Arch::S390x => "cr1",
        Arch::Ppc64 => {
            log::debug!("ppc64: no root page table given");
            return FullAddress::NONE;
        }
    };

    match ctx.read_register(register) {
        Ok(value) => FullAddress::machphys(register_table_address(arch, value, options)),
        Err(err) => {
            log::debug!("{arch}: no root page table: {err}");
            FullAddress::NONE
        }
    }
}

/// Extracts the top-level table address from the translation base register `value`.
fn register_table_address(arch: Arch, value: u64, options: &Options) -> u64 {
    match arch {
        Arch::X86_64 => value & X86_64_CR3_MASK,
        Arch::Ia32 => value & IA32_CR3_MASK,
        Arch::Ia32Pae => value & IA32_PAE_CR3_MASK,
        Arch::Aarch64 if options.phys_bits == Some(52) && options.page_size == Some(0x1_0000) => {
            (value & AARCH64_TTBR_BADDR_LPA_MASK)
                | ((value & AARCH64_TTBR_BADDR_HIGH_MASK) << AARCH64_TTBR_BADDR_HIGH_SHIFT)
        }
        Arch::Aarch64 => value & AARCH64_TTBR_BADDR_MASK,
        Arch::S390x | Arch::Ppc64 => value & S390X_ASCE_ORIGIN_MASK,
    }
}

/// Fails unless the page size option is unset or equals `size`.
fn fixed_page_size(options: &Options, size: u64, arch: Arch) -> Result<(), ConfigError> {
    match options.page_size {
        Some(page_size) if page_size != size => {
            Err(unsupported(format!("{arch} with {page_size}-byte pages")))
        }
        _ => Ok(()),
    }
}

/// Returns the x86-64 paging form for 4-level or 5-level paging.
fn x86_64_form(options: &Options) -> Result<PagingForm, ConfigError> {
    fixed_page_size(options, 0x1000, Arch::X86_64)?;

    let five_level = options.virt_bits == Some(x86_64::paging::VIRTUAL_ADDRESS_BITS_5_LEVEL);
    let levels = options.levels.unwrap_or(if five_level { 5 } else { 4 });
    let fields = match levels {
        4 => vec![9, 9, 9, 9, 12],
        5 => vec![9, 9, 9, 9, 9, 12],
        _ => return Err(unsupported(format!("x86_64 with {levels} paging levels"))),
    };

    PagingForm::new(PteFormat::X86_64, fields)
}

/// Returns the AArch64 paging form for the configured granule and virtual address size.
fn aarch64_form(options: &Options, phys_bits: u8) -> Result<PagingForm, ConfigError> {
    let page_size = options.page_size.unwrap_or(0x1000);
    let granule_shift: u8 = match page_size {
        0x1000 => 12,
        0x4000 => 14,
        0x1_0000 => 16,
        _ => {
            return Err(unsupported(format!(
                "aarch64 with {page_size}-byte pages"
            )));
        }
    };

    let virt_bits = options.virt_bits.unwrap_or(48);
    if virt_bits <= granule_shift || virt_bits > 52 {
        return Err(unsupported(format!(
            "aarch64 with {virt_bits} virtual address bits"
        )));
    }

    let index_bits = granule_shift - 3;
    let mut fields = Vec::new();
    let mut remaining = virt_bits - granule_shift;
    while remaining > 0 {
        let bits = remaining.min(index_bits);
        fields.push(bits);
        remaining -= bits;
    }
    fields.reverse();
    fields.push(granule_shift);

    if let Some(levels) = options.levels.filter(|&levels| {
        usize::try_from(levels).ok() != Some(fields.len() - 1)
    }) {
        return Err(unsupported(format!(
            "aarch64 with {levels} paging levels for {virt_bits}-bit addresses"
        )));
    }

    let format = match (phys_bits, granule_shift) {
        (52, 16) => PteFormat::Aarch64Lpa,
        (52, _) => PteFormat::Aarch64Lpa2,
        _ => PteFormat::Aarch64,
    };

    PagingForm::new(format, fields)
}

/// Returns the s390x paging form, probing the root table if the number of levels is not given.
fn s390x_form(
    system: &System,
    ctx: &Context<'_>,
    options: &Options,
    root: FullAddress,
) -> Result<PagingForm, ConfigError> {
    fixed_page_size(options, 0x1000, Arch::S390x)?;

    let levels = match options.levels {
        Some(levels) => levels,
        None => s390x_probe_levels(system, ctx, root).unwrap_or_else(|| {
            log::debug!("s390x: cannot determine paging levels, assuming 4");
            4
        }),
    };
    if !(2..=5).contains(&levels) {
        return Err(unsupported(format!("s390x with {levels} paging levels")));
    }

    let regions = usize::try_from(levels - 2).unwrap_or(0);
    let mut fields = vec![11; regions];
    fields.extend([11, 8, 12]);
    PagingForm::new(PteFormat::S390x, fields)
}

/// Derives the number of s390x paging levels from the type of the first valid root entry.
fn s390x_probe_levels(system: &System, ctx: &Context<'_>, root: FullAddress) -> Option<u32> {
    if root.is_none() {
        return None;
    }

    for index in 0..S390X_TABLE_ENTRIES {
        let addr = root.wrapping_add(index * s390x::paging::ENTRY_SIZE);
        let raw = ctx
            .read_uint(Some(system), addr, 8, "root table entry", 0)
            .inspect_err(|err| log::debug!("s390x: probing root table failed: {err}"))
            .ok()?;

        let entry = s390x::paging::TableEntry::from_bits(raw);
        if !entry.invalid() {
            let levels = u32::try_from(entry.table_type_bits()).ok()? + 2;
            log::debug!("s390x: root entry {index} implies {levels} paging levels");
            return Some(levels);
        }
    }

    None
}

/// Returns the signed offset that maps `from` onto `to`, modulo 2^64.
#[expect(clippy::as_conversions)]
#[expect(clippy::cast_possible_wrap, reason = "offsets are applied modulo 2^64")]
const fn wrapping_offset(from: u64, to: u64) -> i64 {
    to.wrapping_sub(from) as i64
}

/// Returns a mask of the low `bits` bits.
const fn low_mask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Constructs a [`ConfigError::Unsupported`].
fn unsupported(what: String) -> ConfigError {
    ConfigError::Unsupported(what)
}

#[cfg(test)]
mod test {
    use memory::{
        access::ByteOrder,
        address::{AddressSpace, FullAddress},
    };

    use super::{Configurator, Generic};
    use crate::{
        context::Context,
        error::{ConfigError, Error, Slot},
        method::{Method, PteFormat},
        options::Options,
        system::{SysMap, SysMethod, System},
        test_util::{Registers, Snapshot},
    };

    fn configure(ctx: &Context<'_>, options: &str) -> Result<System, ConfigError> {
        let mut sys = System::new();
        Generic.configure(&mut sys, ctx, &Options::parse(options)?)?;
        Ok(sys)
    }

    fn pgt_form(sys: &System) -> (PteFormat, alloc::vec::Vec<u8>) {
        match sys.method(SysMethod::Pgt) {
            Method::Pgt(params) => (params.form.format(), params.form.fields().to_vec()),
            other => panic!("unexpected METH_PGT: {other:?}"),
        }
    }

    fn pgt_root(sys: &System) -> FullAddress {
        match sys.method(SysMethod::Pgt) {
            Method::Pgt(params) => params.root,
            other => panic!("unexpected METH_PGT: {other:?}"),
        }
    }

    #[test]
    fn x86_64_walks_to_kernel_physical() {
        let mut snapshot = Snapshot::new();
        let pml4 = 0x1000;
        let pdpt = 0x2000;
        let pd = 0x3000;
        let pt = 0x4000;
        // 0xFFFF_8000_0020_1040: PML4 256, PDPT 0, PD 1, PT 1.
        snapshot.write_u64(FullAddress::machphys(pml4 + 256 * 8), pdpt | 0x3);
        snapshot.write_u64(FullAddress::machphys(pdpt), pd | 0x3);
        snapshot.write_u64(FullAddress::machphys(pd + 8), pt | 0x3);
        snapshot.write_u64(FullAddress::machphys(pt + 8), 0x0012_3000 | 0x3);

        let ctx = Context::new().with_memory(&snapshot);
        let sys = configure(&ctx, "arch=x86_64 rootpgt=MACHPHYSADDR:0x1000").unwrap();

        assert_eq!(
            sys.translate(
                &ctx,
                FullAddress::kv(0xFFFF_8000_0020_1040),
                AddressSpace::KPhysAddr
            ),
            Ok(FullAddress::kphys(0x0012_3040))
        );
        assert_eq!(
            sys.translate(
                &ctx,
                FullAddress::kv(0x0000_8000_0000_0000),
                AddressSpace::KPhysAddr
            ),
            Err(Error::NoMatch {
                map: SysMap::KvPhys,
                addr: 0x0000_8000_0000_0000
            })
        );
    }

    #[test]
    fn root_from_registers() {
        let registers = Registers(&[
            ("cr3", 0x0000_0001_2345_6018),
            ("ttbr1_el1", 0x0001_0000_4000_0001),
            ("cr1", 0x0000_0000_0012_300B),
        ]);
        let ctx = Context::new().with_registers(&registers);

        let sys = configure(&ctx, "arch=x86_64").unwrap();
        assert_eq!(pgt_root(&sys), FullAddress::machphys(0x0000_0001_2345_6000));

        let sys = configure(&ctx, "arch=ia32").unwrap();
        assert_eq!(pgt_root(&sys), FullAddress::machphys(0x2345_6000));

        let sys = configure(&ctx, "arch=ia32_pae").unwrap();
        assert_eq!(pgt_root(&sys), FullAddress::machphys(0x2345_6000));

        let sys = configure(&ctx, "arch=aarch64").unwrap();
        assert_eq!(pgt_root(&sys), FullAddress::machphys(0x4000_0000));

        let sys = configure(&ctx, "arch=s390x levels=3").unwrap();
        assert_eq!(pgt_root(&sys), FullAddress::machphys(0x0012_3000));

        let sys = configure(&Context::new(), "arch=x86_64").unwrap();
        assert!(pgt_root(&sys).is_none());
        assert_eq!(
            sys.translate(
                &Context::new(),
                FullAddress::kv(0xFFFF_8000_0000_0000),
                AddressSpace::KPhysAddr
            ),
            Err(Error::Unconfigured { slot: Slot::Root })
        );
    }

    #[test]
    fn x86_forms() {
        let ctx = Context::new();

        assert_eq!(
            pgt_form(&configure(&ctx, "arch=x86_64").unwrap()),
            (PteFormat::X86_64, alloc::vec![9, 9, 9, 9, 12])
        );
        assert_eq!(
            pgt_form(&configure(&ctx, "arch=x86_64 levels=5").unwrap()),
            (PteFormat::X86_64, alloc::vec![9, 9, 9, 9, 9, 12])
        );
        assert_eq!(
            pgt_form(&configure(&ctx, "arch=x86_64 virt_bits=57").unwrap()).1.len(),
            6
        );
        assert_eq!(
            pgt_form(&configure(&ctx, "arch=ia32").unwrap()),
            (PteFormat::Ia32, alloc::vec![10, 10, 12])
        );
        assert_eq!(
            pgt_form(&configure(&ctx, "arch=ia32_pae").unwrap()),
            (PteFormat::Ia32Pae, alloc::vec![2, 9, 9, 12])
        );

        let sys = configure(&ctx, "arch=x86_64 levels=5").unwrap();
        assert_eq!(
            sys.map(SysMap::Hw)
                .unwrap()
                .lookup(0xFF00_0000_0000_0000),
            Some(SysMethod::Pgt)
        );
        assert_eq!(
            sys.map(SysMap::Hw)
                .unwrap()
                .lookup(0x0100_0000_0000_0000),
            None
        );
    }

    #[test]
    fn aarch64_forms() {
        let ctx = Context::new();

        assert_eq!(
            pgt_form(&configure(&ctx, "arch=aarch64").unwrap()),
            (PteFormat::Aarch64, alloc::vec![9, 9, 9, 9, 12])
        );
        assert_eq!(
            pgt_form(&configure(&ctx, "arch=aarch64 pagesize=65536").unwrap()),
            (PteFormat::Aarch64, alloc::vec![6, 13, 13, 16])
        );
        assert_eq!(
            pgt_form(&configure(&ctx, "arch=aarch64 pagesize=16384 virt_bits=47").unwrap()),
            (PteFormat::Aarch64, alloc::vec![11, 11, 11, 14])
        );
        assert_eq!(
            pgt_form(
                &configure(&ctx, "arch=aarch64 pagesize=0x10000 virt_bits=52 phys_bits=52")
                    .unwrap()
            ),
            (PteFormat::Aarch64Lpa, alloc::vec![10, 13, 13, 16])
        );
        assert_eq!(
            pgt_form(&configure(&ctx, "arch=aarch64 virt_bits=52 phys_bits=52").unwrap()),
            (PteFormat::Aarch64Lpa2, alloc::vec![4, 9, 9, 9, 9, 12])
        );
    }

    #[test]
    fn s390x_levels_from_root_table() {
        let mut snapshot = Snapshot::new().with_byte_order(ByteOrder::Big);
        // An invalid region-second entry followed by a valid one.
        snapshot.write_u64(FullAddress::machphys(0x8000), 0x28);
        snapshot.write_u64(FullAddress::machphys(0x8008), 0x0001_0000 | 0x08);
        let ctx = Context::new().with_memory(&snapshot);

        let sys = configure(&ctx, "arch=s390x rootpgt=MACHPHYSADDR:0x8000").unwrap();
        assert_eq!(
            pgt_form(&sys),
            (PteFormat::S390x, alloc::vec![11, 11, 11, 8, 12])
        );

        let sys = configure(&Context::new(), "arch=s390x").unwrap();
        assert_eq!(pgt_form(&sys).1, alloc::vec![11, 11, 11, 8, 12]);

        let sys = configure(&Context::new(), "arch=s390x levels=5").unwrap();
        assert_eq!(pgt_form(&sys).1, alloc::vec![11, 11, 11, 11, 8, 12]);

        let sys = configure(&Context::new(), "arch=s390x levels=2").unwrap();
        assert_eq!(pgt_form(&sys).1, alloc::vec![11, 8, 12]);
    }

    #[test]
    fn ppc64_linux_layout() {
        let ctx = Context::new();
        let sys = configure(
            &ctx,
            "arch=ppc64 ostype=linux rootpgt=KVADDR:0xC000000001000000",
        )
        .unwrap();

        assert_eq!(
            pgt_form(&sys),
            (PteFormat::Ppc64LinuxRpn30, alloc::vec![4, 12, 12, 16])
        );
        assert_eq!(
            sys.translate(
                &ctx,
                FullAddress::kv(0xC000_0000_0123_4567),
                AddressSpace::KPhysAddr
            ),
            Ok(FullAddress::kphys(0x0123_4567))
        );
        assert_eq!(
            sys.translate(
                &ctx,
                FullAddress::kphys(0x0123_4567),
                AddressSpace::KVAddr
            ),
            Ok(FullAddress::kv(0xC000_0000_0123_4567))
        );
        assert_eq!(
            sys.translate(
                &ctx,
                FullAddress::kv(0xC000_0000_0123_4567),
                AddressSpace::MachPhysAddr
            ),
            Ok(FullAddress::machphys(0x0123_4567))
        );
        assert_eq!(
            sys.translate(&ctx, FullAddress::kv(0x1000), AddressSpace::KPhysAddr),
            Err(Error::Unconfigured { slot: Slot::Root })
        );
        assert_eq!(
            sys.translate(
                &ctx,
                FullAddress::kv(0xF000_0000_0000_0000),
                AddressSpace::KPhysAddr
            ),
            Err(Error::Unconfigured {
                slot: Slot::Method(Some(SysMethod::Vmemmap))
            })
        );
        assert_eq!(
            sys.map(SysMap::KphysMachphys)
                .unwrap()
                .lookup((1 << 50) - 1),
            Some(SysMethod::KphysMachphys)
        );
    }

    #[test]
    fn x86_64_linux_kernel_text() {
        let ctx = Context::new();
        let sys = configure(&ctx, "arch=x86_64 ostype=linux phys_base=0x1000000").unwrap();

        assert_eq!(
            sys.translate(
                &ctx,
                FullAddress::kv(0xFFFF_FFFF_8100_0000),
                AddressSpace::KPhysAddr
            ),
            Ok(FullAddress::kphys(0x0200_0000))
        );
        assert_eq!(
            sys.map(SysMap::KvPhys)
                .unwrap()
                .lookup(0xFFFF_FFFF_C000_0000),
            Some(SysMethod::Pgt)
        );
    }

    #[test]
    fn unsupported_settings() {
        let ctx = Context::new();

        assert_eq!(
            configure(&ctx, "ostype=linux").err(),
            Some(ConfigError::MissingValue("arch".into()))
        );
        assert!(matches!(
            configure(&ctx, "arch=x86_64 pagesize=8192"),
            Err(ConfigError::Unsupported(_))
        ));
        assert!(matches!(
            configure(&ctx, "arch=x86_64 levels=3"),
            Err(ConfigError::Unsupported(_))
        ));
        assert!(matches!(
            configure(&ctx, "arch=aarch64 pagesize=8192"),
            Err(ConfigError::Unsupported(_))
        ));
        assert!(matches!(
            configure(&ctx, "arch=aarch64 levels=3"),
            Err(ConfigError::Unsupported(_))
        ));
        assert!(matches!(
            configure(&ctx, "arch=ppc64 pagesize=4096"),
            Err(ConfigError::Unsupported(_))
        ));
        assert!(matches!(
            configure(&ctx, "arch=s390x levels=6"),
            Err(ConfigError::Unsupported(_))
        ));
        assert!(matches!(
            configure(&ctx, "arch=ia32 phys_bits=65"),
            Err(ConfigError::Unsupported(_))
        ));
        assert!(configure(&ctx, "arch=x86_64 xen_xlat").is_ok());
    }
}
