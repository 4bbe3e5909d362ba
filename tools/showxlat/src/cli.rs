//! Command line parsing and [`Action`] construction.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, builder::PossibleValuesParser};
use memory::address::parse_number;
use xlat::{AddressSpace, Arch, ByteOrder, ConfigError, FullAddress};

/// The action to carry out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Print the methods and maps of a configured system.
    Dump(DumpConfig),
    /// Translate an address using page tables from a raw physical image.
    Vtop(VtopConfig),
}

impl Action {
    /// Returns `true` if every page-table level should be logged.
    pub fn trace(&self) -> bool {
        match self {
            Self::Dump(_) => false,
            Self::Vtop(config) => config.trace,
        }
    }
}

/// Arguments of `showxlat dump`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpConfig {
    /// The architecture of the snapshot.
    pub arch: Arch,
    /// Additional configurator options.
    pub options: String,
}

/// Arguments of `showxlat vtop`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VtopConfig {
    /// The architecture of the snapshot.
    pub arch: Arch,
    /// Additional configurator options.
    pub options: String,
    /// The raw physical memory image.
    pub image: PathBuf,
    /// The byte order of values in the image.
    pub byte_order: ByteOrder,
    /// The goal address space.
    pub goal: AddressSpace,
    /// Whether every page-table level should be logged.
    pub trace: bool,
    /// The address to translate.
    pub address: FullAddress,
}

/// Parses `showxlat`'s arguments to construct an [`Action`].
pub fn get_action() -> Action {
    let matches = command_parser().get_matches();

    let Some((subcommand_name, subcommand_matches)) = matches.subcommand() else {
        unreachable!("subcommand is required");
    };
    match subcommand_name {
        "dump" => Action::Dump(parse_dump(subcommand_matches)),
        "vtop" => Action::Vtop(parse_vtop(subcommand_matches)),
        _ => unreachable!("unexpected subcommand: {subcommand_name:?}"),
    }
}

/// Returns the `--arch` argument and the byte order its name implies.
fn arch(matches: &ArgMatches) -> (Arch, ByteOrder) {
    matches
        .get_one::<(Arch, ByteOrder)>("arch")
        .copied()
        .unwrap_or_else(|| unreachable!("`arch` is a required argument"))
}

/// Returns the `--opts` argument, or an empty string.
fn options(matches: &ArgMatches) -> String {
    matches.get_one::<String>("opts").cloned().unwrap_or_default()
}

/// Parses the arguments of `showxlat dump`.
fn parse_dump(matches: &ArgMatches) -> DumpConfig {
    DumpConfig {
        arch: arch(matches).0,
        options: options(matches),
    }
}

/// Parses the arguments of `showxlat vtop`.
fn parse_vtop(matches: &ArgMatches) -> VtopConfig {
    let (arch, native_order) = arch(matches);

    let image = matches
        .get_one::<PathBuf>("image")
        .cloned()
        .unwrap_or_else(|| unreachable!("`image` is a required argument"));

    let goal = match matches.get_one::<String>("to").map(String::as_str) {
        Some("machphys") => AddressSpace::MachPhysAddr,
        _ => AddressSpace::KPhysAddr,
    };

    let address = matches
        .get_one::<FullAddress>("address")
        .copied()
        .unwrap_or_else(|| unreachable!("`address` is a required argument"));

    VtopConfig {
        arch,
        options: options(matches),
        image,
        byte_order: match matches.get_one::<String>("byte-order").map(String::as_str) {
            Some("big") => ByteOrder::Big,
            Some(_) => ByteOrder::Little,
            None => native_order,
        },
        goal,
        trace: matches.get_flag("trace"),
        address,
    }
}

/// Parses an architecture name along with the byte order its page tables are usually stored in.
///
/// A `le` suffix selects little endian; otherwise s390x and ppc64 default to big endian.
fn parse_arch(s: &str) -> Result<(Arch, ByteOrder), ConfigError> {
    let arch = s.parse::<Arch>()?;
    let order = if s.to_ascii_lowercase().ends_with("le") {
        ByteOrder::Little
    } else {
        match arch {
            Arch::S390x | Arch::Ppc64 => ByteOrder::Big,
            _ => ByteOrder::Little,
        }
    };

    Ok((arch, order))
}

/// Parses a kernel virtual address, or a full address of the form `SPACE:value`.
fn parse_address(s: &str) -> Result<FullAddress, String> {
    match parse_number(s) {
        Some(value) => Ok(FullAddress::kv(value)),
        None => s.parse::<FullAddress>().map_err(|err| err.to_string()),
    }
}

/// Returns the arguments shared by every subcommand.
fn common_args() -> [Arg; 2] {
    let arch = Arg::new("arch")
        .long("arch")
        .help("Architecture of the snapshot")
        .value_parser(parse_arch)
        .required(true);

    let opts = Arg::new("opts")
        .long("opts")
        .help("Configurator options, e.g. \"levels=5 rootpgt=MACHPHYSADDR:0x1000\"")
        .env("SHOWXLAT_OPTS");

    [arch, opts]
}

/// Returns the command parser for all [`Action`]s.
fn command_parser() -> Command {
    let dump = Command::new("dump")
        .about("Prints the translation methods and maps of a configured system")
        .args(common_args());

    let image = Arg::new("image")
        .long("image")
        .help("Raw physical memory image; file offsets are physical addresses")
        .value_parser(clap::value_parser!(PathBuf))
        .required(true);
    let byte_order = Arg::new("byte-order")
        .long("byte-order")
        .help("Byte order of the image [default: big for s390x and ppc64 (not ppc64le), little otherwise]")
        .value_parser(PossibleValuesParser::new(["little", "big"]));
    let to = Arg::new("to")
        .long("to")
        .help("Goal address space")
        .value_parser(PossibleValuesParser::new(["kphys", "machphys"]))
        .default_value("kphys");
    let trace = Arg::new("trace")
        .long("trace")
        .help("Log every page-table entry read")
        .action(ArgAction::SetTrue);
    let address = Arg::new("address")
        .help("Kernel virtual address to translate")
        .value_parser(parse_address)
        .required(true);

    let vtop = Command::new("vtop")
        .about("Translates an address using page tables read from a raw physical image")
        .args(common_args())
        .args([image, byte_order, to, trace, address]);

    Command::new("showxlat")
        .about("Inspects address translation of kernel memory snapshots")
        .subcommand(dump)
        .subcommand(vtop)
        .subcommand_required(true)
        .arg_required_else_help(true)
}

#[cfg(test)]
mod test {
    use xlat::{AddressSpace, Arch, ByteOrder, FullAddress};

    use super::{Action, command_parser, parse_address, parse_arch, parse_dump, parse_vtop};

    fn action(args: &[&str]) -> Action {
        let matches = command_parser().try_get_matches_from(args).unwrap();
        let (name, matches) = matches.subcommand().unwrap();
        match name {
            "dump" => Action::Dump(parse_dump(matches)),
            _ => Action::Vtop(parse_vtop(matches)),
        }
    }

    #[test]
    fn command_is_valid() {
        command_parser().debug_assert();
    }

    #[test]
    fn addresses() {
        assert_eq!(
            parse_address("0xffff888000000000"),
            Ok(FullAddress::kv(0xFFFF_8880_0000_0000))
        );
        assert_eq!(
            parse_address("MACHPHYSADDR:0x1000"),
            Ok(FullAddress::machphys(0x1000))
        );
        assert!(parse_address("nowhere").is_err());
    }

    #[test]
    fn vtop_arguments() {
        let Action::Vtop(config) = action(&[
            "showxlat",
            "vtop",
            "--arch",
            "s390x",
            "--image",
            "mem.raw",
            "--to",
            "machphys",
            "--opts",
            "levels=3",
            "0x1000",
        ]) else {
            panic!("expected vtop");
        };

        assert_eq!(config.arch, Arch::S390x);
        assert_eq!(config.byte_order, ByteOrder::Big);
        assert!(!config.trace);
        assert_eq!(config.goal, AddressSpace::MachPhysAddr);
        assert_eq!(config.options, "levels=3");
        assert_eq!(config.address, FullAddress::kv(0x1000));
    }

    #[test]
    fn byte_order_override() {
        let Action::Vtop(config) = action(&[
            "showxlat",
            "vtop",
            "--arch",
            "ppc64le",
            "--image",
            "mem.raw",
            "--byte-order",
            "little",
            "KVADDR:0xc000000000001000",
        ]) else {
            panic!("expected vtop");
        };

        assert_eq!(config.arch, Arch::Ppc64);
        assert_eq!(config.byte_order, ByteOrder::Little);
        assert_eq!(config.goal, AddressSpace::KPhysAddr);
        assert_eq!(config.address, FullAddress::kv(0xC000_0000_0000_1000));
    }

    #[test]
    fn byte_order_follows_arch_name() {
        assert_eq!(parse_arch("ppc64le"), Ok((Arch::Ppc64, ByteOrder::Little)));
        assert_eq!(parse_arch("PPC64LE"), Ok((Arch::Ppc64, ByteOrder::Little)));
        assert_eq!(parse_arch("ppc64"), Ok((Arch::Ppc64, ByteOrder::Big)));
        assert_eq!(parse_arch("x86_64"), Ok((Arch::X86_64, ByteOrder::Little)));

        let Action::Vtop(config) = action(&[
            "showxlat",
            "vtop",
            "--arch",
            "ppc64le",
            "--image",
            "mem.raw",
            "0xc000000000001000",
        ]) else {
            panic!("expected vtop");
        };
        assert_eq!(config.byte_order, ByteOrder::Little);
    }

    #[test]
    fn unknown_arch_is_rejected() {
        assert!(
            command_parser()
                .try_get_matches_from(["showxlat", "dump", "--arch", "vax"])
                .is_err()
        );
    }
}
