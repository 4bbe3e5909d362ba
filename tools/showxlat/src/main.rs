//! Inspection of the address translation set up for a kernel memory snapshot.
//!
//! `showxlat dump` prints what the generic configurator installs for an architecture, and
//! `showxlat vtop` translates a kernel virtual address against a raw physical memory image.

use std::io::{self, Write};

use anyhow::{Context as _, Result};
use log::LevelFilter;
use xlat::{Configurator, Context, Generic, Options, ReadCache, SysMap, System};

use crate::{
    cli::{Action, DumpConfig, VtopConfig},
    image::RawImage,
};

pub mod cli;
pub mod image;

fn main() -> Result<()> {
    let action = cli::get_action();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default());
    if action.trace() {
        logger.filter_level(LevelFilter::Trace);
    }
    logger.init();

    match action {
        Action::Dump(config) => dump(&config),
        Action::Vtop(config) => vtop(&config),
    }
}

/// Prints every configured method and map.
fn dump(config: &DumpConfig) -> Result<()> {
    let ctx = Context::new();
    let system = configure(&ctx, config.arch, &config.options)?;

    write_dump(&system, &mut io::stdout().lock()).context("error writing dump")
}

/// Writes each configured method followed by a blank line, then every map role, unset ones
/// with only their header.
fn write_dump(system: &System, out: &mut impl Write) -> io::Result<()> {
    for (role, meth) in system.methods() {
        writeln!(out, "METH_{role}: {meth}")?;
        writeln!(out)?;
    }

    for (i, role) in SysMap::ALL.into_iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "MAP_{role}:")?;
        if let Some(map) = system.map(role) {
            write!(out, "{map}")?;
        }
    }

    Ok(())
}

/// Translates the requested address and prints the result.
fn vtop(config: &VtopConfig) -> Result<()> {
    let image = RawImage::open(&config.image, config.byte_order)?;
    let cache = ReadCache::new();
    let ctx = Context::new().with_memory(&image).with_cache(&cache);
    let system = configure(&ctx, config.arch, &config.options)?;

    let result = system
        .translate(&ctx, config.address, config.goal)
        .with_context(|| format!("error translating {}", config.address))?;
    println!("{} -> {result}", config.address);

    Ok(())
}

/// Builds a [`System`] with the [`Generic`] configurator.
fn configure(ctx: &Context<'_>, arch: xlat::Arch, options: &str) -> Result<System> {
    let mut options = options
        .parse::<Options>()
        .context("error parsing configurator options")?;
    options.arch = Some(arch);

    let mut system = System::new();
    Generic
        .configure(&mut system, ctx, &options)
        .context("error configuring translation")?;
    Ok(system)
}

#[cfg(test)]
mod test {
    use xlat::{Arch, Context};

    use super::{configure, write_dump};

    #[test]
    fn dump_lists_every_map_role() {
        let system = configure(&Context::new(), Arch::Ia32, "").unwrap();
        let mut out = Vec::new();
        write_dump(&system, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("METH_PGT: PGT\n"));
        assert!(out.contains("  fields=10,10,12\n\nMETH_MACHPHYS_KPHYS: LINEAR\n"));
        assert!(out.contains("\nMAP_HW:\n0-ffffffff: PGT\n"));
        assert!(out.contains("\n\nMAP_KPHYS_DIRECT:\n\nMAP_MACHPHYS_KPHYS:\n"));
        assert_eq!(out.matches("MAP_").count(), 5);
    }
}
