//! Parsing of configurator option strings.
//!
//! An option string is a whitespace-separated list of `key=value` pairs, split at the last
//! unquoted `=`. Keys are matched case-insensitively. Single or double quotes may enclose any part of a pair, which lets values
//! contain white space. A boolean option given without a value is set to `true`.

use core::{fmt, str::FromStr};

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use memory::address::{FullAddress, parse_number};

use crate::error::ConfigError;

/// A CPU architecture understood by the [`Generic`][crate::Generic] configurator.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Arch {
    /// x86-64 with 4-level or 5-level paging.
    X86_64,
    /// IA-32 without PAE.
    Ia32,
    /// IA-32 with PAE.
    Ia32Pae,
    /// AArch64.
    Aarch64,
    /// z/Architecture.
    S390x,
    /// 64-bit POWER.
    Ppc64,
}

impl Arch {
    /// Returns the canonical name of the architecture.
    pub const fn name(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Ia32 => "ia32",
            Self::Ia32Pae => "ia32_pae",
            Self::Aarch64 => "aarch64",
            Self::S390x => "s390x",
            Self::Ppc64 => "ppc64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Arch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arch = match s.to_ascii_lowercase().as_str() {
            "x86_64" | "x86-64" | "amd64" => Self::X86_64,
            "ia32" | "i386" | "i686" | "x86" => Self::Ia32,
            "ia32_pae" | "i386_pae" | "x86_pae" => Self::Ia32Pae,
            "aarch64" | "arm64" => Self::Aarch64,
            "s390x" => Self::S390x,
            "ppc64" | "ppc64le" => Self::Ppc64,
            _ => return Err(bad_value("arch", s)),
        };

        Ok(arch)
    }
}

/// The operating system of the snapshot.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum OsType {
    /// Linux kernel.
    Linux,
    /// Xen hypervisor.
    Xen,
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linux => "linux",
            Self::Xen => "xen",
        })
    }
}

impl FromStr for OsType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("linux") {
            Ok(Self::Linux)
        } else if s.eq_ignore_ascii_case("xen") {
            Ok(Self::Xen)
        } else {
            Err(bad_value("ostype", s))
        }
    }
}

/// Parsed configurator options. Unset options are [`None`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// `arch`: the CPU architecture.
    pub arch: Option<Arch>,
    /// `ostype`: the operating system.
    pub os_type: Option<OsType>,
    /// `osver`: the operating system version code.
    pub os_ver: Option<u64>,
    /// `levels`: the number of page-table levels.
    pub levels: Option<u32>,
    /// `pagesize`: the page size, in bytes.
    pub page_size: Option<u64>,
    /// `phys_bits`: the number of implemented physical address bits.
    pub phys_bits: Option<u8>,
    /// `virt_bits`: the number of implemented virtual address bits.
    pub virt_bits: Option<u8>,
    /// `phys_base`: the physical load address of the kernel.
    pub phys_base: Option<u64>,
    /// `pte_mask`: bits cleared from every page-table entry.
    pub pte_mask: Option<u64>,
    /// `rootpgt`: the address of the top-level page table.
    pub root_pgt: Option<FullAddress>,
    /// `xen_p2m_mfn`: the machine frame of the Xen physical-to-machine table.
    pub xen_p2m_mfn: Option<u64>,
    /// `xen_xlat`: whether Xen translation is in effect.
    pub xen_xlat: Option<bool>,
}

impl Options {
    /// Parses an option string.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownOption`]: Returned if a key is not recognized.
    /// - [`ConfigError::MissingValue`]: Returned if a non-boolean key has no value.
    /// - [`ConfigError::BadValue`]: Returned if a value cannot be parsed.
    /// - [`ConfigError::Unterminated`]: Returned if a quoted section is not closed.
    pub fn parse(opts: &str) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        for (key, value) in tokenize(opts)? {
            options.set(&key, value.as_deref())?;
        }

        Ok(options)
    }

    /// Sets the option called `key` from `value`.
    ///
    /// # Errors
    ///
    /// See [`Options::parse`].
    pub fn set(&mut self, key: &str, value: Option<&str>) -> Result<(), ConfigError> {
        let key = key.to_ascii_lowercase();
        let required = || value.ok_or_else(|| ConfigError::MissingValue(key.clone()));

        match key.as_str() {
            "arch" => self.arch = Some(required()?.parse()?),
            "ostype" => self.os_type = Some(required()?.parse()?),
            "osver" => self.os_ver = Some(number(&key, required()?)?),
            "levels" => self.levels = Some(narrow(&key, required()?)?),
            "pagesize" => self.page_size = Some(number(&key, required()?)?),
            "phys_bits" => self.phys_bits = Some(narrow(&key, required()?)?),
            "virt_bits" => self.virt_bits = Some(narrow(&key, required()?)?),
            "phys_base" => self.phys_base = Some(number(&key, required()?)?),
            "pte_mask" => self.pte_mask = Some(number(&key, required()?)?),
            "rootpgt" => {
                let value = required()?;
                self.root_pgt = Some(value.parse().map_err(|_| bad_value(&key, value))?);
            }
            "xen_p2m_mfn" => self.xen_p2m_mfn = Some(number(&key, required()?)?),
            "xen_xlat" => self.xen_xlat = Some(boolean(&key, value)?),
            _ => return Err(ConfigError::UnknownOption(key)),
        }

        Ok(())
    }
}

impl FromStr for Options {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Splits an option string into keys and optional values, removing quotes.
fn tokenize(opts: &str) -> Result<Vec<(String, Option<String>)>, ConfigError> {
    let mut pairs = Vec::new();
    let mut chars = opts.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        let mut value: Option<String> = None;
        let mut quote: Option<char> = None;
        while let Some(c) = chars.next_if(|&c| quote.is_some() || !c.is_ascii_whitespace()) {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (None, '\'' | '"') => quote = Some(c),
                (None, '=') => {
                    if let Some(previous) = value.replace(String::new()) {
                        key.push('=');
                        key.push_str(&previous);
                    }
                }
                _ => value.as_mut().unwrap_or(&mut key).push(c),
            }
        }

        if let Some(q) = quote {
            return Err(ConfigError::Unterminated(if q == '"' {
                "double"
            } else {
                "single"
            }));
        }
        pairs.push((key, value));
    }

    Ok(pairs)
}

/// Parses a signed or unsigned number; negative values wrap modulo 2^64.
fn number(key: &str, value: &str) -> Result<u64, ConfigError> {
    let parsed = match value.strip_prefix('-') {
        Some(magnitude) => parse_number(magnitude).map(u64::wrapping_neg),
        None => parse_number(value.strip_prefix('+').unwrap_or(value)),
    };

    parsed.ok_or_else(|| bad_value(key, value))
}

/// Parses a non-negative number that must fit in `T`.
fn narrow<T: TryFrom<u64>>(key: &str, value: &str) -> Result<T, ConfigError> {
    parse_number(value)
        .and_then(|number| T::try_from(number).ok())
        .ok_or_else(|| bad_value(key, value))
}

/// Parses a boolean; a missing value means `true`.
fn boolean(key: &str, value: Option<&str>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(true);
    };

    if value.eq_ignore_ascii_case("yes") || value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("no") || value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        number(key, value).map(|number| number != 0)
    }
}

/// Constructs a [`ConfigError::BadValue`].
fn bad_value(key: &str, value: &str) -> ConfigError {
    ConfigError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
