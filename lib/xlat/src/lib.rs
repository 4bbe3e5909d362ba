//! Address translation across the address spaces of a kernel memory snapshot.
//!
//! A [`System`] holds a fixed set of translation [`Method`]s and range [`Map`]s. Translating an
//! address selects the map for the requested direction, looks up the method bound to the address,
//! executes it through a [`Step`], and repeats until the goal address space is reached.
#![no_std]

extern crate alloc;

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod layout;
pub mod map;
pub mod method;
pub mod options;
mod pgt;
pub mod step;
pub mod system;
mod walk;

#[cfg(test)]
mod test_util;

pub use memory::{
    access::{ByteOrder, Capabilities, MemoryRead, ReadError, RegisterRead},
    address::{AddressSpace, FullAddress},
};

pub use cache::ReadCache;
pub use config::{Configurator, Generic};
pub use context::Context;
pub use error::{ConfigError, Error, ErrorKind, Slot};
pub use layout::Region;
pub use map::{Map, MapEntry, Range};
pub use method::{
    CustomMethod, CustomTranslate, LinearParams, LookupEntry, LookupParams, MemArrParams, Method,
    MethodKind, PagingForm, PgtParams, PteFormat,
};
pub use options::{Arch, OsType, Options};
pub use step::Step;
pub use system::{SysMap, SysMethod, System};
pub use walk::MAX_HOPS;
