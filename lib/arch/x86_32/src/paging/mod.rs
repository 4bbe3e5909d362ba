//! 32-bit paging and PAE paging entries.

pub mod bits_32;
pub mod pae;
