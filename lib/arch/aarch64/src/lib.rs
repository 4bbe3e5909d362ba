//! Definitions of the `aarch64` VMSAv8-64 translation table descriptors as they appear in a
//! memory snapshot.
#![no_std]

pub mod paging;
