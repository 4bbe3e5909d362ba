//! Definitions of the z/Architecture DAT table entries as they appear in a memory snapshot.
#![no_std]

pub mod paging;
