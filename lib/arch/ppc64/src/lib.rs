//! Definitions of the 64-bit POWER Linux page-table entries as they appear in a memory snapshot.
#![no_std]

pub mod paging;
