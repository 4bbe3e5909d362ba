//! Definitions of the `x86_64` paging structures as they appear in a memory snapshot.
#![no_std]

pub mod paging;
