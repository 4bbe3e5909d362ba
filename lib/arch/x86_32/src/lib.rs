//! Definitions of the 32-bit `x86` paging structures as they appear in a memory snapshot.
#![no_std]

pub mod paging;
