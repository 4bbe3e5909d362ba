//! Address model and snapshot access traits shared by the translation engine.
#![no_std]

extern crate alloc;

pub mod access;
pub mod address;
