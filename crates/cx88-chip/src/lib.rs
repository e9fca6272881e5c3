//! Hardware description for the Conexant CX2388x video digitizer family.
//!
//! This crate carries no I/O: it is the static knowledge about the chip that
//! the driver crate binds to live hardware: PCI identity, the BAR0 MMIO
//! window geometry, and the register/cluster table for the video decoder
//! core.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub mod pcie;
pub mod tables;

pub use tables::{AccessMode, AddressDef, ClusterDef, FieldDef, VIDEO_CORE};
