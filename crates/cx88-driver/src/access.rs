//! Named register access over the memory window.
//!
//! Targets resolve in a fixed order: register name first, then cluster by
//! numeric address, then raw aligned address inside the window. The
//! resolver is explicit and tagged so callers can tell what a target meant.
//!
//! Values written to a field are truncated by the field mask rather than
//! range-checked, so an oversized value silently loses its high bits. This is
//! deliberate: saved settings blobs rely on it.

use crate::catalog::{Cluster, Register, RegisterCatalog};
use crate::error::{CxError, Result};
use crate::window::MemoryWindow;

/// A resolved access target.
#[derive(Debug)]
pub enum Target<'a> {
    /// A named bit-field, possibly fanned out over several addresses.
    Register(&'a Register),
    /// A whole cluster of words, addressed numerically.
    Cluster(&'a Cluster),
    /// A bare aligned address inside the window.
    Raw(u32),
}

/// Binds the register catalog to a memory window.
#[derive(Debug, Clone, Copy)]
pub struct RegisterAccessor<'a> {
    catalog: &'a RegisterCatalog,
    window: &'a MemoryWindow,
}

impl<'a> RegisterAccessor<'a> {
    /// Create an accessor over `catalog` and `window`.
    #[must_use]
    pub const fn new(catalog: &'a RegisterCatalog, window: &'a MemoryWindow) -> Self {
        Self { catalog, window }
    }

    /// Resolve `target` in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::NotFound`] if the target is neither a known
    /// register name, a cluster address, nor an aligned in-window address.
    pub fn resolve(&self, target: &str) -> Result<Target<'a>> {
        if let Some(register) = self.catalog.register(target) {
            return Ok(Target::Register(register));
        }
        if let Some(addr) = parse_u32(target) {
            if let Some(cluster) = self.catalog.cluster_at(addr) {
                return Ok(Target::Cluster(cluster));
            }
            if addr % 4 == 0 && (addr as usize) < self.window.size() {
                return Ok(Target::Raw(addr));
            }
        }
        Err(CxError::not_found(target))
    }

    /// Read the target's current value(s), one labelled entry per covered
    /// address, in address order.
    ///
    /// Register entries are shifted and masked to the field width; cluster
    /// and raw entries are whole words labelled by address.
    ///
    /// # Errors
    ///
    /// Propagates resolution and window errors.
    pub fn get(&self, target: &str) -> Result<Vec<(String, u32)>> {
        match self.resolve(target)? {
            Target::Register(register) => {
                let mask = register.mask();
                let shift = register.offset();
                register
                    .cluster()
                    .addresses()
                    .iter()
                    .zip(register.labels())
                    .map(|(slot, label)| {
                        let word = self.window.read_word(slot.addr)?;
                        Ok((label, (word & mask) >> shift))
                    })
                    .collect()
            }
            Target::Cluster(cluster) => cluster
                .addresses()
                .iter()
                .map(|slot| {
                    let word = self.window.read_word(slot.addr)?;
                    Ok((format!("{:#08x}", slot.addr), word))
                })
                .collect(),
            Target::Raw(addr) => {
                let word = self.window.read_word(addr)?;
                Ok(vec![(format!("{addr:#08x}"), word)])
            }
        }
    }

    /// Write `value` to the target, fanning out over every covered address.
    ///
    /// Register writes shift the value into the field position and mask the
    /// store; cluster and raw writes replace the whole word.
    ///
    /// # Errors
    ///
    /// Propagates resolution and window errors.
    pub fn set(&self, target: &str, value: u32) -> Result<()> {
        match self.resolve(target)? {
            Target::Register(register) => {
                let mask = register.mask();
                let shifted = value << register.offset();
                for slot in register.cluster().addresses() {
                    self.window.write_word(slot.addr, shifted, mask)?;
                }
                Ok(())
            }
            Target::Cluster(cluster) => {
                for slot in cluster.addresses() {
                    self.window.write_word(slot.addr, value, 0xffff_ffff)?;
                }
                Ok(())
            }
            Target::Raw(addr) => self.window.write_word(addr, value, 0xffff_ffff),
        }
    }

    /// Parse `value` as an integer and write it to the target.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::InvalidValue`] if `value` does not parse; else as
    /// [`RegisterAccessor::set`].
    pub fn set_text(&self, target: &str, value: &str) -> Result<()> {
        let parsed = parse_u32(value).ok_or_else(|| CxError::invalid_value(value))?;
        self.set(target, parsed)
    }

    /// Render a human description of the target.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors.
    pub fn describe(&self, target: &str) -> Result<String> {
        match self.resolve(target)? {
            Target::Register(register) => Ok(register.describe()),
            Target::Cluster(cluster) => Ok(cluster.describe()),
            Target::Raw(addr) => Ok(format!("Raw address: {addr:#08x}\n")),
        }
    }

    /// The underlying window, for block dumps.
    #[must_use]
    pub const fn window(&self) -> &'a MemoryWindow {
        self.window
    }
}

/// Parse a decimal or `0x`/`0o`/`0b`-prefixed integer.
#[must_use]
pub fn parse_u32(text: &str) -> Option<u32> {
    let text = text.trim();
    let (digits, radix) = match text.get(..2) {
        Some("0x") | Some("0X") => (&text[2..], 16),
        Some("0o") | Some("0O") => (&text[2..], 8),
        Some("0b") | Some("0B") => (&text[2..], 2),
        _ => (text, 10),
    };
    u32::from_str_radix(&digits.replace('_', ""), radix).ok()
}
