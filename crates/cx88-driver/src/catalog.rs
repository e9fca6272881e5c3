//! Register catalog: named bit-fields bound to cluster addresses.
//!
//! Built once at startup from the static table in `cx88-chip` and immutable
//! afterwards. Sub-clusters are expanded here, at build time, into a flat
//! name map: a tagged address becomes its own single-address cluster and
//! every field on the parent is replicated onto it under `NAME_TAG`.
//!
//! Duplicate names or duplicate concrete addresses are table bugs, not
//! runtime conditions: building fails with [`CxError::ConfigIntegrity`].

use crate::error::{CxError, Result};
use cx88_chip::{AccessMode, ClusterDef};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// One address covered by a cluster, with its sub-cluster tag if any.
#[derive(Debug, Clone)]
pub struct AddressSlot {
    /// Byte offset into the register window.
    pub addr: u32,
    /// Derived-name suffix for this address, uppercase.
    pub tag: Option<String>,
    /// Tag description as written in the table.
    pub tag_description: Option<String>,
}

/// Field summary kept on the cluster for describe output.
#[derive(Debug, Clone)]
struct FieldLine {
    name: String,
    mode: AccessMode,
    offset: u8,
    length: u8,
    description: String,
}

/// A group of physical addresses sharing one field layout.
#[derive(Debug)]
pub struct Cluster {
    description: String,
    addresses: Vec<AddressSlot>,
    fields: Vec<FieldLine>,
}

impl Cluster {
    /// Human description of the group.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Addresses covered, in table order.
    #[must_use]
    pub fn addresses(&self) -> &[AddressSlot] {
        &self.addresses
    }

    /// Render the cluster and the fields laid out on it.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for slot in &self.addresses {
            match (&slot.tag, &slot.tag_description) {
                (Some(tag), Some(desc)) => {
                    let _ = writeln!(
                        out,
                        "{:#08x}: {} xxx_{tag} : {desc}",
                        slot.addr, self.description
                    );
                }
                _ => {
                    let _ = writeln!(out, "{:#08x}: {}", slot.addr, self.description);
                }
            }
        }
        for f in &self.fields {
            let _ = writeln!(
                out,
                "    {:>5} : {} : {:10} : {}",
                bit_range(f.offset, f.length),
                f.mode.tag(),
                f.name,
                f.description.replace('\n', " ")
            );
        }
        out
    }
}

/// A named bit-field within every word of a cluster.
#[derive(Debug)]
pub struct Register {
    name: String,
    description: String,
    mode: AccessMode,
    offset: u8,
    length: u8,
    cluster: Arc<Cluster>,
}

impl Register {
    /// Canonical (uppercase) register name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Access mode.
    #[must_use]
    pub const fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Bit offset of the field's LSB.
    #[must_use]
    pub const fn offset(&self) -> u8 {
        self.offset
    }

    /// Bit length of the field.
    #[must_use]
    pub const fn length(&self) -> u8 {
        self.length
    }

    /// Owning cluster.
    #[must_use]
    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    /// In-word mask: `((1 << length) - 1) << offset`.
    #[must_use]
    pub fn mask(&self) -> u32 {
        (((1u64 << self.length) - 1) as u32) << self.offset
    }

    /// Labels for the values this register yields, one per covered address.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.cluster
            .addresses
            .iter()
            .map(|slot| match &slot.tag {
                Some(tag) => format!("{}_{tag}", self.name),
                None => self.name.clone(),
            })
            .collect()
    }

    /// Render address coverage, mode, bit range and description.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for slot in &self.cluster.addresses {
            let suffix = slot
                .tag
                .as_ref()
                .map(|t| format!("_{t}"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{:#08x} {}:{:>5} : {}{suffix}",
                slot.addr,
                self.mode.tag(),
                bit_range(self.offset, self.length),
                self.name
            );
        }
        for line in self.description.lines() {
            let _ = writeln!(out, "    {line}");
        }
        out
    }
}

fn bit_range(offset: u8, length: u8) -> String {
    if length == 1 {
        format!("{offset}")
    } else {
        format!("{offset}:{}", offset + length - 1)
    }
}

/// The built, immutable register catalog.
#[derive(Debug)]
pub struct RegisterCatalog {
    registers: HashMap<String, Arc<Register>>,
    names: Vec<String>,
    clusters_by_addr: HashMap<u32, Arc<Cluster>>,
}

impl RegisterCatalog {
    /// Build a catalog from the chip's video core table.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::ConfigIntegrity`] on duplicate names, duplicate
    /// concrete addresses, misaligned addresses or fields spilling past bit
    /// 31. All are fatal table bugs.
    pub fn video_core() -> Result<Self> {
        Self::build(cx88_chip::VIDEO_CORE)
    }

    /// Build a catalog from an arbitrary cluster table.
    ///
    /// # Errors
    ///
    /// See [`RegisterCatalog::video_core`].
    pub fn build(table: &[ClusterDef]) -> Result<Self> {
        let mut catalog = Self {
            registers: HashMap::new(),
            names: Vec::new(),
            clusters_by_addr: HashMap::new(),
        };

        for def in table {
            catalog.add_cluster(def)?;
        }

        tracing::debug!(
            "Register catalog built: {} registers, {} addressable words",
            catalog.registers.len(),
            catalog.clusters_by_addr.len()
        );
        Ok(catalog)
    }

    fn add_cluster(&mut self, def: &ClusterDef) -> Result<()> {
        let field_lines: Vec<FieldLine> = def
            .fields
            .iter()
            .map(|f| FieldLine {
                name: f.name.to_uppercase(),
                mode: f.mode,
                offset: f.offset,
                length: f.length,
                description: f.description.to_string(),
            })
            .collect();

        let mut slots = Vec::new();
        let mut subs: Vec<(String, Arc<Cluster>)> = Vec::new();

        for a in def.addresses {
            if a.addr % 4 != 0 {
                return Err(CxError::config_integrity(format!(
                    "misaligned address {:#08x} in \"{}\"",
                    a.addr, def.description
                )));
            }
            match a.tag {
                Some(tag_desc) => {
                    let tag = tag_desc
                        .split_whitespace()
                        .next()
                        .unwrap_or(tag_desc)
                        .to_uppercase();
                    let sub = Arc::new(Cluster {
                        description: format!("{} : {tag_desc}", def.description),
                        addresses: vec![AddressSlot {
                            addr: a.addr,
                            tag: None,
                            tag_description: None,
                        }],
                        fields: field_lines
                            .iter()
                            .map(|f| FieldLine {
                                name: format!("{}_{tag}", f.name),
                                ..f.clone()
                            })
                            .collect(),
                    });
                    self.index_address(a.addr, &sub)?;
                    slots.push(AddressSlot {
                        addr: a.addr,
                        tag: Some(tag.clone()),
                        tag_description: Some(tag_desc.to_string()),
                    });
                    subs.push((tag, sub));
                }
                None => {
                    slots.push(AddressSlot {
                        addr: a.addr,
                        tag: None,
                        tag_description: None,
                    });
                }
            }
        }

        let cluster = Arc::new(Cluster {
            description: def.description.to_string(),
            addresses: slots,
            fields: field_lines,
        });

        // Untagged addresses are the cluster's own words; tagged ones were
        // already indexed through their sub-cluster.
        for slot in &cluster.addresses {
            if slot.tag.is_none() {
                self.index_address(slot.addr, &cluster)?;
            }
        }

        for f in def.fields {
            if f.length == 0 || u32::from(f.offset) + u32::from(f.length) > 32 {
                return Err(CxError::config_integrity(format!(
                    "field {} bit range {}+{} does not fit a 32-bit word",
                    f.name, f.offset, f.length
                )));
            }
            self.add_register(Register {
                name: f.name.to_uppercase(),
                description: f.description.to_string(),
                mode: f.mode,
                offset: f.offset,
                length: f.length,
                cluster: Arc::clone(&cluster),
            })?;
            for (tag, sub) in &subs {
                self.add_register(Register {
                    name: format!("{}_{tag}", f.name.to_uppercase()),
                    description: f.description.to_string(),
                    mode: f.mode,
                    offset: f.offset,
                    length: f.length,
                    cluster: Arc::clone(sub),
                })?;
            }
        }

        Ok(())
    }

    fn index_address(&mut self, addr: u32, cluster: &Arc<Cluster>) -> Result<()> {
        if self.clusters_by_addr.contains_key(&addr) {
            return Err(CxError::config_integrity(format!(
                "duplicate address {addr:#08x}"
            )));
        }
        self.clusters_by_addr.insert(addr, Arc::clone(cluster));
        Ok(())
    }

    fn add_register(&mut self, register: Register) -> Result<()> {
        let name = register.name.clone();
        if self.registers.contains_key(&name) {
            return Err(CxError::config_integrity(format!(
                "duplicate register name {name}"
            )));
        }
        self.names.push(name.clone());
        self.registers.insert(name, Arc::new(register));
        Ok(())
    }

    /// Look up a register by name, case-insensitively.
    #[must_use]
    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers.get(&name.to_uppercase()).map(Arc::as_ref)
    }

    /// Look up the cluster owning a concrete address.
    #[must_use]
    pub fn cluster_at(&self, addr: u32) -> Option<&Cluster> {
        self.clusters_by_addr.get(&addr).map(Arc::as_ref)
    }

    /// All register names, in table order (derived names follow their base).
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
