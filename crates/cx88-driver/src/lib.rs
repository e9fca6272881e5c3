//! Userspace control and acquisition driver for CX2388x video digitizers.
//!
//! Two planes, matching the hardware:
//!
//! - **Control**: a register catalog built once from the chip tables, bound
//!   to a memory-mapped BAR0 window. Named bit-fields resolve to masked
//!   word accesses; clusters fan one name out over per-channel addresses.
//! - **Data**: a bounded circular buffer fed by a reader thread pulling raw
//!   ADC samples from the capture node, with a running moving-average
//!   filter and a histogram-derived black/white cutoff.
//!
//! # Quick start
//!
//! ```no_run
//! use cx88_driver::{AcquisitionBuffer, DeviceManager, RegisterAccessor, RegisterCatalog, TimingModel};
//!
//! # fn main() -> cx88_driver::Result<()> {
//! let manager = DeviceManager::discover()?;
//! let info = manager.device(0)?;
//!
//! let catalog = RegisterCatalog::video_core()?;
//! let window = info.open_window()?;
//! let regs = RegisterAccessor::new(&catalog, &window);
//! regs.set("YADC_SEL", 2)?;
//!
//! let mut timing = TimingModel::pal(28_636_363);
//! let mut ring = AcquisitionBuffer::new()?;
//! ring.start(manager.open(0)?)?;
//!
//! let mut frame = vec![0u8; (timing.samples_per_frame() + timing.next_frame_extra()) as usize];
//! ring.read_into(&mut frame)?;
//! ring.stop()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]

mod access;
mod acquire;
mod catalog;
mod device;
mod discovery;
mod error;
mod io;
mod timing;
pub mod transfer;
mod window;

#[cfg(test)]
mod test_util;

pub use access::{parse_u32, RegisterAccessor, Target};
pub use acquire::{AcquisitionBuffer, SampleSource, FILTER_WINDOW, PAGE_COUNT, PAGE_SIZE};
pub use catalog::{AddressSlot, Cluster, Register, RegisterCatalog};
pub use device::CxDevice;
pub use discovery::{DeviceInfo, DeviceManager};
pub use error::{CxError, Result};
pub use timing::TimingModel;
pub use window::MemoryWindow;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        AcquisitionBuffer, CxDevice, CxError, DeviceManager, MemoryWindow, RegisterAccessor,
        RegisterCatalog, Result, SampleSource, TimingModel,
    };
}
