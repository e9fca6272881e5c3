//! Discover capture devices and show their register state.

use anyhow::Result;
use cx88_driver::{DeviceManager, RegisterAccessor, RegisterCatalog};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("cx88_driver=info")
        .init();

    let manager = DeviceManager::discover()?;
    println!("CX2388x capture devices: {}", manager.device_count());
    println!();

    let catalog = RegisterCatalog::video_core()?;

    for info in manager.devices() {
        println!("[{}] {} @ {}", info.index, info.path().display(), info.pci_address());

        let window = info.open_window()?;
        let regs = RegisterAccessor::new(&catalog, &window);

        for name in ["HLOCK", "VPRES", "FMT", "YADC_SEL", "FIELD_CNT"] {
            for (label, value) in regs.get(name)? {
                println!("     {label:12} {value} ({value:#x})");
            }
        }
        println!();
    }

    Ok(())
}
