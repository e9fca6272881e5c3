//! Hex-dump the video core register block and print a restore blob.

use anyhow::Result;
use cx88_driver::{transfer, DeviceManager};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("cx88_driver=warn")
        .init();

    let manager = DeviceManager::discover()?;
    let window = manager.device(0)?.open_window()?;

    for &(base, size) in &[(0x31_0100u32, 0xacu32), (0x31_0200, 0x28)] {
        let words = window.read_block(base, size)?;
        for (row, chunk) in words.chunks(8).enumerate() {
            print!("{:06x}:", base + row as u32 * 0x20);
            for word in chunk {
                print!(" {word:08x}");
            }
            println!();
        }
    }

    println!();
    println!("To restore current settings, import:");
    println!("    {}", transfer::export_defaults(&window)?);

    Ok(())
}
