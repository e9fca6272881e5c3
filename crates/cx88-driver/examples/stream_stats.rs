//! Stream one second of PAL frames and report ring statistics.

use anyhow::Result;
use cx88_driver::{AcquisitionBuffer, DeviceManager, TimingModel};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("cx88_driver=info")
        .init();

    let manager = DeviceManager::discover()?;
    let device = manager.open_first()?;
    println!("Streaming from {}", device.path().display());

    let mut timing = TimingModel::pal(28_636_363);
    let mut ring = AcquisitionBuffer::new()?;
    ring.start(device)?;

    let mut frame = Vec::new();
    for n in 0..25 {
        let count = timing.samples_per_frame() + timing.next_frame_extra();
        frame.resize(count as usize, 0);
        ring.read_into(&mut frame)?;

        println!(
            "frame {n:2}: {count} samples, cutoff {:#04x}, pages head={} tail={}",
            ring.cutoff(),
            ring.head_page(),
            ring.tail_page()
        );
    }

    ring.stop()?;
    println!("Done.");
    Ok(())
}
