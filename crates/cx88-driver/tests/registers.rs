//! Register plane tests against a file-backed window with the full video
//! core catalog.

use cx88_driver::{transfer, CxError, MemoryWindow, RegisterAccessor, RegisterCatalog};
use std::path::PathBuf;

/// File-backed stand-in for BAR0, removed on drop.
struct TestWindow {
    window: MemoryWindow,
    dir: PathBuf,
}

impl Drop for TestWindow {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn bar0_stand_in(name: &str) -> TestWindow {
    let dir = std::env::temp_dir().join(format!("cx88-it-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("resource0");
    let size = cx88_chip::pcie::bar0::WINDOW_SIZE;
    std::fs::write(&path, vec![0u8; size]).expect("write window file");
    let window = MemoryWindow::open(&path, size).expect("map window file");
    TestWindow { window, dir }
}

#[test]
fn every_field_round_trips_masked() {
    let catalog = RegisterCatalog::video_core().unwrap();
    let tw = bar0_stand_in("roundtrip");
    let regs = RegisterAccessor::new(&catalog, &tw.window);

    for name in catalog.names() {
        let register = catalog.register(name).unwrap();
        let width = u32::from(register.length());
        let top = 1u64 << width;

        // Full sweep for narrow fields, edges for wide ones.
        let values: Vec<u32> = if width <= 8 {
            (0..top as u32).collect()
        } else {
            vec![0, 1, (top / 2) as u32, (top - 1) as u32]
        };

        for v in values {
            regs.set(name, v).unwrap();
            for (_, got) in regs.get(name).unwrap() {
                assert_eq!(got, v, "field {name} value {v:#x}");
            }
        }

        // Oversized values truncate deterministically through the mask.
        regs.set(name, u32::MAX).unwrap();
        for (_, got) in regs.get(name).unwrap() {
            assert_eq!(got, (top - 1) as u32, "field {name} truncation");
        }
    }
}

#[test]
fn fields_sharing_a_word_do_not_clobber() {
    let catalog = RegisterCatalog::video_core().unwrap();
    let tw = bar0_stand_in("sharing");
    let regs = RegisterAccessor::new(&catalog, &tw.window);

    regs.set("FMT", 4).unwrap();
    regs.set("YADC_SEL", 2).unwrap();
    regs.set("VERTEN", 1).unwrap();

    assert_eq!(regs.get("FMT").unwrap()[0].1, 4);
    assert_eq!(regs.get("YADC_SEL").unwrap()[0].1, 2);
    assert_eq!(regs.get("VERTEN").unwrap()[0].1, 1);

    // The shared word shows all three fields in place.
    let word = tw.window.read_word(0x31_0104).unwrap();
    assert_eq!(word, (2 << 26) | (1 << 15) | 4);
}

#[test]
fn cluster_writes_fan_out() {
    let catalog = RegisterCatalog::video_core().unwrap();
    let tw = bar0_stand_in("fanout");
    let regs = RegisterAccessor::new(&catalog, &tw.window);

    // ADC_REF covers two untagged words; one set writes both.
    regs.set("ADC_REF", 0x15).unwrap();
    assert_eq!(tw.window.read_word(0x31_0230).unwrap(), 0x15);
    assert_eq!(tw.window.read_word(0x31_0234).unwrap(), 0x15);

    // AGC_GAIN replicates across the tagged gain clamps.
    regs.set("AGC_GAIN", 0x123).unwrap();
    let values = regs.get("AGC_GAIN").unwrap();
    let labels: Vec<&str> = values.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(
        labels,
        vec!["AGC_GAIN_INITIAL", "AGC_GAIN_MINIMUM", "AGC_GAIN_MAXIMUM"]
    );
    assert!(values.iter().all(|&(_, v)| v == 0x123));

    // A derived name touches only its own word.
    regs.set("AGC_GAIN_MINIMUM", 0x7).unwrap();
    assert_eq!(regs.get("AGC_GAIN_MINIMUM").unwrap()[0].1, 0x7);
    assert_eq!(regs.get("AGC_GAIN_INITIAL").unwrap()[0].1, 0x123);
}

#[test]
fn export_import_reproduces_register_state() {
    let catalog = RegisterCatalog::video_core().unwrap();
    let tw = bar0_stand_in("export");
    let regs = RegisterAccessor::new(&catalog, &tw.window);

    regs.set("HTOTAL", 0x7ff).unwrap();
    regs.set("YADC_SEL", 2).unwrap();
    regs.set("AGC_KP_TRACK", 0x40).unwrap();
    regs.set("ADC_REF", 0x3f).unwrap();

    let blob = transfer::export_defaults(&tw.window).unwrap();
    let before: Vec<(String, Vec<(String, u32)>)> = catalog
        .names()
        .iter()
        .map(|n| (n.clone(), regs.get(n).unwrap()))
        .collect();

    // Wipe the exported ranges, then restore.
    for &(addr, len) in transfer::EXPORT_RANGES {
        for n in (0..len).step_by(4) {
            tw.window.write_word(addr + n, 0, 0xffff_ffff).unwrap();
        }
    }
    assert_eq!(regs.get("HTOTAL").unwrap()[0].1, 0);

    transfer::import(&tw.window, &blob).unwrap();

    for (name, values) in before {
        // The status word at 0x310100 is outside the exported ranges.
        let register = catalog.register(&name).unwrap();
        if register
            .cluster()
            .addresses()
            .iter()
            .any(|slot| !exported(slot.addr))
        {
            continue;
        }
        assert_eq!(regs.get(&name).unwrap(), values, "register {name}");
    }
}

fn exported(addr: u32) -> bool {
    transfer::EXPORT_RANGES
        .iter()
        .any(|&(base, len)| addr >= base && addr < base + len)
}

#[test]
fn unknown_targets_are_reported_not_fatal() {
    let catalog = RegisterCatalog::video_core().unwrap();
    let tw = bar0_stand_in("unknown");
    let regs = RegisterAccessor::new(&catalog, &tw.window);

    assert!(matches!(
        regs.get("NO_SUCH_REGISTER"),
        Err(CxError::NotFound { .. })
    ));
    assert!(matches!(
        regs.set_text("HTOTAL", "not-a-number"),
        Err(CxError::InvalidValue { .. })
    ));
}

#[test]
fn describe_covers_both_planes() {
    let catalog = RegisterCatalog::video_core().unwrap();
    let tw = bar0_stand_in("describe");
    let regs = RegisterAccessor::new(&catalog, &tw.window);

    let text = regs.describe("HDELAY").unwrap();
    assert!(text.contains("HDELAY_EVEN"));
    assert!(text.contains("0x310124"));

    let text = regs.describe("0x310104").unwrap();
    assert!(text.contains("Input format"));
    assert!(text.contains("YADC_SEL"));
}
