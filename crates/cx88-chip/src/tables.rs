//! Register and cluster table for the CX2388x video decoder core.
//!
//! This is the pre-parsed configuration the driver builds its catalog from.
//! A cluster is one or more physical addresses sharing a field layout; an
//! address carrying a tag description spawns a named sub-cluster, and every
//! field defined on the cluster is replicated onto it under `NAME_TAG`.
//!
//! Addresses are byte offsets into BAR0. All words are 32-bit.

/// Access mode of a register field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only: writes have no effect or are undefined.
    ReadOnly,
    /// Write-only: reads return undefined data (e.g. write-triggered).
    WriteOnly,
    /// Read-write.
    ReadWrite,
}

impl AccessMode {
    /// Two-letter mode tag as rendered in describe output.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ReadOnly => "ro",
            Self::WriteOnly => "wo",
            Self::ReadWrite => "rw",
        }
    }
}

/// One physical address belonging to a cluster.
#[derive(Debug, Clone, Copy)]
pub struct AddressDef {
    /// Byte offset into BAR0. Must be word-aligned.
    pub addr: u32,
    /// Sub-cluster tag description. The first word, uppercased, becomes the
    /// derived-name suffix. `None` registers the address directly.
    pub tag: Option<&'static str>,
}

/// One named bit-field within a cluster's words.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Unique (case-insensitive) field name.
    pub name: &'static str,
    /// Access mode.
    pub mode: AccessMode,
    /// Bit offset of the field's LSB within the word.
    pub offset: u8,
    /// Bit length, >= 1. `offset + length` must fit in 32.
    pub length: u8,
    /// Human description.
    pub description: &'static str,
}

/// One address group with a shared field layout.
#[derive(Debug, Clone, Copy)]
pub struct ClusterDef {
    /// Human description of the group.
    pub description: &'static str,
    /// Physical addresses covered.
    pub addresses: &'static [AddressDef],
    /// Fields laid out identically on every covered word.
    pub fields: &'static [FieldDef],
}

const fn plain(addr: u32) -> AddressDef {
    AddressDef { addr, tag: None }
}

const fn tagged(addr: u32, tag: &'static str) -> AddressDef {
    AddressDef {
        addr,
        tag: Some(tag),
    }
}

const fn field(
    name: &'static str,
    mode: AccessMode,
    offset: u8,
    length: u8,
    description: &'static str,
) -> FieldDef {
    FieldDef {
        name,
        mode,
        offset,
        length,
        description,
    }
}

use AccessMode::{ReadOnly, ReadWrite};

/// Video decoder core register table (0x3101xx / 0x3102xx block).
pub const VIDEO_CORE: &[ClusterDef] = &[
    ClusterDef {
        description: "Device status",
        addresses: &[plain(0x31_0100)],
        fields: &[
            field("HLOCK", ReadOnly, 0, 1, "Horizontal PLL locked to sync"),
            field("CSC_LOCK", ReadOnly, 1, 1, "Chroma subcarrier PLL locked"),
            field("VPRES", ReadOnly, 3, 1, "Video present (sync activity detected)"),
            field("FIELD", ReadOnly, 5, 1, "Field currently being decoded (0 = odd)"),
        ],
    },
    ClusterDef {
        description: "Input format",
        addresses: &[plain(0x31_0104)],
        fields: &[
            field(
                "FMT",
                ReadWrite,
                0,
                4,
                "Video standard select.\n0 = auto detect\n1 = NTSC-M\n4 = PAL-B/D/G/H/I\n12 = raw ADC passthrough",
            ),
            field("SVIDEO", ReadWrite, 13, 1, "S-Video mode: bypass chroma trap"),
            field("VERTEN", ReadWrite, 15, 1, "Vertical sync processing enable"),
            field("AGC_EN", ReadWrite, 20, 1, "Automatic gain control enable"),
            field(
                "YADC_SEL",
                ReadWrite,
                26,
                2,
                "Luma ADC input mux select (0-3 = video input pins)",
            ),
        ],
    },
    ClusterDef {
        description: "Contrast and brightness",
        addresses: &[plain(0x31_0110)],
        fields: &[
            field("BRIGHT", ReadWrite, 0, 8, "Luma offset, two's complement"),
            field("CONTRAST", ReadWrite, 8, 8, "Luma gain, 0x44 = unity"),
        ],
    },
    ClusterDef {
        description: "Chroma saturation",
        addresses: &[plain(0x31_0114)],
        fields: &[
            field("SAT_U", ReadWrite, 0, 8, "U (B-Y) gain, 0x7f = unity"),
            field("SAT_V", ReadWrite, 8, 8, "V (R-Y) gain, 0x5a = unity"),
        ],
    },
    ClusterDef {
        description: "Hue",
        addresses: &[plain(0x31_0118)],
        fields: &[field(
            "HUE",
            ReadWrite,
            0,
            8,
            "Hue phase adjust, two's complement degrees",
        )],
    },
    ClusterDef {
        description: "Vertical blanking",
        addresses: &[plain(0x31_011c)],
        fields: &[
            field("VBLANK", ReadWrite, 0, 9, "Lines of vertical blanking per field"),
            field("VBLANK_EN", ReadWrite, 15, 1, "Force blanking during VBI lines"),
        ],
    },
    ClusterDef {
        description: "Horizontal timing",
        addresses: &[plain(0x31_0120)],
        fields: &[field(
            "HTOTAL",
            ReadWrite,
            0,
            11,
            "Total sample clocks per line including sync",
        )],
    },
    ClusterDef {
        description: "Horizontal active delay",
        addresses: &[
            tagged(0x31_0124, "EVEN field"),
            tagged(0x31_0128, "ODD field"),
        ],
        fields: &[field(
            "HDELAY",
            ReadWrite,
            0,
            10,
            "Samples from sync edge to active video start",
        )],
    },
    ClusterDef {
        description: "Vertical active delay",
        addresses: &[
            tagged(0x31_012c, "ODD field"),
            tagged(0x31_0130, "EVEN field"),
        ],
        fields: &[field(
            "VDELAY",
            ReadWrite,
            0,
            11,
            "Lines from vertical sync to active video start",
        )],
    },
    ClusterDef {
        description: "Vertical active window",
        addresses: &[
            tagged(0x31_0134, "ODD field"),
            tagged(0x31_0138, "EVEN field"),
        ],
        fields: &[field(
            "VACTIVE",
            ReadWrite,
            0,
            10,
            "Active video lines per field",
        )],
    },
    ClusterDef {
        description: "PLL control",
        addresses: &[plain(0x31_0168)],
        fields: &[
            field("PLL_FRAC", ReadWrite, 0, 20, "PLL fractional divider"),
            field("PLL_INT", ReadWrite, 20, 6, "PLL integer divider"),
            field("PLL_PRE", ReadWrite, 26, 2, "PLL prescaler select"),
        ],
    },
    ClusterDef {
        description: "PLL adjust control",
        addresses: &[plain(0x31_016c)],
        fields: &[
            field(
                "PLL_ADJ_EN",
                ReadWrite,
                0,
                1,
                "Continuous PLL adjustment by the line-lock loop",
            ),
            field("PLL_ADJ_BW", ReadWrite, 1, 3, "Adjustment loop bandwidth"),
        ],
    },
    ClusterDef {
        description: "Sample rate converter",
        addresses: &[plain(0x31_0170)],
        fields: &[field(
            "SCONV",
            ReadWrite,
            0,
            24,
            "Sample rate conversion ratio, 17.7 MHz = 0x20_0000",
        )],
    },
    ClusterDef {
        description: "Capture control",
        addresses: &[plain(0x31_0180)],
        fields: &[
            field("CAP_EVEN", ReadWrite, 0, 1, "Capture even fields"),
            field("CAP_ODD", ReadWrite, 1, 1, "Capture odd fields"),
            field("CAP_VBI_EVEN", ReadWrite, 2, 1, "Capture even-field VBI lines"),
            field("CAP_VBI_ODD", ReadWrite, 3, 1, "Capture odd-field VBI lines"),
            field(
                "RAW_CAPTURE",
                ReadWrite,
                6,
                1,
                "Bypass the decoder: stream raw ADC samples",
            ),
        ],
    },
    ClusterDef {
        description: "Field counter",
        addresses: &[plain(0x31_0190)],
        fields: &[field(
            "FIELD_CNT",
            ReadOnly,
            0,
            16,
            "Free-running count of decoded fields",
        )],
    },
    ClusterDef {
        description: "AGC back porch",
        addresses: &[plain(0x31_0200)],
        fields: &[
            field("BP_REF", ReadWrite, 0, 8, "Back porch reference level"),
            field("BP_DELAY", ReadWrite, 8, 8, "Samples from sync edge to porch sample point"),
        ],
    },
    ClusterDef {
        description: "AGC sync slicer",
        addresses: &[plain(0x31_0204)],
        fields: &[
            field("SYNC_SLICE", ReadWrite, 0, 8, "Sync tip slicing level"),
            field("SLICE_AUTO", ReadWrite, 15, 1, "Track slicing level automatically"),
        ],
    },
    ClusterDef {
        description: "AGC loop coefficients",
        addresses: &[
            tagged(0x31_0208, "TRACK mode loop gains"),
            tagged(0x31_020c, "ACQUIRE mode loop gains"),
        ],
        fields: &[
            field("AGC_KP", ReadWrite, 0, 8, "Proportional gain of the AGC loop"),
            field("AGC_KI", ReadWrite, 8, 8, "Integral gain of the AGC loop"),
        ],
    },
    ClusterDef {
        description: "AGC gain clamps",
        addresses: &[
            tagged(0x31_0214, "INITIAL gain after acquisition"),
            tagged(0x31_0218, "MINIMUM gain clamp"),
            tagged(0x31_021c, "MAXIMUM gain clamp"),
        ],
        fields: &[field("AGC_GAIN", ReadWrite, 0, 12, "ADC gain word")],
    },
    ClusterDef {
        description: "ADC reference trim",
        addresses: &[plain(0x31_0230), plain(0x31_0234)],
        fields: &[field(
            "ADC_REF",
            ReadWrite,
            0,
            6,
            "Reference ladder trim, applied to both converters",
        )],
    },
];

/// Register ranges packed by the settings export blob, in address order.
pub const EXPORT_RANGES: &[(u32, u32)] = &[(0x31_0104, 0xa8), (0x31_0200, 0x28)];
