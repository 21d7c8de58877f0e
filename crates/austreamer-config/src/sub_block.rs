//! Sub-block id table.
//!
//! Every algorithm owns a group of four consecutive ids:
//!
//! | Offset | Role |
//! |--------|------|
//! | +0 | parameter block |
//! | +1 | sniffer enable |
//! | +2 | MCPS reporting enable |
//! | +3 | bypass |
//!
//! The downlink mixer has no bypass id. Ids at `0x00..0x7f` belong to the
//! uplink (microphone) path, `0x80..0xdf` to the downlink (speaker) path.
//!
//! | Algorithm | Base | | Algorithm | Base |
//! |-----------|------|-|-----------|------|
//! | UL AEC | `0x00` | | DL PEQ | `0x80` |
//! | UL AGC | `0x08` | | DL DRC | `0x88` |
//! | UL NS | `0x10` | | DL MBDRC | `0x90` |
//! | UL PEQ | `0x18` | | DL gain | `0x98` |
//! | UL DRC | `0x20` | | DL mixer | `0xa0` |
//! | UL WNR | `0x30` | | resampler | `0xb0` |
//! | UL VAD | `0x38` | | | |

use std::fmt;

/// Global sniffer activation (dynamic flag shared by all algorithms).
pub const SNIFFER_ACTIVATE: u16 = 0x35;
/// Prompt playback request.
pub const PROMPT: u16 = 0xe0;
/// Wildcard for "every configuration sub-block".
pub const ALL_CONFIG: u16 = 0xf0;
/// MCPS query; answered by every algorithm with MCPS reporting enabled.
pub const ALL_MCPS: u16 = 0xf1;

/// Algorithms with their own sub-block group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlgoKind {
    /// Uplink acoustic echo canceller.
    Aec,
    /// Uplink automatic gain control.
    Agc,
    /// Uplink noise suppressor.
    Ns,
    /// Uplink parametric EQ.
    UlPeq,
    /// Uplink dynamic range compressor.
    UlDrc,
    /// Uplink wind noise reduction.
    Wnr,
    /// Uplink voice activity detector.
    Vad,
    /// Downlink parametric EQ.
    DlPeq,
    /// Downlink dynamic range compressor.
    DlDrc,
    /// Downlink multiband compressor.
    Mbdrc,
    /// Downlink gain.
    Gain,
    /// Downlink mixer.
    Mixer,
    /// Sample rate converter.
    Resample,
}

impl AlgoKind {
    /// Every algorithm, in id order.
    pub const ALL: [AlgoKind; 13] = [
        AlgoKind::Aec,
        AlgoKind::Agc,
        AlgoKind::Ns,
        AlgoKind::UlPeq,
        AlgoKind::UlDrc,
        AlgoKind::Wnr,
        AlgoKind::Vad,
        AlgoKind::DlPeq,
        AlgoKind::DlDrc,
        AlgoKind::Mbdrc,
        AlgoKind::Gain,
        AlgoKind::Mixer,
        AlgoKind::Resample,
    ];

    /// First id of the group.
    pub const fn base(self) -> u16 {
        match self {
            AlgoKind::Aec => 0x00,
            AlgoKind::Agc => 0x08,
            AlgoKind::Ns => 0x10,
            AlgoKind::UlPeq => 0x18,
            AlgoKind::UlDrc => 0x20,
            AlgoKind::Wnr => 0x30,
            AlgoKind::Vad => 0x38,
            AlgoKind::DlPeq => 0x80,
            AlgoKind::DlDrc => 0x88,
            AlgoKind::Mbdrc => 0x90,
            AlgoKind::Gain => 0x98,
            AlgoKind::Mixer => 0xa0,
            AlgoKind::Resample => 0xb0,
        }
    }

    /// Ids owned by this algorithm.
    pub const fn sub_blocks(self) -> AlgoSubBlocks {
        let base = self.base();
        AlgoSubBlocks {
            config: base,
            sniffer: base + 1,
            mcps: base + 2,
            bypass: match self {
                AlgoKind::Mixer => None,
                _ => Some(base + 3),
            },
        }
    }

    /// Short lowercase name, also used as the registry element type.
    pub const fn name(self) -> &'static str {
        match self {
            AlgoKind::Aec => "aec",
            AlgoKind::Agc => "agc",
            AlgoKind::Ns => "ns",
            AlgoKind::UlPeq => "ul_peq",
            AlgoKind::UlDrc => "ul_drc",
            AlgoKind::Wnr => "wnr",
            AlgoKind::Vad => "vad",
            AlgoKind::DlPeq => "dl_peq",
            AlgoKind::DlDrc => "dl_drc",
            AlgoKind::Mbdrc => "mbdrc",
            AlgoKind::Gain => "gain",
            AlgoKind::Mixer => "mixer",
            AlgoKind::Resample => "resample",
        }
    }

    /// Parses [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for AlgoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The ids of one algorithm group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlgoSubBlocks {
    /// Parameter block.
    pub config: u16,
    /// Sniffer enable.
    pub sniffer: u16,
    /// MCPS reporting enable.
    pub mcps: u16,
    /// Bypass switch, absent for the mixer.
    pub bypass: Option<u16>,
}

impl AlgoSubBlocks {
    /// Whether `id` belongs to this group.
    pub fn contains(&self, id: u16) -> bool {
        id == self.config || id == self.sniffer || id == self.mcps || self.bypass == Some(id)
    }
}

/// What a sub-block id means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubBlockRole {
    /// Parameter block of an algorithm.
    Config(AlgoKind),
    /// Sniffer enable of an algorithm.
    Sniffer(AlgoKind),
    /// MCPS reporting enable of an algorithm.
    Mcps(AlgoKind),
    /// Bypass switch of an algorithm.
    Bypass(AlgoKind),
    /// Global sniffer activation.
    SnifferActivate,
    /// Prompt request.
    Prompt,
    /// Every configuration sub-block.
    AllConfig,
    /// MCPS query.
    AllMcps,
}

impl SubBlockRole {
    /// Looks `id` up in the table.
    pub fn of(id: u16) -> Option<Self> {
        match id {
            SNIFFER_ACTIVATE => return Some(SubBlockRole::SnifferActivate),
            PROMPT => return Some(SubBlockRole::Prompt),
            ALL_CONFIG => return Some(SubBlockRole::AllConfig),
            ALL_MCPS => return Some(SubBlockRole::AllMcps),
            _ => {}
        }
        let kind = AlgoKind::ALL
            .into_iter()
            .find(|k| k.sub_blocks().contains(id))?;
        let ids = kind.sub_blocks();
        Some(if id == ids.config {
            SubBlockRole::Config(kind)
        } else if id == ids.sniffer {
            SubBlockRole::Sniffer(kind)
        } else if id == ids.mcps {
            SubBlockRole::Mcps(kind)
        } else {
            SubBlockRole::Bypass(kind)
        })
    }

    /// Algorithm owning the id, if any.
    pub fn algo(self) -> Option<AlgoKind> {
        match self {
            SubBlockRole::Config(k)
            | SubBlockRole::Sniffer(k)
            | SubBlockRole::Mcps(k)
            | SubBlockRole::Bypass(k) => Some(k),
            _ => None,
        }
    }
}
