//! Typed 16-byte parameter blocks.
//!
//! Every sub-block carries at most [`SUB_BLOCK_SIZE`] bytes of
//! little-endian payload. [`ParamBlock::decode`] interprets the payload
//! according to the id's [`SubBlockRole`]; [`ParamBlock::encode`] produces
//! the zero-padded record.
//!
//! Most algorithm blocks start with a `u16` enable word; a disabled block
//! makes the wrapping element forward its input untouched.
//!
//! # Layouts
//!
//! | Block | Fields (offset: type) |
//! |-------|-----------------------|
//! | AEC | 0 enable, 2 filter_len, 4 fixed_delay, 6 nlp_enable, 8 nlp_level (u16) |
//! | AGC | 0 enable, 2 attack_ms, 4 decay_ms (u16), 6 target_db (i16) |
//! | NS | 0 enable, 2 level_db (u16) |
//! | DRC | 0 enable, 2 attack_ms, 4 decay_ms (u16), 6 knee_db, 8 noise_gate_db, 10 slope_pct (i16) |
//! | PEQ | 0 enable, 2 band count (u16), 4 + 4n: freq_hz u16, gain_db i8, q×10 u8 |
//! | MBDRC | 0 enable, 2 band count (u16), 4 + 4n: bound_hz u16, threshold_db i8, slope_pct u8 |
//! | Gain | 0 enable (u16), 2 gain_db (i16) |
//! | Mixer | 0 tone, 2 speech, 4 music, 6 record (Q1.14 u16) |
//! | Resample | 0 enable (u16), 2 out_rate (u32) |
//! | VAD | 0 enable (u16), 2 threshold_db (i16), 4 hangover_frames (u16) |
//! | WNR | 0 enable, 2 cutoff_hz, 4 level_db (u16) |
//! | Sniffer / MCPS / activate | 0 flag (u16) |
//! | Bypass | 0 flag (u8), 1 reserved |
//! | Prompt | 0 waveform (u8), 1 index (u8), 2 frequency, 4 duration_ms (u16) |

use crate::error::ConfigError;
use crate::sub_block::{AlgoKind, SubBlockRole};

/// Payload bytes per sub-block record.
pub const SUB_BLOCK_SIZE: usize = 16;

/// Raw record payload.
pub type RawBlock = [u8; SUB_BLOCK_SIZE];

/// Maximum bands in a PEQ or MBDRC block.
pub const MAX_BANDS: usize = 3;

/// Sample rates a resampler may target.
pub const SUPPORTED_RATES: [u32; 6] = [8_000, 16_000, 24_000, 32_000, 44_100, 48_000];

fn get_u16(b: &RawBlock, at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn get_i16(b: &RawBlock, at: usize) -> i16 {
    i16::from_le_bytes([b[at], b[at + 1]])
}

fn get_u32(b: &RawBlock, at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn get_flag(b: &RawBlock, at: usize) -> bool {
    get_u16(b, at) != 0
}

fn put_u16(b: &mut RawBlock, at: usize, v: u16) {
    b[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_i16(b: &mut RawBlock, at: usize, v: i16) {
    b[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_flag(b: &mut RawBlock, at: usize, v: bool) {
    put_u16(b, at, u16::from(v));
}

/// Echo canceller parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AecParams {
    /// Processing enabled.
    pub enable: bool,
    /// Adaptive filter length in taps.
    pub filter_len: u16,
    /// Bulk delay of the echo path in samples.
    pub fixed_delay: u16,
    /// Residual echo suppression enabled.
    pub nlp_enable: bool,
    /// Residual echo suppression strength, 0..=3.
    pub nlp_level: u16,
}

impl Default for AecParams {
    fn default() -> Self {
        Self {
            enable: true,
            filter_len: 256,
            fixed_delay: 0,
            nlp_enable: true,
            nlp_level: 1,
        }
    }
}

/// Automatic gain control parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgcParams {
    /// Processing enabled.
    pub enable: bool,
    /// Gain reduction time constant.
    pub attack_ms: u16,
    /// Gain recovery time constant.
    pub decay_ms: u16,
    /// Target level in dBFS.
    pub target_db: i16,
}

impl Default for AgcParams {
    fn default() -> Self {
        Self {
            enable: true,
            attack_ms: 10,
            decay_ms: 500,
            target_db: -18,
        }
    }
}

/// Noise suppressor parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NsParams {
    /// Processing enabled.
    pub enable: bool,
    /// Maximum attenuation in dB.
    pub level_db: u16,
}

impl Default for NsParams {
    fn default() -> Self {
        Self {
            enable: true,
            level_db: 12,
        }
    }
}

/// Compressor parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrcParams {
    /// Processing enabled.
    pub enable: bool,
    /// Envelope attack.
    pub attack_ms: u16,
    /// Envelope release.
    pub decay_ms: u16,
    /// Compression threshold in dBFS.
    pub knee_db: i16,
    /// Levels below this are muted, dBFS.
    pub noise_gate_db: i16,
    /// Output rise above the knee per 100 dB of input rise.
    pub slope_pct: i16,
}

impl Default for DrcParams {
    fn default() -> Self {
        Self {
            enable: true,
            attack_ms: 5,
            decay_ms: 100,
            knee_db: -20,
            noise_gate_db: -70,
            slope_pct: 25,
        }
    }
}

/// One parametric EQ band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EqBand {
    /// Center frequency.
    pub freq_hz: u16,
    /// Peak gain.
    pub gain_db: i8,
    /// Quality factor times ten.
    pub q_tenths: u8,
}

/// Parametric EQ parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeqParams {
    /// Processing enabled.
    pub enable: bool,
    /// Up to [`MAX_BANDS`] bands.
    pub bands: Vec<EqBand>,
}

impl Default for PeqParams {
    fn default() -> Self {
        Self {
            enable: true,
            bands: vec![EqBand {
                freq_hz: 1000,
                gain_db: 0,
                q_tenths: 7,
            }],
        }
    }
}

/// One multiband compressor band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MbdrcBand {
    /// Upper band edge.
    pub bound_hz: u16,
    /// Compression threshold in dBFS.
    pub threshold_db: i8,
    /// Output rise above the threshold per 100 dB of input rise.
    pub slope_pct: u8,
}

/// Multiband compressor parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MbdrcParams {
    /// Processing enabled.
    pub enable: bool,
    /// Bands in ascending `bound_hz` order; the last band extends to Nyquist.
    pub bands: Vec<MbdrcBand>,
}

impl Default for MbdrcParams {
    fn default() -> Self {
        Self {
            enable: true,
            bands: vec![
                MbdrcBand {
                    bound_hz: 500,
                    threshold_db: -24,
                    slope_pct: 50,
                },
                MbdrcBand {
                    bound_hz: 4000,
                    threshold_db: -20,
                    slope_pct: 50,
                },
            ],
        }
    }
}

/// Fixed gain parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct GainParams {
    /// Processing enabled.
    pub enable: bool,
    /// Gain in dB.
    pub gain_db: i16,
}

/// Unity in Q1.14.
pub const Q14_ONE: u16 = 1 << 14;

/// Converts a Q1.14 gain to linear.
pub fn q14_to_linear(q: u16) -> f32 {
    f32::from(q) / f32::from(Q14_ONE)
}

/// Mixer input gains, Q1.14 linear (0..2.0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MixerParams {
    /// Tone generator input.
    pub tone: u16,
    /// Speech input.
    pub speech: u16,
    /// Music input.
    pub music: u16,
    /// Recording input.
    pub record: u16,
}

impl MixerParams {
    /// Gains in input-pad order.
    pub fn gains(&self) -> [u16; 4] {
        [self.tone, self.speech, self.music, self.record]
    }
}

impl Default for MixerParams {
    fn default() -> Self {
        Self {
            tone: Q14_ONE,
            speech: Q14_ONE,
            music: Q14_ONE,
            record: Q14_ONE,
        }
    }
}

/// Resampler parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResampleParams {
    /// Processing enabled.
    pub enable: bool,
    /// Output sample rate; one of [`SUPPORTED_RATES`].
    pub out_rate: u32,
}

impl Default for ResampleParams {
    fn default() -> Self {
        Self {
            enable: true,
            out_rate: 16_000,
        }
    }
}

/// Voice activity detector parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VadParams {
    /// Processing enabled.
    pub enable: bool,
    /// Frame energy above which voice is assumed, dBFS.
    pub threshold_db: i16,
    /// Frames voice stays active after energy drops.
    pub hangover_frames: u16,
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            enable: true,
            threshold_db: -45,
            hangover_frames: 8,
        }
    }
}

/// Wind noise reduction parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WnrParams {
    /// Processing enabled.
    pub enable: bool,
    /// High-pass corner.
    pub cutoff_hz: u16,
    /// Maximum low-band attenuation in dB.
    pub level_db: u16,
}

impl Default for WnrParams {
    fn default() -> Self {
        Self {
            enable: true,
            cutoff_hz: 150,
            level_db: 12,
        }
    }
}

/// Prompt playback request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromptParams {
    /// Waveform: 0 sine, 1 triangle, 2 square, 3 noise.
    pub waveform: u8,
    /// Prompt index within the waveform type.
    pub index: u8,
    /// Tone frequency.
    pub frequency: u16,
    /// Playing time.
    pub duration_ms: u16,
}

impl PromptParams {
    /// Waveform name understood by the wave source element.
    pub fn waveform_name(&self) -> &'static str {
        match self.waveform {
            0 => "sine",
            1 => "triangle",
            2 => "square",
            _ => "noise",
        }
    }
}

/// A decoded sub-block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamBlock {
    /// Echo canceller.
    Aec(AecParams),
    /// Automatic gain control.
    Agc(AgcParams),
    /// Noise suppressor.
    Ns(NsParams),
    /// Compressor (uplink or downlink).
    Drc(DrcParams),
    /// Parametric EQ (uplink or downlink).
    Peq(PeqParams),
    /// Multiband compressor.
    Mbdrc(MbdrcParams),
    /// Fixed gain.
    Gain(GainParams),
    /// Mixer gains.
    Mixer(MixerParams),
    /// Resampler.
    Resample(ResampleParams),
    /// Voice activity detector.
    Vad(VadParams),
    /// Wind noise reduction.
    Wnr(WnrParams),
    /// Per-algorithm sniffer enable.
    Sniffer(bool),
    /// Per-algorithm MCPS reporting enable.
    Mcps(bool),
    /// Per-algorithm bypass.
    Bypass(bool),
    /// Global sniffer activation.
    SnifferActivate(bool),
    /// Prompt request.
    Prompt(PromptParams),
    /// MCPS query.
    McpsQuery,
}

impl ParamBlock {
    /// Factory parameter block of `kind`.
    pub fn default_for(kind: AlgoKind) -> Self {
        match kind {
            AlgoKind::Aec => ParamBlock::Aec(AecParams::default()),
            AlgoKind::Agc => ParamBlock::Agc(AgcParams::default()),
            AlgoKind::Ns => ParamBlock::Ns(NsParams::default()),
            AlgoKind::UlDrc | AlgoKind::DlDrc => ParamBlock::Drc(DrcParams::default()),
            AlgoKind::UlPeq | AlgoKind::DlPeq => ParamBlock::Peq(PeqParams::default()),
            AlgoKind::Mbdrc => ParamBlock::Mbdrc(MbdrcParams::default()),
            AlgoKind::Gain => ParamBlock::Gain(GainParams {
                enable: true,
                gain_db: 0,
            }),
            AlgoKind::Mixer => ParamBlock::Mixer(MixerParams::default()),
            AlgoKind::Resample => ParamBlock::Resample(ResampleParams::default()),
            AlgoKind::Vad => ParamBlock::Vad(VadParams::default()),
            AlgoKind::Wnr => ParamBlock::Wnr(WnrParams::default()),
        }
    }

    /// Whether the block leaves its algorithm active. Switch blocks report
    /// their flag.
    pub fn enabled(&self) -> bool {
        match self {
            ParamBlock::Aec(p) => p.enable,
            ParamBlock::Agc(p) => p.enable,
            ParamBlock::Ns(p) => p.enable,
            ParamBlock::Drc(p) => p.enable,
            ParamBlock::Peq(p) => p.enable,
            ParamBlock::Mbdrc(p) => p.enable,
            ParamBlock::Gain(p) => p.enable,
            ParamBlock::Resample(p) => p.enable,
            ParamBlock::Vad(p) => p.enable,
            ParamBlock::Wnr(p) => p.enable,
            ParamBlock::Sniffer(f)
            | ParamBlock::Mcps(f)
            | ParamBlock::Bypass(f)
            | ParamBlock::SnifferActivate(f) => *f,
            ParamBlock::Mixer(_) | ParamBlock::Prompt(_) | ParamBlock::McpsQuery => true,
        }
    }

    /// Decodes the payload of sub-block `id`. Payloads shorter than
    /// [`SUB_BLOCK_SIZE`] are zero-extended.
    pub fn decode(id: u16, data: &[u8]) -> Result<Self, ConfigError> {
        if data.len() > SUB_BLOCK_SIZE {
            return Err(ConfigError::RecordSize(data.len()));
        }
        let mut b = [0u8; SUB_BLOCK_SIZE];
        b[..data.len()].copy_from_slice(data);
        let role = SubBlockRole::of(id).ok_or(ConfigError::UnknownSubBlock(id))?;
        match role {
            SubBlockRole::Config(kind) => Self::decode_config(kind, &b),
            SubBlockRole::Sniffer(_) => Ok(ParamBlock::Sniffer(get_flag(&b, 0))),
            SubBlockRole::Mcps(_) => Ok(ParamBlock::Mcps(get_flag(&b, 0))),
            SubBlockRole::Bypass(_) => Ok(ParamBlock::Bypass(b[0] != 0)),
            SubBlockRole::SnifferActivate => Ok(ParamBlock::SnifferActivate(get_flag(&b, 0))),
            SubBlockRole::Prompt => {
                let prompt = PromptParams {
                    waveform: b[0],
                    index: b[1],
                    frequency: get_u16(&b, 2),
                    duration_ms: get_u16(&b, 4),
                };
                if prompt.waveform > 3 {
                    return Err(ConfigError::malformed("prompt", format!("waveform {}", prompt.waveform)));
                }
                Ok(ParamBlock::Prompt(prompt))
            }
            SubBlockRole::AllMcps => Ok(ParamBlock::McpsQuery),
            SubBlockRole::AllConfig => Err(ConfigError::malformed("sub-block", "0xf0 carries no payload")),
        }
    }

    fn decode_config(kind: AlgoKind, b: &RawBlock) -> Result<Self, ConfigError> {
        let block = match kind {
            AlgoKind::Aec => {
                let p = AecParams {
                    enable: get_flag(b, 0),
                    filter_len: get_u16(b, 2),
                    fixed_delay: get_u16(b, 4),
                    nlp_enable: get_flag(b, 6),
                    nlp_level: get_u16(b, 8),
                };
                if p.enable && p.filter_len == 0 {
                    return Err(ConfigError::malformed("aec", "zero filter length"));
                }
                ParamBlock::Aec(p)
            }
            AlgoKind::Agc => ParamBlock::Agc(AgcParams {
                enable: get_flag(b, 0),
                attack_ms: get_u16(b, 2),
                decay_ms: get_u16(b, 4),
                target_db: get_i16(b, 6),
            }),
            AlgoKind::Ns => ParamBlock::Ns(NsParams {
                enable: get_flag(b, 0),
                level_db: get_u16(b, 2),
            }),
            AlgoKind::UlDrc | AlgoKind::DlDrc => ParamBlock::Drc(DrcParams {
                enable: get_flag(b, 0),
                attack_ms: get_u16(b, 2),
                decay_ms: get_u16(b, 4),
                knee_db: get_i16(b, 6),
                noise_gate_db: get_i16(b, 8),
                slope_pct: get_i16(b, 10),
            }),
            AlgoKind::UlPeq | AlgoKind::DlPeq => {
                let count = band_count("peq", b)?;
                let bands: Vec<EqBand> = (0..count)
                    .map(|i| {
                        let at = 4 + 4 * i;
                        EqBand {
                            freq_hz: get_u16(b, at),
                            gain_db: i8::from_le_bytes([b[at + 2]]),
                            q_tenths: b[at + 3],
                        }
                    })
                    .collect();
                if bands.iter().any(|band| band.q_tenths == 0 || band.freq_hz == 0) {
                    return Err(ConfigError::malformed("peq", "band with zero frequency or Q"));
                }
                ParamBlock::Peq(PeqParams {
                    enable: get_flag(b, 0),
                    bands,
                })
            }
            AlgoKind::Mbdrc => {
                let count = band_count("mbdrc", b)?;
                let bands: Vec<MbdrcBand> = (0..count)
                    .map(|i| {
                        let at = 4 + 4 * i;
                        MbdrcBand {
                            bound_hz: get_u16(b, at),
                            threshold_db: i8::from_le_bytes([b[at + 2]]),
                            slope_pct: b[at + 3],
                        }
                    })
                    .collect();
                if bands.windows(2).any(|w| w[0].bound_hz >= w[1].bound_hz) {
                    return Err(ConfigError::malformed("mbdrc", "band edges not ascending"));
                }
                ParamBlock::Mbdrc(MbdrcParams {
                    enable: get_flag(b, 0),
                    bands,
                })
            }
            AlgoKind::Gain => ParamBlock::Gain(GainParams {
                enable: get_flag(b, 0),
                gain_db: get_i16(b, 2),
            }),
            AlgoKind::Mixer => ParamBlock::Mixer(MixerParams {
                tone: get_u16(b, 0),
                speech: get_u16(b, 2),
                music: get_u16(b, 4),
                record: get_u16(b, 6),
            }),
            AlgoKind::Resample => {
                let p = ResampleParams {
                    enable: get_flag(b, 0),
                    out_rate: get_u32(b, 2),
                };
                if p.enable && !SUPPORTED_RATES.contains(&p.out_rate) {
                    return Err(ConfigError::malformed("resample", format!("rate {}", p.out_rate)));
                }
                ParamBlock::Resample(p)
            }
            AlgoKind::Vad => ParamBlock::Vad(VadParams {
                enable: get_flag(b, 0),
                threshold_db: get_i16(b, 2),
                hangover_frames: get_u16(b, 4),
            }),
            AlgoKind::Wnr => ParamBlock::Wnr(WnrParams {
                enable: get_flag(b, 0),
                cutoff_hz: get_u16(b, 2),
                level_db: get_u16(b, 4),
            }),
        };
        Ok(block)
    }

    /// Encodes into a zero-padded record payload.
    pub fn encode(&self) -> RawBlock {
        let mut b = [0u8; SUB_BLOCK_SIZE];
        match self {
            ParamBlock::Aec(p) => {
                put_flag(&mut b, 0, p.enable);
                put_u16(&mut b, 2, p.filter_len);
                put_u16(&mut b, 4, p.fixed_delay);
                put_flag(&mut b, 6, p.nlp_enable);
                put_u16(&mut b, 8, p.nlp_level);
            }
            ParamBlock::Agc(p) => {
                put_flag(&mut b, 0, p.enable);
                put_u16(&mut b, 2, p.attack_ms);
                put_u16(&mut b, 4, p.decay_ms);
                put_i16(&mut b, 6, p.target_db);
            }
            ParamBlock::Ns(p) => {
                put_flag(&mut b, 0, p.enable);
                put_u16(&mut b, 2, p.level_db);
            }
            ParamBlock::Drc(p) => {
                put_flag(&mut b, 0, p.enable);
                put_u16(&mut b, 2, p.attack_ms);
                put_u16(&mut b, 4, p.decay_ms);
                put_i16(&mut b, 6, p.knee_db);
                put_i16(&mut b, 8, p.noise_gate_db);
                put_i16(&mut b, 10, p.slope_pct);
            }
            ParamBlock::Peq(p) => {
                put_flag(&mut b, 0, p.enable);
                let bands = &p.bands[..p.bands.len().min(MAX_BANDS)];
                put_u16(&mut b, 2, bands.len() as u16);
                for (i, band) in bands.iter().enumerate() {
                    let at = 4 + 4 * i;
                    put_u16(&mut b, at, band.freq_hz);
                    b[at + 2] = band.gain_db.to_le_bytes()[0];
                    b[at + 3] = band.q_tenths;
                }
            }
            ParamBlock::Mbdrc(p) => {
                put_flag(&mut b, 0, p.enable);
                let bands = &p.bands[..p.bands.len().min(MAX_BANDS)];
                put_u16(&mut b, 2, bands.len() as u16);
                for (i, band) in bands.iter().enumerate() {
                    let at = 4 + 4 * i;
                    put_u16(&mut b, at, band.bound_hz);
                    b[at + 2] = band.threshold_db.to_le_bytes()[0];
                    b[at + 3] = band.slope_pct;
                }
            }
            ParamBlock::Gain(p) => {
                put_flag(&mut b, 0, p.enable);
                put_i16(&mut b, 2, p.gain_db);
            }
            ParamBlock::Mixer(p) => {
                for (i, g) in p.gains().into_iter().enumerate() {
                    put_u16(&mut b, 2 * i, g);
                }
            }
            ParamBlock::Resample(p) => {
                put_flag(&mut b, 0, p.enable);
                b[2..6].copy_from_slice(&p.out_rate.to_le_bytes());
            }
            ParamBlock::Vad(p) => {
                put_flag(&mut b, 0, p.enable);
                put_i16(&mut b, 2, p.threshold_db);
                put_u16(&mut b, 4, p.hangover_frames);
            }
            ParamBlock::Wnr(p) => {
                put_flag(&mut b, 0, p.enable);
                put_u16(&mut b, 2, p.cutoff_hz);
                put_u16(&mut b, 4, p.level_db);
            }
            ParamBlock::Sniffer(f) | ParamBlock::Mcps(f) | ParamBlock::SnifferActivate(f) => {
                put_flag(&mut b, 0, *f);
            }
            ParamBlock::Bypass(f) => b[0] = u8::from(*f),
            ParamBlock::Prompt(p) => {
                b[0] = p.waveform;
                b[1] = p.index;
                put_u16(&mut b, 2, p.frequency);
                put_u16(&mut b, 4, p.duration_ms);
            }
            ParamBlock::McpsQuery => {}
        }
        b
    }
}

fn band_count(what: &'static str, b: &RawBlock) -> Result<usize, ConfigError> {
    let count = usize::from(get_u16(b, 2));
    if count > MAX_BANDS {
        return Err(ConfigError::malformed(what, format!("{count} bands")));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aec_layout_matches_table() {
        let raw = ParamBlock::Aec(AecParams::default()).encode();
        assert_eq!(&raw[..10], &[1, 0, 0, 1, 0, 0, 1, 0, 1, 0]);
        assert!(raw[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn defaults_survive_encoding() {
        for kind in AlgoKind::ALL {
            let block = ParamBlock::default_for(kind);
            let decoded = ParamBlock::decode(kind.sub_blocks().config, &block.encode()).unwrap();
            assert_eq!(decoded, block, "{kind}");
        }
    }

    #[test]
    fn short_payload_is_zero_extended() {
        let block = ParamBlock::decode(0x98, &[1, 0, 0xfa, 0xff]).unwrap();
        assert_eq!(
            block,
            ParamBlock::Gain(GainParams {
                enable: true,
                gain_db: -6
            })
        );
    }

    #[test]
    fn oversized_payload_is_rejected() {
        assert!(matches!(
            ParamBlock::decode(0x98, &[0; 17]),
            Err(ConfigError::RecordSize(17))
        ));
    }

    #[test]
    fn switches_decode_by_role() {
        assert_eq!(ParamBlock::decode(0x03, &[1, 0]).unwrap(), ParamBlock::Bypass(true));
        assert_eq!(ParamBlock::decode(0x09, &[0, 0]).unwrap(), ParamBlock::Sniffer(false));
        assert_eq!(ParamBlock::decode(0x12, &[1, 0]).unwrap(), ParamBlock::Mcps(true));
        assert_eq!(
            ParamBlock::decode(0x35, &[1, 0]).unwrap(),
            ParamBlock::SnifferActivate(true)
        );
        assert_eq!(ParamBlock::decode(0xf1, &[]).unwrap(), ParamBlock::McpsQuery);
    }

    #[test]
    fn invalid_blocks_are_refused() {
        let mut raw = [0u8; SUB_BLOCK_SIZE];
        raw[2] = 4;
        assert!(ParamBlock::decode(0x18, &raw).is_err(), "too many bands");

        let resample = ParamBlock::Resample(ResampleParams {
            enable: true,
            out_rate: 11_025,
        });
        assert!(ParamBlock::decode(0xb0, &resample.encode()).is_err());

        assert!(ParamBlock::decode(0xe0, &[7]).is_err(), "bad prompt waveform");
        assert!(matches!(
            ParamBlock::decode(0x07, &[]),
            Err(ConfigError::UnknownSubBlock(0x07))
        ));
    }

    #[test]
    fn mixer_has_no_enable_word() {
        let mixer = ParamBlock::Mixer(MixerParams {
            tone: Q14_ONE / 2,
            ..MixerParams::default()
        });
        assert!(mixer.enabled());
        assert_eq!(&mixer.encode()[..2], &(Q14_ONE / 2).to_le_bytes());
        assert!((q14_to_linear(Q14_ONE / 2) - 0.5).abs() < 1e-6);
    }
}
