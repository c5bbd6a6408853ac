//! Audio and spectrogram settings with their action reducers.
//!
//! Out-of-range arguments are contract violations and come back as
//! [`SettingsError`]; the settings are left untouched in that case.

use crate::error::SettingsError;
use crate::models::Recording;
use serde::{Deserialize, Serialize};

/// Highest effective sample rate the playback device accepts, in Hz.
pub const MAX_PLAYBACK_SAMPLERATE: u32 = 96_000;

/// Audio fetch and playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Resample the audio to `samplerate` before playback.
    pub resample: bool,
    /// Target sample rate in Hz, used when `resample` is on.
    pub samplerate: u32,
    /// Playback speed multiplier.
    pub speed: f64,
    /// High-pass cutoff in Hz.
    pub low_freq: Option<f64>,
    /// Low-pass cutoff in Hz.
    pub high_freq: Option<f64>,
    pub filter_order: u32,
    pub channel: u16,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            resample: false,
            samplerate: 44_100,
            speed: 1.0,
            low_freq: None,
            high_freq: None,
            filter_order: 5,
            channel: 0,
        }
    }
}

/// Actions accepted by [`AudioSettings::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSettingsAction {
    SetSpeed(f64),
    ToggleResample,
    SetSamplerate(u32),
    SetFilterBand {
        low: Option<f64>,
        high: Option<f64>,
    },
    SetFilterOrder(u32),
    SetChannel(u16),
    SetAll(AudioSettings),
    Reset,
}

impl AudioSettings {
    /// Sample rate the audio is rendered at.
    pub fn effective_samplerate(&self, native: u32) -> u32 {
        if self.resample {
            self.samplerate
        } else {
            native
        }
    }

    /// Make the settings compatible with `recording`: filters outside the
    /// Nyquist range are dropped and the channel is clamped to the last one.
    pub fn adjust_to_recording(&self, recording: &Recording) -> Self {
        let nyquist = self.effective_samplerate(recording.samplerate) as f64 / 2.0;
        let in_band = |f: Option<f64>| f.filter(|f| *f > 0.0 && *f < nyquist);

        let mut adjusted = self.clone();
        adjusted.low_freq = in_band(self.low_freq);
        adjusted.high_freq = in_band(self.high_freq);
        if let (Some(low), Some(high)) = (adjusted.low_freq, adjusted.high_freq) {
            if low >= high {
                adjusted.high_freq = None;
            }
        }
        adjusted.channel = self.channel.min(recording.channels.saturating_sub(1));
        adjusted
    }

    /// Settings actually used to fetch and play audio.
    ///
    /// When `native rate × speed` exceeds `ceiling`, resampling is forced on
    /// with a target of `floor(ceiling / speed)` so the played-back rate
    /// stays at or under the ceiling.
    pub fn adjust_for_playback(&self, recording: &Recording, ceiling: u32) -> Self {
        let mut adjusted = self.adjust_to_recording(recording);
        let effective = recording.samplerate as f64 * adjusted.speed;
        if effective > ceiling as f64 {
            let target = (ceiling as f64 / adjusted.speed).floor() as u32;
            tracing::debug!(
                native = recording.samplerate,
                speed = adjusted.speed,
                target,
                "Forcing resample to stay under playback ceiling"
            );
            adjusted.resample = true;
            adjusted.samplerate = target;
        }
        adjusted
    }

    pub fn apply(&mut self, action: AudioSettingsAction) -> Result<(), SettingsError> {
        match action {
            AudioSettingsAction::SetSpeed(speed) => {
                if !(speed.is_finite() && speed > 0.0) {
                    return Err(SettingsError::Speed { value: speed });
                }
                self.speed = speed;
            }
            AudioSettingsAction::ToggleResample => self.resample = !self.resample,
            AudioSettingsAction::SetSamplerate(rate) => {
                if rate == 0 {
                    return Err(SettingsError::Samplerate { value: rate });
                }
                self.samplerate = rate;
            }
            AudioSettingsAction::SetFilterBand { low, high } => {
                if let (Some(l), Some(h)) = (low, high) {
                    if l >= h {
                        return Err(SettingsError::FilterBand { low: l, high: h });
                    }
                }
                self.low_freq = low;
                self.high_freq = high;
            }
            AudioSettingsAction::SetFilterOrder(order) => self.filter_order = order.max(1),
            AudioSettingsAction::SetChannel(channel) => self.channel = channel,
            AudioSettingsAction::SetAll(settings) => *self = settings,
            AudioSettingsAction::Reset => *self = Self::default(),
        }
        Ok(())
    }
}

/// Amplitude scale of the rendered spectrogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scale {
    #[serde(rename = "amplitude")]
    Amplitude,
    #[serde(rename = "power")]
    Power,
    #[default]
    #[serde(rename = "dB")]
    Decibels,
}

impl Scale {
    pub const ALL: [Scale; 3] = [Scale::Amplitude, Scale::Power, Scale::Decibels];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Amplitude => "amplitude",
            Scale::Power => "power",
            Scale::Decibels => "dB",
        }
    }
}

/// STFT window function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    #[default]
    Hann,
    Hamming,
    Boxcar,
    Triang,
    Blackman,
    Bartlett,
    Flattop,
    Parzen,
    Bohman,
    Blackmanharris,
    Nuttall,
    Barthann,
}

impl WindowFunction {
    pub const ALL: [WindowFunction; 12] = [
        WindowFunction::Hann,
        WindowFunction::Hamming,
        WindowFunction::Boxcar,
        WindowFunction::Triang,
        WindowFunction::Blackman,
        WindowFunction::Bartlett,
        WindowFunction::Flattop,
        WindowFunction::Parzen,
        WindowFunction::Bohman,
        WindowFunction::Blackmanharris,
        WindowFunction::Nuttall,
        WindowFunction::Barthann,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowFunction::Hann => "hann",
            WindowFunction::Hamming => "hamming",
            WindowFunction::Boxcar => "boxcar",
            WindowFunction::Triang => "triang",
            WindowFunction::Blackman => "blackman",
            WindowFunction::Bartlett => "bartlett",
            WindowFunction::Flattop => "flattop",
            WindowFunction::Parzen => "parzen",
            WindowFunction::Bohman => "bohman",
            WindowFunction::Blackmanharris => "blackmanharris",
            WindowFunction::Nuttall => "nuttall",
            WindowFunction::Barthann => "barthann",
        }
    }
}

/// Colormap applied by the server when rendering chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    Gray,
    #[default]
    Viridis,
    Magma,
    Inferno,
    Plasma,
    Cividis,
    Cool,
    Cubehelix,
    Twilight,
}

impl Colormap {
    pub const ALL: [Colormap; 9] = [
        Colormap::Gray,
        Colormap::Viridis,
        Colormap::Magma,
        Colormap::Inferno,
        Colormap::Plasma,
        Colormap::Cividis,
        Colormap::Cool,
        Colormap::Cubehelix,
        Colormap::Twilight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Colormap::Gray => "gray",
            Colormap::Viridis => "viridis",
            Colormap::Magma => "magma",
            Colormap::Inferno => "inferno",
            Colormap::Plasma => "plasma",
            Colormap::Cividis => "cividis",
            Colormap::Cool => "cool",
            Colormap::Cubehelix => "cubehelix",
            Colormap::Twilight => "twilight",
        }
    }
}

/// Spectrogram rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramSettings {
    /// STFT window length in seconds.
    pub window_size: f64,
    /// Fraction of overlap between consecutive windows, in (0, 1).
    pub overlap: f64,
    pub window: WindowFunction,
    pub scale: Scale,
    pub cmap: Colormap,
    #[serde(rename = "min_dB")]
    pub min_db: f64,
    #[serde(rename = "max_dB")]
    pub max_db: f64,
    pub normalize: bool,
    pub pcen: bool,
    pub clamp: bool,
    /// Zoom factor applied to the initial time window, in [1, 10].
    pub time_scale: f64,
    /// Zoom factor applied to the frequency axis, in (0.1, 10].
    pub freq_scale: f64,
    /// Canvas height in pixels.
    pub height: f64,
}

impl Default for SpectrogramSettings {
    fn default() -> Self {
        Self {
            window_size: 0.05,
            overlap: 0.5,
            window: WindowFunction::default(),
            scale: Scale::default(),
            cmap: Colormap::default(),
            min_db: -140.0,
            max_db: 0.0,
            normalize: true,
            pcen: false,
            clamp: true,
            time_scale: 1.0,
            freq_scale: 1.0,
            height: 384.0,
        }
    }
}

/// Actions accepted by [`SpectrogramSettings::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum SpectrogramSettingsAction {
    SetAll(SpectrogramSettings),
    SetWindowSize(f64),
    SetOverlap(f64),
    SetScale(Scale),
    SetWindow(WindowFunction),
    SetDbRange { min: Option<f64>, max: Option<f64> },
    SetColormap(Colormap),
    SetTimeScale(f64),
    SetFreqScale(f64),
    SetHeight(f64),
    TogglePcen,
    ToggleNormalize,
    Reset,
}

impl SpectrogramSettings {
    /// True when both settings render identical images. View-only fields
    /// (time and frequency scale, height) are ignored.
    pub fn same_rendering(&self, other: &SpectrogramSettings) -> bool {
        let view_only = |s: &SpectrogramSettings| SpectrogramSettings {
            time_scale: 1.0,
            freq_scale: 1.0,
            height: 0.0,
            ..s.clone()
        };
        view_only(self) == view_only(other)
    }

    pub fn apply(&mut self, action: SpectrogramSettingsAction) -> Result<(), SettingsError> {
        match action {
            SpectrogramSettingsAction::SetAll(settings) => *self = settings,
            SpectrogramSettingsAction::SetWindowSize(value) => {
                if !(value > 0.0) {
                    return Err(SettingsError::WindowSize { value });
                }
                self.window_size = value;
            }
            SpectrogramSettingsAction::SetOverlap(value) => {
                if !(value > 0.0 && value < 1.0) {
                    return Err(SettingsError::Overlap { value });
                }
                self.overlap = value;
            }
            SpectrogramSettingsAction::SetScale(scale) => self.scale = scale,
            SpectrogramSettingsAction::SetWindow(window) => self.window = window,
            SpectrogramSettingsAction::SetDbRange { min, max } => {
                let new_min = min.unwrap_or(self.min_db);
                let new_max = max.unwrap_or(self.max_db);
                if !(new_min < new_max) {
                    return Err(SettingsError::DbRange {
                        min: new_min,
                        max: new_max,
                    });
                }
                self.min_db = new_min;
                self.max_db = new_max;
            }
            SpectrogramSettingsAction::SetColormap(cmap) => self.cmap = cmap,
            SpectrogramSettingsAction::SetTimeScale(value) => {
                if !(1.0..=10.0).contains(&value) {
                    return Err(SettingsError::TimeScale { value });
                }
                self.time_scale = value;
            }
            SpectrogramSettingsAction::SetFreqScale(value) => {
                if !(value > 0.1 && value <= 10.0) {
                    return Err(SettingsError::FreqScale { value });
                }
                self.freq_scale = value;
            }
            SpectrogramSettingsAction::SetHeight(value) => {
                if !(value > 0.0) {
                    return Err(SettingsError::Height { value });
                }
                self.height = value;
            }
            SpectrogramSettingsAction::TogglePcen => self.pcen = !self.pcen,
            SpectrogramSettingsAction::ToggleNormalize => self.normalize = !self.normalize,
            SpectrogramSettingsAction::Reset => *self = Self::default(),
        }
        Ok(())
    }
}
