//! Records delivered by the data-fetch collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An audio recording as known to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub uuid: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Native sample rate in Hz.
    pub samplerate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_channels() -> u16 {
    1
}

impl Recording {
    pub fn nyquist(&self) -> f64 {
        self.samplerate as f64 / 2.0
    }
}

/// A time-bounded excerpt of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub uuid: String,
    pub recording: Recording,
    pub start_time: f64,
    pub end_time: f64,
}

/// A taxonomic or free-form tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}
