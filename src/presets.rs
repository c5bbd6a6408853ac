//! Playback speed presets offered by the player controls.

/// A named playback speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedPreset {
    /// Human-readable label
    pub label: &'static str,
    /// Playback speed multiplier
    pub speed: f64,
}

/// Speed options in menu order.
pub const SPEED_OPTIONS: &[SpeedPreset] = &[
    SpeedPreset { label: "1x", speed: 1.0 },
    SpeedPreset { label: "1.2x", speed: 1.2 },
    SpeedPreset { label: "1.5x", speed: 1.5 },
    SpeedPreset { label: "1.75x", speed: 1.75 },
    SpeedPreset { label: "2x", speed: 2.0 },
    SpeedPreset { label: "3x", speed: 3.0 },
    SpeedPreset { label: "0.75x", speed: 0.75 },
    SpeedPreset { label: "0.5x", speed: 0.5 },
    SpeedPreset { label: "0.25x", speed: 0.25 },
    SpeedPreset { label: "0.1x", speed: 0.1 },
];

/// Label of the preset matching `speed`, if any
pub fn matches_preset(speed: f64) -> Option<&'static str> {
    const EPSILON: f64 = 0.001;
    SPEED_OPTIONS
        .iter()
        .find(|p| (p.speed - speed).abs() < EPSILON)
        .map(|p| p.label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_have_unique_labels() {
        let mut labels = std::collections::HashSet::new();
        for preset in SPEED_OPTIONS {
            assert!(
                labels.insert(preset.label),
                "Duplicate preset label: {}",
                preset.label
            );
        }
    }

    #[test]
    fn test_all_speeds_positive() {
        assert!(SPEED_OPTIONS.iter().all(|p| p.speed > 0.0));
    }

    #[test]
    fn test_matches_preset_with_tolerance() {
        assert_eq!(matches_preset(1.0), Some("1x"));
        assert_eq!(matches_preset(0.2500001), Some("0.25x"));
        assert_eq!(matches_preset(4.0), None);
    }
}
