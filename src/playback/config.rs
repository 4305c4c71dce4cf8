//! Configuration for the playback engine.

use std::time::Duration;

/// Configuration for the playback engine.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Length of one fade ramp. Track changes spend up to twice this
    /// (fade-out plus fade-in). Kept short so transitions feel immediate.
    pub fade_duration: Duration,
    /// Number of volume steps per ramp.
    pub fade_steps: u32,
    /// Master volume at engine construction, in `[0, 1]`.
    pub initial_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fade_duration: Duration::from_millis(1200),
            fade_steps: 24,
            initial_volume: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::playback::config::PlaybackConfig;

    #[test]
    fn test_default_fade_stays_under_two_seconds() {
        let config = PlaybackConfig::default();
        assert!(config.fade_duration < Duration::from_secs(2));
        assert!(config.fade_steps > 0);
        assert!((0.0..=1.0).contains(&config.initial_volume));
    }
}
