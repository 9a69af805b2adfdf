//! Configuration schema and loader
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/slooper/config.yaml
//!
//! A config holds the engine address, gesture timing, LED velocities and a
//! list of device profiles. One profile is active at a time; it maps the
//! physical controls of a specific controller onto loop slots and monitor
//! buttons.

use crate::types::ControlAddress;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Maximum number of monitor toggle buttons per profile
pub const MAX_MONITORS: usize = 2;

/// Error type for profile selection and config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("No device profile named '{0}'")]
    UnknownProfile(String),

    #[error("Invalid device profile '{profile}': {reason}")]
    InvalidProfile { profile: String, reason: String },
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlooperConfig {
    /// Where engine commands are sent
    pub osc: OscConfig,
    /// Gesture and coalescing timing
    pub timing: TimingConfig,
    /// LED on/off values
    pub led: LedConfig,
    /// Name of the active device profile
    pub profile: String,
    /// Device profiles (selected by name, matched to ports by name)
    pub profiles: Vec<DeviceProfile>,
}

impl Default for SlooperConfig {
    fn default() -> Self {
        Self {
            osc: OscConfig::default(),
            timing: TimingConfig::default(),
            led: LedConfig::default(),
            profile: "traktor-x1-mk3".to_string(),
            profiles: builtin_profiles(),
        }
    }
}

impl SlooperConfig {
    /// The profile named by `self.profile`
    pub fn active_profile(&self) -> Result<&DeviceProfile, ConfigError> {
        self.profile(&self.profile)
    }

    /// Look up and validate a profile by name (case-insensitive)
    pub fn profile(&self, name: &str) -> Result<&DeviceProfile, ConfigError> {
        let profile = self
            .profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }
}

/// Engine address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    pub host: String,
    pub port: u16,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
        }
    }
}

/// Gesture and coalescing timing (all values in milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long a button must be held before it clears the slot
    pub hold_threshold_ms: u64,
    /// Length adjustment per encoder tick
    pub crop_step_ms: i32,
    /// Window over which encoder ticks are merged into one crop command
    pub crop_throttle_ms: u64,
    /// Interval between LED toggles of the clear acknowledgment
    pub flash_interval_ms: u64,
    /// Number of on/off blinks acknowledging a clear
    pub flash_count: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            hold_threshold_ms: 1000,
            crop_step_ms: 50,
            crop_throttle_ms: 50,
            flash_interval_ms: 100,
            flash_count: 3,
        }
    }
}

/// LED values sent as note velocity (or CC value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedConfig {
    pub on_value: u8,
    pub off_value: u8,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            on_value: 127,
            off_value: 0,
        }
    }
}

/// Control mapping for a specific controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Profile name used for selection (e.g. "traktor-x1-mk3")
    pub name: String,

    /// Port name substring to match (case-insensitive)
    /// Used as fallback when learned_port_name doesn't match
    pub port_match: String,

    /// Exact port name (normalized, without hardware ID) for precise matching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_port_name: Option<String>,

    /// Loop slots in order; slot N is addressed as `/slot{N}` (1-based)
    #[serde(default)]
    pub slots: Vec<SlotControls>,

    /// Monitor toggle buttons
    #[serde(default)]
    pub monitors: Vec<MonitorControls>,
}

/// Controls belonging to one loop slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotControls {
    /// Transport button (tap / hold); its LED shows the slot state
    pub button: ControlAddress,
    /// Relative encoder adjusting loop length (values centered at 64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<ControlAddress>,
    /// Encoder push resetting the length adjustment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder_press: Option<ControlAddress>,
}

/// A monitor passthrough toggle button
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorControls {
    pub button: ControlAddress,
}

impl DeviceProfile {
    /// Check the mapping is usable by the controller
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidProfile {
            profile: self.name.clone(),
            reason,
        };

        if self.slots.is_empty() {
            return Err(invalid("no slots mapped".to_string()));
        }
        if self.slots.len() > u8::MAX as usize {
            return Err(invalid(format!("too many slots ({})", self.slots.len())));
        }
        if self.monitors.len() > MAX_MONITORS {
            return Err(invalid(format!(
                "at most {} monitor buttons supported, got {}",
                MAX_MONITORS,
                self.monitors.len()
            )));
        }

        let mut seen = HashSet::new();
        for address in self.addresses() {
            if !seen.insert(address) {
                return Err(invalid(format!("{} is mapped more than once", address)));
            }
        }
        Ok(())
    }

    /// Every control address this profile binds
    pub fn addresses(&self) -> impl Iterator<Item = ControlAddress> + '_ {
        let slot_controls = self.slots.iter().flat_map(|slot| {
            std::iter::once(slot.button)
                .chain(slot.encoder)
                .chain(slot.encoder_press)
        });
        slot_controls.chain(self.monitors.iter().map(|m| m.button))
    }

    /// Whether a MIDI port belongs to this device
    pub fn matches_port(&self, port_name: &str) -> bool {
        port_matches(port_name, self)
    }
}

/// Profiles shipped in the default config
///
/// Note and CC numbers were captured with `slooper learn`; re-learn them if
/// the controller runs a custom mapping.
pub fn builtin_profiles() -> Vec<DeviceProfile> {
    vec![
        DeviceProfile {
            name: "traktor-x1-mk3".to_string(),
            port_match: "TRAKTOR X1 MK3".to_string(),
            learned_port_name: None,
            slots: vec![
                SlotControls {
                    button: ControlAddress::note(0, 10),
                    encoder: Some(ControlAddress::cc(0, 20)),
                    encoder_press: None,
                },
                SlotControls {
                    button: ControlAddress::note(15, 15),
                    encoder: Some(ControlAddress::cc(15, 8)),
                    encoder_press: None,
                },
            ],
            monitors: vec![],
        },
        DeviceProfile {
            name: "xone-px5".to_string(),
            port_match: "XONE".to_string(),
            learned_port_name: None,
            slots: vec![SlotControls {
                button: ControlAddress::note(15, 14),
                encoder: Some(ControlAddress::cc(15, 8)),
                encoder_press: None,
            }],
            monitors: vec![],
        },
    ]
}

/// Get the default config file path
///
/// Returns: ~/.config/slooper/config.yaml (platform config dir)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slooper")
        .join("config.yaml")
}

/// Parse configuration from YAML text
pub fn parse_config(contents: &str) -> Result<SlooperConfig, ConfigError> {
    Ok(serde_yaml::from_str(contents)?)
}

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns the default config (built-in profiles).
/// If the file exists but is invalid, logs a warning and returns the default.
pub fn load_config(path: &Path) -> SlooperConfig {
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return SlooperConfig::default();
    }

    match try_load_config(path) {
        Ok(config) => {
            log::info!(
                "load_config: Loaded {} device profile(s), active '{}'",
                config.profiles.len(),
                config.profile
            );
            for profile in &config.profiles {
                log::info!(
                    "  - {} (port_match: '{}', {} slots, {} monitors)",
                    profile.name,
                    profile.port_match,
                    profile.slots.len(),
                    profile.monitors.len()
                );
            }
            config
        }
        Err(e) => {
            log::warn!("load_config: {}", e);
            SlooperConfig::default()
        }
    }
}

/// Load configuration, reporting read and parse failures
pub fn try_load_config(path: &Path) -> Result<SlooperConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents)
}

/// Save configuration to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &SlooperConfig, path: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Config saved successfully");
    Ok(())
}

/// Normalize a MIDI port name by removing hardware-specific identifiers
///
/// ALSA port names include dynamic IDs that change between systems/reconnections:
///
/// 1. Bracketed hardware IDs: `[hw:3,0,0]`
/// 2. ALSA sequencer client:port IDs: trailing `28:0` or `20:0`
///
/// Examples:
/// - "Traktor Kontrol X1 MK3 MIDI 1 [hw:3,0,0]" -> "Traktor Kontrol X1 MK3 MIDI 1"
/// - "XONE:PX5:XONE:PX5 MIDI 1 28:0" -> "XONE:PX5:XONE:PX5 MIDI 1"
pub fn normalize_port_name(name: &str) -> String {
    let mut result = name.trim();

    if let Some(bracket_pos) = result.rfind('[') {
        result = result[..bracket_pos].trim();
    }

    // Pattern: space followed by digits, colon, digits at end of string
    if let Some(last_space) = result.rfind(' ') {
        let suffix = &result[last_space + 1..];
        if let Some((client, port)) = suffix.split_once(':') {
            let is_id = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
            if is_id(client) && is_id(port) {
                result = result[..last_space].trim();
            }
        }
    }

    result.to_string()
}

/// Check if a port name matches a learned port name or port_match pattern
///
/// First tries exact match against normalized port name, then falls back
/// to case-insensitive substring match against port_match.
pub fn port_matches(actual_port: &str, profile: &DeviceProfile) -> bool {
    let normalized_actual = normalize_port_name(actual_port);

    if let Some(ref learned) = profile.learned_port_name {
        let normalized_learned = normalize_port_name(learned);
        if normalized_actual.eq_ignore_ascii_case(&normalized_learned) {
            return true;
        }
    }

    let normalized_port_match = normalize_port_name(&profile.port_match);
    normalized_actual
        .to_lowercase()
        .contains(&normalized_port_match.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(port_match: &str, learned: Option<&str>) -> DeviceProfile {
        DeviceProfile {
            name: "test".to_string(),
            port_match: port_match.to_string(),
            learned_port_name: learned.map(str::to_string),
            slots: vec![SlotControls {
                button: ControlAddress::note(0, 10),
                encoder: None,
                encoder_press: None,
            }],
            monitors: vec![],
        }
    }

    #[test]
    fn test_default_config() {
        let config = SlooperConfig::default();
        assert_eq!(config.osc.port, 9000);
        assert_eq!(config.timing.hold_threshold_ms, 1000);
        assert_eq!(config.timing.crop_step_ms, 50);
        let active = config.active_profile().unwrap();
        assert_eq!(active.name, "traktor-x1-mk3");
        assert_eq!(active.slots.len(), 2);
        assert!(config.profile("XONE-PX5").is_ok());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
osc:
  host: "192.168.1.20"
  port: 9100
timing:
  hold_threshold_ms: 800
profile: "desk"
profiles:
  - name: "desk"
    port_match: "desk"
    slots:
      - button: { type: note, channel: 0, note: 10 }
        encoder: { type: control_change, channel: 0, cc: 20 }
        encoder_press: { type: note, channel: 0, note: 11 }
    monitors:
      - button: { type: note, channel: 0, note: 12 }
"#;

        let config = parse_config(yaml).unwrap();
        assert_eq!(config.osc.host, "192.168.1.20");
        assert_eq!(config.timing.hold_threshold_ms, 800);
        // Unspecified fields keep their defaults
        assert_eq!(config.timing.crop_throttle_ms, 50);
        assert_eq!(config.led.on_value, 127);

        let profile = config.active_profile().unwrap();
        assert_eq!(profile.slots[0].encoder, Some(ControlAddress::cc(0, 20)));
        assert_eq!(profile.slots[0].encoder_press, Some(ControlAddress::note(0, 11)));
        assert_eq!(profile.monitors[0].button, ControlAddress::note(0, 12));
    }

    #[test]
    fn test_unknown_profile() {
        let config = SlooperConfig {
            profile: "missing".to_string(),
            ..SlooperConfig::default()
        };
        assert!(matches!(
            config.active_profile(),
            Err(ConfigError::UnknownProfile(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_controls() {
        let mut p = profile("x", None);
        p.monitors.push(MonitorControls {
            button: ControlAddress::note(0, 10),
        });
        assert!(matches!(p.validate(), Err(ConfigError::InvalidProfile { .. })));
    }

    #[test]
    fn test_validate_limits() {
        let mut p = profile("x", None);
        p.slots.clear();
        assert!(p.validate().is_err());

        let mut p = profile("x", None);
        for note in 20..23 {
            p.monitors.push(MonitorControls {
                button: ControlAddress::note(0, note),
            });
        }
        assert!(p.validate().is_err());
        p.monitors.pop();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("slooper-config-test-{}", std::process::id()))
            .join("config.yaml");
        let mut config = SlooperConfig::default();
        config.osc.port = 9555;
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path);
        assert_eq!(loaded.osc.port, 9555);
        assert_eq!(loaded.profiles.len(), config.profiles.len());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_missing_or_invalid_falls_back() {
        let missing = std::env::temp_dir().join("slooper-definitely-missing.yaml");
        assert_eq!(load_config(&missing).profile, "traktor-x1-mk3");

        let dir = std::env::temp_dir().join(format!("slooper-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let bad = dir.join("config.yaml");
        std::fs::write(&bad, "profiles: [not, a, profile").unwrap();
        assert!(matches!(try_load_config(&bad), Err(ConfigError::Parse(_))));
        assert_eq!(load_config(&bad).profiles.len(), builtin_profiles().len());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_normalize_port_name() {
        assert_eq!(
            normalize_port_name("Traktor Kontrol X1 MK3 MIDI 1 [hw:3,0,0]"),
            "Traktor Kontrol X1 MK3 MIDI 1"
        );
        assert_eq!(
            normalize_port_name("XONE:PX5:XONE:PX5 MIDI 1 28:0"),
            "XONE:PX5:XONE:PX5 MIDI 1"
        );
        assert_eq!(normalize_port_name("  Padded Name  "), "Padded Name");
        assert_eq!(normalize_port_name(""), "");
        assert_eq!(normalize_port_name("[only brackets]"), "");
    }

    #[test]
    fn test_port_matches() {
        let learned = profile("x1", Some("TRAKTOR X1 MK3:TRAKTOR X1 MK3 MIDI 1"));
        assert!(port_matches("TRAKTOR X1 MK3:TRAKTOR X1 MK3 MIDI 1 24:0", &learned));
        assert!(port_matches("traktor x1 mk3:traktor x1 mk3 midi 1", &learned));

        let substring = profile("TRAKTOR X1 MK3", None);
        assert!(substring.matches_port("Traktor X1 MK3 MIDI 1 [hw:2,0,0]"));
        assert!(!substring.matches_port("XONE:PX5 MIDI 1"));
    }
}
