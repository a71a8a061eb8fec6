use std::path::{Path, PathBuf};

use crate::state::Settings;

const CONFIG_DIR: &str = "read-from-here";
const SETTINGS_FILE: &str = "settings.json";

/// Default settings location under the platform config directory.
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(SETTINGS_FILE))
}

/// Loads settings from `path`, or from [`settings_path`] when none is given.
/// Never fails: unreadable or malformed files fall back to defaults.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = match path.map(Path::to_path_buf).or_else(settings_path) {
        Some(p) => p,
        None => {
            tracing::warn!("No config directory available. Using default settings.");
            return Settings::default();
        }
    };

    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No settings at {}. Using defaults.", path.display());
            return Settings::default();
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
            return Settings::default();
        }
    };

    match serde_json::from_str::<Settings>(&contents) {
        Ok(settings) => {
            tracing::info!("Loaded settings from {}", path.display());
            settings
        }
        Err(e) => {
            tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"tts":{"rate":1.5,"fallback_language":"fr"},"shortcuts":{"next":"j"}}"#,
        )
        .unwrap();

        let settings = load_settings(Some(&path));
        assert_eq!(settings.tts.rate, 1.5);
        assert_eq!(settings.tts.fallback_language.as_deref(), Some("fr"));
        assert_eq!(settings.tts.quiescent_ms, 150);
        assert_eq!(settings.tts.preferred_providers, vec!["Google"]);
        assert_eq!(settings.shortcuts.next, "j");
        assert_eq!(settings.shortcuts.previous, "b");
        assert!(!settings.general.high_contrast);
    }

    #[test]
    fn malformed_or_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(load_settings(Some(&path)).tts.rate, 1.0);
        assert_eq!(
            load_settings(Some(&dir.path().join("absent.json"))).shortcuts.quit,
            "q"
        );
    }

    #[test]
    fn rate_is_clamped() {
        let mut settings = Settings::default();
        settings.tts.rate = 40.0;
        assert_eq!(settings.tts.clamped_rate(), 10.0);
        settings.tts.rate = f32::NAN;
        assert_eq!(settings.tts.clamped_rate(), 1.0);
    }
}
