use super::Voice;
use crate::state::TtsSettings;

/// Picks a voice for a block from the engine's current voice list.
#[derive(Debug, Clone, Default)]
pub struct VoiceResolver {
    preferred_providers: Vec<String>,
    pinned: Option<String>,
}

impl VoiceResolver {
    pub fn new(preferred_providers: Vec<String>, pinned: Option<String>) -> Self {
        let preferred_providers = preferred_providers
            .into_iter()
            .map(|marker| marker.trim().to_lowercase())
            .filter(|marker| !marker.is_empty())
            .collect();
        Self {
            preferred_providers,
            pinned,
        }
    }

    pub fn from_settings(settings: &TtsSettings) -> Self {
        Self::new(settings.preferred_providers.clone(), settings.voice_id.clone())
    }

    /// First match wins: pinned voice, preferred provider in the target
    /// language, any preferred provider, any voice in the target language,
    /// the engine default, the first voice.
    pub fn resolve<'a>(&self, voices: &'a [Voice], language: Option<&str>) -> Option<&'a Voice> {
        if let Some(pinned) = &self.pinned {
            if let Some(voice) = voices.iter().find(|v| &v.id == pinned) {
                return Some(voice);
            }
            tracing::debug!("Pinned voice {} is not available", pinned);
        }

        let speaks_target =
            |voice: &Voice| language.is_some_and(|target| language_matches(&voice.language, target));

        voices
            .iter()
            .find(|v| self.is_preferred(v) && speaks_target(v))
            .or_else(|| voices.iter().find(|v| self.is_preferred(v)))
            .or_else(|| voices.iter().find(|v| speaks_target(v)))
            .or_else(|| voices.iter().find(|v| v.is_default))
            .or_else(|| voices.first())
    }

    fn is_preferred(&self, voice: &Voice) -> bool {
        let name = voice.name.to_lowercase();
        let id = voice.id.to_lowercase();
        self.preferred_providers
            .iter()
            .any(|marker| name.contains(marker) || id.contains(marker))
    }
}

/// Case-insensitive prefix match, so "en" matches "en-US" and "en_GB".
pub fn language_matches(voice_language: &str, target: &str) -> bool {
    let target = normalize_tag(target);
    !target.is_empty() && normalize_tag(voice_language).starts_with(&target)
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_lowercase()
}
