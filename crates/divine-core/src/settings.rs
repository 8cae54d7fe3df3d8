//! In-memory system settings. Reset on every restart.

use serde::{Deserialize, Serialize};

/// Models offered in the settings panel: (id, label).
pub const MODEL_CHOICES: &[(&str, &str)] = &[
    ("gemini-3-pro-preview", "Gemini 3 Pro (Visionary)"),
    ("gemini-3-flash-preview", "Gemini 3 Flash (High-Speed)"),
    ("gemini-2.5-flash", "Gemini 2.5 (Stable Sync)"),
];

pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    Maintenance,
    EnableInnerCircle,
    EnableQuoraMode,
}

impl SettingKey {
    pub const ALL: [SettingKey; 3] = [
        SettingKey::Maintenance,
        SettingKey::EnableInnerCircle,
        SettingKey::EnableQuoraMode,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            SettingKey::Maintenance => "maintenance",
            SettingKey::EnableInnerCircle => "enable_inner_circle",
            SettingKey::EnableQuoraMode => "enable_quora_mode",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingKey::Maintenance => "Maintenance Mode",
            SettingKey::EnableInnerCircle => "Inner Circle Access",
            SettingKey::EnableQuoraMode => "Quora Feed Matrix",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SettingKey::Maintenance => "Suspend all divine stream services.",
            SettingKey::EnableInnerCircle => "Enable high-tier soul decoding protocols.",
            SettingKey::EnableQuoraMode => "Sync knowledge queue with external live feeds.",
        }
    }
}

impl std::str::FromStr for SettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .iter()
            .copied()
            .find(|k| k.slug() == s.trim())
            .ok_or_else(|| format!("unknown setting: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub maintenance: bool,
    pub enable_inner_circle: bool,
    pub enable_quora_mode: bool,
    /// Model used by the soul decoder.
    pub ai_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            maintenance: false,
            enable_inner_circle: true,
            enable_quora_mode: false,
            ai_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    pub fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::Maintenance => self.maintenance,
            SettingKey::EnableInnerCircle => self.enable_inner_circle,
            SettingKey::EnableQuoraMode => self.enable_quora_mode,
        }
    }

    /// Flip a toggle; returns the new value.
    pub fn toggle(&mut self, key: SettingKey) -> bool {
        let slot = match key {
            SettingKey::Maintenance => &mut self.maintenance,
            SettingKey::EnableInnerCircle => &mut self.enable_inner_circle,
            SettingKey::EnableQuoraMode => &mut self.enable_quora_mode,
        };
        *slot = !*slot;
        *slot
    }

    /// Select the decoder model. Only ids from [`MODEL_CHOICES`] are accepted.
    pub fn set_model(&mut self, model: &str) -> bool {
        let model = model.trim();
        if MODEL_CHOICES.iter().any(|(id, _)| *id == model) {
            self.ai_model = model.to_string();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fresh_session() {
        let s = Settings::default();
        assert!(!s.maintenance);
        assert!(s.enable_inner_circle);
        assert!(!s.enable_quora_mode);
        assert_eq!(s.ai_model, "gemini-3-pro-preview");
    }

    #[test]
    fn toggle_flips_and_reports() {
        let mut s = Settings::default();
        assert!(s.toggle(SettingKey::Maintenance));
        assert!(s.get(SettingKey::Maintenance));
        assert!(!s.toggle(SettingKey::Maintenance));
    }

    #[test]
    fn unknown_models_are_refused() {
        let mut s = Settings::default();
        assert!(!s.set_model("gpt-4"));
        assert_eq!(s.ai_model, DEFAULT_MODEL);
        assert!(s.set_model(" gemini-2.5-flash "));
        assert_eq!(s.ai_model, "gemini-2.5-flash");
    }

    #[test]
    fn keys_parse_from_slugs() {
        assert_eq!("enable_quora_mode".parse::<SettingKey>(), Ok(SettingKey::EnableQuoraMode));
        assert!("turbo".parse::<SettingKey>().is_err());
    }
}
