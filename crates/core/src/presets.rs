//! Built-in avatar, voice and style presets that generation settings may name.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
    pub locale: Option<&'static str>,
}

const fn preset(id: &'static str, name: &'static str, provider: &'static str) -> Preset {
    Preset {
        id,
        name,
        provider,
        locale: None,
    }
}

const fn voice(id: &'static str, name: &'static str, locale: &'static str) -> Preset {
    Preset {
        id,
        name,
        provider: "stub",
        locale: Some(locale),
    }
}

pub const AVATAR_PRESETS: &[Preset] = &[
    preset("local_musetalk", "Local (MuseTalk)", "local_musetalk"),
    preset("stub_avatar_m1", "Mentor", "stub"),
    preset("stub_avatar_f1", "Instructor", "stub"),
    preset("stub_avatar_n1", "Narrator", "stub"),
];

pub const VOICE_PRESETS: &[Preset] = &[
    voice("stub_voice_en_us_1", "English (US) Neutral", "en-US"),
    voice("stub_voice_en_ca_1", "English (CA) Neutral", "en-CA"),
    voice("stub_voice_en_gb_1", "English (UK) Neutral", "en-GB"),
];

pub const STYLE_PRESETS: &[Preset] = &[
    preset("stub_style_clean", "Clean", "stub"),
    preset("stub_style_corporate", "Corporate", "stub"),
    preset("stub_style_modern", "Modern", "stub"),
];

fn find(presets: &'static [Preset], id: &str) -> Option<&'static Preset> {
    presets.iter().find(|preset| preset.id == id)
}

pub fn avatar_preset(id: &str) -> Option<&'static Preset> {
    find(AVATAR_PRESETS, id)
}

pub fn voice_preset(id: &str) -> Option<&'static Preset> {
    find(VOICE_PRESETS, id)
}

pub fn style_preset(id: &str) -> Option<&'static Preset> {
    find(STYLE_PRESETS, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_match_exact_ids() {
        assert_eq!(avatar_preset("stub_avatar_f1").map(|p| p.name), Some("Instructor"));
        assert_eq!(voice_preset("stub_voice_en_gb_1").and_then(|p| p.locale), Some("en-GB"));
        assert!(style_preset("stub_style_modern").is_some());
        assert!(avatar_preset("STUB_AVATAR_F1").is_none());
        assert!(voice_preset("").is_none());
    }
}
