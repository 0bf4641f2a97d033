use super::types::Productivity;

const PRODUCTIVE_APPS: &[&str] = &[
    "code", "vscode", "sublime", "notepad++", "excel", "word", "chrome", "firefox", "edge",
    "outlook", "teams",
];

const UNPRODUCTIVE_APPS: &[&str] = &[
    "whatsapp", "telegram", "discord", "steam", "epicgames", "netflix", "youtube", "facebook",
    "instagram", "twitter",
];

const GAMING_APPS: &[&str] = &[
    "steam", "epicgames", "battle.net", "origin", "uplay", "gog", "minecraft", "valorant",
    "league", "csgo",
];

/// Classify a window/app name into a productivity category.
///
/// Case-insensitive substring match against the static app lists. A name can
/// match several lists ("steam" is both unproductive and gaming); the check
/// order productive -> unproductive -> gaming is the authoritative precedence,
/// first match wins. No match means neutral.
pub fn classify(window_name: &str) -> Productivity {
    let window = window_name.to_lowercase();

    if PRODUCTIVE_APPS.iter().any(|app| window.contains(app)) {
        Productivity::Productive
    } else if UNPRODUCTIVE_APPS.iter().any(|app| window.contains(app)) {
        Productivity::Unproductive
    } else if GAMING_APPS.iter().any(|app| window.contains(app)) {
        Productivity::Gaming
    } else {
        Productivity::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_apps() {
        assert_eq!(classify("Visual Studio Code"), Productivity::Productive);
        assert_eq!(classify("Steam"), Productivity::Unproductive);
        assert_eq!(classify("Unknown App"), Productivity::Neutral);
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(classify("EXCEL.EXE"), Productivity::Productive);
        assert_eq!(classify("WhatsApp Desktop"), Productivity::Unproductive);
        assert_eq!(classify("MINECRAFT"), Productivity::Gaming);
    }

    #[test]
    fn productive_wins_over_later_lists() {
        // "chrome" is productive even though the title also mentions youtube
        assert_eq!(classify("YouTube - Google Chrome"), Productivity::Productive);
    }

    #[test]
    fn unproductive_wins_over_gaming() {
        // "steam" appears in both the unproductive and gaming lists; the
        // earlier list takes precedence
        assert_eq!(classify("steam_client"), Productivity::Unproductive);
    }

    #[test]
    fn gaming_only_entries_classify_as_gaming() {
        assert_eq!(classify("VALORANT-Win64-Shipping"), Productivity::Gaming);
        assert_eq!(classify("battle.net launcher"), Productivity::Gaming);
    }

    #[test]
    fn empty_name_is_neutral() {
        assert_eq!(classify(""), Productivity::Neutral);
    }
}
