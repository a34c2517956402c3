const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sv", "Swedish"),
    ("th", "Thai"),
    ("tl", "Tagalog"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

/// Lowercase primary subtag: "en-US" and "EN_gb" both become "en"
pub fn normalize_language_code(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

pub fn is_same_language(a: &str, b: &str) -> bool {
    normalize_language_code(a) == normalize_language_code(b)
}

/// English name for prompts; unknown codes are returned as given
pub fn language_name(code: &str) -> String {
    let normalized = normalize_language_code(code);
    LANGUAGE_NAMES
        .iter()
        .find(|(known, _)| *known == normalized)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}
