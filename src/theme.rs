//! Named application color themes.
//!
//! A theme is a pure map of CSS custom properties. [`apply`] is the only
//! place those tokens reach the host environment.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Ocean,
    Sunset,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Light, Theme::Dark, Theme::Ocean, Theme::Sunset];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Ocean => "ocean",
            Theme::Sunset => "sunset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }

    fn palette(self) -> [&'static str; 7] {
        // background, surface, text, muted, primary, accent, border
        match self {
            Theme::Light => [
                "#ffffff", "#f9fafb", "#111827", "#6b7280", "#4f46e5", "#ec4899", "#e5e7eb",
            ],
            Theme::Dark => [
                "#0f172a", "#1e293b", "#f1f5f9", "#94a3b8", "#818cf8", "#f472b6", "#334155",
            ],
            Theme::Ocean => [
                "#f0f9ff", "#e0f2fe", "#0c4a6e", "#0369a1", "#0284c7", "#14b8a6", "#bae6fd",
            ],
            Theme::Sunset => [
                "#fff7ed", "#ffedd5", "#431407", "#9a3412", "#ea580c", "#e11d48", "#fed7aa",
            ],
        }
    }

    /// CSS custom properties for this theme.
    pub fn tokens(self) -> BTreeMap<&'static str, String> {
        const NAMES: [&str; 7] = [
            "--color-background",
            "--color-surface",
            "--color-text",
            "--color-muted",
            "--color-primary",
            "--color-accent",
            "--color-border",
        ];
        let mut tokens: BTreeMap<_, _> = NAMES
            .into_iter()
            .zip(self.palette().map(str::to_string))
            .collect();
        let scheme = if self == Theme::Dark { "dark" } else { "light" };
        tokens.insert("color-scheme", scheme.to_string());
        tokens
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where theme tokens are written, e.g. the document root's style.
pub trait ThemeSink {
    fn set_property(&mut self, name: &str, value: &str);
}

/// Write every token of `theme` into `sink`.
pub fn apply(theme: Theme, sink: &mut dyn ThemeSink) {
    let tokens = theme.tokens();
    for (name, value) in &tokens {
        sink.set_property(name, value);
    }
    tracing::debug!(theme = %theme, tokens = tokens.len(), "theme applied");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<(String, String)>);

    impl ThemeSink for Recorder {
        fn set_property(&mut self, name: &str, value: &str) {
            self.0.push((name.to_string(), value.to_string()));
        }
    }

    #[test]
    fn test_tokens_are_complete_for_every_theme() {
        for theme in Theme::ALL {
            let tokens = theme.tokens();
            assert_eq!(tokens.len(), 8, "{theme}");
            assert!(tokens.values().all(|v| !v.is_empty()));
        }
        assert_eq!(Theme::Dark.tokens()["color-scheme"], "dark");
    }

    #[test]
    fn test_apply_writes_once_per_token() {
        let mut sink = Recorder::default();
        apply(Theme::Ocean, &mut sink);
        assert_eq!(sink.0.len(), 8);
        assert!(sink.0.contains(&("--color-primary".to_string(), "#0284c7".to_string())));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Theme::parse(" Dark "), Some(Theme::Dark));
        assert_eq!(Theme::parse("neon"), None);
    }
}
