//! Supported answer languages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language used to pick the system prompt and refusal phrase.
///
/// Retrieval filters on the raw language code the caller sent; this enum
/// only governs how the model is instructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ko,
    En,
    Ja,
}

impl Lang {
    /// Fallback for unrecognized codes.
    pub const DEFAULT: Lang = Lang::Ko;

    /// Map any language code to a supported language. Never fails.
    pub fn resolve(code: &str) -> Lang {
        match code.trim().to_ascii_lowercase().as_str() {
            "ko" => Lang::Ko,
            "en" => Lang::En,
            "ja" => Lang::Ja,
            _ => Lang::DEFAULT,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Lang::Ko => "ko",
            Lang::En => "en",
            Lang::Ja => "ja",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_codes() {
        assert_eq!(Lang::resolve("ko"), Lang::Ko);
        assert_eq!(Lang::resolve("en"), Lang::En);
        assert_eq!(Lang::resolve("JA"), Lang::Ja);
    }

    #[test]
    fn test_resolve_unknown_falls_back() {
        assert_eq!(Lang::resolve("fr"), Lang::DEFAULT);
        assert_eq!(Lang::resolve(""), Lang::DEFAULT);
    }

    #[test]
    fn test_code_roundtrip() {
        for lang in [Lang::Ko, Lang::En, Lang::Ja] {
            assert_eq!(Lang::resolve(lang.code()), lang);
        }
    }
}
