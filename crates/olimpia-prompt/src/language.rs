//! Report language
//!
//! Reports and prompts ship in English and Brazilian Portuguese. Anything else
//! is carried as `Other` and rendered through the English fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language a report is written in
///
/// # Examples
///
/// ```
/// use olimpia_prompt::Language;
///
/// assert_eq!(Language::from_code("pt-BR"), Language::Portuguese);
/// assert_eq!(Language::Portuguese.code(), "pt");
/// assert_eq!(Language::from_code("es"), Language::Other("es".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Portuguese,
    /// Any other ISO 639-1 code
    Other(String),
}

impl Language {
    /// ISO 639-1 code
    pub fn code(&self) -> &str {
        match self {
            Language::English => "en",
            Language::Portuguese => "pt",
            Language::Other(code) => code,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            Language::English => "English",
            Language::Portuguese => "Português",
            Language::Other(code) => code,
        }
    }

    /// Parse a code or a common name, case-insensitively
    pub fn from_code(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" | "en-us" | "en-gb" => Language::English,
            "pt" | "pt-br" | "pt_br" | "portuguese" | "português" | "portugues" => {
                Language::Portuguese
            }
            other => Language::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Language::Other(_))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        Language::from_code(s)
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        Language::from_code(&s)
    }
}
