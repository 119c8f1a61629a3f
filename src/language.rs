use std::fmt;
use std::str::FromStr;

use failure::format_err;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Language {
    #[serde(rename = "de")]
    DE,
    #[serde(rename = "en")]
    EN,
    #[serde(rename = "es")]
    ES,
    #[serde(rename = "fr")]
    FR,
    #[serde(rename = "it")]
    IT,
    #[serde(rename = "ja")]
    JA,
    #[serde(rename = "ko")]
    KO,
    #[serde(rename = "pt_pt")]
    PT_PT,
    #[serde(rename = "pt_br")]
    PT_BR,
}

impl Language {
    pub fn all() -> &'static [Language] {
        &[
            Language::DE,
            Language::EN,
            Language::ES,
            Language::FR,
            Language::IT,
            Language::JA,
            Language::KO,
            Language::PT_PT,
            Language::PT_BR,
        ]
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::DE => "de",
            Language::EN => "en",
            Language::ES => "es",
            Language::FR => "fr",
            Language::IT => "it",
            Language::JA => "ja",
            Language::KO => "ko",
            Language::PT_PT => "pt_pt",
            Language::PT_BR => "pt_br",
        }
    }

    /// Languages written without spaces between words
    pub fn is_space_free(&self) -> bool {
        match self {
            Language::JA => true,
            _ => false,
        }
    }
}

impl FromStr for Language {
    type Err = failure::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.to_lowercase().replace('-', "_");
        Language::all()
            .iter()
            .find(|language| language.code() == code)
            .cloned()
            .ok_or_else(|| format_err!("Unknown language: '{}'", s))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
