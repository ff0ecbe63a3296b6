use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValorantError;

/// Locales accepted by the `language` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ar-AE")]
    ArabicUae,
    #[serde(rename = "de-DE")]
    German,
    #[default]
    #[serde(rename = "en-US")]
    EnglishUs,
    #[serde(rename = "es-ES")]
    SpanishSpain,
    #[serde(rename = "es-MX")]
    SpanishMexico,
    #[serde(rename = "fr-FR")]
    French,
    #[serde(rename = "id-ID")]
    Indonesian,
    #[serde(rename = "it-IT")]
    Italian,
    #[serde(rename = "ja-JP")]
    Japanese,
    #[serde(rename = "ko-KR")]
    Korean,
    #[serde(rename = "pl-PL")]
    Polish,
    #[serde(rename = "pt-BR")]
    PortugueseBrazil,
    #[serde(rename = "ru-RU")]
    Russian,
    #[serde(rename = "th-TH")]
    Thai,
    #[serde(rename = "tr-TR")]
    Turkish,
    #[serde(rename = "vi-VN")]
    Vietnamese,
    #[serde(rename = "zh-CN")]
    ChineseSimplified,
    #[serde(rename = "zh-TW")]
    ChineseTraditional,
}

impl Language {
    /// Every supported locale.
    pub const ALL: [Language; 18] = [
        Language::ArabicUae,
        Language::German,
        Language::EnglishUs,
        Language::SpanishSpain,
        Language::SpanishMexico,
        Language::French,
        Language::Indonesian,
        Language::Italian,
        Language::Japanese,
        Language::Korean,
        Language::Polish,
        Language::PortugueseBrazil,
        Language::Russian,
        Language::Thai,
        Language::Turkish,
        Language::Vietnamese,
        Language::ChineseSimplified,
        Language::ChineseTraditional,
    ];

    /// The locale tag sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::ArabicUae => "ar-AE",
            Language::German => "de-DE",
            Language::EnglishUs => "en-US",
            Language::SpanishSpain => "es-ES",
            Language::SpanishMexico => "es-MX",
            Language::French => "fr-FR",
            Language::Indonesian => "id-ID",
            Language::Italian => "it-IT",
            Language::Japanese => "ja-JP",
            Language::Korean => "ko-KR",
            Language::Polish => "pl-PL",
            Language::PortugueseBrazil => "pt-BR",
            Language::Russian => "ru-RU",
            Language::Thai => "th-TH",
            Language::Turkish => "tr-TR",
            Language::Vietnamese => "vi-VN",
            Language::ChineseSimplified => "zh-CN",
            Language::ChineseTraditional => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ValorantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValorantError::InvalidConfig(format!("unknown language '{}'", s)))
    }
}
