use std::str::FromStr;

use anyhow::{anyhow, Result};

/// 數字前後常見的非數字字元 (空白、不換行空白、引號)
const NUMBER_ESCAPE_CHAR: &[char] = &[' ', '\u{a0}', '\u{202f}', '"', '\n', '\t'];

/// 以空白作為千分位的語系，三種空白皆視為千分位
const SPACE_GROUPING: &[char] = &[' ', '\u{a0}', '\u{202f}'];

/// Grouping and decimal separators of a locale.
///
/// Quote pages render numbers the way the site's locale does ("1,000.00" on an
/// English page, "1.000,00" on a German one). Parsing goes through a
/// `NumberLocale` so the same extractor works for either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberLocale {
    pub grouping: char,
    pub decimal: char,
}

impl NumberLocale {
    pub const EN_US: NumberLocale = NumberLocale {
        grouping: ',',
        decimal: '.',
    };

    pub const DE_DE: NumberLocale = NumberLocale {
        grouping: '.',
        decimal: ',',
    };

    pub const FR_FR: NumberLocale = NumberLocale {
        grouping: '\u{202f}',
        decimal: ',',
    };

    /// Resolves a locale tag such as `en_US`, `de-DE` or `fr_FR.UTF-8`.
    ///
    /// Unknown tags resolve to `None`; callers decide the fallback.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.split('.').next().unwrap_or_default().replace('-', "_");
        let language = tag.split('_').next().unwrap_or_default().to_lowercase();

        match language.as_str() {
            "en" | "ja" | "zh" | "ko" | "fil" | "tl" => Some(Self::EN_US),
            "de" | "id" | "it" | "es" | "pt" | "nl" | "da" | "tr" => Some(Self::DE_DE),
            "fr" | "ru" | "pl" | "cs" | "sv" | "fi" | "nb" | "uk" => Some(Self::FR_FR),
            _ => None,
        }
    }

    /// Rewrites `s` into the plain `1234.5` form `FromStr` understands.
    ///
    /// Only the grouping separator is dropped inside the number; any other
    /// stray character stays and makes the parse fail.
    pub fn delocalize(&self, s: &str) -> String {
        let space_grouping = SPACE_GROUPING.contains(&self.grouping);

        clean_escape_chars(s)
            .chars()
            .filter(|c| *c != self.grouping && !(space_grouping && SPACE_GROUPING.contains(c)))
            .map(|c| if c == self.decimal { '.' } else { c })
            .collect()
    }

    /// Parses a localized floating point number, e.g. "1,000.00".
    pub fn parse_f64(&self, s: &str) -> Result<f64> {
        let cleaned = self.delocalize(s);
        let value = f64::from_str(&cleaned)
            .map_err(|why| anyhow!("Failed to parse '{}' as f64 because {:?}", s, why))?;

        if !value.is_finite() {
            return Err(anyhow!("Failed to parse '{}' as f64 because it is not finite", s));
        }

        Ok(value)
    }

    /// Parses a localized integer, e.g. "1,000". Decimals are rejected.
    pub fn parse_i64(&self, s: &str) -> Result<i64> {
        let cleaned = self.delocalize(s);
        i64::from_str(&cleaned)
            .map_err(|why| anyhow!("Failed to parse '{}' as i64 because: {:?}", s, why))
    }
}

/// Strips the characters in `NUMBER_ESCAPE_CHAR` from both ends of `s`.
///
/// # Example
///
/// ```ignore
/// assert_eq!(clean_escape_chars(" \"1,234\"\n"), "1,234");
/// ```
pub(crate) fn clean_escape_chars(s: &str) -> &str {
    s.trim_matches(NUMBER_ESCAPE_CHAR)
}
