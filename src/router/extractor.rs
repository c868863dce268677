//! City-name extraction for the keyword strategy
//!
//! Pure CPU logic over an ordered list of regular expressions. The first
//! pattern that matches the lowercased message wins; without a match the
//! last whitespace-delimited token of the original message is used.

use crate::error::{AppError, AppResult};
use crate::weather::title_case;
use regex::Regex;

/// Built-in city patterns, tried in this order
///
/// Each has exactly one capture group and is applied to the lowercased
/// message.
pub const DEFAULT_CITY_PATTERNS: &[&str] = &[
    r"weather in ([a-z\s]+)",
    r"temperature in ([a-z\s]+)",
    r"forecast for ([a-z\s]+)",
    r"climate in ([a-z\s]+)",
    r"weather of ([a-z\s]+)",
    r"temperature of ([a-z\s]+)",
    r"raining in ([a-z\s]+)",
    r"rain in ([a-z\s]+)",
    r"snowing in ([a-z\s]+)",
    r"sunny in ([a-z\s]+)",
    r"cloudy in ([a-z\s]+)",
    r"windy in ([a-z\s]+)",
    r"humid in ([a-z\s]+)",
    r"hot in ([a-z\s]+)",
    r"cold in ([a-z\s]+)",
    r"warm in ([a-z\s]+)",
];

/// Recovers a candidate city name from free text
///
/// Patterns are compiled once at construction and never change.
#[derive(Debug, Clone)]
pub struct CityExtractor {
    patterns: Vec<Regex>,
}

impl CityExtractor {
    /// Compile `patterns` in order
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if a pattern does not compile or does not
    /// have exactly one capture group.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> AppResult<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                let compiled = Regex::new(pattern).map_err(|e| {
                    AppError::Config(format!(
                        "routing.city_patterns entry '{}' is not a valid regex: {}",
                        pattern, e
                    ))
                })?;
                // captures_len counts the implicit whole-match group
                if compiled.captures_len() != 2 {
                    return Err(AppError::Config(format!(
                        "routing.city_patterns entry '{}' must have exactly one capture group, found {}",
                        pattern,
                        compiled.captures_len() - 1
                    )));
                }
                Ok(compiled)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Extractor over [`DEFAULT_CITY_PATTERNS`]
    pub fn with_defaults() -> AppResult<Self> {
        Self::new(DEFAULT_CITY_PATTERNS)
    }

    /// Extract a title-cased city name from `message`
    ///
    /// The last-token fallback is greedy: "check the weather" yields
    /// `Some("Weather")`.
    pub fn extract(&self, message: &str) -> Option<String> {
        let lowered = message.to_lowercase();

        for pattern in &self.patterns {
            if let Some(captures) = pattern.captures(&lowered) {
                let city = captures.get(1).map_or("", |m| m.as_str()).trim();
                if city.is_empty() {
                    return None;
                }
                return Some(title_case(city));
            }
        }

        let mut tokens = message.split_whitespace();
        let first = tokens.next();
        match (first, tokens.last()) {
            (Some(_), Some(last)) => Some(title_case(last)),
            _ => None,
        }
    }
}
