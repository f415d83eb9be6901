use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::SubscriberEmail;

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[._-]+").expect("valid separator pattern"));

const FALLBACK: &str = "there";

/// Human-friendly name guessed from the local part of an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn from_email(email: &SubscriberEmail) -> Self {
        Self::from_local_part(email.local_part())
    }

    pub fn from_local_part(local_part: &str) -> Self {
        let cleaned = SEPARATORS.replace_all(local_part, " ");
        let cleaned = cleaned.trim();

        if cleaned.is_empty() {
            return Self(FALLBACK.to_string());
        }

        let name = cleaned
            .split_whitespace()
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ");

        Self(name)
    }
}

fn capitalize(word: &str) -> String {
    let mut graphemes = word.graphemes(true);
    match graphemes.next() {
        Some(first) => format!(
            "{}{}",
            first.to_uppercase(),
            graphemes.as_str().to_lowercase()
        ),
        None => String::new(),
    }
}

impl Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
