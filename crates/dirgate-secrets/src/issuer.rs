//! Secret generation and strength scoring.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::secret::SecretValue;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Characters counted as "special" by both the generator and the scorer.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Default generated length.
pub const DEFAULT_LENGTH: usize = 12;

/// Highest attainable strength score.
pub const MAX_SCORE: u8 = 6;

/// Score at which a secret counts as strong.
pub const STRONG_SCORE: u8 = 4;

/// Regeneration attempts before giving up on the strong bar.
const MAX_ATTEMPTS: usize = 64;

/// Coarse strength bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthLabel {
    Weak,
    Medium,
    Strong,
}

impl StrengthLabel {
    fn from_score(score: u8) -> Self {
        if score < 3 {
            Self::Weak
        } else if score < 5 {
            Self::Medium
        } else {
            Self::Strong
        }
    }
}

impl std::fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weak => write!(f, "weak"),
            Self::Medium => write!(f, "medium"),
            Self::Strong => write!(f, "strong"),
        }
    }
}

/// Result of [`strength`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthReport {
    pub score: u8,
    pub max_score: u8,
    pub label: StrengthLabel,
    pub suggestions: Vec<String>,
    pub is_strong: bool,
}

/// Generation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretIssuer {
    pub length: usize,
    pub include_special: bool,
}

impl Default for SecretIssuer {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            include_special: true,
        }
    }
}

impl SecretIssuer {
    /// Generate a secret under this policy.
    #[must_use]
    pub fn issue(&self) -> SecretValue {
        generate(self.length, self.include_special)
    }
}

/// Generate a random secret.
///
/// At least one lowercase letter, one uppercase letter, one digit and, when
/// `include_special` is set, one special character are always present. The
/// remaining positions come from the full alphabet and the result is shuffled
/// with the OS CSPRNG. Lengths shorter than the number of required classes
/// are raised to that number.
#[must_use]
pub fn generate(length: usize, include_special: bool) -> SecretValue {
    let mut rng = OsRng;
    let mut last = None;

    for _ in 0..MAX_ATTEMPTS {
        let candidate = build_candidate(&mut rng, length, include_special);
        if strength(&candidate).is_strong {
            return SecretValue::new(candidate);
        }
        last = Some(candidate);
    }

    debug!(length, "Generated secret did not reach the strong bar");
    SecretValue::new(last.unwrap_or_default())
}

fn build_candidate(rng: &mut OsRng, length: usize, include_special: bool) -> String {
    let special = SPECIAL_CHARACTERS.as_bytes();
    let mut classes: Vec<&[u8]> = vec![LOWERCASE, UPPERCASE, DIGITS];
    if include_special {
        classes.push(special);
    }
    let alphabet: Vec<u8> = classes.iter().flat_map(|c| c.iter().copied()).collect();
    let length = length.max(classes.len());

    let mut chars: Vec<u8> = Vec::with_capacity(length);
    for class in &classes {
        chars.push(class[rng.gen_range(0..class.len())]);
    }
    while chars.len() < length {
        chars.push(alphabet[rng.gen_range(0..alphabet.len())]);
    }
    chars.shuffle(rng);

    chars.into_iter().map(char::from).collect()
}

/// Score a secret.
///
/// One point each for: length of at least 8, a lowercase letter, an
/// uppercase letter, a digit, a special character, and at least 70% distinct
/// characters.
#[must_use]
pub fn strength(secret: &str) -> StrengthReport {
    let mut score = 0u8;
    let mut suggestions = Vec::new();

    let length = secret.chars().count();
    let checks = [
        (length >= 8, "Use at least 8 characters"),
        (
            secret.chars().any(|c| c.is_ascii_lowercase()),
            "Add a lowercase letter",
        ),
        (
            secret.chars().any(|c| c.is_ascii_uppercase()),
            "Add an uppercase letter",
        ),
        (secret.chars().any(|c| c.is_ascii_digit()), "Add a digit"),
        (
            secret.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
            "Add a special character",
        ),
        (
            distinct_ratio_ok(secret, length),
            "Use fewer repeated characters",
        ),
    ];

    for (passed, suggestion) in checks {
        if passed {
            score += 1;
        } else {
            suggestions.push(suggestion.to_string());
        }
    }

    StrengthReport {
        score,
        max_score: MAX_SCORE,
        label: StrengthLabel::from_score(score),
        suggestions,
        is_strong: score >= STRONG_SCORE,
    }
}

fn distinct_ratio_ok(secret: &str, length: usize) -> bool {
    let mut seen: Vec<char> = secret.chars().collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len() * 10 >= length * 7
}
