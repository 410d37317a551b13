//! Short code generation and validation.
//!
//! Generated codes draw from the URL-safe base64 alphabet, which is exactly
//! the allowed code alphabet `[A-Za-z0-9_-]`. Custom aliases are normalized
//! to lowercase and checked against a frozen reserved-word set.

use base64::Engine as _;
use rand::Rng;
use std::collections::HashSet;

/// Allowed length range for any short code, generated or custom.
pub const MIN_CODE_LENGTH: usize = 3;
pub const MAX_CODE_LENGTH: usize = 50;

/// Codes that clash with system paths and may never be issued.
///
/// Applies case-insensitively to generated and custom codes alike; the
/// configured `RESERVED_WORDS` superset is merged in at construction.
const BUILTIN_RESERVED: &[&str] = &[
    "api", "admin", "www", "login", "logout", "register", "signup", "health",
    "static", "dashboard", "urls", "auth", "metrics", "webhooks", "docs",
    "status", "about", "terms", "privacy",
];

/// Why a custom alias was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAlias {
    #[error("Alias must be at least 3 characters")]
    TooShort,
    #[error("Alias must be at most 50 characters")]
    TooLong,
    #[error("Alias may only contain letters, digits, '-' and '_'")]
    BadChars,
    #[error("This alias is reserved")]
    Reserved,
}

impl InvalidAlias {
    /// Machine-readable reason carried in error details.
    pub fn kind(&self) -> &'static str {
        match self {
            InvalidAlias::TooShort => "too_short",
            InvalidAlias::TooLong => "too_long",
            InvalidAlias::BadChars => "bad_chars",
            InvalidAlias::Reserved => "reserved",
        }
    }
}

/// Stateless short-code minting and alias validation.
///
/// Holds no durable state; collision handling is the caller's concern
/// (retry on unique-violation at insert).
pub struct CodeGenerator {
    length: usize,
    reserved: HashSet<String>,
}

impl CodeGenerator {
    /// Creates a generator producing codes of `length` characters, with
    /// `extra_reserved` merged into the built-in reserved set.
    pub fn new(length: usize, extra_reserved: &[String]) -> Self {
        let mut reserved: HashSet<String> =
            BUILTIN_RESERVED.iter().map(|w| w.to_string()).collect();
        reserved.extend(extra_reserved.iter().map(|w| w.to_ascii_lowercase()));

        Self { length, reserved }
    }

    /// Generates a random short code.
    ///
    /// Draws entropy from `getrandom` and encodes it as URL-safe base64
    /// without padding, truncated to the configured length. Reserved words
    /// are filtered here as well, so the caller never sees one.
    ///
    /// # Panics
    ///
    /// Panics if the system random number generator fails (treated as
    /// fatal; there is no meaningful recovery without entropy).
    pub fn generate(&self) -> String {
        loop {
            let byte_len = (self.length * 6).div_ceil(8);
            let mut buffer = vec![0u8; byte_len];

            getrandom::fill(&mut buffer).expect("Failed to generate random bytes");

            let mut code = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&buffer);
            code.truncate(self.length);

            // A reserved draw is astronomically unlikely but cheap to reject.
            if !self.is_reserved(&code) {
                return code;
            }
        }
    }

    /// Normalizes and validates a user-supplied alias.
    ///
    /// Aliases are case-insensitive: the stored form is lowercase.
    pub fn normalize(&self, input: &str) -> Result<String, InvalidAlias> {
        let trimmed = input.trim();

        if trimmed.len() < MIN_CODE_LENGTH {
            return Err(InvalidAlias::TooShort);
        }
        if trimmed.len() > MAX_CODE_LENGTH {
            return Err(InvalidAlias::TooLong);
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(InvalidAlias::BadChars);
        }

        let normalized = trimmed.to_ascii_lowercase();
        if self.reserved.contains(&normalized) {
            return Err(InvalidAlias::Reserved);
        }

        Ok(normalized)
    }

    /// Checks a candidate against the reserved set, case-insensitively.
    pub fn is_reserved(&self, s: &str) -> bool {
        self.reserved.contains(&s.to_ascii_lowercase())
    }

    /// Derives up to `n` alternative aliases from a taken one by appending
    /// a short random suffix.
    ///
    /// Suggestions satisfy the alias grammar; availability is checked by
    /// the caller against the repository.
    pub fn suggestions(&self, base: &str, n: usize) -> Vec<String> {
        const SUFFIX_LEN: usize = 4;
        const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

        let mut base: String = base
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect::<String>()
            .to_ascii_lowercase();
        if base.is_empty() {
            base = "link".to_string();
        }
        base.truncate(MAX_CODE_LENGTH - SUFFIX_LEN - 1);

        let mut rng = rand::rng();
        (0..n)
            .map(|_| {
                let suffix: String = (0..SUFFIX_LEN)
                    .map(|_| {
                        let idx = rng.random_range(0..SUFFIX_ALPHABET.len());
                        SUFFIX_ALPHABET[idx] as char
                    })
                    .collect();
                format!("{}-{}", base, suffix)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn generator() -> CodeGenerator {
        CodeGenerator::new(7, &[])
    }

    // ── generate ──────────────────────────────────────────────────────────────

    #[test]
    fn test_generate_has_configured_length() {
        let g = generator();
        assert_eq!(g.generate().len(), 7);

        let g12 = CodeGenerator::new(12, &[]);
        assert_eq!(g12.generate().len(), 12);
    }

    #[test]
    fn test_generate_uses_allowed_alphabet() {
        let g = generator();
        for _ in 0..100 {
            let code = g.generate();
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
                "unexpected character in {}",
                code
            );
        }
    }

    #[test]
    fn test_generate_produces_unique_codes() {
        let g = generator();
        let mut codes = HashSet::new();

        for _ in 0..1000 {
            codes.insert(g.generate());
        }

        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_generate_no_padding() {
        let g = generator();
        assert!(!g.generate().contains('='));
    }

    // ── normalize ─────────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_lowercases() {
        let g = generator();
        assert_eq!(g.normalize("MyAlias").unwrap(), "myalias");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        let g = generator();
        assert_eq!(g.normalize("  launch01  ").unwrap(), "launch01");
    }

    #[test]
    fn test_normalize_accepts_hyphen_and_underscore() {
        let g = generator();
        assert_eq!(g.normalize("my-link_2026").unwrap(), "my-link_2026");
    }

    #[test]
    fn test_normalize_too_short() {
        let g = generator();
        assert_eq!(g.normalize("ab"), Err(InvalidAlias::TooShort));
    }

    #[test]
    fn test_normalize_too_long() {
        let g = generator();
        let long = "a".repeat(51);
        assert_eq!(g.normalize(&long), Err(InvalidAlias::TooLong));
    }

    #[test]
    fn test_normalize_rejects_bad_characters() {
        let g = generator();
        assert_eq!(g.normalize("my alias"), Err(InvalidAlias::BadChars));
        assert_eq!(g.normalize("cafe\u{e9}s"), Err(InvalidAlias::BadChars));
        assert_eq!(g.normalize("a/b/c"), Err(InvalidAlias::BadChars));
    }

    #[test]
    fn test_normalize_rejects_reserved_case_insensitively() {
        let g = generator();
        assert_eq!(g.normalize("API"), Err(InvalidAlias::Reserved));
        assert_eq!(g.normalize("Admin"), Err(InvalidAlias::Reserved));
        assert_eq!(g.normalize("www"), Err(InvalidAlias::Reserved));
    }

    #[test]
    fn test_configured_superset_is_reserved() {
        let g = CodeGenerator::new(7, &["Promo".to_string()]);
        assert!(g.is_reserved("promo"));
        assert!(g.is_reserved("PROMO"));
        assert_eq!(g.normalize("promo"), Err(InvalidAlias::Reserved));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(InvalidAlias::TooShort.kind(), "too_short");
        assert_eq!(InvalidAlias::TooLong.kind(), "too_long");
        assert_eq!(InvalidAlias::BadChars.kind(), "bad_chars");
        assert_eq!(InvalidAlias::Reserved.kind(), "reserved");
    }

    // ── suggestions ───────────────────────────────────────────────────────────

    #[test]
    fn test_suggestions_derive_from_base() {
        let g = generator();
        let suggestions = g.suggestions("launch01", 3);
        assert_eq!(suggestions.len(), 3);
        for s in &suggestions {
            assert!(s.starts_with("launch01-"));
            assert!(g.normalize(s).is_ok(), "suggestion {} must be valid", s);
        }
    }

    #[test]
    fn test_suggestions_sanitize_base() {
        let g = generator();
        let suggestions = g.suggestions("My Launch!", 2);
        for s in &suggestions {
            assert!(g.normalize(s).is_ok(), "suggestion {} must be valid", s);
        }
    }

    #[test]
    fn test_suggestions_handle_degenerate_base() {
        let g = generator();
        let suggestions = g.suggestions("!!!", 2);
        assert_eq!(suggestions.len(), 2);
        for s in &suggestions {
            assert!(g.normalize(s).is_ok());
        }
    }

    #[test]
    fn test_suggestions_respect_max_length() {
        let g = generator();
        let long_base = "x".repeat(80);
        for s in g.suggestions(&long_base, 3) {
            assert!(s.len() <= MAX_CODE_LENGTH);
        }
    }
}
