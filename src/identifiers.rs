// Identifier generation and normalization
// Slugs, public ids, coupon codes and customer emails

use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Alphabet for restaurant public ids: lowercase, no `i`, `l`, `o`, `0`, `1`
pub const PUBLIC_ID_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";
pub const PUBLIC_ID_LENGTH: usize = 10;

/// Alphabet for coupon codes: uppercase, no `I`, `O`, `0`, `1`
pub const COUPON_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const COUPON_CODE_LENGTH: usize = 8;

/// Attempts allowed for random identifier allocation before giving up
pub const MAX_GENERATION_ATTEMPTS: usize = 5;

fn random_chars(alphabet: &[u8], length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Short, URL-safe, easy-to-type id embedded in QR code URLs
pub fn generate_public_id() -> String {
    random_chars(PUBLIC_ID_ALPHABET, PUBLIC_ID_LENGTH)
}

/// Short, uppercase, staff-friendly coupon code
pub fn generate_coupon_code() -> String {
    random_chars(COUPON_CODE_ALPHABET, COUPON_CODE_LENGTH)
}

fn slug_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"))
}

fn coupon_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]{6,12}$").expect("static regex"))
}

/// Normalize a restaurant slug
///
/// Lowercases, trims, drops apostrophes, collapses every run of characters
/// outside `[a-z0-9]` into one hyphen and strips hyphens at both ends.
/// May return an empty string; callers treat that as an invalid slug.
pub fn normalize_slug(input: &str) -> String {
    let lowered = input.to_lowercase();
    let without_apostrophes: String = lowered
        .trim()
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .collect();
    slug_separator()
        .replace_all(&without_apostrophes, "-")
        .trim_matches('-')
        .to_string()
}

/// Normalize a coupon code typed by staff or an owner
///
/// Returns `None` when the trimmed, uppercased input does not match
/// `^[A-Z0-9]{6,12}$`.
pub fn normalize_coupon_code(input: &str) -> Option<String> {
    let code = input.trim().to_uppercase();
    coupon_code_pattern().is_match(&code).then_some(code)
}

/// Normalize a customer email: trim and lowercase
///
/// Returns `None` when the result contains no `@`.
pub fn normalize_email(input: &str) -> Option<String> {
    let email = input.trim().to_lowercase();
    email.contains('@').then_some(email)
}

/// Short, stable fingerprint of an email for log lines
pub fn email_fingerprint(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_slug_examples() {
        assert_eq!(normalize_slug("Joe's Diner"), "joes-diner");
        assert_eq!(normalize_slug("  Café  Olé!! "), "caf-ol");
        assert_eq!(normalize_slug("--Pizza__Place--"), "pizza-place");
        assert_eq!(normalize_slug("Joe\u{2019}s"), "joes");
        assert_eq!(normalize_slug("demo"), "demo");
    }

    #[test]
    fn test_normalize_slug_can_be_empty() {
        assert_eq!(normalize_slug("!!!"), "");
        assert_eq!(normalize_slug("   "), "");
    }

    #[test]
    fn test_generated_public_id_shape() {
        let id = generate_public_id();
        assert_eq!(id.len(), PUBLIC_ID_LENGTH);
        assert!(id.bytes().all(|b| PUBLIC_ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generated_coupon_code_passes_redemption_pattern() {
        for _ in 0..100 {
            let code = generate_coupon_code();
            assert_eq!(code.len(), COUPON_CODE_LENGTH);
            assert_eq!(normalize_coupon_code(&code), Some(code.clone()));
            assert!(!code.contains(&['0', '1', 'I', 'O'][..]));
        }
    }

    #[test]
    fn test_normalize_coupon_code() {
        assert_eq!(normalize_coupon_code("  abcd2345 "), Some("ABCD2345".to_string()));
        assert_eq!(normalize_coupon_code("ABC123"), Some("ABC123".to_string()));
        assert_eq!(normalize_coupon_code("a b"), None);
        assert_eq!(normalize_coupon_code("ABC12"), None);
        assert_eq!(normalize_coupon_code("ABCDEFGHJKLMN"), None);
        assert_eq!(normalize_coupon_code("ABCD-2345"), None);
        assert_eq!(normalize_coupon_code(""), None);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@B.com "), Some("a@b.com".to_string()));
        assert_eq!(normalize_email("not-an-email"), None);
    }

    #[test]
    fn test_email_fingerprint_is_stable_and_short() {
        let a = email_fingerprint("a@b.com");
        assert_eq!(a.len(), 12);
        assert_eq!(a, email_fingerprint("a@b.com"));
        assert_ne!(a, email_fingerprint("c@d.com"));
    }

    proptest! {
        #[test]
        fn prop_normalize_slug_is_idempotent(input in ".{0,64}") {
            let once = normalize_slug(&input);
            prop_assert_eq!(normalize_slug(&once), once.clone());
        }

        #[test]
        fn prop_normalized_slug_uses_slug_charset(input in ".{0,64}") {
            let slug = normalize_slug(&input);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        }

        #[test]
        fn prop_normalize_coupon_code_is_idempotent(input in "[a-zA-Z0-9 ]{0,16}") {
            if let Some(code) = normalize_coupon_code(&input) {
                prop_assert_eq!(normalize_coupon_code(&code), Some(code.clone()));
            }
        }
    }
}
