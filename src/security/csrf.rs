//! Masked CSRF tokens.
//!
//! The session keeps one secret, the *true token*. Every rendered form gets a
//! different *masked* token so the secret never appears twice in a page:
//!
//! ```text
//! masked = base64(mask ‖ xor(true_token, mask))   with '+' written as '.'
//! ```
//!
//! Validation reverses the encoding, splits off the first `mask_length` bytes and
//! xors them back over the rest.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};

/// Length of a freshly generated true token, before the mask length is considered.
pub const TRUE_TOKEN_LENGTH: usize = 32;

/// A random alphanumeric secret for storing in the session.
///
/// At least `mask_length` characters long, so every masked token built from it
/// validates.
pub fn generate_true_token(mask_length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TRUE_TOKEN_LENGTH.max(mask_length))
        .map(char::from)
        .collect()
}

/// Mask `true_token` with `mask_length` random bytes.
///
/// # Examples
///
/// ```
/// use rttp_mvc::security::csrf::{generate_token, validate_token};
///
/// let secret = "0123456789abcdefghijklmnopqrstuv";
/// let masked = generate_token(8, secret.as_bytes());
/// assert!(validate_token(8, &masked, secret));
/// assert!(!validate_token(8, &masked, "another secret of the same size!"));
/// ```
pub fn generate_token(mask_length: usize, true_token: &[u8]) -> String {
    let mut mask = vec![0u8; mask_length];
    thread_rng().fill(&mut mask[..]);

    let masked = xor(true_token, &mask);
    let mut raw = mask;
    raw.extend_from_slice(&masked);

    STANDARD.encode(raw).replace('+', ".")
}

/// Check a presented token against the true token.
///
/// Malformed input (bad base64, too short) is simply invalid.
pub fn validate_token(mask_length: usize, token: &str, true_token: &str) -> bool {
    let Ok(decoded) = STANDARD.decode(token.replace('.', "+")) else {
        return false;
    };
    if decoded.len() <= mask_length {
        return false;
    }

    let (mask, masked) = decoded.split_at(mask_length);
    xor(mask, masked) == true_token.as_bytes()
}

// Byte-wise xor. The shorter operand repeats cyclically; an empty operand is
// treated as spaces.
fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    let len = a.len().max(b.len());
    (0..len).map(|i| cyclic(a, i) ^ cyclic(b, i)).collect()
}

fn cyclic(bytes: &[u8], i: usize) -> u8 {
    if bytes.is_empty() {
        b' '
    } else {
        bytes[i % bytes.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn xor_extends_shorter_operand() {
        assert_eq!(xor(b"ab", b"abab"), vec![0, 0, 0, 0]);
        assert_eq!(xor(b"", b"  "), vec![0, 0]);
        assert_eq!(xor(b"\x01\x02\x03", b"\x01"), vec![0, 3, 2]);
    }

    #[test]
    fn dot_replaces_plus() {
        for _ in 0..64 {
            let token = generate_token(8, b"0123456789abcdefghijklmnopqrstuv");
            assert!(!token.contains('+'));
        }
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        assert!(!validate_token(8, "***not base64***", "secret"));
        assert!(!validate_token(8, "", "secret"));
        // Exactly mask_length bytes decoded.
        assert!(!validate_token(8, &STANDARD.encode([7u8; 8]), "secret"));
    }

    #[test]
    fn true_token_is_alphanumeric_and_long_enough() {
        let t = generate_true_token(8);
        assert_eq!(t.len(), TRUE_TOKEN_LENGTH);
        assert!(t.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(generate_true_token(48).len(), 48);
    }

    #[test]
    fn empty_true_token_never_validates_against_empty() {
        let masked = generate_token(8, b"");
        assert!(!validate_token(8, &masked, ""));
    }

    proptest! {
        #[test]
        fn generated_tokens_validate(m in 1usize..48, extra in 0usize..32) {
            let secret = generate_true_token(m + extra);
            let masked = generate_token(m, secret.as_bytes());
            prop_assert!(validate_token(m, &masked, &secret));
        }

        #[test]
        fn tokens_do_not_cross_validate(m in 1usize..32, a in "[A-Za-z0-9]{32}", b in "[A-Za-z0-9]{32}") {
            prop_assume!(a != b);
            let masked = generate_token(m, a.as_bytes());
            prop_assert!(!validate_token(m, &masked, &b));
        }
    }
}
