//! Password hashing, verification and strength scoring.
//!
//! Stored credentials are a single string, `"{key}:{salt}:{iterations}"`:
//! a hex PBKDF2-HMAC-SHA256 derived key (32 bytes), the hex text of a random
//! salt, and the round count. The salt's hex *text* is what goes into PBKDF2,
//! which keeps credentials created by earlier releases verifiable.

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use rand::{Rng, RngCore};
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

/// Smallest round count configuration accepts for new hashes.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Smallest salt, in bytes, configuration accepts for new hashes.
pub const MIN_SALT_LENGTH: usize = 16;

/// Highest possible strength score.
pub const MAX_SCORE: u8 = 7;

const KEY_LENGTH: usize = 32;

const GENERATED_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Creates and checks password hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
    salt_length: usize,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            iterations: MIN_ITERATIONS,
            salt_length: 32,
        }
    }
}

impl PasswordHasher {
    /// Create a hasher with explicit parameters.
    #[must_use]
    pub fn new(iterations: u32, salt_length: usize) -> Self {
        Self {
            iterations: iterations.max(1),
            salt_length: salt_length.max(1),
        }
    }

    /// A default hasher with a different round count.
    #[must_use]
    pub fn with_iterations(iterations: u32) -> Self {
        Self::new(iterations, PasswordHasher::default().salt_length)
    }

    /// Rounds used for new hashes.
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash a password with a fresh random salt.
    #[must_use]
    pub fn create_hash(&self, password: &str) -> String {
        let mut salt = vec![0u8; self.salt_length];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt_hex = hex::encode(salt);
        let key = derive_key(password, &salt_hex, self.iterations);
        format!("{}:{salt_hex}:{}", hex::encode(key), self.iterations)
    }

    /// Whether a stored hash uses fewer rounds than this hasher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialFormat`] if `stored` cannot be parsed.
    pub fn needs_rehash(&self, stored: &str) -> Result<bool> {
        Ok(StoredCredential::parse(stored)?.iterations < self.iterations)
    }
}

/// Check a password against a stored hash.
///
/// The derived keys are compared in constant time.
///
/// # Errors
///
/// Returns [`Error::CredentialFormat`] if `stored` is malformed. A wrong
/// password is `Ok(false)`, never an error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let credential = StoredCredential::parse(stored)?;
    let derived = derive_key(password, &credential.salt, credential.iterations);
    Ok(derived.as_slice().ct_eq(credential.key.as_slice()).into())
}

fn derive_key(password: &str, salt: &str, iterations: u32) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key);
    key
}

/// A parsed `key:salt:iterations` credential.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredCredential {
    key: Vec<u8>,
    salt: String,
    iterations: u32,
}

impl StoredCredential {
    fn parse(stored: &str) -> Result<Self> {
        let mut parts = stored.split(':');
        let key = parts.next().unwrap_or_default();
        let salt = parts.next().unwrap_or_default();
        let iterations = parts.next().unwrap_or_default();

        if key.is_empty() {
            return Err(Error::credential_format("missing derived key"));
        }
        if salt.is_empty() {
            return Err(Error::credential_format("missing salt"));
        }
        if iterations.is_empty() {
            return Err(Error::credential_format("missing iteration count"));
        }
        if parts.next().is_some() {
            return Err(Error::credential_format("too many fields"));
        }

        let iterations = iterations
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                Error::credential_format(format!("bad iteration count '{iterations}'"))
            })?;
        let key = hex::decode(key)
            .map_err(|_| Error::credential_format("derived key is not hexadecimal"))?;

        Ok(Self {
            key,
            salt: salt.to_string(),
            iterations,
        })
    }
}

/// Strength label for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Strength {
    /// Score 0-1.
    VeryWeak,
    /// Score 2.
    Weak,
    /// Score 3.
    Medium,
    /// Score 4-5.
    Strong,
    /// Score 6-7.
    VeryStrong,
}

impl Strength {
    /// Label for a score.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        if score >= 6 {
            Self::VeryStrong
        } else if score >= 4 {
            Self::Strong
        } else if score == 3 {
            Self::Medium
        } else if score == 2 {
            Self::Weak
        } else {
            Self::VeryWeak
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VeryWeak => "Very Weak",
            Self::Weak => "Weak",
            Self::Medium => "Medium",
            Self::Strong => "Strong",
            Self::VeryStrong => "Very Strong",
        })
    }
}

/// Result of scoring a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrengthReport {
    /// Score from 0 to [`MAX_SCORE`].
    pub score: u8,
    /// Label for the score.
    pub strength: Strength,
    /// What would make the password stronger.
    pub feedback: Vec<String>,
}

impl StrengthReport {
    /// Turn a report into an error unless it reaches `required`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WeakPassword`] when the score is below `required`.
    pub fn require(self, required: u8) -> Result<Self> {
        if self.score < required {
            return Err(Error::WeakPassword {
                score: self.score,
                required,
                feedback: self.feedback,
            });
        }
        Ok(self)
    }
}

/// Score a password. Advisory; callers decide the threshold.
#[must_use]
pub fn check_strength(password: &str) -> StrengthReport {
    if password.is_empty() {
        return StrengthReport {
            score: 0,
            strength: Strength::VeryWeak,
            feedback: vec!["Password cannot be empty".to_string()],
        };
    }

    let length = password.chars().count();
    let mut score = 0u8;
    let mut feedback = Vec::new();

    let mut check = |passed: bool, hint: &str| {
        if passed {
            score += 1;
        } else {
            feedback.push(hint.to_string());
        }
    };

    check(length >= 8, "Password should be at least 8 characters");
    check(
        password.chars().any(|c| c.is_ascii_lowercase()),
        "Include lowercase letters",
    );
    check(
        password.chars().any(|c| c.is_ascii_uppercase()),
        "Include uppercase letters",
    );
    check(
        password.chars().any(|c| c.is_ascii_digit()),
        "Include numbers",
    );
    check(
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
        "Include special characters",
    );

    if length >= 12 {
        score += 1;
    }
    if length >= 16 {
        score += 1;
    }

    if feedback.is_empty() {
        feedback.push("Password is strong".to_string());
    }

    StrengthReport {
        score,
        strength: Strength::from_score(score),
        feedback,
    }
}

/// Generate a random password of `length` characters from letters, digits
/// and `!@#$%^&*`.
#[must_use]
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(GENERATED_CHARSET[rng.gen_range(0..GENERATED_CHARSET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordHasher {
        PasswordHasher::with_iterations(1_000)
    }

    #[test]
    fn test_hash_verifies_same_password() {
        let hasher = fast();
        let stored = hasher.create_hash("Tr1cky!pass");
        assert!(verify_password("Tr1cky!pass", &stored).unwrap());
    }

    #[test]
    fn test_hash_rejects_other_password() {
        let hasher = fast();
        let stored = hasher.create_hash("Tr1cky!pass");
        assert!(!verify_password("tr1cky!pass", &stored).unwrap());
        assert!(!verify_password("", &stored).unwrap());
    }

    #[test]
    fn test_create_hash_is_salted() {
        let hasher = fast();
        let a = hasher.create_hash("same");
        let b = hasher.create_hash("same");
        assert_ne!(a, b);
        assert!(verify_password("same", &a).unwrap());
        assert!(verify_password("same", &b).unwrap());
    }

    #[test]
    fn test_hash_layout() {
        let stored = PasswordHasher::new(1_000, 16).create_hash("x");
        let parts: Vec<&str> = stored.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), KEY_LENGTH * 2);
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2], "1000");
    }

    #[test]
    fn test_missing_iterations_is_format_error() {
        let stored = fast().create_hash("pw");
        let truncated = stored.rsplit_once(':').unwrap().0;
        let err = verify_password("pw", truncated).unwrap_err();
        assert!(err.is_credential_format());
        assert!(err.to_string().contains("missing iteration count"));
    }

    #[test]
    fn test_malformed_hashes() {
        for bad in ["", "abc", "abc:", "abc:def:", ":def:10", "abc:def:zero", "abc:def:0", "zz:def:10"] {
            let err = verify_password("pw", bad).unwrap_err();
            assert!(err.is_credential_format(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_legacy_credential_verifies() {
        // Produced by the browser client: 10k rounds, hex salt text as input.
        let salt = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";
        let key = derive_key("Secret#2024", salt, 10_000);
        let stored = format!("{}:{salt}:10000", hex::encode(key));
        assert!(verify_password("Secret#2024", &stored).unwrap());
        assert!(fast().needs_rehash(&stored).unwrap());
        assert!(PasswordHasher::default().needs_rehash(&stored).unwrap());
    }

    #[test]
    fn test_needs_rehash_current() {
        let hasher = fast();
        let stored = hasher.create_hash("pw");
        assert!(!hasher.needs_rehash(&stored).unwrap());
        assert!(PasswordHasher::with_iterations(2_000)
            .needs_rehash(&stored)
            .unwrap());
    }

    #[test]
    fn test_strength_empty() {
        let report = check_strength("");
        assert_eq!(report.score, 0);
        assert_eq!(report.strength, Strength::VeryWeak);
        assert_eq!(report.feedback, vec!["Password cannot be empty"]);
    }

    #[test]
    fn test_strength_scores() {
        assert_eq!(check_strength("abc").score, 1);
        assert_eq!(check_strength("abcdefgh").score, 2);
        assert_eq!(check_strength("abcdefgH").score, 3);
        assert_eq!(check_strength("abcdefH1").score, 4);
        assert_eq!(check_strength("abcdeH1!").score, 5);
        assert_eq!(check_strength("abcdefghH1!x").score, 6);
        assert_eq!(check_strength("abcdefghijkH1!xy").score, 7);
    }

    #[test]
    fn test_strength_labels() {
        assert_eq!(Strength::from_score(0).to_string(), "Very Weak");
        assert_eq!(Strength::from_score(2).to_string(), "Weak");
        assert_eq!(Strength::from_score(3).to_string(), "Medium");
        assert_eq!(Strength::from_score(5).to_string(), "Strong");
        assert_eq!(Strength::from_score(7).to_string(), "Very Strong");
    }

    #[test]
    fn test_strength_feedback() {
        let report = check_strength("abc");
        assert!(report
            .feedback
            .contains(&"Password should be at least 8 characters".to_string()));
        assert!(report.feedback.contains(&"Include numbers".to_string()));

        let strong = check_strength("Abcdefgh1!");
        assert_eq!(strong.feedback, vec!["Password is strong"]);
    }

    #[test]
    fn test_require_threshold() {
        assert!(check_strength("abcdefgH").require(3).is_ok());
        let err = check_strength("abc").require(3).unwrap_err();
        assert!(matches!(err, Error::WeakPassword { score: 1, required: 3, .. }));
    }

    #[test]
    fn test_generate_password() {
        let pw = generate_password(10);
        assert_eq!(pw.chars().count(), 10);
        assert!(pw.bytes().all(|b| GENERATED_CHARSET.contains(&b)));
        assert_ne!(generate_password(16), generate_password(16));
    }
}
