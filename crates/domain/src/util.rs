//! Small helpers shared by bot-side callers.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Derive a short, stable, log-safe tag from a user id.
///
/// User ids are credentials on the game server, so raw ids must never reach
/// logs or keyspace names. The tag is the last 7 hex characters of the
/// SHA-256 digest: stable across processes, useless for recovering the id.
pub fn anonymize_user_id(user_id: &str) -> String {
    let digest = Sha256::digest(user_id.as_bytes());
    let encoded = hex::encode(digest);
    encoded[encoded.len() - 7..].to_string()
}

/// Uniform random integer in `min..=max`.
pub fn random_in(min: i64, max: i64) -> i64 {
    rand::thread_rng().gen_range(min..=max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymized_id_is_stable_and_short() {
        let a = anonymize_user_id("super-secret-user-id");
        let b = anonymize_user_id("super-secret-user-id");
        assert_eq!(a, b);
        assert_eq!(a.len(), 7);
        assert_ne!(a, anonymize_user_id("other-user"));
    }

    #[test]
    fn anonymized_id_never_contains_the_input() {
        let tag = anonymize_user_id("abcdef");
        assert!(!tag.contains("abcdef"));
    }

    #[test]
    fn random_in_respects_bounds() {
        for _ in 0..100 {
            let v = random_in(3, 5);
            assert!((3..=5).contains(&v));
        }
    }
}
