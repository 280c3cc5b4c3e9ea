//! API key generation

use rand::Rng;

/// API Key prefix
const KEY_PREFIX: &str = "phase";

/// Length of the random part of a key
const RANDOM_LEN: usize = 32;

/// Generate a new API key
/// Format: phase_<user_prefix>_<random_32chars>
pub fn generate_api_key(email: &str) -> String {
    let user_prefix: String = email
        .chars()
        .take_while(|c| *c != '@')
        .filter(|c| c.is_ascii_alphanumeric())
        .take(6)
        .collect();

    let random_part: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(RANDOM_LEN)
        .map(char::from)
        .collect();

    format!("{}_{}_{}", KEY_PREFIX, user_prefix, random_part)
}

/// Lookup prefix stored in clear next to the key hash:
/// user prefix + first 8 characters of the random part
pub fn extract_key_prefix(api_key: &str) -> Option<String> {
    let mut parts = api_key.split('_');
    if parts.next() != Some(KEY_PREFIX) {
        return None;
    }
    let user_prefix = parts.next()?;
    let random_part: String = parts.next()?.chars().take(8).collect();
    Some(format!("{}_{}", user_prefix, random_part))
}

/// Validate API key format
pub fn validate_key_format(api_key: &str) -> bool {
    let parts: Vec<&str> = api_key.split('_').collect();
    parts.len() == 3 && parts[0] == KEY_PREFIX && parts[2].len() >= RANDOM_LEN
}
