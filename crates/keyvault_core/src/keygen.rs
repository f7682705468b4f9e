//! License-key generation for `key` pastes.

use chrono::{DateTime, Local};
use rand::Rng;

const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const GROUPS: usize = 4;
const GROUP_LEN: usize = 4;

/// Generate a random key shaped like `ABCD-EFGH-IJKL-MNOP`.
pub fn generate_license_key() -> String {
    let mut rng = rand::thread_rng();
    let mut key = String::with_capacity(GROUPS * (GROUP_LEN + 1));
    for group in 0..GROUPS {
        if group > 0 {
            key.push('-');
        }
        for _ in 0..GROUP_LEN {
            let index = rng.gen_range(0..KEY_ALPHABET.len());
            key.push(char::from(KEY_ALPHABET[index]));
        }
    }
    key
}

/// Check the `XXXX-XXXX-XXXX-XXXX` shape over `A-Z0-9`.
pub fn looks_like_license_key(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == GROUPS
        && groups.iter().all(|group| {
            group.len() == GROUP_LEN
                && group
                    .bytes()
                    .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit())
        })
}

/// Default title for a generated key, stamped with local wall-clock time.
pub fn generated_key_title(now_millis: i64) -> String {
    let stamp = DateTime::from_timestamp_millis(now_millis)
        .map(|dt| dt.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default();
    format!("Generated Key {}", stamp).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_expected_shape() {
        for _ in 0..64 {
            let key = generate_license_key();
            assert_eq!(key.len(), 19);
            assert!(looks_like_license_key(&key), "key: {}", key);
        }
    }

    #[test]
    fn shape_check_rejects_near_misses() {
        for value in [
            "",
            "ABCD-EFGH-IJKL",
            "ABCD-EFGH-IJKL-MNO",
            "abcd-efgh-ijkl-mnop",
            "ABCD_EFGH_IJKL_MNOP",
            "ABCD-EFGH-IJKL-MNOP-QRST",
        ] {
            assert!(!looks_like_license_key(value), "value: {}", value);
        }
        assert!(looks_like_license_key("A1B2-C3D4-E5F6-G7H8"));
    }

    #[test]
    fn generated_title_carries_a_time_stamp() {
        let title = generated_key_title(0);
        assert!(title.starts_with("Generated Key "));
        assert_eq!(title.len(), "Generated Key 00:00:00".len());
    }
}
