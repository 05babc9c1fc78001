use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

pub const BOARD: &str = "board";
pub const COLUMN: &str = "col";
pub const CARD: &str = "card";
pub const LABEL: &str = "label";
pub const LOG: &str = "log";
pub const PRESET: &str = "preset";

/// Prefixed id: millisecond timestamp in base36 followed by a random suffix.
pub fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}_{}{}", prefix, to_base36(millis), suffix)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_carry_prefix() {
        let id = generate_id(CARD);
        assert!(id.starts_with("card_"));
        assert!(id.len() > "card_".len() + 6);
    }

    #[test]
    fn ids_do_not_collide_in_a_burst() {
        let ids: HashSet<String> = (0..500).map(|_| generate_id(LOG)).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
