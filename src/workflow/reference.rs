use rand::Rng;

const REFERENCE_PREFIX: &str = "OPN-";

/// Candidate reference number such as "OPN-3FA9C21B". Uniqueness is
/// enforced by the database; the caller retries with a fresh candidate
/// when the insert collides.
pub fn generate() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 4] = rng.random();
    format!("{REFERENCE_PREFIX}{}", hex::encode_upper(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_prefix_and_fixed_length() {
        let reference = generate();
        assert!(reference.starts_with("OPN-"));
        assert_eq!(reference.len(), 12);
    }

    #[test]
    fn suffix_is_upper_hex() {
        let reference = generate();
        let suffix = &reference["OPN-".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn consecutive_values_differ() {
        assert_ne!(generate(), generate());
    }
}
