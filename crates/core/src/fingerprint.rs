use sha2::{Digest, Sha256};

const FINGERPRINT_HEX_LEN: usize = 32;

/// Deterministic content signature used to spot repeated FAQ entries across
/// ingestion runs. The first 128 bits of a SHA-256 digest, hex encoded.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..FINGERPRINT_HEX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::fingerprint;
    use std::collections::HashSet;

    #[test]
    fn fingerprint_is_stable() {
        let text = "Wie melde ich mich von einer Prüfung ab?Über das Kundenportal.";
        assert_eq!(fingerprint(text), fingerprint(text));
        assert_eq!(fingerprint(text).len(), 32);
    }

    #[test]
    fn distinct_texts_fingerprint_differently() {
        let prefix = "x".repeat(200);
        let texts: Vec<String> = (0..100).map(|i| format!("{prefix} answer {i}")).collect();
        let unique: HashSet<String> = texts.iter().map(|text| fingerprint(text)).collect();
        assert_eq!(unique.len(), texts.len());
    }
}
