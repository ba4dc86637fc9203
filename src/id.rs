use sha2::Digest as _;

pub const CONVERTED_ID_LEN: usize = 12;

/// Derive a converted id from `url` and the current wall clock.
#[must_use]
pub fn generate(url: &str) -> String {
    generate_at(url, chrono::Utc::now().timestamp_millis())
}

#[must_use]
pub fn generate_at(url: &str, unix_millis: i64) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(unix_millis.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut id = hex::encode(digest);
    id.truncate(CONVERTED_ID_LEN);
    id
}

pub fn is_converted_id(candidate: &str) -> bool {
    candidate.len() == CONVERTED_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
