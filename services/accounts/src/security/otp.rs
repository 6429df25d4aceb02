use rand::RngExt;

/// Charset for numeric one-time codes.
const CHARSET: &[u8] = b"0123456789";

/// Generate a uniformly random numeric code of the given length.
pub fn generate_numeric_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
