//! Local strong-password generation

use rand::rngs::OsRng;
use rand::Rng;

/// Characters a generated password may contain: 52 letters, 10 digits, 13 symbols
pub const ALPHABET: &[u8; 75] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+~";

pub const DEFAULT_LENGTH: usize = 16;

/// Generate a password of `DEFAULT_LENGTH` characters
pub fn generate_password() -> String {
    generate_password_with_length(DEFAULT_LENGTH)
}

/// Generate a password of exactly `length` characters.
///
/// Each character is drawn independently and uniformly from [`ALPHABET`]
/// using the operating system's CSPRNG.
pub fn generate_password_with_length(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}
