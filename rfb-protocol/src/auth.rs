//! VNC Authentication (RFB security type 2): DES-ECB challenge/response.
//!
//! The server sends a 16-byte random challenge. The client encrypts it with
//! DES in ECB mode, keyed by the connection password, and sends back the
//! 16-byte result. The quirk inherited from the original VNC protocol is that
//! each key byte has its bits reversed before being used as the DES key —
//! RFB's author mirrored the bit order of the original AT&T DES reference
//! implementation, and every client since has had to match it.

use cipher::{BlockEncrypt, KeyInit};
use des::Des;

/// Length of the VNC authentication challenge/response, in bytes.
pub const CHALLENGE_LEN: usize = 16;

/// Derive the 8-byte DES key from a VNC password.
///
/// Only the first 8 bytes of the password are significant; shorter passwords
/// are zero-padded. Each key byte has its bit order reversed, matching the
/// legacy VNC authentication scheme.
fn derive_key(password: &[u8]) -> [u8; 8] {
    let mut key = [0u8; 8];
    let n = password.len().min(8);
    key[..n].copy_from_slice(&password[..n]);
    for byte in &mut key {
        *byte = byte.reverse_bits();
    }
    key
}

/// Encrypt a 16-byte challenge with the given password, producing the
/// 16-byte response expected by the server.
///
/// The challenge is encrypted as two independent 8-byte DES-ECB blocks.
pub fn encrypt_challenge(password: &[u8], challenge: &[u8; CHALLENGE_LEN]) -> [u8; CHALLENGE_LEN] {
    let key = derive_key(password);
    let cipher = Des::new_from_slice(&key).expect("DES key is always exactly 8 bytes");

    let mut response = [0u8; CHALLENGE_LEN];
    for (chunk_in, chunk_out) in challenge
        .chunks_exact(8)
        .zip(response.chunks_exact_mut(8))
    {
        let mut block = cipher::generic_array::GenericArray::clone_from_slice(chunk_in);
        cipher.encrypt_block(&mut block);
        chunk_out.copy_from_slice(&block);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derivation_pads_and_reverses_bits() {
        let key = derive_key(b"abc");
        // 'a' = 0x61 = 0b0110_0001, bit-reversed = 0b1000_0110 = 0x86
        assert_eq!(key[0], 0x86);
        // Padding bytes are zero both before and after bit-reversal.
        assert_eq!(key[3], 0);
        assert_eq!(key[7], 0);
    }

    #[test]
    fn key_derivation_truncates_long_passwords() {
        let key_short = derive_key(b"password");
        let key_long = derive_key(b"password-with-more-than-eight-bytes");
        assert_eq!(key_short, key_long);
    }

    #[test]
    fn encryption_is_deterministic_for_same_key_and_challenge() {
        let challenge = [7u8; CHALLENGE_LEN];
        let a = encrypt_challenge(b"secret", &challenge);
        let b = encrypt_challenge(b"secret", &challenge);
        assert_eq!(a, b);
    }

    #[test]
    fn different_passwords_yield_different_responses() {
        let challenge = [1u8; CHALLENGE_LEN];
        let a = encrypt_challenge(b"password1", &challenge);
        let b = encrypt_challenge(b"password2", &challenge);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_password_is_accepted() {
        let challenge = [9u8; CHALLENGE_LEN];
        let response = encrypt_challenge(b"", &challenge);
        assert_eq!(response.len(), CHALLENGE_LEN);
    }
}
