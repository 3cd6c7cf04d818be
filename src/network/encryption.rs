//! Optional symmetric authenticated encryption of transport datagrams
//! (`spec.md` §4.4 "Security"), gated behind the `encryption` Cargo feature.
//!
//! The key is derived from a session password via SHA-256, matching
//! `spec.md`'s "pre-shared key derived from a session password (SHA-256)".
//! The wire envelope is `magic="FGEC"(4B) || iv(12B) || ciphertext`, where
//! `ciphertext` is the AES-256-GCM sealing of a plaintext
//! [`crate::network::messages::Message`] (as produced by
//! [`crate::network::codec::encode`]).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::network::codec::{self, CodecError};
use crate::network::messages::Message;

/// The 4-byte magic prefix identifying an encrypted envelope.
pub const MAGIC: [u8; 4] = *b"FGEC";
/// Length of the random IV/nonce, in bytes.
pub const IV_LEN: usize = 12;

/// Why decrypting an envelope failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    /// The buffer was too short to contain magic + IV.
    Truncated,
    /// The magic prefix did not match [`MAGIC`].
    BadMagic,
    /// AES-GCM authentication failed (wrong key, corrupted ciphertext, or
    /// replayed/altered bytes).
    AuthenticationFailed,
    /// The decrypted plaintext did not decode as a [`Message`].
    Malformed(CodecError),
}

/// A derived symmetric key plus the cipher it configures, immutable after
/// setup (`spec.md` §5 "Crypto key: immutable after setup").
pub struct SessionCipher {
    cipher: Aes256Gcm,
}

impl SessionCipher {
    /// Derives a key from `password` via SHA-256 and builds the cipher.
    #[must_use]
    pub fn from_password(password: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        let digest = hasher.finalize();
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        SessionCipher { cipher: Aes256Gcm::new(key) }
    }

    /// Encrypts `message` into the `FGEC` wire envelope with a fresh random IV.
    ///
    /// # Errors
    ///
    /// Returns a [`DecryptError`]-shaped failure only through the encode
    /// step; in practice this only fails if `message` cannot be encoded
    /// (which does not happen for this crate's message types), surfaced as
    /// [`CodecError`] via [`codec::encode`].
    pub fn encrypt(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let plaintext = codec::encode(message)?;
        let mut iv_bytes = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv_bytes);
        let nonce = Nonce::from_slice(&iv_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|e| CodecError::EncodeError(e.to_string()))?;

        let mut out = Vec::with_capacity(MAGIC.len() + IV_LEN + ciphertext.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&iv_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypts an envelope previously produced by [`SessionCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// See [`DecryptError`]'s variants.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Message, DecryptError> {
        if envelope.len() < MAGIC.len() + IV_LEN {
            return Err(DecryptError::Truncated);
        }
        if envelope[..MAGIC.len()] != MAGIC {
            return Err(DecryptError::BadMagic);
        }
        let iv = &envelope[MAGIC.len()..MAGIC.len() + IV_LEN];
        let ciphertext = &envelope[MAGIC.len() + IV_LEN..];
        let nonce = Nonce::from_slice(iv);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| DecryptError::AuthenticationFailed)?;
        codec::decode_value(&plaintext).map_err(DecryptError::Malformed)
    }
}

/// `true` if `bytes` begins with the [`MAGIC`] prefix. Receivers use this to
/// decide whether to attempt [`SessionCipher::decrypt`] or treat the
/// datagram as plaintext (`spec.md` §4.4: "others accept plaintext only
/// when no key is configured").
#[must_use]
pub fn looks_encrypted(bytes: &[u8]) -> bool {
    bytes.len() >= MAGIC.len() && bytes[..MAGIC.len()] == MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::messages::{InputMessage, Message};
    use crate::Frame;

    #[test]
    fn round_trip_with_matching_password() {
        let cipher = SessionCipher::from_password("correct horse battery staple");
        let msg = Message::Input(InputMessage { frame: Frame::new(3), bits: 0xFEED });
        let envelope = cipher.encrypt(&msg).unwrap();
        assert!(looks_encrypted(&envelope));
        let decoded = cipher.decrypt(&envelope).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn wrong_password_fails_authentication() {
        let sender = SessionCipher::from_password("password-a");
        let receiver = SessionCipher::from_password("password-b");
        let envelope = sender.encrypt(&Message::Renegotiate).unwrap();
        let err = receiver.decrypt(&envelope).unwrap_err();
        assert_eq!(err, DecryptError::AuthenticationFailed);
    }

    #[test]
    fn truncated_envelope_rejected() {
        let cipher = SessionCipher::from_password("pw");
        let err = cipher.decrypt(&[0u8; 4]).unwrap_err();
        assert_eq!(err, DecryptError::Truncated);
    }

    #[test]
    fn bad_magic_rejected() {
        let cipher = SessionCipher::from_password("pw");
        let mut envelope = cipher.encrypt(&Message::Renegotiate).unwrap();
        envelope[0] ^= 0xFF;
        assert_eq!(cipher.decrypt(&envelope).unwrap_err(), DecryptError::BadMagic);
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let cipher = SessionCipher::from_password("pw");
        let mut envelope = cipher.encrypt(&Message::Renegotiate).unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0x01;
        assert_eq!(cipher.decrypt(&envelope).unwrap_err(), DecryptError::AuthenticationFailed);
    }
}
