use crate::error::SecurityError;
use aes_gcm::{
    aead::{Aead, NewAead}, // NewAead for 0.9/0.4
    Aes256Gcm,
    Nonce,
};
use anyhow::{Context, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Hex-encoded AES-256-GCM output, the only form a private key is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedSecret {
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
    pub tag: String,
}

pub struct SecurityUtils;

impl SecurityUtils {
    fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32]> {
        // scrypt N=16384, r=8, p=1
        let params = scrypt::Params::new(14, 8, 1, 32)
            .map_err(|e| anyhow::anyhow!("Invalid scrypt params: {}", e))?;
        let mut key = [0u8; 32];
        scrypt::scrypt(password.as_bytes(), salt, &params, &mut key)
            .map_err(|e| anyhow::anyhow!("Scrypt failed: {}", e))?;
        Ok(key)
    }

    pub fn seal(plaintext: &str, password: &str) -> Result<SealedSecret> {
        if password.is_empty() {
            return Err(SecurityError::PasswordRequired.into());
        }

        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        let mut key = Self::derive_key(password, &salt)?;
        let cipher = Aes256Gcm::new(&key.into());
        key.zeroize();

        let mut payload = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| SecurityError::CryptographyFailed {
                reason: e.to_string(),
            })?;
        let tag = payload.split_off(payload.len() - TAG_LEN);

        Ok(SealedSecret {
            ciphertext: hex::encode(&payload),
            iv: hex::encode(iv),
            salt: hex::encode(salt),
            tag: hex::encode(tag),
        })
    }

    pub fn unseal(sealed: &SealedSecret, password: &str) -> Result<String> {
        Self::decrypt_components(
            &sealed.ciphertext,
            &sealed.iv,
            &sealed.salt,
            &sealed.tag,
            password,
        )
    }

    pub fn decrypt_components(
        ciphertext_hex: &str,
        iv_hex: &str,
        salt_hex: &str,
        tag_hex: &str,
        password: &str,
    ) -> Result<String> {
        let ciphertext = hex::decode(ciphertext_hex).context("Invalid ciphertext hex")?;
        let iv = hex::decode(iv_hex).context("Invalid IV hex")?;
        let salt = hex::decode(salt_hex).context("Invalid salt hex")?;
        let mut tag = hex::decode(tag_hex).context("Invalid tag hex")?;

        if iv.len() != NONCE_LEN {
            return Err(SecurityError::CryptographyFailed {
                reason: format!("expected {} byte nonce, got {}", NONCE_LEN, iv.len()),
            }
            .into());
        }

        let mut key = Self::derive_key(password, &salt)?;
        let cipher = Aes256Gcm::new(&key.into());
        key.zeroize();

        let mut full_payload = ciphertext;
        full_payload.append(&mut tag);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), full_payload.as_ref())
            .map_err(|e| SecurityError::CryptographyFailed {
                reason: e.to_string(),
            })?;

        let text = String::from_utf8(plaintext).context("Decrypted data is not valid UTF-8")?;
        Ok(text)
    }
}
