//! Pairing material: key generation (X25519, Ed25519), QR code content and
//! device identity verification (HMAC).

use crate::error::{Error, PairingError};
use crate::store::Device;
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::SigningKey;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

/// HMAC-SHA256 tag length in bytes.
const HMAC_LEN: usize = 32;

/// Number of QR refs handed out per connection, rotated by the server.
pub const QR_CODE_COUNT: usize = 6;

/// Keys generated for pairing: Noise key, identity key, and adv secret.
#[derive(Clone, Debug)]
pub struct PairingKeys {
    /// X25519 Noise public key (32 bytes).
    pub noise_public: [u8; 32],
    pub noise_private: [u8; 32],
    /// Ed25519 identity public key (32 bytes).
    pub identity_public: [u8; 32],
    pub identity_private: [u8; 32],
    /// Adv secret for pairing (32 bytes).
    pub adv_secret: [u8; 32],
}

/// Generate fresh pairing keys: Noise (X25519), identity (Ed25519), and adv secret.
pub fn generate_pairing_keys() -> PairingKeys {
    let mut noise_private = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut noise_private);
    let secret = StaticSecret::from(noise_private);
    let noise_public = PublicKey::from(&secret).to_bytes();

    let identity_signing = SigningKey::generate(&mut rand::thread_rng());
    let identity_public = identity_signing.verifying_key().to_bytes();
    let identity_private = identity_signing.to_bytes();

    let mut adv_secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut adv_secret);

    PairingKeys {
        noise_public,
        noise_private,
        identity_public,
        identity_private,
        adv_secret,
    }
}

/// Build the string encoded in a pairing QR: `ref,noise,identity,adv`, keys in base64.
pub fn qr_code_content(reference: &str, device: &Device) -> Result<String> {
    let (Some(noise), Some(identity), Some(adv)) = (
        device.noise_key_pub.as_ref(),
        device.identity_key_pub.as_ref(),
        device.adv_secret_key.as_ref(),
    ) else {
        return Err(PairingError::Protocol("device has no pairing keys".into()).into());
    };
    Ok(format!(
        "{},{},{},{}",
        reference,
        STANDARD.encode(noise),
        STANDARD.encode(identity),
        STANDARD.encode(adv)
    ))
}

/// QR codes for one pairing attempt, each with a fresh random ref.
pub fn qr_codes(device: &Device) -> Result<Vec<String>> {
    (0..QR_CODE_COUNT)
        .map(|_| {
            let reference = format!("{:X}", rand::random::<u64>());
            qr_code_content(&reference, device)
        })
        .collect()
}

/// Verify device identity payload: last HMAC_LEN bytes are HMAC-SHA256 of the rest with the given key.
/// Returns the payload without the tag.
pub fn verify_device_identity(payload_with_tag: &[u8], hmac_key: &[u8]) -> Result<Vec<u8>> {
    if payload_with_tag.len() < HMAC_LEN {
        return Err(Error::Pairing(PairingError::InvalidDeviceIdentityHmac));
    }
    let (payload, tag) = payload_with_tag.split_at(payload_with_tag.len() - HMAC_LEN);

    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|_| Error::Pairing(PairingError::Protocol("invalid HMAC key length".into())))?;
    mac.update(payload);
    mac.verify_slice(tag)
        .map_err(|_| Error::Pairing(PairingError::InvalidDeviceIdentityHmac))?;

    Ok(payload.to_vec())
}
