use super::AlgorithmName;
use crate::{
  error::{MsgSigError, MsgSigResult},
  signature_params::SignatureParams,
  trace::*,
};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<sha2::Sha256>;

/* -------------------------------- */
#[derive(Debug, Clone)]
/// Shared key for http message signatures.
/// Variant names follow [Section 6.2.2, RFC 9421](https://datatracker.ietf.org/doc/html/rfc9421#section-6.2.2)
pub enum SharedKey {
  /// hmac-sha256
  HmacSha256(Vec<u8>),
}

impl SharedKey {
  /// Create a new shared key of the given algorithm from a base64 encoded string
  pub fn from_base64(alg: &AlgorithmName, key: &str) -> MsgSigResult<Self> {
    debug!("Create SharedKey from base64 string");
    let key = general_purpose::STANDARD.decode(key)?;
    match alg {
      AlgorithmName::HmacSha256 => Ok(SharedKey::HmacSha256(key)),
      _ => Err(MsgSigError::UnknownAlgorithm(format!(
        "Unsupported algorithm for SharedKey: {alg}"
      ))),
    }
  }
}

impl super::SigningKey for SharedKey {
  fn sign(&self, data: &[u8]) -> MsgSigResult<Vec<u8>> {
    match self {
      SharedKey::HmacSha256(key) => {
        debug!("Sign HmacSha256");
        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(key).unwrap();
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
      }
    }
  }

  fn key_id(&self) -> Option<String> {
    match self {
      SharedKey::HmacSha256(key) => {
        let mut hasher = <Sha256 as Digest>::new();
        hasher.update(key);
        let hash = hasher.finalize();
        Some(general_purpose::STANDARD.encode(hash))
      }
    }
  }

  fn alg(&self) -> Option<String> {
    match self {
      SharedKey::HmacSha256(_) => Some(AlgorithmName::HmacSha256.to_string()),
    }
  }
}

impl super::VerifyingKey for SharedKey {
  /// Verify the mac; a mismatch is `Ok(false)`
  fn verify(&self, data: &[u8], expected_mac: &[u8], _params: &SignatureParams) -> MsgSigResult<bool> {
    match self {
      SharedKey::HmacSha256(key) => {
        debug!("Verify HmacSha256");
        let mut mac = HmacSha256::new_from_slice(key).unwrap();
        mac.update(data);
        Ok(mac.verify_slice(expected_mac).is_ok())
      }
    }
  }

  fn key_id(&self) -> Option<String> {
    super::SigningKey::key_id(self)
  }

  fn algs(&self) -> Option<Vec<String>> {
    match self {
      SharedKey::HmacSha256(_) => Some(vec![AlgorithmName::HmacSha256.to_string()]),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::crypto::{SigningKey, VerifyingKey};

  #[test]
  fn symmetric_key_works() {
    let inner = b"01234567890123456789012345678901";
    let key = SharedKey::HmacSha256(inner.to_vec());
    let data = b"hello";
    let signature = SigningKey::sign(&key, data).unwrap();
    let params = SignatureParams::default();
    assert!(VerifyingKey::verify(&key, data, &signature, &params).unwrap());
    assert!(!VerifyingKey::verify(&key, b"other", &signature, &params).unwrap());
  }
}
