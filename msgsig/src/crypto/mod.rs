mod asymmetric;
mod symmetric;

use crate::{
  error::{MsgSigError, MsgSigResult},
  signature_params::SignatureParams,
};

pub use asymmetric::{PublicKey, SecretKey};
pub use symmetric::SharedKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Algorithm names
/// https://datatracker.ietf.org/doc/html/rfc9421#name-http-signature-algorithms
pub enum AlgorithmName {
  HmacSha256,
  EcdsaP256Sha256,
  EcdsaP384Sha384,
  Ed25519,
  #[cfg(feature = "rsasig")]
  RsaV1_5Sha256,
  #[cfg(feature = "rsasig")]
  RsaV1_5Sha1,
  #[cfg(feature = "rsasig")]
  RsaPssSha512,
}

impl AlgorithmName {
  pub fn as_str(&self) -> &'static str {
    match self {
      AlgorithmName::HmacSha256 => "hmac-sha256",
      AlgorithmName::EcdsaP256Sha256 => "ecdsa-p256-sha256",
      AlgorithmName::EcdsaP384Sha384 => "ecdsa-p384-sha384",
      AlgorithmName::Ed25519 => "ed25519",
      #[cfg(feature = "rsasig")]
      AlgorithmName::RsaV1_5Sha256 => "rsa-v1_5-sha256",
      #[cfg(feature = "rsasig")]
      AlgorithmName::RsaV1_5Sha1 => "rsa-v1_5-sha1",
      #[cfg(feature = "rsasig")]
      AlgorithmName::RsaPssSha512 => "rsa-pss-sha512",
    }
  }
}

impl std::fmt::Display for AlgorithmName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl core::str::FromStr for AlgorithmName {
  type Err = MsgSigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "hmac-sha256" => Ok(Self::HmacSha256),
      "ecdsa-p256-sha256" => Ok(Self::EcdsaP256Sha256),
      "ecdsa-p384-sha384" => Ok(Self::EcdsaP384Sha384),
      "ed25519" => Ok(Self::Ed25519),
      #[cfg(feature = "rsasig")]
      "rsa-v1_5-sha256" => Ok(Self::RsaV1_5Sha256),
      #[cfg(feature = "rsasig")]
      "rsa-v1_5-sha1" => Ok(Self::RsaV1_5Sha1),
      #[cfg(feature = "rsasig")]
      "rsa-pss-sha512" => Ok(Self::RsaPssSha512),
      _ => Err(MsgSigError::UnknownAlgorithm(s.to_string())),
    }
  }
}

/// Signing primitive consumed by the signing drivers.
/// `key_id` and `alg` are hints the drivers fall back to when the sign config
/// does not override the corresponding parameters.
pub trait SigningKey {
  fn sign(&self, data: &[u8]) -> MsgSigResult<Vec<u8>>;
  fn key_id(&self) -> Option<String>;
  fn alg(&self) -> Option<String>;
}

/// Verifying primitive consumed by the verification drivers.
/// `Ok(false)` is a cryptographic rejection; `Err` is an operational failure.
/// `algs` lists the wire algorithm identifiers the key accepts, `None` accepting any.
pub trait VerifyingKey {
  fn verify(&self, data: &[u8], signature: &[u8], params: &SignatureParams) -> MsgSigResult<bool>;
  fn key_id(&self) -> Option<String>;
  fn algs(&self) -> Option<Vec<String>>;
}
