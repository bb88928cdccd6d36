use msgsig::prelude::MsgSigError;
use thiserror::Error;

/// Result type for message signatures over http crate types
pub type SigHttpResult<T> = std::result::Result<T, SigHttpError>;

/// Error type for message signatures over http crate types
#[derive(Error, Debug)]
pub enum SigHttpError {
  /// No signature headers found where the operation requires them
  #[error("No signature headers found: {0}")]
  NoSignatureHeaders(String),

  /// Failed to stringify header value
  #[error("Failed to stringify header value: {0}")]
  FailedToStrHeaderValue(#[from] http::header::ToStrError),

  /// Failed to build a header value
  #[error("Failed to parse header value: {0}")]
  InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

  /// Invalid component name for the message kind, e.g. @status on a request
  #[error("Invalid component name: {0}")]
  InvalidComponentName(String),

  /// Invalid component param for the message kind
  #[error("Invalid component param: {0}")]
  InvalidComponentParam(String),

  /// Signature / Signature-Input header pair incomplete or not parseable
  #[error("Malformed signature headers: {0}")]
  MalformedSignatureHeaders(String),

  /// Verify: the key does not accept the `alg` of the signature parameters
  #[error("Unsupported algorithm: {0}")]
  UnsupportedAlgorithm(String),

  /// Verify in `all` mode: key lookup returned no key for a label
  #[error("Unknown key: {0}")]
  UnknownKey(String),

  /// Verify: required parameters or fields missing from a signature
  #[error("Unacceptable signature: {0}")]
  UnacceptableSignature(String),

  /// Verify: created/expires outside the acceptable window
  #[error("Expired signature: {0}")]
  Expired(String),

  /// Verify: the cryptographic primitive rejected the signature
  #[error("Signature verification failed: {0}")]
  VerificationFailed(String),

  /// Inherited from the core crate
  #[error("MsgSigError: {0}")]
  MsgSigError(#[from] MsgSigError),
}
