use thiserror::Error;

/// Result type for message signature operations
pub type MsgSigResult<T> = std::result::Result<T, MsgSigError>;

/// Error type for message signature operations
#[derive(Error, Debug)]
pub enum MsgSigError {
  #[error("Base64 decode error: {0}")]
  Base64DecodeError(#[from] base64::DecodeError),

  /* ----- Crypto errors ----- */
  /// Invalid private key for asymmetric algorithm
  #[error("Failed to parse private key: {0}")]
  ParsePrivateKeyError(String),
  /// Invalid public key for asymmetric algorithm
  #[error("Failed to parse public key: {0}")]
  ParsePublicKeyError(String),
  /// Algorithm name the convenience layer cannot instantiate
  #[error("Unknown algorithm: {0}")]
  UnknownAlgorithm(String),

  /* ----- Component errors ----- */
  /// Failed to parse structured field value
  #[error("Failed to parse structured field value: {0}")]
  ParseSfvError(String),
  /// Invalid message component name
  #[error("Invalid message component name: {0}")]
  InvalidComponentName(String),
  /// Invalid message component param
  #[error("Invalid message component param: {0}")]
  InvalidComponentParam(String),
  /// Invalid message component id
  #[error("Invalid message component id: {0}")]
  InvalidComponentId(String),
  /// Invalid message component
  #[error("Invalid message component: {0}")]
  InvalidComponent(String),
  /// A requested component is not present in the message
  #[error("Missing message component: {0}")]
  MissingComponent(String),

  /* ----- Signature params / wire errors ----- */
  /// Invalid signature params
  #[error("Invalid signature params: {0}")]
  InvalidSignatureParams(String),
  /// Signature / Signature-Input header pair has the wrong shape
  #[error("Malformed signature header: {0}")]
  MalformedSignatureHeader(String),
  /// Error in building signature base
  #[error("Failed to build signature base: {0}")]
  BuildSignatureBaseError(String),
}
