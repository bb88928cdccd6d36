use crate::{
  crypto::{SigningKey, VerifyingKey},
  error::{MsgSigError, MsgSigResult},
  message_component::{DerivedComponentName, MessageComponent, MessageComponentName},
  signature_params::SignatureParams,
};
use base64::{engine::general_purpose, Engine as _};
use sfv::{BareItem, Item, ListEntry};

type IndexMap<K, V> = indexmap::IndexMap<K, V, fxhash::FxBuildHasher>;

/// Default signature label used in the `Signature` and `Signature-Input` headers
pub const DEFAULT_SIGNATURE_NAME: &str = "sig";

/* ---------------------------------------------------------------- */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Wire dialect of an http message signature
pub enum Dialect {
  /// RFC 9421 structured-field dialect (`Signature` + `Signature-Input`)
  #[default]
  Httpbis,
  /// Legacy draft-cavage dialect (single comma-separated `Signature` header)
  Cavage,
}

/* ---------------------------------------------------------------- */
/// Signature base: the exact byte string presented to the signing primitive.
/// https://datatracker.ietf.org/doc/html/rfc9421#name-creating-the-signature-base
pub struct SignatureBase {
  /// Message components ordered as in the covered components of the signature params
  component_lines: Vec<MessageComponent>,
  /// Signature params producing the trailing @signature-params line
  signature_params: SignatureParams,
}

impl SignatureBase {
  /// Creates a new signature base from component lines and signature params.
  /// The component lines must match the covered components in content and order;
  /// use the message-side builders to produce both from one covered list.
  pub fn try_new(component_lines: &[MessageComponent], signature_params: &SignatureParams) -> MsgSigResult<Self> {
    // `@signature-params` never resolves to a line of its own
    let expected = signature_params
      .covered_components
      .iter()
      .filter(|c| {
        !matches!(
          c.name,
          MessageComponentName::Derived(DerivedComponentName::SignatureParams)
        )
      })
      .collect::<Vec<_>>();

    if component_lines.len() != expected.len() {
      return Err(MsgSigError::BuildSignatureBaseError(
        "the number of component lines differs from the covered component ids".to_string(),
      ));
    }
    let ordered = component_lines
      .iter()
      .zip(expected.iter())
      .all(|(line, covered_id)| line.id == **covered_id);
    if !ordered {
      return Err(MsgSigError::BuildSignatureBaseError(
        "component lines are not ordered as the covered component ids".to_string(),
      ));
    }

    Ok(Self {
      component_lines: component_lines.to_vec(),
      signature_params: signature_params.clone(),
    })
  }

  /// The signature params this base was built over
  pub fn signature_params(&self) -> &SignatureParams {
    &self.signature_params
  }

  /// The signature base string as bytes to be signed, in the given dialect
  pub fn as_bytes(&self, dialect: Dialect) -> Vec<u8> {
    match dialect {
      Dialect::Httpbis => self.to_string().into_bytes(),
      Dialect::Cavage => self.cavage_string().into_bytes(),
    }
  }

  /// The legacy cavage signing string: `(name): value` lines for derived components,
  /// lowercased field-name lines otherwise, and no trailing params line.
  pub fn cavage_string(&self) -> String {
    self
      .component_lines
      .iter()
      .flat_map(|line| line.cavage_lines())
      .collect::<Vec<_>>()
      .join("\n")
  }

  /// Build the raw signature with the given signing key
  pub fn build_raw_signature(&self, signing_key: &impl SigningKey, dialect: Dialect) -> MsgSigResult<Vec<u8>> {
    signing_key.sign(&self.as_bytes(dialect))
  }

  /// Sign and wrap the result together with the params as one labeled header entry
  pub fn build_signature_entry(
    &self,
    signing_key: &impl SigningKey,
    signature_name: Option<&str>,
  ) -> MsgSigResult<SignatureHeaderEntry> {
    let signature = self.build_raw_signature(signing_key, Dialect::Httpbis)?;
    Ok(SignatureHeaderEntry {
      signature_name: signature_name.unwrap_or(DEFAULT_SIGNATURE_NAME).to_string(),
      signature,
      signature_params: self.signature_params.clone(),
    })
  }

  /// Verify a labeled header entry against this base.
  /// `Ok(false)` is a cryptographic rejection, `Err` an operational failure.
  pub fn verify_signature_entry(
    &self,
    verifying_key: &impl VerifyingKey,
    entry: &SignatureHeaderEntry,
    dialect: Dialect,
  ) -> MsgSigResult<bool> {
    verifying_key.verify(&self.as_bytes(dialect), &entry.signature, &self.signature_params)
  }
}

impl std::fmt::Display for SignatureBase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for component_line in &self.component_lines {
      writeln!(f, "{component_line}")?;
    }
    write!(f, "\"@signature-params\": {}", self.signature_params)
  }
}

/* ---------------------------------------------------------------- */
#[derive(Debug, Clone)]
/// One labeled signature as carried in the `Signature` / `Signature-Input` header pair
pub struct SignatureHeaderEntry {
  /// Signature label coupling the signature with its input
  signature_name: String,
  /// Raw signature bytes
  signature: Vec<u8>,
  /// Signature params of the `Signature-Input` member
  signature_params: SignatureParams,
}

/// Signature entries keyed by label, ordered as in `Signature-Input`
pub type SignatureHeadersMap = IndexMap<String, SignatureHeaderEntry>;

impl SignatureHeaderEntry {
  /// Signature label
  pub fn signature_name(&self) -> &str {
    &self.signature_name
  }

  /// Raw signature bytes
  pub fn signature_bytes(&self) -> &[u8] {
    &self.signature
  }

  /// Signature params
  pub fn signature_params(&self) -> &SignatureParams {
    &self.signature_params
  }

  /// The `Signature` header member for this entry: `<label>=:<base64>:`
  pub fn signature_header_value(&self) -> String {
    format!(
      "{}=:{}:",
      self.signature_name,
      general_purpose::STANDARD.encode(&self.signature)
    )
  }

  /// The `Signature-Input` header member for this entry: `<label>=<inner-list>`
  pub fn signature_input_header_value(&self) -> String {
    format!("{}={}", self.signature_name, self.signature_params)
  }

  /// Parse the combined `Signature` and `Signature-Input` header values into labeled entries.
  /// Multiple raw header values must be combined with `", "` before calling.
  pub fn try_parse(signature_header: &str, signature_input_header: &str) -> MsgSigResult<SignatureHeadersMap> {
    let signature_input = sfv::Parser::parse_dictionary(signature_input_header.as_bytes())
      .map_err(|e| MsgSigError::ParseSfvError(e.to_string()))?;
    let signature = sfv::Parser::parse_dictionary(signature_header.as_bytes())
      .map_err(|e| MsgSigError::ParseSfvError(e.to_string()))?;

    if signature.len() != signature_input.len() || !signature.keys().all(|k| signature_input.contains_key(k)) {
      return Err(MsgSigError::MalformedSignatureHeader(
        "the signature and signature-input headers carry different labels".to_string(),
      ));
    }
    if !signature_input.values().all(|v| matches!(v, ListEntry::InnerList(_))) {
      return Err(MsgSigError::MalformedSignatureHeader(
        "signature-input members must be inner lists".to_string(),
      ));
    }

    signature_input
      .iter()
      .map(|(k, v)| {
        let signature_params = SignatureParams::try_from(v)?;
        let signature_bytes = match signature.get(k) {
          Some(ListEntry::Item(Item {
            bare_item: BareItem::ByteSeq(v),
            ..
          })) => v.clone(),
          _ => {
            return Err(MsgSigError::MalformedSignatureHeader(
              "signature members must be byte sequences".to_string(),
            ))
          }
        };
        Ok((
          k.to_string(),
          Self {
            signature_name: k.to_string(),
            signature: signature_bytes,
            signature_params,
          },
        ))
      })
      .collect::<Result<SignatureHeadersMap, _>>()
  }
}

/* ---------------------------------------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;

  const COMPONENT_LINES: &[&str] = &[
    r##""@method": GET"##,
    r##""@path": /"##,
    r##""date": Tue, 07 Jun 2014 20:51:35 GMT"##,
    r##""content-digest": sha-256=:X48E9qOokqqrvdts8nOJRJN3OWDUoyWxBf7kbu9DBPE=:"##,
  ];

  fn build_component_lines() -> Vec<MessageComponent> {
    COMPONENT_LINES
      .iter()
      .map(|&s| MessageComponent::try_from(s))
      .collect::<Result<Vec<_>, _>>()
      .unwrap()
  }

  #[test]
  fn signature_base_httpbis_rendering() {
    const SIGPARA: &str = r##";created=1704972031;alg="ed25519";keyid="gjrE7ACMxgzYfFHgabgf4kLTg1eKIdsJ94AiFTFj1is""##;
    let values = (r##""@method" "@path" "date" "content-digest""##, SIGPARA);
    let signature_params = SignatureParams::try_from(format!("({}){}", values.0, values.1).as_str()).unwrap();

    let signature_base = SignatureBase::try_new(&build_component_lines(), &signature_params).unwrap();
    let test_string = r##""@method": GET
"@path": /
"date": Tue, 07 Jun 2014 20:51:35 GMT
"content-digest": sha-256=:X48E9qOokqqrvdts8nOJRJN3OWDUoyWxBf7kbu9DBPE=:
"@signature-params": "##;
    assert_eq!(
      signature_base.to_string(),
      format!("{}({}){}", test_string, values.0, values.1)
    );
  }

  #[test]
  fn signature_base_cavage_rendering() {
    let lines = [
      r##""@request-target": post /foo"##,
      r##""host": example.org"##,
      r##""content-length": 18"##,
    ]
    .iter()
    .map(|&s| MessageComponent::try_from(s).unwrap())
    .collect::<Vec<_>>();
    let signature_params =
      SignatureParams::try_from(r##"("@request-target" "host" "content-length")"##).unwrap();
    let base = SignatureBase::try_new(&lines, &signature_params).unwrap();
    assert_eq!(
      base.cavage_string(),
      "(request-target): post /foo\nhost: example.org\ncontent-length: 18"
    );
  }

  #[test]
  fn signature_base_empty_covered_list() {
    let signature_params =
      SignatureParams::try_from(r##"();created=1618884473;keyid="test-key-rsa-pss""##).unwrap();
    let base = SignatureBase::try_new(&[], &signature_params).unwrap();
    assert_eq!(
      base.to_string(),
      r##""@signature-params": ();created=1618884473;keyid="test-key-rsa-pss""##
    );
  }

  #[test]
  fn signature_base_rejects_mismatched_order() {
    let signature_params = SignatureParams::try_from(r##"("@path" "@method" "date" "content-digest")"##).unwrap();
    assert!(SignatureBase::try_new(&build_component_lines(), &signature_params).is_err());
  }

  #[test]
  fn signature_header_entries_round_trip() {
    const SIGNATURE_INPUT: &str = r##"sig-b26=("date" "@method" "@path" "@authority" "content-type" "content-length");created=1618884473;keyid="test-key-ed25519""##;
    const SIGNATURE: &str =
      r##"sig-b26=:wqcAqbmYJ2ji2glfAMaRy4gruYYnx2nEFN2HN6jrnDnQCK1u02Gb04v9EDgwUPiu4A0w6vuQv5lIp5WPpBKRCw==:"##;

    let entries = SignatureHeaderEntry::try_parse(SIGNATURE, SIGNATURE_INPUT).unwrap();
    assert_eq!(entries.len(), 1);
    let entry = entries.get("sig-b26").unwrap();
    assert_eq!(entry.signature_header_value(), SIGNATURE);
    assert_eq!(entry.signature_input_header_value(), SIGNATURE_INPUT);
  }

  #[test]
  fn mismatched_header_pair_is_malformed() {
    let res = SignatureHeaderEntry::try_parse("sig1=:YQ==:", "sig2=(\"@method\")");
    assert!(matches!(res, Err(MsgSigError::MalformedSignatureHeader(_))));
  }
}
