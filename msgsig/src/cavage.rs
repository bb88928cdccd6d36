use crate::{
  error::{MsgSigError, MsgSigResult},
  message_component::{MessageComponentId, MessageComponentName},
  signature_params::{SignatureParamValue, SignatureParams},
};
use base64::{engine::general_purpose, Engine as _};

/// Map a modern algorithm identifier to its legacy cavage token.
/// Unknown names pass through unchanged.
pub fn to_legacy_alg(name: &str) -> &str {
  match name {
    "rsa-pss-sha512" => "hs2019",
    "rsa-v1_5-sha1" => "rsa-sha1",
    "rsa-v1_5-sha256" => "rsa-sha256",
    "ecdsa-p256-sha256" => "ecdsa-sha256",
    other => other,
  }
}

/// Map a legacy cavage algorithm token back to the modern identifier.
/// Unknown names pass through unchanged.
pub fn from_legacy_alg(name: &str) -> &str {
  match name {
    "hs2019" => "rsa-pss-sha512",
    "rsa-sha1" => "rsa-v1_5-sha1",
    "rsa-sha256" => "rsa-v1_5-sha256",
    "ecdsa-sha256" => "ecdsa-p256-sha256",
    other => other,
  }
}

/// Render a covered component id as it appears in the cavage `headers` parameter:
/// `(xxx)` for derived components, the lowercased field name otherwise.
pub fn covered_name(id: &MessageComponentId) -> String {
  match &id.name {
    MessageComponentName::Derived(derived) => format!("({})", &derived.as_ref()[1..]),
    MessageComponentName::HttpField(field) => field.clone(),
  }
}

/// Parse one entry of the cavage `headers` parameter back into a component id,
/// mapping `(xxx)` to `@xxx`.
pub fn parse_covered_name(name: &str) -> MsgSigResult<MessageComponentId> {
  let id = if let Some(inner) = name.strip_prefix('(').and_then(|n| n.strip_suffix(')')) {
    format!("@{inner}")
  } else {
    name.to_string()
  };
  MessageComponentId::try_from(id.as_str())
}

/* ---------------------------------------------------------------- */
#[derive(Debug, Clone)]
/// The content of a legacy cavage `Signature` header: the signature parameters
/// (including the covered list reconstructed from `headers`) plus the signature bytes.
pub struct CavageSignatureHeader {
  /// Signature params; `alg` is translated to its modern identifier on parse
  pub params: SignatureParams,
  /// Raw signature bytes
  pub signature: Vec<u8>,
}

impl CavageSignatureHeader {
  /// Parse a cavage `Signature` header value.
  pub fn try_parse(value: &str) -> MsgSigResult<Self> {
    let mut covered: Option<Vec<MessageComponentId>> = None;
    let mut signature: Option<Vec<u8>> = None;
    let mut params = SignatureParams::default();

    for (key, val, quoted) in parse_pairs(value)? {
      match key.as_str() {
        "keyId" => {
          params.set_keyid(&val);
        }
        "algorithm" => {
          params.set_alg(from_legacy_alg(&val));
        }
        "created" | "expires" => {
          let ts = val.parse::<i64>().map_err(|_| {
            MsgSigError::MalformedSignatureHeader(format!("non-integer {key} parameter: {val}"))
          })?;
          params.set_param(&key, SignatureParamValue::Integer(ts));
        }
        "headers" => {
          let ids = val
            .split_whitespace()
            .map(parse_covered_name)
            .collect::<Result<Vec<_>, _>>()?;
          covered = Some(ids);
        }
        "signature" => {
          signature = Some(general_purpose::STANDARD.decode(val.as_bytes())?);
        }
        _ => {
          // extension parameters round-trip; bare integers stay integers
          let parsed = if quoted {
            SignatureParamValue::String(val)
          } else if let Ok(n) = val.parse::<i64>() {
            SignatureParamValue::Integer(n)
          } else {
            SignatureParamValue::Token(val)
          };
          params.set_param(&key, parsed);
        }
      }
    }

    let Some(signature) = signature else {
      return Err(MsgSigError::MalformedSignatureHeader(
        "cavage signature header carries no signature parameter".to_string(),
      ));
    };
    // absent `headers` means the Date header alone was covered (draft-cavage §2.1)
    params.covered_components = match covered {
      Some(ids) => ids,
      None => vec![MessageComponentId::try_from("date")?],
    };

    Ok(Self { params, signature })
  }

  /// Serialize into the cavage `Signature` header value. Parameters are emitted in
  /// their wire order, followed by `headers` and `signature`; `alg` is translated to
  /// its legacy token and `keyid` is rendered as `keyId`.
  pub fn to_header_value(&self) -> String {
    let mut parts = Vec::new();
    for (name, value) in self.params.iter_params() {
      let part = match (name, value) {
        ("keyid", v) => format!("keyId=\"{}\"", v.as_str().unwrap_or_default()),
        ("alg", v) => format!("algorithm=\"{}\"", to_legacy_alg(v.as_str().unwrap_or_default())),
        (name, SignatureParamValue::Integer(n)) => format!("{name}={n}"),
        (name, SignatureParamValue::ByteSeq(b)) => {
          format!("{name}=\"{}\"", general_purpose::STANDARD.encode(b))
        }
        (name, SignatureParamValue::Boolean(b)) => format!("{name}={b}"),
        (name, v) => format!("{name}=\"{}\"", v.as_str().unwrap_or_default()),
      };
      parts.push(part);
    }
    let headers = self
      .params
      .covered_components
      .iter()
      .map(covered_name)
      .collect::<Vec<_>>()
      .join(" ");
    parts.push(format!("headers=\"{headers}\""));
    parts.push(format!(
      "signature=\"{}\"",
      general_purpose::STANDARD.encode(&self.signature)
    ));
    parts.join(", ")
  }
}

/* ---------------------------------------------------------------- */
/// Scan `key=value` pairs separated by commas; values are either double-quoted
/// (no escapes exist in this dialect) or bare tokens running to the next comma.
fn parse_pairs(input: &str) -> MsgSigResult<Vec<(String, String, bool)>> {
  let mut pairs = Vec::new();
  let mut rest = input.trim_start_matches([' ', '\t', ',']);

  while !rest.is_empty() {
    let Some((key, after_key)) = rest.split_once('=') else {
      return Err(MsgSigError::MalformedSignatureHeader(format!(
        "expected key=value in cavage signature header near: {rest}"
      )));
    };
    let key = key.trim();
    if key.is_empty() || key.contains([' ', '\t', ',']) {
      return Err(MsgSigError::MalformedSignatureHeader(format!(
        "invalid cavage parameter name: {key}"
      )));
    }

    let (value, quoted, after_value) = if let Some(quoted_rest) = after_key.strip_prefix('"') {
      let Some(end) = quoted_rest.find('"') else {
        return Err(MsgSigError::MalformedSignatureHeader(
          "unterminated quoted value in cavage signature header".to_string(),
        ));
      };
      (&quoted_rest[..end], true, &quoted_rest[end + 1..])
    } else {
      match after_key.find(',') {
        Some(end) => (after_key[..end].trim(), false, &after_key[end..]),
        None => (after_key.trim(), false, ""),
      }
    };
    pairs.push((key.to_string(), value.to_string(), quoted));
    rest = after_value.trim_start_matches([' ', '\t', ',']);
  }
  Ok(pairs)
}

/* ---------------------------------------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;

  const HEADER: &str = r##"keyId="rsa-key-1", algorithm="hs2019", created=1402170695, expires=1402170995, headers="(request-target) (created) (expires) host digest content-length", signature="dGVzdA==""##;

  #[test]
  fn alg_alias_round_trip() {
    for (modern, legacy) in [
      ("rsa-pss-sha512", "hs2019"),
      ("rsa-v1_5-sha1", "rsa-sha1"),
      ("rsa-v1_5-sha256", "rsa-sha256"),
      ("ecdsa-p256-sha256", "ecdsa-sha256"),
    ] {
      assert_eq!(to_legacy_alg(modern), legacy);
      assert_eq!(from_legacy_alg(legacy), modern);
    }
    assert_eq!(to_legacy_alg("ed25519"), "ed25519");
    assert_eq!(from_legacy_alg("ed25519"), "ed25519");
  }

  #[test]
  fn parse_full_header() {
    let parsed = CavageSignatureHeader::try_parse(HEADER).unwrap();
    assert_eq!(parsed.params.keyid(), Some("rsa-key-1"));
    assert_eq!(parsed.params.alg(), Some("rsa-pss-sha512"));
    assert_eq!(parsed.params.created(), Some(1402170695));
    assert_eq!(parsed.params.expires(), Some(1402170995));
    assert_eq!(parsed.signature, b"test".to_vec());
    let covered = parsed
      .params
      .covered_components
      .iter()
      .map(|c| c.to_string())
      .collect::<Vec<_>>();
    assert_eq!(
      covered,
      vec![
        "\"@request-target\"",
        "\"@created\"",
        "\"@expires\"",
        "\"host\"",
        "\"digest\"",
        "\"content-length\"",
      ]
    );
  }

  #[test]
  fn parse_accepts_unspaced_commas() {
    let unspaced = HEADER.replace(", ", ",");
    let parsed = CavageSignatureHeader::try_parse(&unspaced).unwrap();
    assert_eq!(parsed.params.keyid(), Some("rsa-key-1"));
    assert_eq!(parsed.params.created(), Some(1402170695));
  }

  #[test]
  fn emit_round_trip() {
    let parsed = CavageSignatureHeader::try_parse(HEADER).unwrap();
    assert_eq!(parsed.to_header_value(), HEADER);
  }

  #[test]
  fn missing_headers_param_covers_date() {
    let parsed = CavageSignatureHeader::try_parse(r##"keyId="k", signature="dGVzdA==""##).unwrap();
    assert_eq!(parsed.params.covered_components.len(), 1);
    assert_eq!(parsed.params.covered_components[0].to_string(), "\"date\"");
  }

  #[test]
  fn missing_signature_is_malformed() {
    let res = CavageSignatureHeader::try_parse(r##"keyId="k", headers="date""##);
    assert!(matches!(res, Err(MsgSigError::MalformedSignatureHeader(_))));
  }
}
