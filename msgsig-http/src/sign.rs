use crate::{
  config::SignConfig,
  error::{SigHttpError, SigHttpResult},
  resolve::{build_signature_base, RequestOrResponse},
};
use http::{HeaderMap, HeaderValue, Request};
use msgsig::prelude::{
  cavage::CavageSignatureHeader, parse_dictionary, Dialect, SignatureParams, SigningKey, DEFAULT_SIGNATURE_NAME,
};

type IndexSet<K> = indexmap::IndexSet<K, fxhash::FxBuildHasher>;

/// Default lifetime of the derived `expires` parameter, in seconds
const DEFAULT_EXPIRES_IN: u64 = 300;

/* --------------------------------------- */
/// Assemble the signature parameters for a signing call by iterating the
/// requested parameter names in order.
pub(crate) fn collect_signature_params<K: SigningKey>(config: &SignConfig<'_, K>) -> SigHttpResult<SignatureParams> {
  let mut params = SignatureParams::try_new(&config.fields)?;

  // the effective creation instant, independent of whether `created` is emitted;
  // an explicit null suppresses it together with the derived `expires`
  let created_value = match config.param_values.get("created") {
    Some(None) => None,
    Some(Some(v)) => Some(v.as_u64().ok_or(SigHttpError::InvalidComponentParam(
      "`created` override must be an integer timestamp".to_string(),
    ))?),
    None => Some(SignatureParams::now()),
  };

  for name in &config.params {
    match name.as_str() {
      "created" => {
        if let Some(created) = created_value {
          params.set_created(created);
        }
      }
      "expires" => match config.param_values.get("expires") {
        Some(None) => {}
        Some(Some(v)) => {
          let expires = v.as_u64().ok_or(SigHttpError::InvalidComponentParam(
            "`expires` override must be an integer timestamp".to_string(),
          ))?;
          params.set_expires(expires);
        }
        None => {
          if let Some(created) = created_value {
            params.set_expires(created + DEFAULT_EXPIRES_IN);
          }
        }
      },
      "keyid" => match config.param_values.get("keyid") {
        Some(None) => {}
        Some(Some(v)) => {
          params.set_param("keyid", v.clone());
        }
        None => {
          if let Some(keyid) = config.key.key_id() {
            params.set_keyid(&keyid);
          }
        }
      },
      "alg" => match config.param_values.get("alg") {
        Some(None) => {}
        Some(Some(v)) => {
          params.set_param("alg", v.clone());
        }
        None => {
          if let Some(alg) = config.key.alg() {
            params.set_alg(&alg);
          }
        }
      },
      other => {
        if let Some(Some(v)) = config.param_values.get(other) {
          params.set_param(other, v.clone());
        }
      }
    }
  }

  Ok(params)
}

/* --------------------------------------- */
/// Labels already occupied in the `Signature` / `Signature-Input` headers.
/// Both headers contribute: a fresh label must be free in each.
pub(crate) fn existing_signature_labels(headers: &HeaderMap) -> SigHttpResult<IndexSet<String>> {
  let mut labels = IndexSet::default();
  for header in ["signature", "signature-input"] {
    let values = headers
      .get_all(header)
      .iter()
      .map(|v| v.to_str().map(|s| s.to_owned()))
      .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
      continue;
    }
    let dict = parse_dictionary(&values.join(", "))
      .map_err(|e| SigHttpError::MalformedSignatureHeaders(format!("existing {header} header: {e}")))?;
    labels.extend(dict.keys().cloned());
  }
  Ok(labels)
}

/// Choose a signature label that does not collide with an existing entry by
/// appending the smallest non-negative integer to the requested name.
pub(crate) fn unique_signature_name(requested: Option<&str>, existing: &IndexSet<String>) -> String {
  let requested = requested.unwrap_or(DEFAULT_SIGNATURE_NAME);
  if !existing.contains(requested) {
    return requested.to_string();
  }
  let mut count = 0usize;
  loop {
    let candidate = format!("{requested}{count}");
    if !existing.contains(&candidate) {
      return candidate;
    }
    count += 1;
  }
}

/* --------------------------------------- */
/// Sign one message view and return the headers to append plus the chosen label.
/// Existing signature entries are left untouched; the new entry is appended as an
/// additional header value, which merges under structured-field dictionary rules.
pub(crate) fn build_signature_headers<K, B, B2>(
  config: &SignConfig<'_, K>,
  req_or_res: &RequestOrResponse<'_, B>,
  req_for_param: Option<&Request<B2>>,
) -> SigHttpResult<(Vec<(&'static str, HeaderValue)>, String)>
where
  K: SigningKey,
{
  let params = collect_signature_params(config)?;
  let base = build_signature_base(req_or_res, &params, req_for_param, config.dialect, None)?;

  match config.dialect {
    Dialect::Httpbis => {
      let existing = existing_signature_labels(req_or_res.headers())?;
      let name = unique_signature_name(config.name.as_deref(), &existing);
      let entry = base.build_signature_entry(config.key, Some(&name))?;
      let headers = vec![
        ("signature-input", entry.signature_input_header_value().parse()?),
        ("signature", entry.signature_header_value().parse()?),
      ];
      Ok((headers, name))
    }
    Dialect::Cavage => {
      let signature = base.build_raw_signature(config.key, Dialect::Cavage)?;
      let header = CavageSignatureHeader { params, signature };
      let headers = vec![("signature", header.to_header_value().parse()?)];
      Ok((headers, DEFAULT_SIGNATURE_NAME.to_string()))
    }
  }
}

/* --------------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;
  use msgsig::prelude::{MsgSigResult, SignatureParamValue};

  struct FakeKey;
  impl SigningKey for FakeKey {
    fn sign(&self, _data: &[u8]) -> MsgSigResult<Vec<u8>> {
      Ok(b"a fake signature".to_vec())
    }
    fn key_id(&self) -> Option<String> {
      Some("fake-key".to_string())
    }
    fn alg(&self) -> Option<String> {
      Some("ed25519".to_string())
    }
  }

  #[test]
  fn default_params_use_key_hints_and_now() {
    let key = FakeKey;
    let config = SignConfig::new(&key);
    let params = collect_signature_params(&config).unwrap();
    assert_eq!(params.keyid(), Some("fake-key"));
    assert_eq!(params.alg(), Some("ed25519"));
    let created = params.created().unwrap();
    assert_eq!(params.expires(), Some(created + DEFAULT_EXPIRES_IN));
    // wire order follows the requested parameter-name order
    let names = params.iter_params().map(|(n, _)| n.to_string()).collect::<Vec<_>>();
    assert_eq!(names, vec!["keyid", "alg", "created", "expires"]);
  }

  #[test]
  fn created_null_suppresses_expires() {
    let key = FakeKey;
    let config = SignConfig::new(&key).suppress_param("created");
    let params = collect_signature_params(&config).unwrap();
    assert!(params.created().is_none());
    assert!(params.expires().is_none());
  }

  #[test]
  fn explicit_expires_survives_created_null() {
    let key = FakeKey;
    let config = SignConfig::new(&key)
      .suppress_param("created")
      .param_value("expires", SignatureParamValue::Integer(1618884773));
    let params = collect_signature_params(&config).unwrap();
    assert!(params.created().is_none());
    assert_eq!(params.expires(), Some(1618884773));
  }

  #[test]
  fn explicit_overrides_win() {
    let key = FakeKey;
    let config = SignConfig::new(&key)
      .param_names(&["created", "keyid"])
      .param_value("created", SignatureParamValue::Integer(1618884473))
      .param_value("keyid", SignatureParamValue::String("test-key-rsa-pss".to_string()));
    let params = collect_signature_params(&config).unwrap();
    assert_eq!(params.created(), Some(1618884473));
    assert_eq!(params.keyid(), Some("test-key-rsa-pss"));
    assert!(params.expires().is_none());
    assert!(params.alg().is_none());
    assert_eq!(
      params.to_string(),
      r##"();created=1618884473;keyid="test-key-rsa-pss""##
    );
  }

  #[test]
  fn unique_name_appends_smallest_free_integer() {
    let mut existing = IndexSet::default();
    assert_eq!(unique_signature_name(None, &existing), "sig");
    existing.insert("sig".to_string());
    assert_eq!(unique_signature_name(None, &existing), "sig0");
    existing.insert("sig0".to_string());
    assert_eq!(unique_signature_name(None, &existing), "sig1");
    assert_eq!(unique_signature_name(Some("other"), &existing), "other");
  }

  #[test]
  fn existing_labels_from_headers() {
    let mut headers = HeaderMap::new();
    headers.insert("signature", HeaderValue::from_static("sig1=:YQ==:"));
    headers.insert(
      "signature-input",
      HeaderValue::from_static(r#"sig1=("@method");created=1618884473"#),
    );
    let labels = existing_signature_labels(&headers).unwrap();
    assert!(labels.contains("sig1"));
    assert_eq!(labels.len(), 1);
  }
}
