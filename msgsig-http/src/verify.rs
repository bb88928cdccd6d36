use crate::{
  config::{KeyLookup, VerifyConfig},
  error::{SigHttpError, SigHttpResult},
  resolve::{build_signature_base, RequestOrResponse},
};
use http::Request;
use msgsig::prelude::{
  cavage::CavageSignatureHeader, Dialect, SignatureHeaderEntry, SignatureParams, VerifyingKey, DEFAULT_SIGNATURE_NAME,
};
use tracing::debug;

/// One parsed signature awaiting policy evaluation
struct ParsedSignature {
  label: String,
  params: SignatureParams,
  signature: Vec<u8>,
}

/* --------------------------------------- */
/// Verify every signature of a message according to the config.
///
/// Returns `Ok(Some(labels))` with the verified label(s), or `Ok(None)` when the
/// outcome is indeterminate: no signature headers are present, or no label
/// produced a positive outcome and none raised an error.
///
/// Labels are processed sequentially in `Signature-Input` order; dropping the
/// future between key lookups cancels the remaining labels.
pub(crate) async fn verify_message_impl<L, B, B2>(
  config: &VerifyConfig<L>,
  req_or_res: &RequestOrResponse<'_, B>,
  req_for_param: Option<&Request<B2>>,
) -> SigHttpResult<Option<Vec<String>>>
where
  L: KeyLookup + Sync,
{
  let Some(parsed) = parse_signatures(config.dialect, req_or_res)? else {
    return Ok(None);
  };

  let now = config.now.unwrap_or_else(SignatureParams::now);
  let mut verified: Vec<String> = Vec::new();
  let mut first_error: Option<SigHttpError> = None;

  for sig in &parsed {
    let key = match config.key_lookup.lookup(&sig.params).await {
      Ok(Some(key)) => key,
      Ok(None) => {
        if config.all {
          return Err(SigHttpError::UnknownKey(format!(
            "no key for signature label: {}",
            sig.label
          )));
        }
        debug!("skipping signature label without a known key: {}", sig.label);
        continue;
      }
      Err(e) => {
        if config.all {
          return Err(e);
        }
        first_error.get_or_insert(e);
        continue;
      }
    };

    let outcome = verify_one_label(config, req_or_res, req_for_param, sig, &key, now);
    match outcome {
      Ok(true) => {
        if config.all {
          verified.push(sig.label.clone());
        } else {
          // a single positive outcome short-circuits and hides other labels' errors
          return Ok(Some(vec![sig.label.clone()]));
        }
      }
      Ok(false) => {
        if config.all {
          return Err(SigHttpError::VerificationFailed(format!(
            "signature rejected for label: {}",
            sig.label
          )));
        }
      }
      Err(e) => {
        if config.all {
          return Err(e);
        }
        first_error.get_or_insert(e);
      }
    }
  }

  if let Some(e) = first_error {
    return Err(e);
  }
  if verified.is_empty() {
    Ok(None)
  } else {
    Ok(Some(verified))
  }
}

/// Per-label pipeline after key lookup: parameter checks, coverage checks, the
/// expiry window, base reconstruction, and finally the cryptographic primitive.
fn verify_one_label<L, B, B2>(
  config: &VerifyConfig<L>,
  req_or_res: &RequestOrResponse<'_, B>,
  req_for_param: Option<&Request<B2>>,
  sig: &ParsedSignature,
  key: &L::Key,
  now: u64,
) -> SigHttpResult<bool>
where
  L: KeyLookup,
{
  check_acceptance(config, &sig.params, key)?;
  check_expiry(config, &sig.params, now)?;

  let base = build_signature_base(
    req_or_res,
    &sig.params,
    req_for_param,
    config.dialect,
    config.component_parser.as_deref(),
  )?;
  key
    .verify(&base.as_bytes(config.dialect), &sig.signature, &sig.params)
    .map_err(SigHttpError::from)
}

/// Algorithm acceptance plus the required-params / required-fields policy
fn check_acceptance<L, K>(config: &VerifyConfig<L>, params: &SignatureParams, key: &K) -> SigHttpResult<()>
where
  L: KeyLookup,
  K: VerifyingKey,
{
  if let (Some(alg), Some(accepted)) = (params.alg(), key.algs()) {
    if !accepted.iter().any(|a| a == alg) {
      return Err(SigHttpError::UnsupportedAlgorithm(format!(
        "key does not accept algorithm: {alg}"
      )));
    }
  }

  for required in &config.required_params {
    if !params.contains_param(required) {
      return Err(SigHttpError::UnacceptableSignature(format!(
        "required parameter not signed: {required}"
      )));
    }
  }

  for required in &config.required_fields {
    let covered = params.covered_components.iter().any(|c| c.name == required.name);
    if !covered {
      return Err(SigHttpError::UnacceptableSignature(format!(
        "required component not covered: {required}"
      )));
    }
  }
  Ok(())
}

/// The expiry window: `tolerance` widens acceptance on both sides, `max_age` caps
/// the signature age, and `not_after` (defaulting to now) caps future `created`.
fn check_expiry<L>(config: &VerifyConfig<L>, params: &SignatureParams, now: u64) -> SigHttpResult<()>
where
  L: KeyLookup,
{
  if let Some(created) = params.created() {
    if let Some(max_age) = config.max_age {
      if now.saturating_sub(created) > max_age {
        return Err(SigHttpError::Expired(format!(
          "signature too old: created={created}, max_age={max_age}"
        )));
      }
    }
    let not_after = config.not_after.unwrap_or(now);
    if created.saturating_sub(config.tolerance) > not_after {
      return Err(SigHttpError::Expired(format!(
        "signature created in the future: created={created}"
      )));
    }
  }
  if let Some(expires) = params.expires() {
    if now > expires + config.tolerance {
      return Err(SigHttpError::Expired(format!("signature expired at {expires}")));
    }
  }
  Ok(())
}

/* --------------------------------------- */
/// Parse the wire headers of the message into signatures to evaluate.
/// `Ok(None)` means the message carries no signature at all.
fn parse_signatures<B>(
  dialect: Dialect,
  req_or_res: &RequestOrResponse<'_, B>,
) -> SigHttpResult<Option<Vec<ParsedSignature>>> {
  match dialect {
    Dialect::Httpbis => {
      let signature = combined_header_value(req_or_res, "signature")?;
      let signature_input = combined_header_value(req_or_res, "signature-input")?;
      match (signature, signature_input) {
        (None, None) => Ok(None),
        (Some(signature), Some(signature_input)) => {
          let entries = SignatureHeaderEntry::try_parse(&signature, &signature_input)
            .map_err(|e| SigHttpError::MalformedSignatureHeaders(e.to_string()))?;
          let parsed = entries
            .into_iter()
            .map(|(label, entry)| ParsedSignature {
              label,
              params: entry.signature_params().clone(),
              signature: entry.signature_bytes().to_vec(),
            })
            .collect();
          Ok(Some(parsed))
        }
        _ => Err(SigHttpError::MalformedSignatureHeaders(
          "signature and signature-input headers must be present together".to_string(),
        )),
      }
    }
    Dialect::Cavage => {
      let Some(value) = req_or_res.headers().get("signature") else {
        return Ok(None);
      };
      let header = CavageSignatureHeader::try_parse(value.to_str()?)
        .map_err(|e| SigHttpError::MalformedSignatureHeaders(e.to_string()))?;
      Ok(Some(vec![ParsedSignature {
        label: DEFAULT_SIGNATURE_NAME.to_string(),
        params: header.params,
        signature: header.signature,
      }]))
    }
  }
}

fn combined_header_value<B>(req_or_res: &RequestOrResponse<'_, B>, name: &str) -> SigHttpResult<Option<String>> {
  let values = req_or_res
    .headers()
    .get_all(name)
    .iter()
    .map(|v| v.to_str().map(|s| s.to_owned()))
    .collect::<Result<Vec<_>, _>>()?;
  if values.is_empty() {
    Ok(None)
  } else {
    Ok(Some(values.join(", ")))
  }
}

/* --------------------------------------- */
