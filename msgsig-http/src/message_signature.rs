use crate::{
  config::{KeyLookup, SignConfig, VerifyConfig},
  error::{SigHttpError, SigHttpResult},
  resolve::RequestOrResponse,
  sign::build_signature_headers,
  verify::verify_message_impl,
};
use http::{HeaderValue, Request, Response};
use indexmap::IndexMap;
use msgsig::prelude::{Dialect, SignatureHeaderEntry, SignatureHeadersMap, SignatureParams, SigningKey};
use std::future::Future;

/// A type alias for the signature label
pub type SignatureName = String;
/// A type alias for the key id carried in the `keyid` parameter
pub type KeyId = String;

/* --------------------------------------- */
/// Signing and verifying message signatures on an http request
pub trait RequestSignature {
  type Error;

  /// Sign the request according to the config, appending the signature header(s).
  /// Returns the chosen signature label. The message is augmented fully or not at all.
  fn sign_message<K>(&mut self, config: &SignConfig<'_, K>) -> impl Future<Output = Result<SignatureName, Self::Error>> + Send
  where
    Self: Sized,
    K: SigningKey + Sync;

  /// Verify the request's signatures according to the config.
  /// `Ok(None)` is the indeterminate outcome: the request carries no signature,
  /// or no label produced a positive outcome and none raised an error.
  fn verify_message<L>(
    &self,
    config: &VerifyConfig<L>,
  ) -> impl Future<Output = Result<Option<Vec<SignatureName>>, Self::Error>> + Send
  where
    Self: Sized,
    L: KeyLookup + Sync;

  /// Check if the request has both signature and signature-input headers
  fn has_message_signature(&self) -> bool;

  /// Extract the key id of every signature in the request headers (httpbis dialect)
  fn get_key_ids(&self) -> Result<IndexMap<SignatureName, KeyId>, Self::Error>;

  /// Extract the signature params of every signature in the request headers (httpbis dialect)
  fn get_signature_params(&self) -> Result<IndexMap<SignatureName, SignatureParams>, Self::Error>;

  /// Blocking variant of [`sign_message`](Self::sign_message).
  /// Panics when called from within an async runtime.
  #[cfg(feature = "blocking")]
  fn sign_message_sync<K>(&mut self, config: &SignConfig<'_, K>) -> Result<SignatureName, Self::Error>
  where
    Self: Sized,
    K: SigningKey + Sync;

  /// Blocking variant of [`verify_message`](Self::verify_message).
  /// Panics when called from within an async runtime.
  #[cfg(feature = "blocking")]
  fn verify_message_sync<L>(&self, config: &VerifyConfig<L>) -> Result<Option<Vec<SignatureName>>, Self::Error>
  where
    Self: Sized,
    L: KeyLookup + Sync;
}

/* --------------------------------------- */
/// Signing and verifying message signatures on an http response.
/// The optional bound request serves the `req`-flagged covered components.
pub trait ResponseSignature {
  type Error;

  /// Sign the response according to the config, appending the signature header(s).
  fn sign_message<K, B2>(
    &mut self,
    config: &SignConfig<'_, K>,
    bound_request: Option<&Request<B2>>,
  ) -> impl Future<Output = Result<SignatureName, Self::Error>> + Send
  where
    Self: Sized,
    K: SigningKey + Sync,
    B2: Sync;

  /// Verify the response's signatures according to the config.
  fn verify_message<L, B2>(
    &self,
    config: &VerifyConfig<L>,
    bound_request: Option<&Request<B2>>,
  ) -> impl Future<Output = Result<Option<Vec<SignatureName>>, Self::Error>> + Send
  where
    Self: Sized,
    L: KeyLookup + Sync,
    B2: Sync;

  /// Check if the response has both signature and signature-input headers
  fn has_message_signature(&self) -> bool;

  /// Extract the key id of every signature in the response headers (httpbis dialect)
  fn get_key_ids(&self) -> Result<IndexMap<SignatureName, KeyId>, Self::Error>;

  /// Extract the signature params of every signature in the response headers (httpbis dialect)
  fn get_signature_params(&self) -> Result<IndexMap<SignatureName, SignatureParams>, Self::Error>;

  /// Blocking variant of [`sign_message`](Self::sign_message).
  /// Panics when called from within an async runtime.
  #[cfg(feature = "blocking")]
  fn sign_message_sync<K, B2>(
    &mut self,
    config: &SignConfig<'_, K>,
    bound_request: Option<&Request<B2>>,
  ) -> Result<SignatureName, Self::Error>
  where
    Self: Sized,
    K: SigningKey + Sync,
    B2: Sync;

  /// Blocking variant of [`verify_message`](Self::verify_message).
  /// Panics when called from within an async runtime.
  #[cfg(feature = "blocking")]
  fn verify_message_sync<L, B2>(
    &self,
    config: &VerifyConfig<L>,
    bound_request: Option<&Request<B2>>,
  ) -> Result<Option<Vec<SignatureName>>, Self::Error>
  where
    Self: Sized,
    L: KeyLookup + Sync,
    B2: Sync;
}

/* --------------------------------------- */
impl<D> RequestSignature for Request<D>
where
  D: Send + Sync,
{
  type Error = SigHttpError;

  async fn sign_message<K>(&mut self, config: &SignConfig<'_, K>) -> SigHttpResult<SignatureName>
  where
    Self: Sized,
    K: SigningKey + Sync,
  {
    let (headers, name) = {
      let req_or_res = RequestOrResponse::Request(self);
      build_signature_headers(config, &req_or_res, None::<&Request<()>>)?
    };
    apply_headers(self.headers_mut(), config.dialect, headers);
    Ok(name)
  }

  async fn verify_message<L>(&self, config: &VerifyConfig<L>) -> SigHttpResult<Option<Vec<SignatureName>>>
  where
    Self: Sized,
    L: KeyLookup + Sync,
  {
    let req_or_res = RequestOrResponse::Request(self);
    verify_message_impl(config, &req_or_res, None::<&Request<()>>).await
  }

  fn has_message_signature(&self) -> bool {
    self.headers().contains_key("signature") && self.headers().contains_key("signature-input")
  }

  fn get_key_ids(&self) -> SigHttpResult<IndexMap<SignatureName, KeyId>> {
    let entries = extract_signature_entries(self.headers())?;
    Ok(
      entries
        .iter()
        .filter_map(|(name, entry)| {
          entry
            .signature_params()
            .keyid()
            .map(|key_id| (name.clone(), key_id.to_string()))
        })
        .collect(),
    )
  }

  fn get_signature_params(&self) -> SigHttpResult<IndexMap<SignatureName, SignatureParams>> {
    let entries = extract_signature_entries(self.headers())?;
    Ok(
      entries
        .iter()
        .map(|(name, entry)| (name.clone(), entry.signature_params().clone()))
        .collect(),
    )
  }

  #[cfg(feature = "blocking")]
  fn sign_message_sync<K>(&mut self, config: &SignConfig<'_, K>) -> SigHttpResult<SignatureName>
  where
    Self: Sized,
    K: SigningKey + Sync,
  {
    futures::executor::block_on(self.sign_message(config))
  }

  #[cfg(feature = "blocking")]
  fn verify_message_sync<L>(&self, config: &VerifyConfig<L>) -> SigHttpResult<Option<Vec<SignatureName>>>
  where
    Self: Sized,
    L: KeyLookup + Sync,
  {
    futures::executor::block_on(self.verify_message(config))
  }
}

/* --------------------------------------- */
impl<D> ResponseSignature for Response<D>
where
  D: Send + Sync,
{
  type Error = SigHttpError;

  async fn sign_message<K, B2>(
    &mut self,
    config: &SignConfig<'_, K>,
    bound_request: Option<&Request<B2>>,
  ) -> SigHttpResult<SignatureName>
  where
    Self: Sized,
    K: SigningKey + Sync,
    B2: Sync,
  {
    let (headers, name) = {
      let req_or_res = RequestOrResponse::Response(self);
      build_signature_headers(config, &req_or_res, bound_request)?
    };
    apply_headers(self.headers_mut(), config.dialect, headers);
    Ok(name)
  }

  async fn verify_message<L, B2>(
    &self,
    config: &VerifyConfig<L>,
    bound_request: Option<&Request<B2>>,
  ) -> SigHttpResult<Option<Vec<SignatureName>>>
  where
    Self: Sized,
    L: KeyLookup + Sync,
    B2: Sync,
  {
    let req_or_res = RequestOrResponse::Response(self);
    verify_message_impl(config, &req_or_res, bound_request).await
  }

  fn has_message_signature(&self) -> bool {
    self.headers().contains_key("signature") && self.headers().contains_key("signature-input")
  }

  fn get_key_ids(&self) -> SigHttpResult<IndexMap<SignatureName, KeyId>> {
    let entries = extract_signature_entries(self.headers())?;
    Ok(
      entries
        .iter()
        .filter_map(|(name, entry)| {
          entry
            .signature_params()
            .keyid()
            .map(|key_id| (name.clone(), key_id.to_string()))
        })
        .collect(),
    )
  }

  fn get_signature_params(&self) -> SigHttpResult<IndexMap<SignatureName, SignatureParams>> {
    let entries = extract_signature_entries(self.headers())?;
    Ok(
      entries
        .iter()
        .map(|(name, entry)| (name.clone(), entry.signature_params().clone()))
        .collect(),
    )
  }

  #[cfg(feature = "blocking")]
  fn sign_message_sync<K, B2>(
    &mut self,
    config: &SignConfig<'_, K>,
    bound_request: Option<&Request<B2>>,
  ) -> SigHttpResult<SignatureName>
  where
    Self: Sized,
    K: SigningKey + Sync,
    B2: Sync,
  {
    futures::executor::block_on(self.sign_message(config, bound_request))
  }

  #[cfg(feature = "blocking")]
  fn verify_message_sync<L, B2>(
    &self,
    config: &VerifyConfig<L>,
    bound_request: Option<&Request<B2>>,
  ) -> SigHttpResult<Option<Vec<SignatureName>>>
  where
    Self: Sized,
    L: KeyLookup + Sync,
    B2: Sync,
  {
    futures::executor::block_on(self.verify_message(config, bound_request))
  }
}

/* --------------------------------------- */
/// httpbis entries merge as appended dictionary members; the cavage dialect has a
/// single-signature identity, so its header is replaced.
fn apply_headers(target: &mut http::HeaderMap, dialect: Dialect, headers: Vec<(&'static str, HeaderValue)>) {
  for (name, value) in headers {
    match dialect {
      Dialect::Httpbis => {
        target.append(name, value);
      }
      Dialect::Cavage => {
        target.insert(name, value);
      }
    }
  }
}

/// Extract the labeled signature entries from the httpbis header pair
fn extract_signature_entries(headers: &http::HeaderMap) -> SigHttpResult<SignatureHeadersMap> {
  if !(headers.contains_key("signature-input") && headers.contains_key("signature")) {
    return Err(SigHttpError::NoSignatureHeaders(
      "the message does not have signature and signature-input headers".to_string(),
    ));
  };

  let signature_input_strings = headers
    .get_all("signature-input")
    .iter()
    .map(|v| v.to_str())
    .collect::<Result<Vec<_>, _>>()?
    .join(", ");
  let signature_strings = headers
    .get_all("signature")
    .iter()
    .map(|v| v.to_str())
    .collect::<Result<Vec<_>, _>>()?
    .join(", ");

  SignatureHeaderEntry::try_parse(&signature_strings, &signature_input_strings).map_err(|e| e.into())
}

/* --------------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn has_message_signature_needs_both_headers() {
    let mut req = Request::builder()
      .method("GET")
      .uri("https://example.com/")
      .body(())
      .unwrap();
    assert!(!req.has_message_signature());
    req
      .headers_mut()
      .insert("signature", HeaderValue::from_static("sig=:YQ==:"));
    assert!(!req.has_message_signature());
    req.headers_mut().insert(
      "signature-input",
      HeaderValue::from_static(r#"sig=("@method");created=1"#),
    );
    assert!(req.has_message_signature());
  }

  #[test]
  fn get_key_ids_reads_the_keyid_param() {
    let mut req = Request::builder()
      .method("GET")
      .uri("https://example.com/")
      .body(())
      .unwrap();
    req.headers_mut().insert(
      "signature-input",
      HeaderValue::from_static(r#"sig11=("@method" "@authority");created=1704972031;keyid="some-key""#),
    );
    req.headers_mut().insert(
      "signature",
      HeaderValue::from_static("sig11=:wqcAqbmYJ2ji2glfAMaRy4gruYYnx2nEFN2HN6jrnDnQCK1u02Gb04v9EDgwUPiu4A0w6vuQv5lIp5WPpBKRCw==:"),
    );
    let key_ids = req.get_key_ids().unwrap();
    assert_eq!(key_ids.len(), 1);
    assert_eq!(key_ids["sig11"], "some-key");

    let params = req.get_signature_params().unwrap();
    assert_eq!(
      params["sig11"].to_string(),
      r#"("@method" "@authority");created=1704972031;keyid="some-key""#
    );
  }
}
