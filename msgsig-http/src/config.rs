use crate::error::SigHttpResult;
use msgsig::prelude::{
  message_component::MessageComponentId, Dialect, SignatureParamValue, SignatureParams, SigningKey, VerifyingKey,
};
use std::future::Future;

type IndexMap<K, V> = indexmap::IndexMap<K, V, fxhash::FxBuildHasher>;

/// Parameter names emitted when a sign config does not choose its own set
pub(crate) const DEFAULT_PARAM_NAMES: &[&str] = &["keyid", "alg", "created", "expires"];

/// Resolves the verifying key for one signature from its signature parameters.
/// Returning `Ok(None)` means the key is not known to this verifier; in non-`all`
/// verification the label is then skipped, in `all` mode it fails the call.
pub trait KeyLookup {
  type Key: VerifyingKey + Send + Sync;

  fn lookup(&self, params: &SignatureParams) -> impl Future<Output = SigHttpResult<Option<Self::Key>>> + Send;
}

/// Component-resolution override hook. Returning `Ok(None)` falls through to the
/// built-in resolution; `Ok(Some(values))` supplies the raw values for the component.
pub type ComponentParser = dyn Fn(&MessageComponentId) -> SigHttpResult<Option<Vec<String>>> + Send + Sync;

/* --------------------------------------- */
/// Configuration of one signing call
pub struct SignConfig<'a, K: SigningKey> {
  pub(crate) key: &'a K,
  pub(crate) dialect: Dialect,
  pub(crate) name: Option<String>,
  pub(crate) params: Vec<String>,
  pub(crate) fields: Vec<MessageComponentId>,
  /// Explicit parameter overrides; `None` is the explicit null that suppresses
  /// the parameter (and, for `created`, the derived `expires` default)
  pub(crate) param_values: IndexMap<String, Option<SignatureParamValue>>,
}

impl<'a, K: SigningKey> SignConfig<'a, K> {
  /// New config signing with the given key, covering no components, emitting the
  /// default parameter set in the httpbis dialect
  pub fn new(key: &'a K) -> Self {
    Self {
      key,
      dialect: Dialect::default(),
      name: None,
      params: DEFAULT_PARAM_NAMES.iter().map(|s| s.to_string()).collect(),
      fields: Vec::new(),
      param_values: IndexMap::default(),
    }
  }

  /// Select the wire dialect
  pub fn dialect(mut self, dialect: Dialect) -> Self {
    self.dialect = dialect;
    self
  }

  /// Request a signature label (default `sig`); on collision the smallest free
  /// integer suffix is appended
  pub fn name(mut self, name: &str) -> Self {
    self.name = Some(name.to_string());
    self
  }

  /// Choose the signature parameters to emit, in order
  pub fn param_names(mut self, names: &[&str]) -> Self {
    self.params = names.iter().map(|s| s.to_string()).collect();
    self
  }

  /// Choose the covered components, in order, from their identifier strings
  pub fn covered_fields(mut self, fields: &[&str]) -> SigHttpResult<Self> {
    self.fields = fields
      .iter()
      .map(|f| MessageComponentId::try_from(*f))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(self)
  }

  /// Choose the covered components from already-built identifiers
  pub fn covered_component_ids(mut self, ids: &[MessageComponentId]) -> Self {
    self.fields = ids.to_vec();
    self
  }

  /// Override the value of a signature parameter
  pub fn param_value(mut self, name: &str, value: SignatureParamValue) -> Self {
    self.param_values.insert(name.to_ascii_lowercase(), Some(value));
    self
  }

  /// Explicitly suppress a parameter. Suppressing `created` also suppresses the
  /// derived `expires` default.
  pub fn suppress_param(mut self, name: &str) -> Self {
    self.param_values.insert(name.to_ascii_lowercase(), None);
    self
  }
}

/* --------------------------------------- */
/// Configuration of one verification call
pub struct VerifyConfig<L: KeyLookup> {
  pub(crate) key_lookup: L,
  pub(crate) dialect: Dialect,
  pub(crate) not_after: Option<u64>,
  pub(crate) max_age: Option<u64>,
  pub(crate) tolerance: u64,
  pub(crate) required_params: Vec<String>,
  pub(crate) required_fields: Vec<MessageComponentId>,
  pub(crate) all: bool,
  pub(crate) component_parser: Option<Box<ComponentParser>>,
  pub(crate) now: Option<u64>,
}

impl<L: KeyLookup> VerifyConfig<L> {
  /// New config verifying against keys resolved by `key_lookup`, httpbis dialect,
  /// zero tolerance, no coverage requirements
  pub fn new(key_lookup: L) -> Self {
    Self {
      key_lookup,
      dialect: Dialect::default(),
      not_after: None,
      max_age: None,
      tolerance: 0,
      required_params: Vec::new(),
      required_fields: Vec::new(),
      all: false,
      component_parser: None,
      now: None,
    }
  }

  /// Select the wire dialect
  pub fn dialect(mut self, dialect: Dialect) -> Self {
    self.dialect = dialect;
    self
  }

  /// Reject signatures whose `created` is later than this timestamp (default: now)
  pub fn not_after(mut self, not_after: u64) -> Self {
    self.not_after = Some(not_after);
    self
  }

  /// Reject signatures older than this many seconds regardless of `expires`
  pub fn max_age(mut self, max_age: u64) -> Self {
    self.max_age = Some(max_age);
    self
  }

  /// Clock skew allowance in seconds, applied on both sides of `created`/`expires`
  pub fn tolerance(mut self, tolerance: u64) -> Self {
    self.tolerance = tolerance;
    self
  }

  /// Parameters every signature must carry
  pub fn required_params(mut self, names: &[&str]) -> Self {
    self.required_params = names.iter().map(|s| s.to_ascii_lowercase()).collect();
    self
  }

  /// Components (by name) every signature must cover
  pub fn required_fields(mut self, fields: &[&str]) -> SigHttpResult<Self> {
    self.required_fields = fields
      .iter()
      .map(|f| MessageComponentId::try_from(*f))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(self)
  }

  /// Require every signature with a known key to verify, and fail on unknown keys
  pub fn all(mut self, all: bool) -> Self {
    self.all = all;
    self
  }

  /// Install a component-resolution override hook
  pub fn component_parser(mut self, parser: Box<ComponentParser>) -> Self {
    self.component_parser = Some(parser);
    self
  }

  /// Override the clock used for the expiry checks, e.g. when re-validating
  /// captured traffic. Defaults to the current time.
  pub fn verification_time(mut self, now: u64) -> Self {
    self.now = Some(now);
    self
  }
}
