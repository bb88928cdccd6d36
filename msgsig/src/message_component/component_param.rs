use crate::{
  error::{MsgSigError, MsgSigResult},
  util,
};
use base64::{engine::general_purpose, Engine as _};
use sfv::SerializeValue;

type IndexSet<K> = indexmap::IndexSet<K, fxhash::FxBuildHasher>;

/* ---------------------------------------------------------------- */
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
/// Message component parameters appended with `;` in the component identifier
/// https://datatracker.ietf.org/doc/html/rfc9421#name-http-fields
pub enum MessageComponentParam {
  /// sf: strict structured-field re-serialization of the field value
  Sf,
  /// key: dictionary member projection, encoded as `;key="..."`
  Key(String),
  /// bs: encode the raw field values as byte sequences
  Bs,
  /// req: bind to the request when signing or verifying a response
  Req,
  /// name: query parameter selection for @query-param, encoded as `;name="..."`
  Name(String),
}

impl From<MessageComponentParam> for String {
  fn from(val: MessageComponentParam) -> Self {
    match val {
      MessageComponentParam::Sf => "sf".to_string(),
      MessageComponentParam::Key(val) => format!("key=\"{val}\""),
      MessageComponentParam::Bs => "bs".to_string(),
      MessageComponentParam::Req => "req".to_string(),
      MessageComponentParam::Name(v) => format!("name=\"{v}\""),
    }
  }
}

impl TryFrom<(&str, &sfv::BareItem)> for MessageComponentParam {
  type Error = MsgSigError;
  fn try_from((key, val): (&str, &sfv::BareItem)) -> Result<Self, Self::Error> {
    match key {
      "sf" => Ok(Self::Sf),
      "bs" => Ok(Self::Bs),
      "req" => Ok(Self::Req),
      "name" => {
        let name = val.as_str().ok_or(MsgSigError::InvalidComponentParam(
          "Invalid component param: name".to_string(),
        ))?;
        Ok(Self::Name(name.to_string()))
      }
      "key" => {
        let key = val.as_str().ok_or(MsgSigError::InvalidComponentParam(
          "Invalid component param: key".to_string(),
        ))?;
        Ok(Self::Key(key.to_string()))
      }
      _ => Err(MsgSigError::InvalidComponentParam(format!(
        "Invalid component param: {key}"
      ))),
    }
  }
}

impl MessageComponentParam {
  pub(crate) fn to_sfv_pair(&self) -> (String, sfv::BareItem) {
    match self {
      Self::Sf => ("sf".to_string(), sfv::BareItem::Boolean(true)),
      Self::Key(k) => ("key".to_string(), sfv::BareItem::String(k.clone())),
      Self::Bs => ("bs".to_string(), sfv::BareItem::Boolean(true)),
      Self::Req => ("req".to_string(), sfv::BareItem::Boolean(true)),
      Self::Name(n) => ("name".to_string(), sfv::BareItem::String(n.clone())),
    }
  }
}

#[derive(PartialEq, Eq, Debug, Clone, Default)]
/// Ordered set of message component parameters
pub struct MessageComponentParams(pub IndexSet<MessageComponentParam>);

impl std::hash::Hash for MessageComponentParams {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    let mut params = self.0.iter().map(|v| v.clone().into()).collect::<Vec<String>>();
    params.sort();
    params.hash(state);
  }
}

impl TryFrom<&sfv::Parameters> for MessageComponentParams {
  type Error = MsgSigError;
  fn try_from(val: &sfv::Parameters) -> Result<Self, Self::Error> {
    let hs = val
      .iter()
      .map(|(k, v)| MessageComponentParam::try_from((k.as_str(), v)))
      .collect::<Result<IndexSet<_>, _>>()?;
    Ok(Self(hs))
  }
}

impl MessageComponentParams {
  pub(crate) fn to_sfv_params(&self) -> sfv::Parameters {
    self.0.iter().map(|p| p.to_sfv_pair()).collect()
  }
}

impl std::fmt::Display for MessageComponentParams {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if !self.0.is_empty() {
      write!(
        f,
        ";{}",
        self.0.iter().map(|v| v.clone().into()).collect::<Vec<String>>().join(";")
      )
    } else {
      Ok(())
    }
  }
}

/* ---------------------------------------------------------------- */
/// Handle `sf` parameter: combine raw values first, then re-serialize canonically
pub(super) fn handle_params_sf(field_values: &[String]) -> MsgSigResult<String> {
  let combined = util::combine_field_values(field_values);
  util::reserialize_structured(&combined)
}

/* ---------------------------------------------------------------- */
/// Handle `key` parameter: the combined value must be a dictionary, and the
/// serialization of the member under `key` is the component value
pub(super) fn handle_params_key(field_values: &[String], key: &str) -> MsgSigResult<String> {
  let combined = util::combine_field_values(field_values);
  let dict = sfv::Parser::parse_dictionary(combined.as_bytes())
    .map_err(|e| MsgSigError::InvalidComponentParam(format!("`key` requires a dictionary field value: {e}")))?;

  let Some(member) = dict.get(key) else {
    return Err(MsgSigError::MissingComponent(format!(
      "Dictionary key not found in field value: {key}"
    )));
  };
  let single: sfv::List = vec![member.clone()];
  single
    .serialize_value()
    .map_err(|e| MsgSigError::ParseSfvError(e.to_string()))
}

/* ---------------------------------------------------------------- */
/// Handle `bs` parameter: each raw value is wrapped as a byte sequence, then joined
pub(super) fn handle_params_bs(field_values: &[String]) -> MsgSigResult<String> {
  let encoded = field_values
    .iter()
    .map(|v| format!(":{}:", general_purpose::STANDARD.encode(v.as_bytes())))
    .collect::<Vec<_>>();
  Ok(util::combine_field_values(&encoded))
}

/* ---------------------------------------------------------------- */
