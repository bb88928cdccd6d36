use super::{
  component_name::{DerivedComponentName, MessageComponentName},
  component_param::{MessageComponentParam, MessageComponentParams},
};
use crate::{
  error::{MsgSigError, MsgSigResult},
  util,
};

/* ---------------------------------------------------------------- */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Message component id, i.e., the component name plus its serialization parameters
pub struct MessageComponentId {
  /// Message component name
  pub name: MessageComponentName,
  /// Message component params
  pub params: MessageComponentParams,
}

impl MessageComponentId {
  /// Add `req` param to the component, used to cover request-side values in a response signature.
  pub fn add_req_param(&mut self) {
    self.params.0.insert(MessageComponentParam::Req);
  }

  /// True when the `req` param binds this component to the request context
  pub fn is_req_bound(&self) -> bool {
    self.params.0.contains(&MessageComponentParam::Req)
  }

  /// The identifier as a structured-field item, as placed in the covered-components inner list
  pub(crate) fn to_sfv_item(&self) -> sfv::Item {
    sfv::Item {
      bare_item: sfv::BareItem::String(self.name.as_str().to_string()),
      params: self.params.to_sfv_params(),
    }
  }
}

impl std::fmt::Display for MessageComponentId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}{}", self.name, self.params)
  }
}

impl TryFrom<&str> for MessageComponentId {
  type Error = MsgSigError;
  /// Parse a message component id from its string form.
  /// Accepts `"<name>";<params>` and `"<name>"` (the canonical quoted forms), and
  /// quotes a bare `<name>` or `<name>;<params>` when the quotation is missing.
  fn try_from(val: &str) -> MsgSigResult<Self> {
    let val = val.trim();
    let item = if val.starts_with('@') {
      // bare field names parse as sfv tokens, but @-names do not, so quote those explicitly
      match val.split_once(';') {
        Some((name, rest)) => util::parse_item(&format!("\"{name}\";{rest}"))?,
        None => util::parse_item(&format!("\"{val}\""))?,
      }
    } else {
      util::parse_item(val)?
    };

    let res = Self {
      name: MessageComponentName::try_from(&item.bare_item)?,
      params: MessageComponentParams::try_from(&item.params)?,
    };

    // `name` is exclusively for @query-param
    if res.params.0.iter().any(|v| matches!(v, &MessageComponentParam::Name(_)))
      && !matches!(
        res.name,
        MessageComponentName::Derived(DerivedComponentName::QueryParam)
      )
    {
      return Err(MsgSigError::InvalidComponentId(format!(
        "`name` is only for @query-param: {res}"
      )));
    }

    // `sf`, `key` and `bs` apply to http fields only
    if res.params.0.iter().any(|v| {
      matches!(v, &MessageComponentParam::Bs)
        || matches!(v, &MessageComponentParam::Sf)
        || matches!(v, &MessageComponentParam::Key(_))
    }) && !matches!(res.name, MessageComponentName::HttpField(_))
    {
      return Err(MsgSigError::InvalidComponentId(format!(
        "Invalid param for derived component: {res}"
      )));
    }

    // `bs` is incompatible with the structured re-serialization params
    if res.params.0.contains(&MessageComponentParam::Bs)
      && res
        .params
        .0
        .iter()
        .any(|v| matches!(v, &MessageComponentParam::Sf) || matches!(v, &MessageComponentParam::Key(_)))
    {
      return Err(MsgSigError::InvalidComponentId(format!(
        "`bs` cannot be combined with `sf` or `key`: {res}"
      )));
    }

    Ok(res)
  }
}
