use crate::error::{MsgSigError, MsgSigResult};
use sfv::BareItem;

/* ---------------------------------------------------------------- */
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
/// Message component name
pub enum MessageComponentName {
  /// HTTP field component, the bare field name without surrounding double quotations
  HttpField(String),
  /// Derived component
  Derived(DerivedComponentName),
}

impl TryFrom<&BareItem> for MessageComponentName {
  type Error = MsgSigError;
  /// A quoted string is the canonical identifier form. A bare token is accepted as well,
  /// which realizes the quote-if-bare acceptance of consumer-supplied identifiers.
  fn try_from(value: &BareItem) -> MsgSigResult<Self> {
    let name = match value {
      BareItem::String(name) => name.as_str(),
      BareItem::Token(name) => name.as_str(),
      _ => {
        return Err(MsgSigError::InvalidComponentName(format!(
          "Invalid message component name: {value:?}"
        )))
      }
    };
    if name.starts_with('@') {
      Ok(Self::Derived(DerivedComponentName::try_from(name)?))
    } else {
      Ok(Self::HttpField(name.to_ascii_lowercase()))
    }
  }
}

impl MessageComponentName {
  /// The component name as it appears inside the quoted identifier
  pub fn as_str(&self) -> &str {
    match self {
      Self::HttpField(val) => val.as_str(),
      Self::Derived(val) => val.as_ref(),
    }
  }
}

impl std::fmt::Display for MessageComponentName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "\"{}\"", self.as_str())
  }
}

/* ---------------------------------------------------------------- */
#[derive(PartialEq, Eq, Clone, Hash, Debug)]
/// Components derived from the message rather than carried as a field, expressed as
/// @method, @path, @authority, etc. in the covered component list.
/// `Created` and `Expires` exist only in the cavage dialect, where their values come
/// from the signature parameters instead of the message.
pub enum DerivedComponentName {
  Method,
  TargetUri,
  Authority,
  Scheme,
  RequestTarget,
  Path,
  Query,
  QueryParam,
  Status,
  SignatureParams,
  Created,
  Expires,
}

impl AsRef<str> for DerivedComponentName {
  fn as_ref(&self) -> &str {
    match self {
      Self::Method => "@method",
      Self::TargetUri => "@target-uri",
      Self::Authority => "@authority",
      Self::Scheme => "@scheme",
      Self::RequestTarget => "@request-target",
      Self::Path => "@path",
      Self::Query => "@query",
      Self::QueryParam => "@query-param",
      Self::Status => "@status",
      Self::SignatureParams => "@signature-params",
      Self::Created => "@created",
      Self::Expires => "@expires",
    }
  }
}
impl From<DerivedComponentName> for String {
  fn from(val: DerivedComponentName) -> Self {
    val.as_ref().to_string()
  }
}
impl TryFrom<&str> for DerivedComponentName {
  type Error = MsgSigError;
  fn try_from(val: &str) -> MsgSigResult<Self> {
    match val {
      "@method" => Ok(Self::Method),
      "@target-uri" => Ok(Self::TargetUri),
      "@authority" => Ok(Self::Authority),
      "@scheme" => Ok(Self::Scheme),
      "@request-target" => Ok(Self::RequestTarget),
      "@path" => Ok(Self::Path),
      "@query" => Ok(Self::Query),
      "@query-param" => Ok(Self::QueryParam),
      "@status" => Ok(Self::Status),
      "@signature-params" => Ok(Self::SignatureParams),
      "@created" => Ok(Self::Created),
      "@expires" => Ok(Self::Expires),
      _ => Err(MsgSigError::InvalidComponentName(format!(
        "Invalid derived component: {val}"
      ))),
    }
  }
}

impl std::fmt::Display for DerivedComponentName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", AsRef::<str>::as_ref(self))
  }
}
