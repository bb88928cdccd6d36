use super::{
  component_id::MessageComponentId,
  component_name::{DerivedComponentName, MessageComponentName},
  component_param::{handle_params_bs, handle_params_key, handle_params_sf, MessageComponentParam},
};
use crate::error::{MsgSigError, MsgSigResult};

/* ---------------------------------------------------------------- */
#[derive(Debug, Clone, PartialEq, Eq)]
/// Message component, i.e., a component id with the value(s) it resolved to.
/// Every component carries exactly one value except `@query-param`, which yields
/// one value per occurrence of the selected parameter.
pub struct MessageComponent {
  /// Message component id
  pub id: MessageComponentId,
  /// Resolved component values, one signature-base line each
  pub values: Vec<String>,
}

impl TryFrom<&str> for MessageComponent {
  type Error = MsgSigError;
  /// Create a MessageComponent from a serialized signature base line, i.e., `"<id>": <value>`.
  fn try_from(val: &str) -> Result<Self, Self::Error> {
    let Some((id, value)) = val.split_once(':') else {
      return Err(MsgSigError::InvalidComponent(format!("Invalid component line: {val}")));
    };
    let id = id.trim();

    // the identifier must be wrapped by double quotations
    if !(id.starts_with('"') && (id.ends_with('"') || id[1..].contains("\";"))) {
      return Err(MsgSigError::InvalidComponentId(format!("Invalid component id: {id}")));
    }

    Ok(Self {
      id: MessageComponentId::try_from(id)?,
      values: vec![value.trim().to_string()],
    })
  }
}

impl TryFrom<(&MessageComponentId, &[String])> for MessageComponent {
  type Error = MsgSigError;

  /// Build a message component from an id and the raw values extracted from the message
  fn try_from((id, field_values): (&MessageComponentId, &[String])) -> Result<Self, Self::Error> {
    match &id.name {
      MessageComponentName::HttpField(_) => build_http_field_component(id, field_values),
      MessageComponentName::Derived(_) => build_derived_component(id, field_values),
    }
  }
}

impl std::fmt::Display for MessageComponent {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    // An empty value leaves a single trailing space after the colon
    // https://datatracker.ietf.org/doc/html/rfc9421#name-http-fields
    let mut first = true;
    for value in &self.values {
      if !first {
        writeln!(f)?;
      }
      first = false;
      write!(f, "{}: {}", self.id, value)?;
    }
    Ok(())
  }
}

impl MessageComponent {
  /// Render the component in the legacy cavage signing-string form: derived components
  /// become `(name)` lines, fields use the bare lowercased name.
  pub fn cavage_lines(&self) -> Vec<String> {
    let name = match &self.id.name {
      MessageComponentName::Derived(derived) => format!("({})", &derived.as_ref()[1..]),
      MessageComponentName::HttpField(field) => field.clone(),
    };
    self.values.iter().map(|v| format!("{name}: {v}")).collect()
  }
}

/* ---------------------------------------------------------------- */
/// Collapse obs-fold line continuations into a single SP and trim optional whitespace,
/// so that resolution is invariant under folding and OWS padding.
pub(crate) fn canonicalize_field_value(raw: &str) -> String {
  raw
    .split('\n')
    .map(|line| line.trim_matches(['\r', ' ', '\t']))
    .collect::<Vec<_>>()
    .join(" ")
    .trim()
    .to_string()
}

/* ---------------------------------------------------------------- */
/// Build a derived component from an id and the pre-extracted raw values
pub(super) fn build_derived_component(
  id: &MessageComponentId,
  field_values: &[String],
) -> MsgSigResult<MessageComponent> {
  let MessageComponentName::Derived(derived_id) = &id.name else {
    return Err(MsgSigError::InvalidComponent(
      "invalid message component name as derived component".to_string(),
    ));
  };
  // `req` and `name` are the only params a derived component accepts
  if !id
    .params
    .0
    .iter()
    .all(|p| matches!(p, MessageComponentParam::Req | MessageComponentParam::Name(_)))
  {
    return Err(MsgSigError::InvalidComponent(
      "invalid parameter for derived component".to_string(),
    ));
  }

  let values = match derived_id {
    DerivedComponentName::Method => vec![first_value(derived_id, field_values)?.to_ascii_uppercase()],
    DerivedComponentName::TargetUri => vec![first_value(derived_id, field_values)?.to_string()],
    DerivedComponentName::Authority => vec![first_value(derived_id, field_values)?.to_ascii_lowercase()],
    DerivedComponentName::Scheme => vec![first_value(derived_id, field_values)?.to_ascii_lowercase()],
    DerivedComponentName::RequestTarget => vec![first_value(derived_id, field_values)?.to_string()],
    DerivedComponentName::Path => vec![first_value(derived_id, field_values)?.to_string()],
    DerivedComponentName::Query => vec![first_value(derived_id, field_values)?.to_string()],
    DerivedComponentName::Status => vec![first_value(derived_id, field_values)?.to_string()],
    DerivedComponentName::Created | DerivedComponentName::Expires => {
      vec![first_value(derived_id, field_values)?.to_string()]
    }
    DerivedComponentName::QueryParam => {
      let name = id.params.0.iter().find_map(|p| match p {
        MessageComponentParam::Name(name) => Some(name),
        _ => None,
      });
      let Some(name) = name else {
        return Err(MsgSigError::InvalidComponentParam(
          "@query-param requires the `name` parameter".to_string(),
        ));
      };
      // field_values are the raw `&`-separated query segments; values stay percent-encoded
      let kvs = field_values
        .iter()
        .map(|v| v.split_once('=').unwrap_or((v.as_str(), "")))
        .filter(|(k, _)| *k == name.as_str())
        .map(|(_, v)| v.to_string())
        .collect::<Vec<_>>();
      if kvs.is_empty() {
        return Err(MsgSigError::MissingComponent(format!(
          "query parameter not found: {name}"
        )));
      }
      kvs
    }
    DerivedComponentName::SignatureParams => {
      return Err(MsgSigError::InvalidComponent(
        "@signature-params cannot be resolved as a covered component".to_string(),
      ));
    }
  };
  Ok(MessageComponent { id: id.clone(), values })
}

fn first_value<'a>(derived_id: &DerivedComponentName, field_values: &'a [String]) -> MsgSigResult<&'a str> {
  field_values
    .first()
    .map(|v| v.as_str())
    .ok_or(MsgSigError::MissingComponent(format!(
      "derived component requires a value: {derived_id}"
    )))
}

/* ---------------------------------------------------------------- */
/// Build an http field component from an id and its raw field values.
/// NOTE: with the `req` param the raw values must come from the bound request.
pub(super) fn build_http_field_component(
  id: &MessageComponentId,
  field_values: &[String],
) -> MsgSigResult<MessageComponent> {
  let field_values = field_values.iter().map(|v| canonicalize_field_value(v)).collect::<Vec<_>>();
  let params = &id.params;

  let has_sf = params.0.contains(&MessageComponentParam::Sf);
  let has_bs = params.0.contains(&MessageComponentParam::Bs);
  let key = params.0.iter().find_map(|p| match p {
    MessageComponentParam::Key(k) => Some(k.as_str()),
    _ => None,
  });

  // id parsing already rejects bs+sf/key, but ids can also be built programmatically
  if has_bs && (has_sf || key.is_some()) {
    return Err(MsgSigError::InvalidComponentParam(
      "`bs` cannot be combined with `sf` or `key`".to_string(),
    ));
  }

  let value = if let Some(key) = key {
    handle_params_key(&field_values, key)?
  } else if has_sf {
    handle_params_sf(&field_values)?
  } else if has_bs {
    handle_params_bs(&field_values)?
  } else {
    field_values.join(", ")
  };

  Ok(MessageComponent {
    id: id.clone(),
    values: vec![value],
  })
}

/* ---------------------------------------------------------------- */
#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_serialized_line_derived() {
    let tuples = vec![
      ("\"@method\"", "POST", DerivedComponentName::Method),
      ("\"@target-uri\"", "https://example.com/", DerivedComponentName::TargetUri),
      ("\"@authority\"", "example.com", DerivedComponentName::Authority),
      ("\"@scheme\"", "https", DerivedComponentName::Scheme),
      ("\"@request-target\"", "/path?query", DerivedComponentName::RequestTarget),
      ("\"@path\"", "/path", DerivedComponentName::Path),
      ("\"@query\"", "?query", DerivedComponentName::Query),
      ("\"@query-param\";name=\"key\"", "value", DerivedComponentName::QueryParam),
      ("\"@status\"", "200", DerivedComponentName::Status),
    ];
    for (id, value, name) in tuples {
      let comp = MessageComponent::try_from(format!("{}: {}", id, value).as_ref()).unwrap();
      assert_eq!(comp.id.name, MessageComponentName::Derived(name));
      assert_eq!(comp.values, vec![value.to_string()]);
      assert_eq!(comp.to_string(), format!("{}: {}", id, value));
    }
  }

  #[test]
  fn from_serialized_line_http_field() {
    let tuples = vec![
      ("\"example-header\"", "example-value", "example-header"),
      ("\"example-header\";bs", "example-value", "example-header"),
      ("\"x-empty-header\"", "", "x-empty-header"),
    ];
    for (id, value, inner_name) in tuples {
      let comp = MessageComponent::try_from(format!("{}: {}", id, value).as_ref()).unwrap();
      assert_eq!(comp.id.name, MessageComponentName::HttpField(inner_name.to_string()));
      assert_eq!(comp.to_string(), format!("{}: {}", id, value));
    }
  }

  #[test]
  fn canonicalization_strips_ows_and_folds() {
    assert_eq!(canonicalize_field_value("  value \t"), "value");
    assert_eq!(canonicalize_field_value("line1\r\n\t line2"), "line1 line2");
    assert_eq!(
      canonicalize_field_value("one\n  two\n three"),
      "one two three"
    );
  }

  #[test]
  fn build_http_field_component_basic() {
    let id = MessageComponentId::try_from("content-type").unwrap();
    let field_values = vec!["application/json".to_owned()];
    let component = build_http_field_component(&id, &field_values).unwrap();
    assert_eq!(component.to_string(), "\"content-type\": application/json");
  }

  #[test]
  fn build_http_field_component_multiple_values() {
    let id = MessageComponentId::try_from("\"content-type\"").unwrap();
    let field_values = vec!["application/json".to_owned(), "application/json-patch+json".to_owned()];
    let component = build_http_field_component(&id, &field_values).unwrap();
    assert_eq!(
      component.to_string(),
      "\"content-type\": application/json, application/json-patch+json"
    );
  }

  #[test]
  fn build_http_field_component_sf() {
    let id = MessageComponentId::try_from("\"content-type\";sf").unwrap();
    let field_values = vec![
      "application/json; patched=true".to_owned(),
      "application/json-patch+json;patched".to_owned(),
    ];
    let component = build_http_field_component(&id, &field_values).unwrap();
    assert_eq!(
      component.to_string(),
      "\"content-type\";sf: application/json;patched=true, application/json-patch+json;patched"
    );
  }

  #[test]
  fn build_http_field_component_key() {
    let id = MessageComponentId::try_from("\"example-header\";key=\"patched\"").unwrap();
    let field_values = vec!["patched=12345678".to_owned()];
    let component = build_http_field_component(&id, &field_values).unwrap();
    assert_eq!(component.to_string(), "\"example-header\";key=\"patched\": 12345678");
  }

  #[test]
  fn build_http_field_component_bs() {
    let id = MessageComponentId::try_from("\"example-header\";bs").unwrap();
    let field_values = vec!["value, with, lots".to_owned(), "of, commas".to_owned()];
    let component = build_http_field_component(&id, &field_values).unwrap();
    assert_eq!(
      component.to_string(),
      "\"example-header\";bs: :dmFsdWUsIHdpdGgsIGxvdHM=:, :b2YsIGNvbW1hcw==:"
    );
  }

  #[test]
  fn build_derived_component_basic() {
    let id = MessageComponentId::try_from("@method").unwrap();
    let component = build_derived_component(&id, &["get".to_owned()]).unwrap();
    assert_eq!(component.to_string(), "\"@method\": GET");

    let id = MessageComponentId::try_from("@authority").unwrap();
    let component = build_derived_component(&id, &["EXAMPLE.com".to_owned()]).unwrap();
    assert_eq!(component.to_string(), "\"@authority\": example.com");
  }

  #[test]
  fn build_derived_component_query_param() {
    let id = MessageComponentId::try_from("\"@query-param\";name=\"var\"").unwrap();
    let query = "var=this%20is%20a%20big%0Amultiline%20value&bar=with+plus+whitespace&fa%C3%A7ade%22%3A%20=something&ok";
    let field_values = query.split('&').map(|v| v.to_owned()).collect::<Vec<_>>();
    let component = build_derived_component(&id, &field_values).unwrap();
    assert_eq!(
      component.to_string(),
      "\"@query-param\";name=\"var\": this%20is%20a%20big%0Amultiline%20value"
    );
  }

  #[test]
  fn build_derived_component_query_param_multiple_occurrences() {
    let id = MessageComponentId::try_from("\"@query-param\";name=\"id\"").unwrap();
    let field_values = vec!["id=1".to_owned(), "name=x".to_owned(), "id=2".to_owned()];
    let component = build_derived_component(&id, &field_values).unwrap();
    assert_eq!(component.values, vec!["1".to_string(), "2".to_string()]);
    assert_eq!(
      component.to_string(),
      "\"@query-param\";name=\"id\": 1\n\"@query-param\";name=\"id\": 2"
    );
  }

  #[test]
  fn build_derived_component_query_param_missing() {
    let id = MessageComponentId::try_from("\"@query-param\";name=\"nope\"").unwrap();
    let res = build_derived_component(&id, &["var=1".to_owned()]);
    assert!(matches!(res, Err(MsgSigError::MissingComponent(_))));
  }

  #[test]
  fn cavage_line_rendering() {
    let comp = MessageComponent::try_from("\"@request-target\": post /foo").unwrap();
    assert_eq!(comp.cavage_lines(), vec!["(request-target): post /foo".to_string()]);

    let comp = MessageComponent::try_from("\"content-length\": 18").unwrap();
    assert_eq!(comp.cavage_lines(), vec!["content-length: 18".to_string()]);
  }
}
