use crate::error::{MsgSigError, MsgSigResult};
use sfv::{Parser, SerializeValue};

/// Check duplicate elements in a vector
pub(crate) fn has_unique_elements<T>(iter: T) -> bool
where
  T: IntoIterator,
  T::Item: Eq + std::hash::Hash,
{
  let mut uniq = rustc_hash::FxHashSet::default();
  iter.into_iter().all(move |x| uniq.insert(x))
}

/// Combine multiple raw field values of a single header into the value that is
/// parsed or emitted on the wire. Joining happens before any structured-field parsing.
pub fn combine_field_values(values: &[String]) -> String {
  values.join(", ")
}

/// Parse a string as a structured-field dictionary
pub fn parse_dictionary(value: &str) -> MsgSigResult<sfv::Dictionary> {
  Parser::parse_dictionary(value.as_bytes()).map_err(|e| MsgSigError::ParseSfvError(e.to_string()))
}

/// Parse a string as a structured-field list
pub fn parse_list(value: &str) -> MsgSigResult<sfv::List> {
  Parser::parse_list(value.as_bytes()).map_err(|e| MsgSigError::ParseSfvError(e.to_string()))
}

/// Parse a string as a structured-field item
pub fn parse_item(value: &str) -> MsgSigResult<sfv::Item> {
  Parser::parse_item(value.as_bytes()).map_err(|e| MsgSigError::ParseSfvError(e.to_string()))
}

/// Serialize any structured-field value, folding the sfv error into ours.
/// Values built by this crate always serialize.
pub(crate) fn serialize_sfv<V: SerializeValue>(value: &V) -> MsgSigResult<String> {
  value.serialize_value().map_err(|e| MsgSigError::ParseSfvError(e.to_string()))
}

/// Re-serialize a combined field value as a canonical structured field.
/// Without a field-type registry the value is tried as a list, then a dictionary,
/// then a bare item.
pub(crate) fn reserialize_structured(combined: &str) -> MsgSigResult<String> {
  if let Ok(list) = Parser::parse_list(combined.as_bytes()) {
    return serialize_sfv(&list);
  }
  if let Ok(dict) = Parser::parse_dictionary(combined.as_bytes()) {
    return serialize_sfv(&dict);
  }
  if let Ok(item) = Parser::parse_item(combined.as_bytes()) {
    return serialize_sfv(&item);
  }
  Err(MsgSigError::InvalidComponentParam(format!(
    "Value is not a structured field: {combined}"
  )))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unique_elements() {
    assert!(has_unique_elements(["a", "b", "c"]));
    assert!(!has_unique_elements(["a", "b", "a"]));
  }

  #[test]
  fn sfv_round_trip() {
    // Parsing structured field value of Item type.
    let item_header_input = "12.445;foo=bar";
    let item = parse_item(item_header_input).unwrap();
    assert_eq!(serialize_sfv(&item).unwrap(), item_header_input);

    // Parsing structured field value of List type.
    let list_header_input = "  1; a=tok, (\"foo\"   \"bar\" );baz, (  )";
    let list = parse_list(list_header_input).unwrap();
    assert_eq!(serialize_sfv(&list).unwrap(), "1;a=tok, (\"foo\" \"bar\");baz, ()");

    // Parsing structured field value of Dictionary type.
    let dict_header_input = "a=?0, b, c; foo=bar, rating=1.5, fruits=(apple pear), d";
    let dict = parse_dictionary(dict_header_input).unwrap();
    assert_eq!(
      serialize_sfv(&dict).unwrap(),
      "a=?0, b, c;foo=bar, rating=1.5, fruits=(apple pear), d"
    );
  }

  #[test]
  fn combine_before_parse() {
    let values = vec!["a=1".to_owned(), "b=2, c=3".to_owned()];
    let combined = combine_field_values(&values);
    assert_eq!(combined, "a=1, b=2, c=3");
    assert!(parse_dictionary(&combined).is_ok());
  }
}
