use crate::{
  config::ComponentParser,
  error::{SigHttpError, SigHttpResult},
};
use http::{HeaderMap, Request, Response};
use msgsig::prelude::{
  message_component::{DerivedComponentName, MessageComponent, MessageComponentId, MessageComponentName},
  Dialect, SignatureBase, SignatureParams,
};

/* --------------------------------------- */
/// A view over either an http request or response
pub(crate) enum RequestOrResponse<'a, B> {
  Request(&'a Request<B>),
  Response(&'a Response<B>),
}

impl<B> RequestOrResponse<'_, B> {
  fn method(&self) -> SigHttpResult<&http::Method> {
    match self {
      RequestOrResponse::Request(req) => Ok(req.method()),
      _ => Err(SigHttpError::InvalidComponentName(
        "request-only derived component on a response without `req`".to_string(),
      )),
    }
  }

  fn uri(&self) -> SigHttpResult<&http::Uri> {
    match self {
      RequestOrResponse::Request(req) => Ok(req.uri()),
      _ => Err(SigHttpError::InvalidComponentName(
        "request-only derived component on a response without `req`".to_string(),
      )),
    }
  }

  fn status(&self) -> SigHttpResult<http::StatusCode> {
    match self {
      RequestOrResponse::Response(res) => Ok(res.status()),
      _ => Err(SigHttpError::InvalidComponentName(
        "`@status` is only for responses".to_string(),
      )),
    }
  }

  pub(crate) fn headers(&self) -> &HeaderMap {
    match self {
      RequestOrResponse::Request(req) => req.headers(),
      RequestOrResponse::Response(res) => res.headers(),
    }
  }
}

/* --------------------------------------- */
/// Build the signature base for a message from its signature params.
/// - `req_for_param`: the bound request consulted by `req`-flagged components of a response
/// - `component_parser`: optional resolution override hook
pub(crate) fn build_signature_base<B, B2>(
  req_or_res: &RequestOrResponse<'_, B>,
  signature_params: &SignatureParams,
  req_for_param: Option<&Request<B2>>,
  dialect: Dialect,
  component_parser: Option<&ComponentParser>,
) -> SigHttpResult<SignatureBase> {
  let component_lines = signature_params
    .covered_components
    .iter()
    .filter(|component_id| {
      !matches!(
        component_id.name,
        MessageComponentName::Derived(DerivedComponentName::SignatureParams)
      )
    })
    .map(|component_id| {
      if let Some(parser) = component_parser {
        if let Some(values) = parser(component_id)? {
          return MessageComponent::try_from((component_id, values.as_slice())).map_err(SigHttpError::from);
        }
      }
      if matches!(
        component_id.name,
        MessageComponentName::Derived(DerivedComponentName::Created | DerivedComponentName::Expires)
      ) {
        return build_params_bound_component(component_id, signature_params, dialect);
      }
      if component_id.is_req_bound() {
        if matches!(req_or_res, RequestOrResponse::Request(_)) {
          return Err(SigHttpError::InvalidComponentParam(
            "`req` is not allowed in a request".to_string(),
          ));
        }
        let Some(req) = req_for_param else {
          return Err(SigHttpError::InvalidComponentParam(
            "`req` requires the bound request".to_string(),
          ));
        };
        let req = RequestOrResponse::Request(req);
        extract_message_component(&req, component_id, dialect)
      } else {
        extract_message_component(req_or_res, component_id, dialect)
      }
    })
    .collect::<Result<Vec<_>, _>>()?;

  SignatureBase::try_new(&component_lines, signature_params).map_err(|e| e.into())
}

/// `@created` / `@expires` cover signature parameters, not message content.
/// They only exist in the cavage dialect.
fn build_params_bound_component(
  id: &MessageComponentId,
  signature_params: &SignatureParams,
  dialect: Dialect,
) -> SigHttpResult<MessageComponent> {
  if dialect != Dialect::Cavage {
    return Err(SigHttpError::InvalidComponentName(format!(
      "{id} is only valid in the cavage dialect"
    )));
  }
  let value = match id.name {
    MessageComponentName::Derived(DerivedComponentName::Created) => signature_params.created(),
    _ => signature_params.expires(),
  };
  let Some(value) = value else {
    return Err(SigHttpError::MsgSigError(msgsig::prelude::MsgSigError::MissingComponent(
      format!("{id} covered but the signature parameter is absent"),
    )));
  };
  Ok(MessageComponent {
    id: id.clone(),
    values: vec![value.to_string()],
  })
}

/* --------------------------------------- */
/// Extract raw http field values for a component id
fn extract_http_field<B>(req_or_res: &RequestOrResponse<'_, B>, id: &MessageComponentId) -> SigHttpResult<MessageComponent> {
  let MessageComponentName::HttpField(header_name) = &id.name else {
    return Err(SigHttpError::InvalidComponentName(
      "invalid message component name as http field".to_string(),
    ));
  };

  let values = req_or_res.headers().get_all(header_name);
  let field_values = values
    .iter()
    .map(|v| v.to_str().map(|s| s.to_owned()))
    .collect::<Result<Vec<_>, _>>()?;
  if field_values.is_empty() {
    return Err(SigHttpError::MsgSigError(msgsig::prelude::MsgSigError::MissingComponent(
      format!("header not present in the message: {header_name}"),
    )));
  }

  MessageComponent::try_from((id, field_values.as_slice())).map_err(|e| e.into())
}

/// Extract the raw value(s) feeding a derived component
fn extract_derived_component<B>(
  req_or_res: &RequestOrResponse<'_, B>,
  id: &MessageComponentId,
  dialect: Dialect,
) -> SigHttpResult<MessageComponent> {
  let MessageComponentName::Derived(derived_id) = &id.name else {
    return Err(SigHttpError::InvalidComponentName(
      "invalid message component name as derived component".to_string(),
    ));
  };

  let field_values: Vec<String> = match derived_id {
    DerivedComponentName::Method => vec![req_or_res.method()?.as_str().to_string()],
    DerivedComponentName::TargetUri => vec![req_or_res.uri()?.to_string()],
    DerivedComponentName::Authority => vec![authority_value(req_or_res.uri()?)?],
    DerivedComponentName::Scheme => vec![req_or_res
      .uri()?
      .scheme_str()
      .map(|s| s.to_string())
      .ok_or(SigHttpError::InvalidComponentName(
        "uri carries no scheme".to_string(),
      ))?],
    DerivedComponentName::RequestTarget => {
      let target = request_target_value(req_or_res)?;
      match dialect {
        // the legacy signing string covers the lowercased method as well
        Dialect::Cavage => vec![format!(
          "{} {}",
          req_or_res.method()?.as_str().to_ascii_lowercase(),
          target
        )],
        Dialect::Httpbis => vec![target],
      }
    }
    DerivedComponentName::Path => vec![{
      let p = req_or_res.uri()?.path();
      if p.is_empty() {
        "/".to_string()
      } else {
        p.to_string()
      }
    }],
    DerivedComponentName::Query => vec![req_or_res.uri()?.query().map(|v| format!("?{v}")).unwrap_or("?".to_string())],
    DerivedComponentName::QueryParam => {
      let query = req_or_res.uri()?.query().unwrap_or("");
      query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
    }
    DerivedComponentName::Status => vec![req_or_res.status()?.as_str().to_string()],
    DerivedComponentName::SignatureParams | DerivedComponentName::Created | DerivedComponentName::Expires => {
      return Err(SigHttpError::InvalidComponentName(format!(
        "{derived_id} does not resolve against the message"
      )));
    }
  };

  MessageComponent::try_from((id, field_values.as_slice())).map_err(|e| e.into())
}

/// Lowercased host with the port elided when it is the default for the scheme
fn authority_value(uri: &http::Uri) -> SigHttpResult<String> {
  let authority = uri
    .authority()
    .ok_or(SigHttpError::InvalidComponentName("uri carries no authority".to_string()))?;
  let host = authority.host().to_ascii_lowercase();
  let value = match (authority.port_u16(), uri.scheme_str()) {
    (None, _) => host,
    (Some(80), Some("http")) => host,
    (Some(443), Some("https")) => host,
    (Some(port), _) => format!("{host}:{port}"),
  };
  Ok(value)
}

/// Path-and-query as it would appear on the request line.
/// Signing this on the sender side is unreliable: intermediaries may rewrite the
/// request line without touching the url the application supplied.
fn request_target_value<B>(req_or_res: &RequestOrResponse<'_, B>) -> SigHttpResult<String> {
  let uri = req_or_res.uri()?;
  let target = match *req_or_res.method()? {
    http::Method::CONNECT => uri.authority().map(|s| s.to_string()).unwrap_or_default(),
    http::Method::OPTIONS => "*".to_string(),
    _ => uri.path_and_query().map(|s| s.to_string()).unwrap_or("/".to_string()),
  };
  Ok(target)
}

/* --------------------------------------- */
/// Extract a message component of either kind from the message
pub(crate) fn extract_message_component<B>(
  req_or_res: &RequestOrResponse<'_, B>,
  target_component_id: &MessageComponentId,
  dialect: Dialect,
) -> SigHttpResult<MessageComponent> {
  match &target_component_id.name {
    MessageComponentName::HttpField(_) => extract_http_field(req_or_res, target_component_id),
    MessageComponentName::Derived(_) => extract_derived_component(req_or_res, target_component_id, dialect),
  }
}

/* --------------------------------------- */
