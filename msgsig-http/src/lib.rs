//! # msgsig-http
//!
//! `msgsig-http` signs and verifies HTTP message signatures on `http` crate
//! requests and responses, in both wire dialects: the structured-field dialect of
//! RFC 9421 (`Signature` + `Signature-Input`) and the legacy cavage dialect
//! (a single comma-separated `Signature` header).
//!
//! Signing is driven by a [`SignConfig`] (key, dialect, covered components,
//! parameter selection and overrides); verification by a [`VerifyConfig`]
//! (key lookup, expiry window, coverage requirements, `all` mode).
//!
//! ## Async-first design
//!
//! The primary API is async: key lookup and the crypto callables are the only
//! suspension points, and multiple signature labels are verified sequentially in
//! `Signature-Input` order.
//!
//! ## Blocking API
//!
//! With the `blocking` feature (on by default), synchronous wrappers are provided
//! via `sign_message_sync` / `verify_message_sync`. These use
//! `futures::executor::block_on` internally and are intended **exclusively for
//! non-async contexts**.
//!
//! # Panics
//!
//! Calling any `*_sync` method from within an async runtime (e.g. inside a
//! `tokio::spawn` task) will panic. If you are already in an async context, use
//! the async methods directly.

mod config;
mod error;
mod message_signature;
mod resolve;
mod sign;
mod verify;

pub use config::{ComponentParser, KeyLookup, SignConfig, VerifyConfig};
pub use error::{SigHttpError, SigHttpResult};
pub use message_signature::{KeyId, RequestSignature, ResponseSignature, SignatureName};
pub use msgsig::prelude;
