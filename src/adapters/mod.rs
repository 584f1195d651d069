//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`ReqwestSessionFactory`] - opens a reqwest client per peer configuration
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockHttpClient`] - Configurable HTTP responses and event streams
//! - [`mock::MockSessionFactory`] - Session factory over a shared mock client

pub mod mock;
pub mod reqwest_http;

pub use mock::{MockHttpClient, MockSessionFactory};
pub use reqwest_http::{ReqwestHttpClient, ReqwestSessionFactory};
