//! Mock implementations for testing.
//!
//! Test doubles for the transport seams, so connection and stream behavior
//! can be exercised without a live peer.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses and streams
//! - [`MockSessionFactory`] - hands the same mock client to every session

pub mod http;

pub use http::{MockHttpClient, MockResponse, MockSessionFactory, RecordedRequest};
