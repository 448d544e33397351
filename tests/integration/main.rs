//! Integration tests for odata-harvest
//!
//! Controller scenarios run against scripted transports and authenticators;
//! the end-to-end tests use wiremock with the real reqwest transport.

mod crawl_tests;
mod end_to_end_tests;
mod records_tests;
mod resume_tests;
mod storage_failure_tests;
mod support;
