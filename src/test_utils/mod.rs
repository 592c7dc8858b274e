//! Fakes and fixtures for tests of code built on this crate.

pub mod attestation;
pub mod employees;
pub mod entropy;
