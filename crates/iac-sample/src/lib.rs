//! # IaC Sample Library
//!
//! A small program against `iac_framework`, with an in-process engine to run it on.
//! The modules are public for integration testing.

pub mod engine;
pub mod lifecycle;
pub mod model;
