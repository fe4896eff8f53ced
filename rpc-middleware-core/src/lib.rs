//! Core status types for rpc-middleware.
//!
//! This crate provides the types shared by every interceptor in
//! `rpc-middleware-client`.
//!
//! ## Contents
//!
//! - Status codes ([`Code`]), the [`Status`] error type and its JSON body ([`ErrorBody`])

mod error;

pub use error::*;
