//! Common utilities and types shared across Token Guard components.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (unverified decoding, size limits, constants)
pub mod jwt;
