//! `mail2matrix`: turn an email piped from an MTA into a Matrix room message.
//!
//! The library holds the whole email-to-message pipeline: MIME extraction,
//! HTML sanitizing, template rendering and skip filtering, plus a small
//! Matrix client for delivery.

pub mod config;
pub mod deliver;
pub mod error;
pub mod filter;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
