//! Email parsing: framing, content classification, part selection and HTML sanitizing.

pub mod content_type;
pub mod header;
pub mod html;
pub mod mime;
