//! Core data model types: MIME classification results and the extracted message.

pub mod content_type;
pub mod message;
