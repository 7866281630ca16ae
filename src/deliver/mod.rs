//! Delivery of rendered messages to a chat room.

pub mod matrix;

pub use matrix::{login, MatrixClient};

use crate::error::Result;

/// Something that can post a plain-text message into a room.
pub trait Deliver {
    fn send(&self, room: &str, message: &str) -> Result<()>;
}

impl<D: Deliver + ?Sized> Deliver for &D {
    fn send(&self, room: &str, message: &str) -> Result<()> {
        (**self).send(room, message)
    }
}
