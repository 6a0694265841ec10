//! Data models for the Lectern blog engine.
//!
//! Field names map 1:1 to storage columns; JSON uses camelCase.

mod comment;
mod message;
mod post;
mod tag;

pub use comment::*;
pub use message::*;
pub use post::*;
pub use tag::*;
