//! RSS 2.0 documents with the iTunes podcast extensions.

pub mod model;
pub mod writer;

pub use model::{Channel, Enclosure, Feed, Guid, Image, Item, itunes_duration};
