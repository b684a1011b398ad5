//! XML event decoding on top of quick-xml.
//!
//! quick-xml pulls bytes through a buffered reader; [`decoder::ChunkReader`]
//! (and tokio-util's `StreamReader` for async sources) feed it one byte chunk
//! at a time, so a document never has to be in memory at once and chunk
//! boundaries are invisible to the tokenizer.

pub mod coalesce;
pub mod decoder;
pub mod stream;
mod translate;

pub use self::coalesce::{CoalesceText, CoalesceTextExt};
pub use self::decoder::{decode, ChunkReader, XmlEventDecoder};
pub use self::stream::{decode_stream, decode_stream_with_system_id};
