//! Incremental OpenStreetMap XML parsing.
//!
//! Bytes flow through three stages, each pulled lazily by the one after it:
//!
//! 1. a byte source yields chunks ([`source`]),
//! 2. the XML event decoder turns chunks into [`XmlEvent`]s ([`xml`]),
//! 3. the OSM mapper turns events into [`OsmData`] records ([`osm`]).
//!
//! A chunk is only requested once the events of the previous one have been
//! consumed, so memory use does not grow with the document. Every stage stops
//! at the first error and releases its source.
//!
//! ```no_run
//! use osm_xml_stream::{parse_file, OsmData, DEFAULT_CHUNK_SIZE};
//!
//! for record in parse_file("hamburg.osm.xz", DEFAULT_CHUNK_SIZE)? {
//!     if let OsmData::Way(way) = record? {
//!         println!("way with {} nodes", way.nds().len());
//!     }
//! }
//! # Ok::<(), osm_xml_stream::Error>(())
//! ```

pub mod data;
pub mod errors;
pub mod osm;
pub mod source;
pub mod xml;

use std::io::{self, Read};
use std::path::Path;

use bytes::Buf;
use futures::Stream;

pub use crate::data::{
    Bounds, Element, ElementMetadata, Member, MemberType, Node, OsmData, OsmId, OsmMetadata,
    Point, Relation, StartElement, Tags, Way, XmlEvent,
};
pub use crate::errors::{Error, ErrorKind, GrammarError, Result, ValidationError};
pub use crate::osm::{map, map_stream, OsmDataIter, OsmMapper, ParserState};
pub use crate::source::{open_file, open_file_stream, ReadChunks, DEFAULT_CHUNK_SIZE};
pub use crate::xml::{decode, decode_stream, CoalesceTextExt, XmlEventDecoder};

/// Records of an OSM document delivered as a sequence of byte chunks.
pub fn parse<I, B>(chunks: I) -> OsmDataIter<XmlEventDecoder<I::IntoIter, B>>
where
    I: IntoIterator<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    map(decode(chunks))
}

pub type FileRecords = OsmDataIter<XmlEventDecoder<ReadChunks<Box<dyn Read + Send>>, Vec<u8>>>;

/// Records of an OSM file, read `chunk_size` bytes at a time. `.xz` files are
/// decompressed.
pub fn parse_file(path: impl AsRef<Path>, chunk_size: usize) -> Result<FileRecords> {
    let path = path.as_ref();
    let chunks = open_file(path, chunk_size)?;
    Ok(map(decode(chunks).with_system_id(path.display().to_string())))
}

/// Async counterpart of [`parse`].
pub fn parse_stream<S, B>(chunks: S) -> impl Stream<Item = Result<OsmData>>
where
    S: Stream<Item = io::Result<B>> + Unpin,
    B: Buf + Unpin,
{
    map_stream(decode_stream(chunks))
}

/// Async counterpart of [`parse_file`] for uncompressed files.
pub async fn parse_file_stream(
    path: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<impl Stream<Item = Result<OsmData>>> {
    let path = path.as_ref();
    let chunks = open_file_stream(path, chunk_size).await?;
    let events = xml::decode_stream_with_system_id(chunks, path.display().to_string());
    Ok(map_stream(events))
}
