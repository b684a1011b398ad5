//! Mapping of XML events onto OSM records.

mod attributes;
pub mod mapper;
pub mod state;

pub use self::mapper::{map, map_stream, OsmDataIter, OsmMapper};
pub use self::state::{ParserState, TagOwner, Transition};
