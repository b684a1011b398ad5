//! Value types flowing through the pipeline: XML events in, OSM records out.

pub mod osm;
pub mod xml;

pub use self::osm::{
    Bounds, Element, ElementMetadata, Member, MemberType, Node, OsmData, OsmId, OsmMetadata,
    Point, Relation, Tags, Way,
};
pub use self::xml::{StartElement, XmlEvent};
