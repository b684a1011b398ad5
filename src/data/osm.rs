use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::{GrammarError, ValidationError};

pub type OsmId = i64;

/// Free-form key/value pairs attached to an element.
pub type Tags = HashMap<String, String>;

pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

pub const MAX_NODES_IN_WAY: usize = 2000;
pub const MIN_NODES_IN_WAY: usize = 2;

/// A WGS84 position. Latitude is in [-90, 90] degrees, positive north of the
/// equator; longitude in [-180, 180], positive east of Greenwich.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    lat: f64,
    lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        // NaN fails both range checks.
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(ValidationError::LongitudeOutOfRange(lon));
        }
        Ok(Point { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

/// Bounding box declared for the area a document covers. Ordering of the two
/// corners is whatever the document says.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_point: Point,
    pub max_point: Point,
}

/// Attributes shared by nodes, ways and relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementMetadata {
    pub id: OsmId,
    /// Display name of the user who last changed the element.
    pub user: Option<String>,
    pub uid: i64,
    pub timestamp: DateTime<Utc>,
    /// False once the element has been deleted.
    pub visible: bool,
    pub version: i64,
    pub changeset: i64,
}

/// Common view over [`Node`], [`Way`] and [`Relation`].
pub trait Element {
    fn metadata(&self) -> &ElementMetadata;
    fn tags(&self) -> &Tags;

    fn id(&self) -> OsmId {
        self.metadata().id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub metadata: ElementMetadata,
    pub tags: Tags,
    pub point: Point,
}

/// An ordered list of node references. Ways with fewer than two references are
/// accepted but reported as faulty; more than [`MAX_NODES_IN_WAY`] are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Way {
    metadata: ElementMetadata,
    pub(crate) tags: Tags,
    nds: Vec<OsmId>,
}

impl Way {
    pub fn new(
        metadata: ElementMetadata,
        tags: Tags,
        nds: Vec<OsmId>,
    ) -> Result<Self, ValidationError> {
        if nds.len() > MAX_NODES_IN_WAY {
            return Err(ValidationError::TooManyNodes {
                count: nds.len(),
                limit: MAX_NODES_IN_WAY,
            });
        }
        Ok(Way { metadata, tags, nds })
    }

    pub fn nds(&self) -> &[OsmId] {
        &self.nds
    }

    pub fn is_faulty(&self) -> bool {
        self.nds.len() < MIN_NODES_IN_WAY
    }

    /// A faulty way is never closed.
    pub fn is_closed(&self) -> bool {
        !self.is_faulty() && self.nds.first() == self.nds.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::Node => "node",
            MemberType::Way => "way",
            MemberType::Relation => "relation",
        }
    }
}

impl FromStr for MemberType {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(MemberType::Node),
            "way" => Ok(MemberType::Way),
            "relation" => Ok(MemberType::Relation),
            other => Err(GrammarError::UnknownMemberType {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference from a relation to another element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub member_type: MemberType,
    pub id: OsmId,
    pub role: Option<String>,
}

impl Member {
    /// Blank roles are stored as `None`.
    pub fn new(member_type: MemberType, id: OsmId, role: Option<String>) -> Self {
        Member {
            member_type,
            id,
            role: role.filter(|role| !role.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relation {
    pub metadata: ElementMetadata,
    pub tags: Tags,
    pub members: Vec<Member>,
}

/// Document level information, emitted once when the `bounds` element is read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsmMetadata {
    /// OSM API version.
    pub version: Option<String>,
    pub generator: Option<String>,
    pub bounds: Option<Bounds>,
}

/// A record produced while reading an OSM XML document.
///
/// Metadata comes first when the document declares bounds; elements follow in
/// the order their closing tags appear.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OsmData {
    Metadata(OsmMetadata),
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl OsmData {
    pub fn kind(&self) -> &'static str {
        match self {
            OsmData::Metadata(_) => "metadata",
            OsmData::Node(_) => "node",
            OsmData::Way(_) => "way",
            OsmData::Relation(_) => "relation",
        }
    }

    pub fn element(&self) -> Option<&dyn Element> {
        match self {
            OsmData::Metadata(_) => None,
            OsmData::Node(node) => Some(node),
            OsmData::Way(way) => Some(way),
            OsmData::Relation(relation) => Some(relation),
        }
    }
}

impl Element for Node {
    fn metadata(&self) -> &ElementMetadata {
        &self.metadata
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }
}

impl Element for Way {
    fn metadata(&self) -> &ElementMetadata {
        &self.metadata
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }
}

impl Element for Relation {
    fn metadata(&self) -> &ElementMetadata {
        &self.metadata
    }

    fn tags(&self) -> &Tags {
        &self.tags
    }
}
