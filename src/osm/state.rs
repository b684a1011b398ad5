//! The OSM grammar as a pure transducer over XML events.
//!
//! Every state is a value. Child states (`ReadingTags`, `ReadingNds`,
//! `ReadingMembers`) own the element their parent state is building; when the
//! child sees the event that ends it, it rebuilds the parent state around the
//! collected data and hands the same event to the parent's transition, so the
//! event is consumed exactly once.

use crate::data::osm::{
    Bounds, ElementMetadata, Member, MemberType, Node, OsmData, OsmId, OsmMetadata, Point,
    Relation, Tags, Way, MAX_NODES_IN_WAY,
};
use crate::data::xml::{StartElement, XmlEvent};
use crate::errors::{Error, GrammarError, Result, ValidationError};

use super::attributes::{read_element_metadata, read_point, required, required_parsed};

const READING_OSM_METADATA: &str = "reading osm metadata";
const READING_BOUNDS: &str = "reading bounds";
const READING_NODES: &str = "reading nodes";
const READING_TAGS: &str = "reading tags";
const READING_WAYS: &str = "reading ways";
const READING_NDS: &str = "reading way node references";
const READING_RELATIONS: &str = "reading relations";
const READING_MEMBERS: &str = "reading relation members";
const FINISHED: &str = "finished";

/// Next state plus the record completed by the transition, if any.
pub type Transition = (ParserState, Option<OsmData>);

#[derive(Debug, Clone, PartialEq)]
pub struct PendingNode {
    metadata: ElementMetadata,
    point: Point,
    tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingWay {
    metadata: ElementMetadata,
    nds: Vec<OsmId>,
    tags: Tags,
}

impl PendingWay {
    fn accept_nd_refs(mut self, nds: Vec<OsmId>) -> Self {
        self.nds = nds;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRelation {
    metadata: ElementMetadata,
    members: Vec<Member>,
    tags: Tags,
}

impl PendingRelation {
    fn accept_members(mut self, members: Vec<Member>) -> Self {
        self.members = members;
        self
    }
}

/// Element whose `<tag>` children are being read.
#[derive(Debug, Clone, PartialEq)]
pub enum TagOwner {
    Node(PendingNode),
    Way(PendingWay),
    Relation(PendingRelation),
}

impl TagOwner {
    /// Hands the collected tags back and returns the owner's state.
    fn accept_tags(self, tags: Tags) -> ParserState {
        match self {
            TagOwner::Node(mut node) => {
                node.tags = tags;
                ParserState::ReadingNodes { pending: Some(node) }
            }
            TagOwner::Way(mut way) => {
                way.tags = tags;
                ParserState::ReadingWays { pending: Some(way) }
            }
            TagOwner::Relation(mut relation) => {
                relation.tags = tags;
                ParserState::ReadingRelations {
                    pending: Some(relation),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParserState {
    #[default]
    ReadingOsmMetadata,
    ReadingBounds {
        api_version: Option<String>,
        generator: Option<String>,
    },
    ReadingNodes {
        pending: Option<PendingNode>,
    },
    ReadingTags {
        owner: TagOwner,
        tags: Tags,
    },
    ReadingWays {
        pending: Option<PendingWay>,
    },
    ReadingNds {
        owner: PendingWay,
        nds: Vec<OsmId>,
    },
    ReadingRelations {
        pending: Option<PendingRelation>,
    },
    ReadingMembers {
        owner: PendingRelation,
        members: Vec<Member>,
    },
    Finished,
}

impl ParserState {
    pub fn name(&self) -> &'static str {
        match self {
            ParserState::ReadingOsmMetadata => READING_OSM_METADATA,
            ParserState::ReadingBounds { .. } => READING_BOUNDS,
            ParserState::ReadingNodes { .. } => READING_NODES,
            ParserState::ReadingTags { .. } => READING_TAGS,
            ParserState::ReadingWays { .. } => READING_WAYS,
            ParserState::ReadingNds { .. } => READING_NDS,
            ParserState::ReadingRelations { .. } => READING_RELATIONS,
            ParserState::ReadingMembers { .. } => READING_MEMBERS,
            ParserState::Finished => FINISHED,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ParserState::Finished)
    }

    /// Feeds one event to the machine. Text, whitespace, comments, CDATA and
    /// processing instructions never change the state.
    pub fn accept(self, event: &XmlEvent) -> Result<Transition> {
        match event {
            XmlEvent::Characters { .. }
            | XmlEvent::Space { .. }
            | XmlEvent::Comment { .. }
            | XmlEvent::CData { .. }
            | XmlEvent::ProcessingInstruction { .. } => Ok((self, None)),
            _ => self.handle(event),
        }
    }

    fn handle(self, event: &XmlEvent) -> Result<Transition> {
        match self {
            ParserState::ReadingOsmMetadata => read_osm_metadata(event),
            ParserState::ReadingBounds {
                api_version,
                generator,
            } => read_bounds(api_version, generator, event),
            ParserState::ReadingNodes { pending } => read_nodes(pending, event),
            ParserState::ReadingTags { owner, tags } => read_tags(owner, tags, event),
            ParserState::ReadingWays { pending } => read_ways(pending, event),
            ParserState::ReadingNds { owner, nds } => read_nds(owner, nds, event),
            ParserState::ReadingRelations { pending } => read_relations(pending, event),
            ParserState::ReadingMembers { owner, members } => read_members(owner, members, event),
            ParserState::Finished => Ok((ParserState::Finished, None)),
        }
    }
}

fn unexpected(event: &XmlEvent, state: &'static str) -> Error {
    let err = match event {
        XmlEvent::StartElement(start) => GrammarError::UnexpectedStartElement {
            element: start.local_name.clone(),
            state,
        },
        XmlEvent::EndElement { local_name } => GrammarError::UnexpectedEndElement {
            element: local_name.clone(),
            state,
        },
        other => GrammarError::UnexpectedEvent {
            event: other.kind(),
            state,
        },
    };
    err.into()
}

fn read_osm_metadata(event: &XmlEvent) -> Result<Transition> {
    match event {
        XmlEvent::StartDocument { .. } => Ok((ParserState::ReadingOsmMetadata, None)),
        XmlEvent::StartElement(start) if start.local_name == "osm" => {
            let state = ParserState::ReadingBounds {
                api_version: start.attribute("version").map(str::to_string),
                generator: start.attribute("generator").map(str::to_string),
            };
            Ok((state, None))
        }
        // Reached again from the element states once `</osm>` is seen.
        XmlEvent::EndElement { local_name } if local_name == "osm" => {
            Ok((ParserState::ReadingOsmMetadata, None))
        }
        XmlEvent::EndDocument => Ok((ParserState::Finished, None)),
        other => Err(unexpected(other, READING_OSM_METADATA)),
    }
}

fn read_bounds_element(start: &StartElement) -> Result<Bounds> {
    let max_point = read_point(start, "maxlat", "maxlon")?;
    let min_point = read_point(start, "minlat", "minlon")?;
    Ok(Bounds {
        min_point,
        max_point,
    })
}

fn read_bounds(
    api_version: Option<String>,
    generator: Option<String>,
    event: &XmlEvent,
) -> Result<Transition> {
    match event {
        XmlEvent::StartElement(start) if start.local_name == "bounds" => {
            let metadata = OsmMetadata {
                version: api_version.clone(),
                generator: generator.clone(),
                bounds: Some(read_bounds_element(start)?),
            };
            let state = ParserState::ReadingBounds {
                api_version,
                generator,
            };
            Ok((state, Some(OsmData::Metadata(metadata))))
        }
        // An `osm` element without any children.
        XmlEvent::EndElement { local_name } if local_name == "osm" => {
            ParserState::ReadingNodes { pending: None }.handle(event)
        }
        XmlEvent::EndElement { .. } => Ok((ParserState::ReadingNodes { pending: None }, None)),
        other => Err(unexpected(other, READING_BOUNDS)),
    }
}

fn read_nodes(pending: Option<PendingNode>, event: &XmlEvent) -> Result<Transition> {
    match event {
        XmlEvent::StartElement(start) if pending.is_none() => match start.local_name.as_str() {
            "node" => {
                let node = PendingNode {
                    metadata: read_element_metadata(start)?,
                    point: read_point(start, "lat", "lon")?,
                    tags: Tags::new(),
                };
                let state = ParserState::ReadingTags {
                    owner: TagOwner::Node(node),
                    tags: Tags::new(),
                };
                Ok((state, None))
            }
            "way" => ParserState::ReadingWays { pending: None }.handle(event),
            "relation" => ParserState::ReadingRelations { pending: None }.handle(event),
            _ => Err(unexpected(event, READING_NODES)),
        },
        XmlEvent::EndElement { local_name } => match (local_name.as_str(), pending) {
            ("node", Some(node)) => {
                let node = Node {
                    metadata: node.metadata,
                    tags: node.tags,
                    point: node.point,
                };
                Ok((ParserState::ReadingNodes { pending: None }, Some(OsmData::Node(node))))
            }
            ("osm", None) => ParserState::ReadingOsmMetadata.handle(event),
            _ => Err(unexpected(event, READING_NODES)),
        },
        other => Err(unexpected(other, READING_NODES)),
    }
}

fn read_tags(owner: TagOwner, mut tags: Tags, event: &XmlEvent) -> Result<Transition> {
    match event {
        XmlEvent::StartElement(start) if start.local_name == "tag" => {
            let key = required(start, "k")?.to_string();
            let value = required(start, "v")?.to_string();
            tags.insert(key, value);
            Ok((ParserState::ReadingTags { owner, tags }, None))
        }
        XmlEvent::EndElement { local_name } if local_name == "tag" => {
            Ok((ParserState::ReadingTags { owner, tags }, None))
        }
        XmlEvent::EndElement { .. } => owner.accept_tags(tags).handle(event),
        other => Err(unexpected(other, READING_TAGS)),
    }
}

fn read_ways(pending: Option<PendingWay>, event: &XmlEvent) -> Result<Transition> {
    match event {
        XmlEvent::StartElement(start) if pending.is_none() => match start.local_name.as_str() {
            "way" => {
                let way = PendingWay {
                    metadata: read_element_metadata(start)?,
                    nds: Vec::new(),
                    tags: Tags::new(),
                };
                Ok((
                    ParserState::ReadingNds {
                        owner: way,
                        nds: Vec::new(),
                    },
                    None,
                ))
            }
            "relation" => ParserState::ReadingRelations { pending: None }.handle(event),
            _ => Err(unexpected(event, READING_WAYS)),
        },
        XmlEvent::EndElement { local_name } => match (local_name.as_str(), pending) {
            ("way", Some(way)) => {
                let way = Way::new(way.metadata, way.tags, way.nds)?;
                Ok((ParserState::ReadingWays { pending: None }, Some(OsmData::Way(way))))
            }
            ("osm", None) => ParserState::ReadingOsmMetadata.handle(event),
            _ => Err(unexpected(event, READING_WAYS)),
        },
        other => Err(unexpected(other, READING_WAYS)),
    }
}

fn read_nds(owner: PendingWay, mut nds: Vec<OsmId>, event: &XmlEvent) -> Result<Transition> {
    match event {
        XmlEvent::StartElement(start) => match start.local_name.as_str() {
            "nd" => {
                let nd = required_parsed(start, "ref")?;
                if nds.len() == MAX_NODES_IN_WAY {
                    return Err(ValidationError::TooManyNodes {
                        count: nds.len() + 1,
                        limit: MAX_NODES_IN_WAY,
                    }
                    .into());
                }
                nds.push(nd);
                Ok((ParserState::ReadingNds { owner, nds }, None))
            }
            "tag" => {
                let owner = TagOwner::Way(owner.accept_nd_refs(nds));
                ParserState::ReadingTags {
                    owner,
                    tags: Tags::new(),
                }
                .handle(event)
            }
            _ => Err(unexpected(event, READING_NDS)),
        },
        XmlEvent::EndElement { local_name } => match local_name.as_str() {
            "nd" => Ok((ParserState::ReadingNds { owner, nds }, None)),
            "way" => ParserState::ReadingWays {
                pending: Some(owner.accept_nd_refs(nds)),
            }
            .handle(event),
            _ => Err(unexpected(event, READING_NDS)),
        },
        other => Err(unexpected(other, READING_NDS)),
    }
}

fn read_relations(pending: Option<PendingRelation>, event: &XmlEvent) -> Result<Transition> {
    match event {
        XmlEvent::StartElement(start) if pending.is_none() && start.local_name == "relation" => {
            let relation = PendingRelation {
                metadata: read_element_metadata(start)?,
                members: Vec::new(),
                tags: Tags::new(),
            };
            Ok((
                ParserState::ReadingMembers {
                    owner: relation,
                    members: Vec::new(),
                },
                None,
            ))
        }
        XmlEvent::EndElement { local_name } => match (local_name.as_str(), pending) {
            ("relation", Some(relation)) => {
                let relation = Relation {
                    metadata: relation.metadata,
                    tags: relation.tags,
                    members: relation.members,
                };
                Ok((
                    ParserState::ReadingRelations { pending: None },
                    Some(OsmData::Relation(relation)),
                ))
            }
            ("osm", None) => ParserState::ReadingOsmMetadata.handle(event),
            _ => Err(unexpected(event, READING_RELATIONS)),
        },
        other => Err(unexpected(other, READING_RELATIONS)),
    }
}

fn read_member(start: &StartElement) -> Result<Member> {
    let member_type: MemberType = required(start, "type")?.parse()?;
    let id = required_parsed(start, "ref")?;
    let role = required(start, "role")?;
    Ok(Member::new(member_type, id, Some(role.to_string())))
}

fn read_members(
    owner: PendingRelation,
    mut members: Vec<Member>,
    event: &XmlEvent,
) -> Result<Transition> {
    match event {
        XmlEvent::StartElement(start) => match start.local_name.as_str() {
            "member" => {
                members.push(read_member(start)?);
                Ok((ParserState::ReadingMembers { owner, members }, None))
            }
            "tag" => {
                let owner = TagOwner::Relation(owner.accept_members(members));
                ParserState::ReadingTags {
                    owner,
                    tags: Tags::new(),
                }
                .handle(event)
            }
            _ => Err(unexpected(event, READING_MEMBERS)),
        },
        XmlEvent::EndElement { local_name } => match local_name.as_str() {
            "member" => Ok((ParserState::ReadingMembers { owner, members }, None)),
            "relation" => ParserState::ReadingRelations {
                pending: Some(owner.accept_members(members)),
            }
            .handle(event),
            _ => Err(unexpected(event, READING_MEMBERS)),
        },
        other => Err(unexpected(other, READING_MEMBERS)),
    }
}
