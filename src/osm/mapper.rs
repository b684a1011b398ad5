use futures::{stream, Stream, StreamExt};
use log::{trace, warn};

use crate::data::osm::OsmData;
use crate::data::xml::XmlEvent;
use crate::errors::Result;

use super::state::ParserState;

/// Drives a [`ParserState`] one event at a time.
///
/// The first error, whether it comes from upstream or from the grammar, is
/// passed on once; after that the mapper ignores all input.
#[derive(Debug)]
pub struct OsmMapper {
    state: Option<ParserState>,
}

impl OsmMapper {
    pub fn new() -> Self {
        OsmMapper {
            state: Some(ParserState::default()),
        }
    }

    pub fn state(&self) -> Option<&ParserState> {
        self.state.as_ref()
    }

    /// True once the document has ended or an error was reported.
    pub fn is_done(&self) -> bool {
        self.state.as_ref().map_or(true, ParserState::is_finished)
    }

    pub fn feed(&mut self, event: Result<XmlEvent>) -> Option<Result<OsmData>> {
        let state = self.state.take()?;
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                warn!(state = state.name(), err = err.to_string().as_str(); "Input failed while mapping OSM data");
                return Some(Err(err));
            }
        };
        match state.accept(&event) {
            Ok((next, record)) => {
                self.state = Some(next);
                if let Some(record) = &record {
                    trace!(kind = record.kind(); "Mapped OSM record");
                }
                record.map(Ok)
            }
            Err(err) => {
                warn!(event = event.kind(), err = err.to_string().as_str(); "OSM grammar violation");
                Some(Err(err))
            }
        }
    }
}

impl Default for OsmMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator of [`OsmData`] records mapped from XML events.
pub struct OsmDataIter<I> {
    events: I,
    mapper: OsmMapper,
}

impl<I> OsmDataIter<I> {
    pub fn mapper(&self) -> &OsmMapper {
        &self.mapper
    }
}

impl<I> Iterator for OsmDataIter<I>
where
    I: Iterator<Item = Result<XmlEvent>>,
{
    type Item = Result<OsmData>;

    fn next(&mut self) -> Option<Self::Item> {
        // Stop pulling upstream once nothing more can be produced.
        while self.mapper.state.is_some() {
            let event = self.events.next()?;
            if let Some(record) = self.mapper.feed(event) {
                return Some(record);
            }
        }
        None
    }
}

pub fn map<I>(events: I) -> OsmDataIter<I::IntoIter>
where
    I: IntoIterator<Item = Result<XmlEvent>>,
{
    OsmDataIter {
        events: events.into_iter(),
        mapper: OsmMapper::new(),
    }
}

/// Async counterpart of [`map`].
pub fn map_stream<S>(events: S) -> impl Stream<Item = Result<OsmData>>
where
    S: Stream<Item = Result<XmlEvent>>,
{
    let events = Box::pin(events);
    stream::unfold((events, OsmMapper::new()), |(mut events, mut mapper)| async move {
        while mapper.state.is_some() {
            let event = events.next().await?;
            if let Some(record) = mapper.feed(event) {
                return Some((record, (events, mapper)));
            }
        }
        None
    })
}
