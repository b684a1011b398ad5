use std::{collections::VecDeque, io};

use bytes::Buf;
use futures::{stream, Stream};
use log::{debug, warn};
use quick_xml::Reader;
use tokio_util::io::StreamReader;

use crate::data::xml::XmlEvent;
use crate::errors::{Error, Result};

use super::translate::{self, EventTranslator, Flow};

/// Async counterpart of [`XmlEventDecoder`](super::decoder::XmlEventDecoder).
/// Waiting for the next chunk is the only point where it yields.
struct StreamDecoder<S, B> {
    reader: Option<Reader<StreamReader<S, B>>>,
    buf: Vec<u8>,
    translator: EventTranslator,
    pending: VecDeque<XmlEvent>,
    failure: Option<Error>,
}

impl<S, B> StreamDecoder<S, B>
where
    S: Stream<Item = io::Result<B>> + Unpin,
    B: Buf + Unpin,
{
    async fn next_event(&mut self) -> Option<Result<XmlEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if let Some(err) = self.failure.take() {
                return Some(Err(err));
            }
            let reader = self.reader.as_mut()?;
            let step = match reader.read_event_into_async(&mut self.buf).await {
                Ok(raw) => self.translator.translate(raw, &mut self.pending),
                Err(err) => Err(err.into()),
            };
            self.buf.clear();
            match step {
                Ok(Flow::Continue) => {}
                Ok(Flow::Finished) => self.close(),
                Err(err) => {
                    warn!(err = err.to_string().as_str(); "XML decoding failed");
                    self.close();
                    self.failure = Some(err);
                }
            }
        }
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("Closed XML event stream decoder");
        }
    }
}

/// Decodes a stream of byte chunks into a stream of XML events.
///
/// Same event sequence and failure behaviour as [`decode`](super::decoder::decode).
pub fn decode_stream<S, B>(chunks: S) -> impl Stream<Item = Result<XmlEvent>>
where
    S: Stream<Item = io::Result<B>> + Unpin,
    B: Buf + Unpin,
{
    decode_stream_with_system_id(chunks, String::new())
}

pub fn decode_stream_with_system_id<S, B>(
    chunks: S,
    system_id: String,
) -> impl Stream<Item = Result<XmlEvent>>
where
    S: Stream<Item = io::Result<B>> + Unpin,
    B: Buf + Unpin,
{
    let mut reader = Reader::from_reader(StreamReader::new(chunks));
    translate::configure(&mut reader);
    debug!("Opened XML event stream decoder");

    let decoder = StreamDecoder {
        reader: Some(reader),
        buf: Vec::new(),
        translator: EventTranslator::new(system_id),
        pending: VecDeque::new(),
        failure: None,
    };
    stream::unfold(decoder, |mut decoder| async move {
        let event = decoder.next_event().await?;
        Some((event, decoder))
    })
}
