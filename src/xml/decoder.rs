use std::{
    collections::VecDeque,
    io::{self, BufRead, Read},
};

use log::{debug, trace, warn};
use quick_xml::Reader;

use crate::data::xml::XmlEvent;
use crate::errors::{Error, Result};

use super::translate::{self, EventTranslator, Flow};

/// Presents a sequence of byte chunks as a [`BufRead`].
///
/// A new chunk is pulled from the source only once every byte of the current
/// one has been consumed, so at most one chunk is held at a time.
pub struct ChunkReader<I, B> {
    chunks: I,
    current: Option<B>,
    pos: usize,
    exhausted: bool,
    pulled: u64,
}

impl<I, B> ChunkReader<I, B>
where
    I: Iterator<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    pub fn new(chunks: I) -> Self {
        ChunkReader {
            chunks,
            current: None,
            pos: 0,
            exhausted: false,
            pulled: 0,
        }
    }

    /// Total number of bytes pulled from the source so far.
    pub fn bytes_pulled(&self) -> u64 {
        self.pulled
    }

    fn remaining(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, |chunk| chunk.as_ref().len() - self.pos)
    }
}

impl<I, B> BufRead for ChunkReader<I, B>
where
    I: Iterator<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while !self.exhausted && self.remaining() == 0 {
            match self.chunks.next() {
                Some(Ok(chunk)) => {
                    let len = chunk.as_ref().len();
                    trace!(len = len; "Pulled byte chunk");
                    self.pulled += len as u64;
                    self.current = Some(chunk);
                    self.pos = 0;
                }
                Some(Err(err)) => return Err(err),
                None => {
                    self.exhausted = true;
                    self.current = None;
                }
            }
        }
        match &self.current {
            Some(chunk) => Ok(&chunk.as_ref()[self.pos..]),
            None => Ok(&[]),
        }
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.pos + self.remaining());
    }
}

impl<I, B> Read for ChunkReader<I, B>
where
    I: Iterator<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let len = available.len().min(buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.consume(len);
        Ok(len)
    }
}

/// Lazy, forward-only sequence of [`XmlEvent`]s decoded from byte chunks.
///
/// The first event is always `StartDocument` and the last `EndDocument`. The
/// sequence ends after `EndDocument` or the first error; at that point the
/// tokenizer and the byte source have already been dropped.
pub struct XmlEventDecoder<I, B> {
    reader: Option<Reader<ChunkReader<I, B>>>,
    buf: Vec<u8>,
    translator: EventTranslator,
    pending: VecDeque<XmlEvent>,
    failure: Option<Error>,
}

impl<I, B> XmlEventDecoder<I, B>
where
    I: Iterator<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    pub fn new(chunks: I) -> Self {
        let mut reader = Reader::from_reader(ChunkReader::new(chunks));
        translate::configure(&mut reader);
        debug!("Opened XML event decoder");
        XmlEventDecoder {
            reader: Some(reader),
            buf: Vec::new(),
            translator: EventTranslator::default(),
            pending: VecDeque::new(),
            failure: None,
        }
    }

    /// Sets the system identifier reported in `StartDocument`.
    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.translator.set_system_id(system_id.into());
        self
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            debug!(bytes = reader.get_ref().bytes_pulled(); "Closed XML event decoder");
        }
    }
}

impl<I, B> Iterator for XmlEventDecoder<I, B>
where
    I: Iterator<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    type Item = Result<XmlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Events decoded ahead of a failure still precede it.
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if let Some(err) = self.failure.take() {
                return Some(Err(err));
            }
            let reader = self.reader.as_mut()?;
            let step = match reader.read_event_into(&mut self.buf) {
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
}

/// Decodes a sequence of byte chunks into XML events.
pub fn decode<I, B>(chunks: I) -> XmlEventDecoder<I::IntoIter, B>
where
    I: IntoIterator<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    XmlEventDecoder::new(chunks.into_iter())
}
