use crate::data::xml::XmlEvent;
use crate::errors::Result;

/// Merges runs of adjacent `Characters` (or adjacent `CData`) events into one
/// event. Everything else passes through in order.
pub struct CoalesceText<I> {
    events: I,
    text: Option<XmlEvent>,
    held: Option<Result<XmlEvent>>,
}

impl<I> CoalesceText<I>
where
    I: Iterator<Item = Result<XmlEvent>>,
{
    pub fn new(events: I) -> Self {
        CoalesceText {
            events,
            text: None,
            held: None,
        }
    }

    /// Emits buffered text first, keeping `next` for the following call.
    fn flush_before(&mut self, next: Result<XmlEvent>) -> Option<Result<XmlEvent>> {
        match self.text.take() {
            Some(text) => {
                self.held = Some(next);
                Some(Ok(text))
            }
            None => Some(next),
        }
    }
}

impl<I> Iterator for CoalesceText<I>
where
    I: Iterator<Item = Result<XmlEvent>>,
{
    type Item = Result<XmlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(held) = self.held.take() {
            return Some(held);
        }
        loop {
            match self.events.next() {
                Some(Ok(event)) => {
                    if self
                        .text
                        .as_mut()
                        .is_some_and(|buffered| buffered.merge_text(&event))
                    {
                        continue;
                    }
                    if event.is_text() {
                        if let Some(previous) = self.text.replace(event) {
                            return Some(Ok(previous));
                        }
                        continue;
                    }
                    return self.flush_before(Ok(event));
                }
                Some(Err(err)) => return self.flush_before(Err(err)),
                None => return self.text.take().map(Ok),
            }
        }
    }
}

pub trait CoalesceTextExt: Iterator<Item = Result<XmlEvent>> + Sized {
    fn coalesce_text(self) -> CoalesceText<Self> {
        CoalesceText::new(self)
    }
}

impl<I> CoalesceTextExt for I where I: Iterator<Item = Result<XmlEvent>> {}
