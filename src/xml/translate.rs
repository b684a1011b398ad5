use std::{collections::VecDeque, str};

use log::trace;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::data::xml::{StartElement, XmlEvent, DEFAULT_ENCODING};
use crate::errors::{Error, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Whether the tokenizer should keep being polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Finished,
}

pub(crate) fn configure<R>(reader: &mut Reader<R>) {
    // Whitespace is reported as `Space` events, so nothing gets trimmed here.
    reader.trim_text(false);
    reader.check_end_names(true);
}

/// Turns borrowed tokenizer events into owned [`XmlEvent`]s and checks the
/// balance of the element tree, which the tokenizer alone does not do at end
/// of input.
#[derive(Debug, Default)]
pub(crate) struct EventTranslator {
    system_id: String,
    started: bool,
    root_seen: bool,
    open: Vec<String>,
}

impl EventTranslator {
    pub(crate) fn new(system_id: String) -> Self {
        EventTranslator {
            system_id,
            ..Default::default()
        }
    }

    pub(crate) fn set_system_id(&mut self, system_id: String) {
        self.system_id = system_id;
    }

    pub(crate) fn translate(&mut self, raw: Event<'_>, out: &mut VecDeque<XmlEvent>) -> Result<Flow> {
        // The tokenizer only strips a byte order mark that arrives whole in its
        // first read, so a mark split across chunks shows up as leading text.
        let raw = match raw {
            Event::Text(text) if !self.started && text.starts_with(UTF8_BOM) => {
                let rest = decode(&text[UTF8_BOM.len()..])?;
                if rest.is_empty() {
                    trace!("Skipping byte order mark");
                    return Ok(Flow::Continue);
                }
                Event::Text(BytesText::from_escaped(rest))
            }
            other => other,
        };

        if !self.started {
            self.started = true;
            if let Event::Decl(decl) = &raw {
                out.push_back(self.start_document(Some(decl))?);
                return Ok(Flow::Continue);
            }
            out.push_back(self.start_document(None)?);
        }

        match raw {
            Event::Decl(_) => {
                return Err(Error::MisplacedContent {
                    content: "XML declaration".to_string(),
                })
            }
            Event::Start(start) => {
                let element = self.open_element(&start)?;
                out.push_back(XmlEvent::StartElement(element));
            }
            Event::Empty(start) => {
                let element = self.open_element(&start)?;
                let local_name = element.local_name.clone();
                out.push_back(XmlEvent::StartElement(element));
                out.push_back(self.close_element(local_name)?);
            }
            Event::End(end) => {
                let local_name = decode(end.local_name().as_ref())?;
                out.push_back(self.close_element(local_name)?);
            }
            Event::Text(text) => {
                if let Some(event) = self.text(&text)? {
                    out.push_back(event);
                }
            }
            Event::CData(cdata) => {
                let text = decode(&cdata.into_inner())?;
                out.push_back(XmlEvent::CData { text });
            }
            Event::Comment(comment) => {
                let text = decode(&comment.into_inner())?;
                out.push_back(XmlEvent::Comment { text });
            }
            Event::PI(pi) => {
                let content = decode(&pi.into_inner())?;
                out.push_back(processing_instruction(&content));
            }
            Event::DocType(_) => trace!("Skipping DOCTYPE declaration"),
            Event::Eof => {
                if let Some(element) = self.open.last() {
                    return Err(Error::Truncated {
                        element: element.clone(),
                    });
                }
                if !self.root_seen {
                    return Err(Error::NoRootElement);
                }
                out.push_back(XmlEvent::EndDocument);
                return Ok(Flow::Finished);
            }
        }
        Ok(Flow::Continue)
    }

    fn start_document(&self, decl: Option<&BytesDecl<'_>>) -> Result<XmlEvent> {
        let mut encoding = DEFAULT_ENCODING.to_string();
        let mut standalone = false;
        if let Some(decl) = decl {
            if let Some(value) = decl.encoding() {
                encoding = decode(&value?)?;
                if !is_utf8_compatible(&encoding) {
                    return Err(Error::UnsupportedEncoding { encoding });
                }
            }
            if let Some(value) = decl.standalone() {
                let value = value?;
                standalone = &*value == b"yes";
            }
        }
        Ok(XmlEvent::StartDocument {
            system_id: self.system_id.clone(),
            encoding,
            standalone,
        })
    }

    fn open_element(&mut self, start: &BytesStart<'_>) -> Result<StartElement> {
        let local_name = decode(start.local_name().as_ref())?;
        if self.root_seen && self.open.is_empty() {
            return Err(Error::MisplacedContent {
                content: format!("second root element `{local_name}`"),
            });
        }

        let mut element = StartElement::new(local_name);
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = decode(attribute.key.local_name().as_ref())?;
            let value = attribute.unescape_value()?.into_owned();
            element.attributes.insert(key, value);
        }

        self.root_seen = true;
        self.open.push(element.local_name.clone());
        Ok(element)
    }

    fn close_element(&mut self, local_name: String) -> Result<XmlEvent> {
        match self.open.pop() {
            Some(open) if open == local_name => Ok(XmlEvent::EndElement { local_name }),
            _ => Err(Error::UnmatchedEndElement { element: local_name }),
        }
    }

    fn text(&self, raw: &BytesText<'_>) -> Result<Option<XmlEvent>> {
        let text = raw.unescape()?.into_owned();
        if text.is_empty() {
            return Ok(None);
        }
        if text.bytes().all(is_xml_whitespace) {
            return Ok(Some(XmlEvent::Space { text }));
        }
        if self.open.is_empty() {
            return Err(Error::MisplacedContent {
                content: "text outside the root element".to_string(),
            });
        }
        Ok(Some(XmlEvent::Characters { text }))
    }
}

fn decode(bytes: &[u8]) -> Result<String> {
    Ok(str::from_utf8(bytes)?.to_string())
}

fn is_utf8_compatible(encoding: &str) -> bool {
    ["UTF-8", "UTF8", "US-ASCII", "ASCII"]
        .iter()
        .any(|name| encoding.eq_ignore_ascii_case(name))
}

fn is_xml_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

fn processing_instruction(content: &str) -> XmlEvent {
    let (target, data) = match content.find(|c: char| c.is_ascii_whitespace()) {
        Some(idx) => (&content[..idx], content[idx..].trim_start()),
        None => (content, ""),
    };
    XmlEvent::ProcessingInstruction {
        target: target.to_string(),
        data: (!data.is_empty()).then(|| data.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn processing_instruction_splits_target_and_data() {
        assert_eq!(
            processing_instruction("xml-stylesheet href=\"mystyle.xslt\" type=\"text/xsl\""),
            XmlEvent::ProcessingInstruction {
                target: "xml-stylesheet".to_string(),
                data: Some("href=\"mystyle.xslt\" type=\"text/xsl\"".to_string()),
            }
        );
        assert_eq!(
            processing_instruction("pagebreak"),
            XmlEvent::ProcessingInstruction {
                target: "pagebreak".to_string(),
                data: None,
            }
        );
    }

    #[test]
    fn byte_order_mark_before_the_declaration_is_dropped() {
        let mut translator = EventTranslator::default();
        let mut out = VecDeque::new();
        translator
            .translate(Event::Text(BytesText::from_escaped("\u{feff}")), &mut out)
            .unwrap();
        assert!(out.is_empty());

        translator
            .translate(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)), &mut out)
            .unwrap();
        assert_eq!(
            Vec::from(out),
            vec![XmlEvent::StartDocument {
                system_id: String::new(),
                encoding: "utf-8".to_string(),
                standalone: false,
            }]
        );
    }

    #[test]
    fn byte_order_mark_followed_by_whitespace_keeps_the_whitespace() {
        let mut translator = EventTranslator::default();
        let mut out = VecDeque::new();
        translator
            .translate(Event::Text(BytesText::from_escaped("\u{feff}\n")), &mut out)
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[1], XmlEvent::Space { text: "\n".to_string() });
    }

    #[test]
    fn non_utf8_declaration_is_rejected() {
        let mut translator = EventTranslator::default();
        let mut out = VecDeque::new();
        let decl = BytesDecl::new("1.0", Some("ISO-8859-1"), None);

        let err = translator.translate(Event::Decl(decl), &mut out).unwrap_err();
        assert!(matches!(&err, Error::UnsupportedEncoding { encoding } if encoding == "ISO-8859-1"));
        assert!(out.is_empty());
    }

    #[test]
    fn end_of_input_inside_an_element_is_truncation() {
        let mut translator = EventTranslator::default();
        let mut out = VecDeque::new();
        translator
            .translate(Event::Start(BytesStart::new("osm")), &mut out)
            .unwrap();

        let err = translator.translate(Event::Eof, &mut out).unwrap_err();
        assert!(matches!(err, Error::Truncated { element } if element == "osm"));
    }

    #[test]
    fn empty_element_expands_to_start_and_end() {
        let mut translator = EventTranslator::new("file.osm".to_string());
        let mut out = VecDeque::new();
        translator
            .translate(Event::Empty(BytesStart::new("osm")), &mut out)
            .unwrap();
        let flow = translator.translate(Event::Eof, &mut out).unwrap();

        assert_eq!(flow, Flow::Finished);
        assert_eq!(
            Vec::from(out),
            vec![
                XmlEvent::StartDocument {
                    system_id: "file.osm".to_string(),
                    encoding: "UTF-8".to_string(),
                    standalone: false,
                },
                XmlEvent::StartElement(StartElement::new("osm")),
                XmlEvent::end_element("osm"),
                XmlEvent::EndDocument,
            ]
        );
    }
}
