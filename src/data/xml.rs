use std::collections::HashMap;

pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Start tag with its attributes keyed by local name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartElement {
    pub local_name: String,
    pub attributes: HashMap<String, String>,
}

impl StartElement {
    pub fn new(local_name: impl Into<String>) -> Self {
        StartElement {
            local_name: local_name.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Structural XML events in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    StartDocument {
        system_id: String,
        encoding: String,
        standalone: bool,
    },
    EndDocument,
    StartElement(StartElement),
    EndElement {
        local_name: String,
    },
    Characters {
        text: String,
    },
    CData {
        text: String,
    },
    Comment {
        text: String,
    },
    /// Whitespace-only text.
    Space {
        text: String,
    },
    ProcessingInstruction {
        target: String,
        data: Option<String>,
    },
}

impl XmlEvent {
    pub fn end_element(local_name: impl Into<String>) -> Self {
        XmlEvent::EndElement {
            local_name: local_name.into(),
        }
    }

    pub fn characters(text: impl Into<String>) -> Self {
        XmlEvent::Characters { text: text.into() }
    }

    pub fn cdata(text: impl Into<String>) -> Self {
        XmlEvent::CData { text: text.into() }
    }

    /// Short name of the variant, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            XmlEvent::StartDocument { .. } => "start of document",
            XmlEvent::EndDocument => "end of document",
            XmlEvent::StartElement(_) => "start element",
            XmlEvent::EndElement { .. } => "end element",
            XmlEvent::Characters { .. } => "characters",
            XmlEvent::CData { .. } => "CDATA",
            XmlEvent::Comment { .. } => "comment",
            XmlEvent::Space { .. } => "whitespace",
            XmlEvent::ProcessingInstruction { .. } => "processing instruction",
        }
    }

    /// Events that can be merged by the text coalescer.
    pub fn is_text(&self) -> bool {
        matches!(self, XmlEvent::Characters { .. } | XmlEvent::CData { .. })
    }

    /// Appends the text of `other` when both are text events of the same kind.
    pub(crate) fn merge_text(&mut self, other: &XmlEvent) -> bool {
        match (self, other) {
            (XmlEvent::Characters { text }, XmlEvent::Characters { text: more })
            | (XmlEvent::CData { text }, XmlEvent::CData { text: more }) => {
                text.push_str(more);
                true
            }
            _ => false,
        }
    }
}

impl From<StartElement> for XmlEvent {
    fn from(value: StartElement) -> Self {
        XmlEvent::StartElement(value)
    }
}
