//! Source documents - streaming start/end events over nested elements
//!
//! The forward converter only ever sees this interface. Each start event
//! carries the element's tag, its attributes in document order and the trimmed
//! text found before its first child.

pub mod xml;

pub use xml::XmlEventReader;

use crate::Result;

/// Boundary an event marks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    End,
}

/// An element as seen by a start or end event.
///
/// End events only carry the tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Set the character content, dropping it when only whitespace remains
    pub fn with_text(mut self, text: &str) -> Self {
        let trimmed = text.trim();
        self.text = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
}

/// A pull-based stream of element boundaries.
pub trait EventSource {
    /// Next boundary, or `None` once the document is exhausted
    fn next_event(&mut self) -> Result<Option<(EventKind, Element)>>;
}

/// Replays a prepared event list; handy for documents built in code.
#[derive(Debug, Default)]
pub struct EventList {
    events: std::collections::VecDeque<(EventKind, Element)>,
}

impl EventList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, element: Element) -> Self {
        self.events.push_back((EventKind::Start, element));
        self
    }

    pub fn end(mut self, tag: &str) -> Self {
        self.events.push_back((EventKind::End, Element::new(tag)));
        self
    }
}

impl EventSource for EventList {
    fn next_event(&mut self) -> Result<Option<(EventKind, Element)>> {
        Ok(self.events.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_text_trims() {
        assert_eq!(Element::new("a").with_text("  hi \n").text.as_deref(), Some("hi"));
        assert_eq!(Element::new("a").with_text(" \n\t ").text, None);
    }

    #[test]
    fn test_event_list_replays_in_order() {
        let mut events = EventList::new()
            .start(Element::new("XML"))
            .start(Element::new("Item").with_attribute("k", "v"))
            .end("Item")
            .end("XML");

        let (kind, element) = events.next_event().unwrap().unwrap();
        assert_eq!((kind, element.tag.as_str()), (EventKind::Start, "XML"));
        let (_, item) = events.next_event().unwrap().unwrap();
        assert_eq!(item.attributes, vec![("k".to_string(), "v".to_string())]);
        events.next_event().unwrap();
        events.next_event().unwrap();
        assert!(events.next_event().unwrap().is_none());
    }
}
