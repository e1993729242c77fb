//! XML event source backed by quick-xml
//!
//! Reads the document incrementally: only the current raw event and at most one
//! look-ahead event are held, so arbitrarily large files can be streamed.

use super::{Element, EventKind, EventSource};
use crate::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Low-level event before text has been attached
#[derive(Debug)]
enum RawEvent {
    Start(Element),
    Empty(Element),
    End(String),
    Text(String),
    Eof,
}

/// Streaming reader producing start/end events for every element.
pub struct XmlEventReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    pending: Option<RawEvent>,
}

impl XmlEventReader<BufReader<File>> {
    /// Open an XML file for streaming
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<'a> XmlEventReader<&'a [u8]> {
    pub fn from_xml(xml: &'a str) -> Self {
        Self::new(xml.as_bytes())
    }
}

impl<R: BufRead> XmlEventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Reader::from_reader(reader),
            buf: Vec::new(),
            pending: None,
        }
    }

    fn parse_error(&self, err: impl std::fmt::Display) -> Error {
        Error::SourceParse(format!(
            "{} (at byte {})",
            err,
            self.reader.buffer_position()
        ))
    }

    fn next_raw(&mut self) -> Result<RawEvent> {
        match self.pending.take() {
            Some(event) => Ok(event),
            None => self.read_raw(),
        }
    }

    fn read_raw(&mut self) -> Result<RawEvent> {
        let mut buf = std::mem::take(&mut self.buf);
        let raw = self.read_raw_into(&mut buf);
        self.buf = buf;
        raw
    }

    fn read_raw_into(&mut self, buf: &mut Vec<u8>) -> Result<RawEvent> {
        loop {
            buf.clear();
            let event = match self.reader.read_event_into(buf) {
                Ok(event) => event,
                Err(e) => return Err(self.parse_error(e)),
            };

            let raw = match event {
                Event::Start(ref start) => RawEvent::Start(self.element(start)?),
                Event::Empty(ref start) => RawEvent::Empty(self.element(start)?),
                Event::End(ref end) => RawEvent::End(self.decode(end.name().as_ref())?),
                Event::Text(ref text) => {
                    let text = text.unescape().map_err(|e| self.parse_error(e))?;
                    RawEvent::Text(text.into_owned())
                }
                Event::CData(cdata) => {
                    let bytes = cdata.into_inner();
                    RawEvent::Text(self.decode(&bytes)?)
                }
                Event::Eof => RawEvent::Eof,
                // Declarations, comments, processing instructions and doctypes carry no data
                _ => continue,
            };
            return Ok(raw);
        }
    }

    fn element(&self, start: &BytesStart<'_>) -> Result<Element> {
        let mut element = Element::new(self.decode(start.name().as_ref())?);
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| self.parse_error(e))?;
            let name = self.decode(attribute.key.as_ref())?;
            let value = attribute
                .unescape_value()
                .map_err(|e| self.parse_error(e))?
                .into_owned();
            element.attributes.push((name, value));
        }
        Ok(element)
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| self.parse_error(e))
    }
}

impl<R: BufRead> EventSource for XmlEventReader<R> {
    fn next_event(&mut self) -> Result<Option<(EventKind, Element)>> {
        loop {
            match self.next_raw()? {
                RawEvent::Start(element) => {
                    // Leading text runs until the first child or the closing tag
                    let mut text = String::new();
                    loop {
                        match self.read_raw()? {
                            RawEvent::Text(chunk) => text.push_str(&chunk),
                            other => {
                                self.pending = Some(other);
                                break;
                            }
                        }
                    }
                    return Ok(Some((EventKind::Start, element.with_text(&text))));
                }
                RawEvent::Empty(element) => {
                    self.pending = Some(RawEvent::End(element.tag.clone()));
                    return Ok(Some((EventKind::Start, element)));
                }
                RawEvent::End(tag) => return Ok(Some((EventKind::End, Element::new(tag)))),
                // tail text between siblings
                RawEvent::Text(_) => continue,
                RawEvent::Eof => return Ok(None),
            }
        }
    }
}
