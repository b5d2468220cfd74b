// Timed text parsing
//
// YouTube serves captions as a small XML document:
//
//   <transcript>
//     <text start="0.16" dur="2.4">Hello &amp;amp; welcome</text>
//   </transcript>
//
// Element text is XML-escaped once and the caption itself may carry HTML
// entities and inline tags on top of that.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};
use std::fmt::Display;
use std::sync::OnceLock;

use super::error::UpstreamError;
use super::transcripts::TranscriptSnippet;

/// Inline tags kept when formatting is preserved
const FORMATTING_TAGS: [&str; 10] = [
    "strong", "em", "b", "i", "mark", "small", "del", "ins", "sub", "sup",
];

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</?\s*([a-z][a-z0-9]*)\b[^>]*>").expect("valid tag regex"))
}

fn malformed_xml<E: Display>(e: E) -> UpstreamError {
    UpstreamError::malformed(format!("invalid timed text XML: {}", e))
}

/// A `<text>` element whose closing tag has not been reached yet
struct OpenCaption {
    start: f64,
    duration: f64,
    raw: String,
}

impl OpenCaption {
    fn from_element(element: &BytesStart) -> Result<Self, UpstreamError> {
        let mut start = None;
        let mut duration = 0.0;
        for attr in element.attributes() {
            let attr = attr.map_err(malformed_xml)?;
            let value = attr.unescape_value().map_err(malformed_xml)?;
            match attr.key.as_ref() {
                b"start" => start = value.parse::<f64>().ok(),
                b"dur" => duration = value.parse::<f64>().unwrap_or(0.0),
                _ => {}
            }
        }

        let start = start
            .ok_or_else(|| UpstreamError::malformed("text element without a valid start attribute"))?;
        Ok(Self {
            start,
            duration,
            raw: String::new(),
        })
    }
}

/// Parses timed text XML into transcript snippets
#[derive(Debug, Clone, Copy, Default)]
pub struct TimedTextParser {
    preserve_formatting: bool,
}

impl TimedTextParser {
    pub fn new(preserve_formatting: bool) -> Self {
        Self {
            preserve_formatting,
        }
    }

    /// Parse a timed text document. Elements without text are skipped.
    pub fn parse(&self, xml: &str) -> Result<Vec<TranscriptSnippet>, UpstreamError> {
        let mut reader = Reader::from_str(xml);
        let mut has_root = false;
        let mut open: Option<OpenCaption> = None;
        let mut snippets = Vec::new();

        loop {
            match reader.read_event().map_err(malformed_xml)? {
                Event::Start(element) => match element.name().as_ref() {
                    b"transcript" => has_root = true,
                    b"text" => {
                        has_root = true;
                        open = Some(OpenCaption::from_element(&element)?);
                    }
                    _ => {}
                },
                Event::Empty(element) if element.name().as_ref() == b"text" => has_root = true,
                Event::Text(text) => {
                    if let Some(caption) = open.as_mut() {
                        caption.raw.push_str(&text.unescape().map_err(malformed_xml)?);
                    }
                }
                Event::CData(data) => {
                    if let Some(caption) = open.as_mut() {
                        caption.raw.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::End(element) if element.name().as_ref() == b"text" => {
                    if let Some(caption) = open.take() {
                        if !caption.raw.is_empty() {
                            snippets.push(self.snippet(caption));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !has_root {
            return Err(UpstreamError::malformed("timed text document has no <transcript> root"));
        }
        Ok(snippets)
    }

    fn snippet(&self, caption: OpenCaption) -> TranscriptSnippet {
        // the XML layer is already gone, captions still carry HTML entities
        let text = html_escape::decode_html_entities(&caption.raw);
        TranscriptSnippet {
            text: self.clean_tags(&text),
            start: caption.start,
            duration: caption.duration,
        }
    }

    fn clean_tags(&self, text: &str) -> String {
        let preserve = self.preserve_formatting;
        tag_regex()
            .replace_all(text, |caps: &Captures| {
                let name = caps[1].to_ascii_lowercase();
                if preserve && FORMATTING_TAGS.contains(&name.as_str()) {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned()
    }
}
