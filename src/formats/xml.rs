//! XML format handler
//!
//! Supports payload aggregation only: fragments are wrapped verbatim in an
//! `<aggregation>` envelope, and de-aggregation slices the combined text by
//! the byte spans of each top-level child element, so fragment text survives
//! the round trip exactly. Template binding and injection for XML live in an
//! external tree-walker; this handler reports them as unsupported.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{Aggregator, FormatError, FormatHandler};
use crate::bindings::Bindings;

const ENVELOPE_OPEN: &str = "<aggregation>";
const ENVELOPE_CLOSE: &str = "</aggregation>";

/// Built-in handler for `xml`-typed schemas.
pub struct XmlFormat;

impl FormatHandler for XmlFormat {
    fn format_type(&self) -> &'static str {
        "xml"
    }

    fn create_aggregator(&self) -> Box<dyn Aggregator> {
        Box::new(XmlAggregator::default())
    }

    fn bind(&self, _template: &str, _payload: &str) -> Result<Bindings, FormatError> {
        Err(FormatError::Unsupported {
            format: "xml",
            operation: "template binding",
        })
    }

    fn inject(&self, _template: &str, _bindings: &Bindings) -> Result<String, FormatError> {
        Err(FormatError::Unsupported {
            format: "xml",
            operation: "value injection",
        })
    }
}

/// Packs XML fragments into an envelope element, keeping each fragment's
/// text untouched. De-aggregation returns each child element's exact text;
/// whitespace around a fragment's root element counts as envelope padding
/// and is not attributed to any fragment.
#[derive(Default)]
pub struct XmlAggregator {
    fragments: Vec<String>,
}

impl Aggregator for XmlAggregator {
    fn add(&mut self, raw: &str) {
        self.fragments.push(raw.to_string());
    }

    fn emit(&self) -> String {
        let inner: usize = self.fragments.iter().map(String::len).sum();
        let mut out =
            String::with_capacity(inner + ENVELOPE_OPEN.len() + ENVELOPE_CLOSE.len());
        out.push_str(ENVELOPE_OPEN);
        for fragment in &self.fragments {
            out.push_str(fragment);
        }
        out.push_str(ENVELOPE_CLOSE);
        out
    }

    fn de_aggregate(&self, combined: &str) -> Result<Vec<String>, FormatError> {
        let spans = child_spans(combined)?;
        Ok(spans
            .into_iter()
            .map(|(start, end)| combined[start..end].to_string())
            .collect())
    }
}

// Byte spans of each direct child element of the document root.
fn child_spans(combined: &str) -> Result<Vec<(usize, usize)>, FormatError> {
    let mut reader = Reader::from_str(combined);
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut child_start = 0usize;

    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                if depth == 2 {
                    child_start = before;
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    spans.push((child_start, reader.buffer_position() as usize));
                }
                if depth == 0 {
                    return Err(malformed("unbalanced end tag"));
                }
                depth -= 1;
            }
            Ok(Event::Empty(_)) => {
                if depth == 1 {
                    spans.push((before, reader.buffer_position() as usize));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(&e.to_string())),
        }
    }

    if depth != 0 {
        return Err(malformed("unclosed element"));
    }
    Ok(spans)
}

fn malformed(reason: &str) -> FormatError {
    FormatError::Malformed {
        format: "xml",
        reason: reason.to_string(),
    }
}
