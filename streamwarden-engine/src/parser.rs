//! Line-oriented stream file parser
//!
//! ```text
//! #stream-1
//! ssh,alice,secret
//! dir
//! sudo,secret
//! ```
//!
//! `#stream-<id>` opens a stream named `<id>`; following lines up to the next
//! marker are comma-separated event records. Records with an unknown tag or
//! the wrong number of fields, and blank lines, are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::model::{Event, Stream};

/// Prefix that opens a new stream
pub const STREAM_MARKER: &str = "#stream-";

/// Parse a single event record; `None` for anything that is not a valid event
pub fn parse_event(line: &str) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let parts: Vec<&str> = line.split(',').collect();
    match parts.as_slice() {
        ["ssh", name, passwd] => Some(Event::ssh(*name, *passwd)),
        ["sudo", passwd] => Some(Event::sudo(*passwd)),
        ["dir"] => Some(Event::Dir),
        _ => None,
    }
}

/// Parse every stream from a buffered reader
pub fn parse_streams<R: BufRead>(reader: R) -> Result<Vec<Stream>> {
    let mut streams = Vec::new();
    let mut current: Option<Stream> = None;
    let mut skipped = 0usize;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if let Some(id) = line.strip_prefix(STREAM_MARKER) {
            if let Some(done) = current.take() {
                streams.push(done);
            }
            current = Some(Stream::new(id, Vec::new()));
            continue;
        }

        let Some(stream) = current.as_mut() else {
            continue;
        };
        match parse_event(line) {
            Some(event) => stream.events.push(event),
            None if line.is_empty() => {}
            None => {
                skipped += 1;
                debug!(stream_id = %stream.stream_id, line, "Skipping malformed event record");
            }
        }
    }

    if let Some(done) = current {
        streams.push(done);
    }

    debug!(streams = streams.len(), skipped, "Parsed stream input");
    Ok(streams)
}

/// Parse streams from an in-memory string
pub fn parse_str(data: &str) -> Vec<Stream> {
    // Reading from a byte slice cannot fail
    parse_streams(data.as_bytes()).unwrap_or_default()
}

/// Parse streams from a file on disk
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Stream>> {
    let file = File::open(path.as_ref())?;
    parse_streams(BufReader::new(file))
}
