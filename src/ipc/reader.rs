//! Line-oriented [`OperationSource`] over any byte stream.
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"type":"addWidget","widgetType":"clock"}
//! {"type":"moveWidget","id":"clock-1","x":4,"y":0}
//! {"type":"setWidgetLock","id":"clock-1","locked":true}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.  A malformed line is
//! logged and skipped; it never stops the reader.

use crate::operation::LayoutOperation;
use crate::traits::OperationSource;
use log::{debug, error, info};
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc;

/// Errors produced while reading operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse one line.  Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(text: &str) -> Result<Option<LayoutOperation>, SourceError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}

/// An [`OperationSource`] reading newline-delimited JSON from `R`.
///
/// The command-line tool runs one over stdin.
pub struct LineReader<R> {
    inner: BufReader<R>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }
}

impl<R: Read + Send> OperationSource for LineReader<R> {
    type Error = SourceError;

    /// Read until end of input.  This method **blocks**; run it on a
    /// dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<LayoutOperation>) -> Result<(), SourceError> {
        for (index, line) in (&mut self.inner).lines().enumerate() {
            let text = line?;
            match parse_line(&text) {
                Ok(Some(op)) => {
                    debug!("received {}", op.kind());
                    if sink.send(op).is_err() {
                        info!("sink closed, shutting down");
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(e) => error!("line {}: bad operation: {}", index + 1, e),
            }
        }
        debug!("end of input");
        Ok(())
    }
}

//  Tests
