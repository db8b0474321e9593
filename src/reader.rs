// 📖 Record Reader - line-oriented input shared by every text codec
//
// Records are one line each. Blank lines between records are skipped and the
// reader remembers which line it is on, so enclosing readers can point at the
// record that failed.

use crate::error::LedgerResult;
use std::io::{BufRead, Lines};

pub struct RecordReader<R> {
    lines: Lines<R>,
    peeked: Option<String>,
    line_number: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        RecordReader {
            lines: inner.lines(),
            peeked: None,
            line_number: 0,
        }
    }

    /// Next raw line, blank or not.
    pub fn next_line(&mut self) -> LedgerResult<Option<String>> {
        if let Some(line) = self.peeked.take() {
            return Ok(Some(line));
        }
        match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    /// Looks at the next non-blank line without consuming it.
    pub fn peek_record(&mut self) -> LedgerResult<Option<&str>> {
        while self.peeked.is_none() {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            self.line_number += 1;
            let line = line?;
            if !line.trim().is_empty() {
                self.peeked = Some(line);
            }
        }
        Ok(self.peeked.as_deref())
    }

    /// Consumes the next non-blank line.
    pub fn next_record(&mut self) -> LedgerResult<Option<String>> {
        self.peek_record()?;
        Ok(self.peeked.take())
    }

    /// 1-based number of the last line read (peeked lines included).
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

/// Splits the first whitespace-delimited token off `text`.
pub(crate) fn split_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    match text.find(char::is_whitespace) {
        Some(end) => Some((&text[..end], text[end..].trim_start())),
        None => Some((text, "")),
    }
}
