//! Character-level read cursor handed to token classifiers.
//!
//! A classifier sees one contiguous span of the buffer through a
//! [`ScanInput`] and consumes it a character at a time. The driving loop
//! owns token boundaries: after the classifier reports a token, the driver
//! calls [`ScanInput::finish_token`] to collect its length and rearm the
//! cursor for the next one.

use std::str::Chars;

use text_size::{TextLen, TextSize};

/// Sentinel returned by lookahead past the end of the scanned span.
pub const EOF_CHAR: char = '\0';

/// Read cursor over one span of text.
pub struct ScanInput<'text> {
    text: &'text str,
    chars: Chars<'text>,
    remaining_at_token_start: TextSize,
    previous: char,
}

impl<'text> ScanInput<'text> {
    pub fn new(text: &'text str) -> Self {
        Self {
            text,
            chars: text.chars(),
            remaining_at_token_start: text.text_len(),
            previous: EOF_CHAR,
        }
    }

    fn remaining(&self) -> TextSize {
        TextSize::new(self.chars.as_str().len() as u32)
    }

    /// Returns the character last consumed by [`advance`](Self::advance).
    pub fn previous(&self) -> char {
        self.previous
    }

    /// Returns the next character without consuming it.
    pub fn peek(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    /// Returns the character after [`peek`](Self::peek) without consuming.
    pub fn peek_second(&self) -> char {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next().unwrap_or(EOF_CHAR)
    }

    /// Consumes and returns the next character, or [`EOF_CHAR`] at the end.
    pub fn advance(&mut self) -> char {
        self.previous = self.chars.next().unwrap_or(EOF_CHAR);
        self.previous
    }

    /// Consumes characters while `f` holds and the span is not exhausted.
    pub fn advance_while(&mut self, f: impl Fn(char) -> bool + Copy) {
        while self.peek() != EOF_CHAR && f(self.peek()) {
            self.advance();
        }
    }

    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Length consumed since the last [`finish_token`](Self::finish_token).
    pub fn scanned_len(&self) -> TextSize {
        self.remaining_at_token_start - self.remaining()
    }

    /// Offset of the current token's first character within the span.
    pub fn token_start(&self) -> TextSize {
        self.text.text_len() - self.remaining_at_token_start
    }

    /// Text consumed since the last [`finish_token`](Self::finish_token).
    pub fn scanned_text(&self) -> &'text str {
        let start: usize = self.token_start().into();
        let end: usize = (self.token_start() + self.scanned_len()).into();
        &self.text[start..end]
    }

    /// Ends the current token, returning its length and rearming the cursor.
    ///
    /// Called by the driving loop, not by classifiers.
    pub fn finish_token(&mut self) -> TextSize {
        let len = self.scanned_len();
        self.remaining_at_token_start = self.remaining();
        len
    }
}
