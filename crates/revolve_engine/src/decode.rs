use encoding_rs::{CoderResult, Decoder, UTF_8};
use session_logging::session_debug;

/// Incremental UTF-8 decoder for a chunked response body.
///
/// A multi-byte sequence split across two chunks is held back until the rest
/// arrives. Invalid sequences become U+FFFD instead of failing the stream.
pub struct ChunkDecoder {
    decoder: Decoder,
    finished: bool,
    had_errors: bool,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_with_bom_removal(),
            finished: false,
            had_errors: false,
        }
    }

    /// Decodes one chunk, returning the text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.decode_inner(chunk, false)
    }

    /// Flushes any held-back bytes at end of stream. Later calls return nothing.
    pub fn finish(&mut self) -> String {
        self.decode_inner(&[], true)
    }

    /// Whether any replacement character has been emitted so far.
    pub fn had_errors(&self) -> bool {
        self.had_errors
    }

    fn decode_inner(&mut self, bytes: &[u8], last: bool) -> String {
        let mut text = String::new();
        if self.finished {
            return text;
        }

        let mut remaining = bytes;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(remaining.len())
                .unwrap_or(remaining.len() * 3 + 4);
            text.reserve(needed);
            let (result, read, had_errors) =
                self.decoder.decode_to_string(remaining, &mut text, last);
            if had_errors && !self.had_errors {
                session_debug!("Response body contains invalid UTF-8; replacing");
            }
            self.had_errors |= had_errors;
            remaining = &remaining[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }

        self.finished = last;
        text
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}
