use crate::decode::ChunkDecoder;

/// Splits decoded text into newline-terminated records.
///
/// The segment after the last newline is carried over to the next fragment.
/// Blank records are dropped.
#[derive(Debug, Default)]
pub struct LineFramer {
    carry: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        let Some(last_newline) = fragment.rfind('\n') else {
            self.carry.push_str(fragment);
            return Vec::new();
        };

        let end = self.carry.len() + last_newline + 1;
        self.carry.push_str(fragment);
        let tail = self.carry.split_off(end);
        let complete = std::mem::replace(&mut self.carry, tail);
        complete.split('\n').filter_map(into_record).collect()
    }

    /// Emits the carried segment, if any, as the final record.
    pub fn finish(&mut self) -> Option<String> {
        into_record(&std::mem::take(&mut self.carry))
    }

    /// Bytes waiting for their terminating newline.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

fn into_record(segment: &str) -> Option<String> {
    let line = segment.strip_suffix('\r').unwrap_or(segment);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.to_owned())
    }
}

/// Decoder and framer for one response body: raw chunks in, records out.
#[derive(Default)]
pub struct RecordPipeline {
    decoder: ChunkDecoder,
    framer: LineFramer,
}

impl RecordPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        self.framer.push(&text)
    }

    pub fn finish(&mut self) -> Vec<String> {
        let text = self.decoder.finish();
        let mut records = self.framer.push(&text);
        records.extend(self.framer.finish());
        records
    }
}
