//! Reassembly of newline-delimited records from arbitrarily split chunks.

/// Accumulates raw output chunks and yields complete newline-terminated
/// records.
///
/// Chunk boundaries carry no meaning: a record (or a multi-byte character)
/// may be split across any number of chunks. The trailing fragment after
/// the last newline is held back until more bytes arrive or [`finish`]
/// is called.
///
/// [`finish`]: LineBuffer::finish
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record it completed, in order.
    ///
    /// A chunk containing `k` newlines completes exactly `k` records. The
    /// newline itself is not part of the record; nothing else is trimmed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // Held-back bytes never contain a newline, so only the new chunk
        // needs scanning.
        let Some(last_newline) = chunk.iter().rposition(|b| *b == b'\n') else {
            self.pending.extend_from_slice(chunk);
            return Vec::new();
        };

        self.pending.extend_from_slice(&chunk[..last_newline]);
        let complete = std::mem::replace(&mut self.pending, chunk[last_newline + 1..].to_vec());

        complete
            .split(|b| *b == b'\n')
            .map(|record| String::from_utf8_lossy(record).into_owned())
            .collect()
    }

    /// Close the stream, returning the unterminated trailing fragment if it
    /// holds anything other than whitespace.
    pub fn finish(&mut self) -> Option<String> {
        let pending = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&pending);
        if text.trim().is_empty() {
            None
        } else {
            Some(text.into_owned())
        }
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
