// Newline framing for peer connections.

/// Upper bound for one line; anything longer is dropped.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Line(String),
    /// A line exceeded `MAX_LINE_BYTES` and was discarded.
    Oversized,
}

/// Accumulates bytes from a stream and yields complete lines.
///
/// Trailing `\r` is stripped, blank lines are skipped, and invalid UTF-8 is replaced rather
/// than treated as an error. A partial line is kept until its terminator arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    // Inside an oversized line; drop bytes until the next newline.
    discarding: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }

            self.buf.extend_from_slice(head);
            if self.buf.len() > MAX_LINE_BYTES {
                self.buf.clear();
                frames.push(Frame::Oversized);
                continue;
            }

            let raw = std::mem::take(&mut self.buf);
            let raw = raw.strip_suffix(b"\r").unwrap_or(&raw);
            let line = String::from_utf8_lossy(raw);
            if !line.trim().is_empty() {
                frames.push(Frame::Line(line.into_owned()));
            }
        }

        if self.discarding {
            return frames;
        }

        self.buf.extend_from_slice(rest);
        if self.buf.len() > MAX_LINE_BYTES {
            self.buf.clear();
            self.discarding = true;
            frames.push(Frame::Oversized);
        }

        frames
    }

    /// Bytes of the current partial line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
