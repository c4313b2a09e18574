/// Event name assumed when a block carries no `event:` field.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// One complete SSE block: its name and the raw (undecoded) data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: Option<String>,
}

impl SseEvent {
    #[must_use]
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: Some(data.into()),
        }
    }
}

/// Incremental parser for SSE text streams.
///
/// Bytes may be split anywhere, including inside a UTF-8 code point or between
/// the `\r` and `\n` of a line ending.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: String,
    pending_bytes: Vec<u8>,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.decode_into_buffer(bytes);
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut events = Vec::new();
        while let Some(split) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..split + 2).collect();
            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
        }

        events
    }

    /// Flush whatever is left once the underlying stream has ended.
    ///
    /// Covers servers that omit the blank line after the final event.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        let remainder = std::mem::take(&mut self.buffer);
        parse_block(&remainder.replace("\r\n", "\n"))
    }

    /// Parse a complete SSE payload string in one shot, including a trailing
    /// unterminated block.
    pub fn parse_frames(input: &str) -> Vec<SseEvent> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes());
        events.extend(parser.finish());
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty() && self.pending_bytes.is_empty()
    }

    fn decode_into_buffer(&mut self, bytes: &[u8]) {
        self.pending_bytes.extend_from_slice(bytes);

        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending_bytes.clear();
                    return;
                }
                Err(error) => {
                    let valid = error.valid_up_to();
                    self.buffer
                        .push_str(std::str::from_utf8(&self.pending_bytes[..valid]).unwrap_or_default());
                    match error.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.drain(..valid + invalid);
                        }
                        None => {
                            // Incomplete code point at the end; wait for more bytes.
                            self.pending_bytes.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut name: Option<String> = None;
    let mut data: Option<String> = None;

    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.trim();
        match field.trim() {
            "event" if !value.is_empty() => name = Some(value.to_owned()),
            // Last `data:` line wins.
            "data" => data = Some(value.to_owned()).filter(|value| !value.is_empty()),
            _ => {}
        }
    }

    let event = name.unwrap_or_else(|| DEFAULT_EVENT_NAME.to_owned());
    if event == DEFAULT_EVENT_NAME && data.is_none() {
        return None;
    }

    Some(SseEvent { event, data })
}
