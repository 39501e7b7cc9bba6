pub const RESET_ID_SENTINEL: &str = "reset";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventId {
    Value(String),
    Reset,
}

impl EventId {
    fn from_field_value(value: String) -> Self {
        if value == RESET_ID_SENTINEL {
            Self::Reset
        } else {
            Self::Value(value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub id: Option<EventId>,
    pub retry_ms: Option<u64>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseParser {
    pending_line: Vec<u8>,
    data_lines: Vec<String>,
    id: Option<EventId>,
    retry_ms: Option<u64>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut emitted = Vec::new();
        for byte in chunk {
            if *byte == b'\n' {
                self.process_completed_line(&mut emitted);
            } else {
                self.pending_line.push(*byte);
            }
        }
        emitted
    }

    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.pending_line.is_empty() {
            let mut line = std::mem::take(&mut self.pending_line);
            trim_trailing_carriage_return(&mut line);
            self.apply_line(&line);
        }
        self.flush_block()
    }

    fn process_completed_line(&mut self, emitted: &mut Vec<SseEvent>) {
        let mut line = std::mem::take(&mut self.pending_line);
        trim_trailing_carriage_return(&mut line);
        if line.is_empty() {
            if let Some(event) = self.flush_block() {
                emitted.push(event);
            }
            return;
        }
        self.apply_line(&line);
    }

    fn apply_line(&mut self, line: &[u8]) {
        if line.first() == Some(&b':') {
            return;
        }
        let (field_bytes, value_bytes) = parse_field_line(line);
        if field_bytes.is_empty() {
            return;
        }
        let field = String::from_utf8_lossy(field_bytes);
        let value = String::from_utf8_lossy(value_bytes).into_owned();
        match field.as_ref() {
            "data" => {
                self.data_lines.push(value);
            }
            "id" => {
                if !value.contains('\0') {
                    self.id = Some(EventId::from_field_value(value));
                }
            }
            "retry" => {
                if let Ok(retry_ms) = value.parse::<u64>() {
                    self.retry_ms = Some(retry_ms);
                }
            }
            _ => {}
        }
    }

    // A block whose data buffer stayed empty yields nothing; its pending
    // id and retry fields are discarded with it.
    fn flush_block(&mut self) -> Option<SseEvent> {
        let id = self.id.take();
        let retry_ms = self.retry_ms.take();
        let data = std::mem::take(&mut self.data_lines).join("\n");
        if data.is_empty() {
            return None;
        }
        Some(SseEvent { id, retry_ms, data })
    }
}

fn trim_trailing_carriage_return(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

fn parse_field_line(line: &[u8]) -> (&[u8], &[u8]) {
    if let Some(separator_index) = line.iter().position(|byte| *byte == b':') {
        let field = &line[..separator_index];
        let mut value = &line[separator_index + 1..];
        if value.first() == Some(&b' ') {
            value = &value[1..];
        }
        (field, value)
    } else {
        (line, &[])
    }
}
