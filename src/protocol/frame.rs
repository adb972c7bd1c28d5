//! Frame accumulation, parsing, and formatting
//!
//! Transport fragments arrive in arbitrary chunks; the [`Accumulator`]
//! collects them until one complete frame is present (head and tail marker
//! both seen). Completeness is a necessary, not sufficient, condition for a
//! successful parse - [`parse`] performs no validation beyond the split.

use super::{codec, Command, FIELD_DELIMITER, FRAME_HEAD, FRAME_TAIL};

/// Buffers incoming text fragments until one complete frame is present.
///
/// The buffer grows monotonically until [`Accumulator::clear`] is called;
/// the dispatcher clears it after every dispatch attempt.
#[derive(Debug, Default)]
pub struct Accumulator {
    buf: String,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` to the buffer. Returns true iff the cumulative buffer
    /// now contains both a head and a tail marker ("ready to parse").
    /// Empty input is a warned no-op.
    pub fn accumulate(&mut self, chunk: &str) -> bool {
        if chunk.is_empty() {
            tracing::warn!("accumulate: chunk is empty, ignoring");
            return false;
        }

        self.buf.push_str(chunk);

        if self.buf.contains(FRAME_HEAD) && self.buf.contains(FRAME_TAIL) {
            tracing::debug!("accumulate: frame ready for dispatch");
            true
        } else {
            tracing::debug!("accumulate: continuing to accumulate");
            false
        }
    }

    /// The accumulated text so far.
    pub fn contents(&self) -> &str {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Strip newlines and surrounding whitespace from a raw serial chunk.
pub fn trim_chunk(data: &str) -> String {
    data.replace('\n', "").trim().to_string()
}

/// Split a complete frame into its fields: command id and optional payload.
///
/// Removes the head and tail markers, then splits once on the delimiter.
/// Returns one or two fields; validation of the command id is the caller's
/// concern.
pub fn parse(frame: &str) -> Vec<String> {
    let stripped: String = frame
        .chars()
        .filter(|c| *c != FRAME_HEAD && *c != FRAME_TAIL)
        .collect();

    stripped
        .splitn(2, FIELD_DELIMITER)
        .map(|s| s.to_string())
        .collect()
}

/// Format a command and payload into a wire frame: `[<id>|<payload>]`.
pub fn format(command: Command, payload: &str) -> String {
    format!(
        "{}{}{}{}{}",
        FRAME_HEAD,
        command.id(),
        FIELD_DELIMITER,
        payload,
        FRAME_TAIL
    )
}

/// Frame a received datagram as an outbound RECV_DATA unit.
pub fn recv_frame(data: &[u8]) -> String {
    format(Command::RecvData, codec::encode(data).trim())
}

/// Frame a location fix as an outbound GET_LOCATION answer.
pub fn location_frame(location: &str) -> String {
    format(Command::GetLocation, &codec::encode(location.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_until_complete() {
        let mut acc = Accumulator::new();
        assert!(!acc.accumulate("[1|10.0"));
        assert!(!acc.accumulate(".0.5 90"));
        assert!(acc.accumulate("00]"));
        assert_eq!(acc.contents(), "[1|10.0.0.5 9000]");
    }

    #[test]
    fn test_accumulate_empty_input_is_noop() {
        let mut acc = Accumulator::new();
        assert!(!acc.accumulate(""));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_accumulate_reports_presence_not_validity() {
        // Completeness only checks for both markers, not frame shape.
        let mut acc = Accumulator::new();
        assert!(acc.accumulate("]["));
    }

    #[test]
    fn test_parse_two_fields() {
        let fields = parse("[1|10.0.0.5 9000]");
        assert_eq!(fields, vec!["1", "10.0.0.5 9000"]);
    }

    #[test]
    fn test_parse_single_field() {
        let fields = parse("[2]");
        assert_eq!(fields, vec!["2"]);
    }

    #[test]
    fn test_parse_empty_payload() {
        let fields = parse("[2|]");
        assert_eq!(fields, vec!["2", ""]);
    }

    #[test]
    fn test_format_parse_roundtrip() {
        let frame = format(Command::SendData, "AQI=");
        assert_eq!(frame, "[4|AQI=]");
        assert_eq!(parse(&frame), vec!["4", "AQI="]);
    }

    #[test]
    fn test_recv_frame_is_base64_payload() {
        let frame = recv_frame(&[0x01, 0x02]);
        assert_eq!(frame, "[8|AQI=]");
    }

    #[test]
    fn test_location_frame_uses_decimal_id() {
        let frame = location_frame("37.0 -122.0");
        assert!(frame.starts_with("[22|"));
        let fields = parse(&frame);
        assert_eq!(codec::decode(&fields[1]).unwrap(), b"37.0 -122.0");
    }

    #[test]
    fn test_trim_chunk_strips_newlines() {
        assert_eq!(trim_chunk("[2|]\n"), "[2|]");
        assert_eq!(trim_chunk("  [2\n|]  "), "[2|]");
    }
}
