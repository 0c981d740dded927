use super::constants::StompCommand;
use super::error::{StompError, StompResult};
use super::frame::Frame;

/// Unit decoded from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// One or more bare end-of-line heart-beats.
    Heartbeat,
    Frame(Frame),
}

/// STOMP 1.2 frame codec. Frames may span websocket messages, so input is
/// buffered until a full frame is available.
#[derive(Debug, Default)]
pub struct StompCodec {
    buffer: Vec<u8>,
}

impl StompCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    #[must_use]
    pub fn encode(frame: &Frame) -> String {
        let escape = frame.command.escapes_headers();
        let mut out = String::with_capacity(frame.body.len() + 64);
        out.push_str(frame.command.as_str());
        out.push('\n');
        for (name, value) in &frame.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !frame.body.is_empty() && frame.get("content-length").is_none() {
            out.push_str("content-length:");
            out.push_str(&frame.body.len().to_string());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&frame.body);
        out.push('\0');
        out
    }

    /// Feeds raw bytes and returns everything that became complete.
    ///
    /// # Errors
    ///
    /// Returns `StompError::MalformedFrame` on an unknown command, a bad
    /// header line, invalid UTF-8 or a body that overruns `content-length`.
    pub fn decode(&mut self, data: &[u8]) -> StompResult<Vec<Inbound>> {
        self.buffer.extend_from_slice(data);
        let mut decoded = Vec::new();

        loop {
            let eols = leading_eols(&self.buffer);
            if eols > 0 {
                self.buffer.drain(..eols);
                decoded.push(Inbound::Heartbeat);
            }
            if self.buffer.is_empty() {
                break;
            }
            match self.next_frame()? {
                Some(frame) => decoded.push(Inbound::Frame(frame)),
                None => break,
            }
        }

        Ok(decoded)
    }

    fn next_frame(&mut self) -> StompResult<Option<Frame>> {
        let Some((head_end, body_start)) = find_head_end(&self.buffer) else {
            return Ok(None);
        };

        let head = std::str::from_utf8(&self.buffer[..head_end])
            .map_err(|e| StompError::malformed(format!("header is not UTF-8: {e}")))?;
        let mut lines = head.lines();
        let command_line = lines.next().unwrap_or_default().trim_end_matches('\r');
        let command = StompCommand::parse(command_line)
            .ok_or_else(|| StompError::malformed(format!("unknown command {command_line:?}")))?;

        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| StompError::malformed(format!("header without colon: {line:?}")))?;
            if command.escapes_headers() {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| StompError::malformed(format!("bad content-length {v:?}")))
            })
            .transpose()?;

        let body_end = match content_length {
            Some(len) => {
                let end = body_start + len;
                if self.buffer.len() <= end {
                    return Ok(None);
                }
                if self.buffer[end] != 0 {
                    return Err(StompError::malformed("body longer than content-length"));
                }
                end
            }
            None => match self.buffer[body_start..].iter().position(|&b| b == 0) {
                Some(offset) => body_start + offset,
                None => return Ok(None),
            },
        };

        let body = String::from_utf8(self.buffer[body_start..body_end].to_vec())
            .map_err(|e| StompError::malformed(format!("body is not UTF-8: {e}")))?;
        self.buffer.drain(..=body_end);

        Ok(Some(Frame {
            command,
            headers,
            body,
        }))
    }
}

fn leading_eols(buffer: &[u8]) -> usize {
    let mut i = 0;
    loop {
        match buffer.get(i..) {
            Some([b'\n', ..]) => i += 1,
            Some([b'\r', b'\n', ..]) => i += 2,
            _ => return i,
        }
    }
}

/// Locates the blank line ending the headers. Returns the end of the header
/// block and the start of the body.
fn find_head_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < buffer.len() {
        if buffer[i] == b'\n' {
            match buffer.get(i + 1..) {
                Some([b'\n', ..]) => return Some((i, i + 2)),
                Some([b'\r', b'\n', ..]) => return Some((i, i + 3)),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

fn escape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(value: &str) -> StompResult<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(StompError::malformed(format!(
                    "undefined escape sequence \\{}",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &str) -> Vec<Inbound> {
        StompCodec::new().decode(input.as_bytes()).unwrap()
    }

    fn frame(inbound: &Inbound) -> &Frame {
        match inbound {
            Inbound::Frame(frame) => frame,
            Inbound::Heartbeat => panic!("expected a frame"),
        }
    }

    #[test]
    fn test_encode_send_frame() {
        let encoded = StompCodec::encode(&Frame::send("/app/chat/room/1/send", "{}"));
        assert_eq!(
            encoded,
            "SEND\ndestination:/app/chat/room/1/send\ncontent-type:application/json\ncontent-length:2\n\n{}\0"
        );
    }

    #[test]
    fn test_encode_escapes_headers_except_connect() {
        let send = Frame::new(StompCommand::Send).header("note", "a:b\nc");
        assert!(StompCodec::encode(&send).contains("note:a\\cb\\nc\n"));

        let connect = Frame::new(StompCommand::Connect).header("host", "h:1");
        assert!(StompCodec::encode(&connect).contains("host:h:1\n"));
    }

    #[test]
    fn test_decode_message_with_content_length() {
        let decoded = decode_all(
            "MESSAGE\nsubscription:sub-1\ndestination:/topic/x\ncontent-length:5\n\nhe\0lo\0",
        );
        assert_eq!(decoded.len(), 1);
        let message = frame(&decoded[0]);
        assert_eq!(message.command, StompCommand::Message);
        assert_eq!(message.body, "he\0lo");
        assert_eq!(message.subscription_id(), Some(1));
    }

    #[test]
    fn test_decode_heartbeats_between_frames() {
        let decoded = decode_all("\n\r\nMESSAGE\ndestination:/a\n\nx\0\nMESSAGE\ndestination:/b\n\ny\0");
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0], Inbound::Heartbeat);
        assert_eq!(frame(&decoded[1]).body, "x");
        assert_eq!(decoded[2], Inbound::Heartbeat);
        assert_eq!(frame(&decoded[3]).get("destination"), Some("/b"));
    }

    #[test]
    fn test_decode_frame_split_across_reads() {
        let mut codec = StompCodec::new();
        assert!(codec.decode(b"MESSAGE\ndestina").unwrap().is_empty());
        assert!(codec.decode(b"tion:/a\n\n{\"k\":").unwrap().is_empty());
        let decoded = codec.decode(b"1}\0").unwrap();
        assert_eq!(frame(&decoded[0]).body, "{\"k\":1}");
    }

    #[test]
    fn test_decode_unescapes_and_keeps_first_repeated_header() {
        let decoded = decode_all("MESSAGE\nfoo:a\\cb\nfoo:second\n\n\0");
        assert_eq!(frame(&decoded[0]).get("foo"), Some("a:b"));
    }

    #[test]
    fn test_decode_crlf_lines() {
        let decoded = decode_all("CONNECTED\r\nversion:1.2\r\nheart-beat:0,0\r\n\r\n\0");
        let connected = frame(&decoded[0]);
        assert_eq!(connected.command, StompCommand::Connected);
        assert_eq!(connected.get("heart-beat"), Some("0,0"));
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert!(StompCodec::new().decode(b"BOGUS\n\n\0").is_err());
        assert!(StompCodec::new().decode(b"MESSAGE\nno-colon\n\n\0").is_err());
        assert!(StompCodec::new().decode(b"MESSAGE\nbad:\\x\n\n\0").is_err());
        assert!(
            StompCodec::new()
                .decode(b"MESSAGE\ncontent-length:1\n\nabc\0")
                .is_err()
        );
    }

    #[test]
    fn test_encode_decode_preserves_body() {
        let original = Frame::send("/app/x", "{\"content\":\"hi: there\"}");
        let decoded = decode_all(&StompCodec::encode(&original));
        let parsed = frame(&decoded[0]);
        assert_eq!(parsed.body, original.body);
        assert_eq!(parsed.get("destination"), Some("/app/x"));
    }
}
