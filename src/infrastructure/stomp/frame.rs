use super::constants::{STOMP_VERSION, StompCommand};

/// A STOMP frame with a UTF-8 body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    #[must_use]
    pub const fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header; repeated headers keep the first occurrence.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn connect(host: &str, heartbeat: (u64, u64), token: Option<&str>) -> Self {
        let mut frame = Self::new(StompCommand::Connect)
            .header("accept-version", STOMP_VERSION)
            .header("host", host)
            .header("heart-beat", format!("{},{}", heartbeat.0, heartbeat.1));
        if let Some(token) = token {
            frame = frame.header("Authorization", format!("Bearer {token}"));
        }
        frame
    }

    #[must_use]
    pub fn subscribe(id: u64, destination: &str) -> Self {
        Self::new(StompCommand::Subscribe)
            .header("id", format!("sub-{id}"))
            .header("destination", destination)
            .header("ack", "auto")
    }

    #[must_use]
    pub fn unsubscribe(id: u64) -> Self {
        Self::new(StompCommand::Unsubscribe).header("id", format!("sub-{id}"))
    }

    #[must_use]
    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        Self::new(StompCommand::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .with_body(body)
    }

    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(StompCommand::Disconnect)
    }

    /// Subscription id carried by a MESSAGE frame.
    #[must_use]
    pub fn subscription_id(&self) -> Option<u64> {
        self.get("subscription")
            .and_then(|raw| raw.strip_prefix("sub-"))
            .and_then(|raw| raw.parse().ok())
    }

    /// Broker-reported reason of an ERROR frame.
    #[must_use]
    pub fn error_message(&self) -> String {
        match (self.get("message"), self.body.trim()) {
            (Some(message), "") => message.to_string(),
            (Some(message), body) => format!("{message}: {body}"),
            (None, "") => "unspecified broker error".to_string(),
            (None, body) => body.to_string(),
        }
    }
}

/// Heart-beat intervals agreed with the broker, in milliseconds; zero means
/// disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat {
    pub send_every_ms: u64,
    pub expect_every_ms: u64,
}

impl Heartbeat {
    /// Combines the client's `(cx, cy)` with the broker's `heart-beat`
    /// header as described by STOMP 1.2.
    #[must_use]
    pub fn negotiate(client: (u64, u64), server_header: Option<&str>) -> Self {
        let (sx, sy) = server_header
            .and_then(|raw| raw.split_once(','))
            .and_then(|(x, y)| Some((x.trim().parse::<u64>().ok()?, y.trim().parse::<u64>().ok()?)))
            .unwrap_or((0, 0));
        let (cx, cy) = client;

        Self {
            send_every_ms: if cx == 0 || sy == 0 { 0 } else { cx.max(sy) },
            expect_every_ms: if cy == 0 || sx == 0 { 0 } else { cy.max(sx) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_connect_frame_headers() {
        let frame = Frame::connect("chat.example.com", (10_000, 10_000), Some("abc"));
        assert_eq!(frame.get("accept-version"), Some("1.2"));
        assert_eq!(frame.get("heart-beat"), Some("10000,10000"));
        assert_eq!(frame.get("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn test_subscription_id_roundtrip() {
        let sub = Frame::subscribe(7, "/topic/chat/room/1");
        let message = Frame::new(StompCommand::Message).header("subscription", sub.get("id").unwrap());
        assert_eq!(message.subscription_id(), Some(7));
        assert_eq!(Frame::new(StompCommand::Message).subscription_id(), None);
    }

    #[test]
    fn test_error_message_combines_header_and_body() {
        let frame = Frame::new(StompCommand::Error)
            .header("message", "Access denied")
            .with_body("token expired");
        assert_eq!(frame.error_message(), "Access denied: token expired");
        assert_eq!(Frame::new(StompCommand::Error).error_message(), "unspecified broker error");
    }

    #[test_case((10_000, 10_000), Some("5000,20000"), 20_000, 10_000 ; "takes the larger side")]
    #[test_case((10_000, 10_000), Some("0,0"), 0, 0 ; "broker disables")]
    #[test_case((0, 0), Some("5000,5000"), 0, 0 ; "client disables")]
    #[test_case((10_000, 10_000), None, 0, 0 ; "missing header")]
    #[test_case((10_000, 10_000), Some("garbage"), 0, 0 ; "bad header")]
    fn test_heartbeat_negotiation(client: (u64, u64), header: Option<&str>, send: u64, expect: u64) {
        let hb = Heartbeat::negotiate(client, header);
        assert_eq!(hb.send_every_ms, send);
        assert_eq!(hb.expect_every_ms, expect);
    }
}
