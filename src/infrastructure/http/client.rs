//! REST client for the chat and notification endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::dto::{
    CreateRoomBody, HistoryResponse, InviteBody, MessageDto, NotificationDto, RoomDto,
    UnreadCountDto,
};
use crate::domain::entities::{
    AccessToken, Message, MessageId, Notification, OutgoingFile, Room, RoomId, UserId,
};
use crate::domain::errors::ChatError;
use crate::domain::ports::{
    ChatApiPort, CreateRoomRequest, HistoryPage, NotificationApiPort, PageRequest,
};

const USER_AGENT: &str = concat!("roomsync/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER_MS: u64 = 5000;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP adapter for [`ChatApiPort`] and [`NotificationApiPort`].
pub struct ChatHttpClient {
    client: Client,
    base_url: String,
    token: Option<AccessToken>,
}

impl ChatHttpClient {
    /// Creates a client against `base_url`, e.g. `https://host/api`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(base_url: impl Into<String>, token: Option<AccessToken>) -> Result<Self, ChatError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChatError::unexpected(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header(header::AUTHORIZATION, token.bearer()),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ChatError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after_ms = retry_after_ms(response.headers());
        let body = response.bytes().await.unwrap_or_default();
        let error = error_for_status(status, &body, retry_after_ms);
        warn!(status = %status, error = %error, "Request failed");
        Err(error)
    }

    async fn json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, ChatError> {
        let response = self.execute(builder).await?;
        let bytes = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(error = %e, what, "Failed to decode response");
            ChatError::decode(format!("{what}: {e}"))
        })
    }

    async fn empty(&self, builder: RequestBuilder) -> Result<(), ChatError> {
        self.execute(builder).await.map(|_| ())
    }
}

fn transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::network("request timed out")
    } else if e.is_connect() {
        ChatError::network(format!("failed to connect: {e}"))
    } else if e.is_decode() {
        ChatError::decode(e.to_string())
    } else {
        ChatError::network(e.to_string())
    }
}

fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1000))
}

/// Maps a non-success status to the domain error.
fn error_for_status(status: StatusCode, body: &[u8], retry_after_ms: Option<u64>) -> ChatError {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        StatusCode::UNAUTHORIZED => ChatError::rejected(format!("unauthorized: {detail}")),
        StatusCode::FORBIDDEN => ChatError::rejected(format!("access denied: {detail}")),
        StatusCode::NOT_FOUND => ChatError::not_found(detail),
        StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimited {
            retry_after_ms: retry_after_ms.unwrap_or(DEFAULT_RETRY_AFTER_MS),
        },
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ChatError::network(format!("server temporarily unavailable: {detail}"))
        }
        _ => ChatError::unexpected(format!("unexpected response: {status} - {detail}")),
    }
}

fn decode_count(bytes: &[u8]) -> Result<u32, ChatError> {
    serde_json::from_slice::<UnreadCountDto>(bytes)
        .map(|dto| dto.count)
        .or_else(|_| serde_json::from_slice::<u32>(bytes))
        .map_err(|e| ChatError::decode(format!("unread count: {e}")))
}

#[async_trait]
impl ChatApiPort for ChatHttpClient {
    async fn fetch_rooms(&self) -> Result<Vec<Room>, ChatError> {
        debug!("Fetching rooms");
        let rooms: Vec<RoomDto> = self
            .json(self.request(Method::GET, "/chat/rooms"), "rooms")
            .await?;
        Ok(rooms.into_iter().map(Room::from).collect())
    }

    async fn fetch_room(&self, room_id: RoomId) -> Result<Room, ChatError> {
        let path = format!("/chat/rooms/{room_id}");
        let room: RoomDto = self.json(self.request(Method::GET, &path), "room").await?;
        Ok(room.into())
    }

    async fn fetch_history(
        &self,
        room_id: RoomId,
        page: PageRequest,
    ) -> Result<HistoryPage, ChatError> {
        debug!(room_id = %room_id, page = page.page, size = page.size, "Fetching history");
        let path = format!("/chat/rooms/{room_id}/messages");
        let builder = self
            .request(Method::GET, &path)
            .query(&[("page", page.page), ("size", page.size)]);
        let response: HistoryResponse = self.json(builder, "history").await?;
        Ok(response.into_page(page.size))
    }

    async fn mark_room_read(
        &self,
        room_id: RoomId,
        last_message_id: Option<MessageId>,
    ) -> Result<(), ChatError> {
        let path = format!("/chat/rooms/{room_id}/read");
        let mut builder = self.request(Method::PATCH, &path);
        if let Some(id) = &last_message_id {
            builder = builder.query(&[("lastMessageId", id.as_str())]);
        }
        self.empty(builder).await
    }

    async fn create_room(&self, request: CreateRoomRequest) -> Result<Room, ChatError> {
        let body = CreateRoomBody {
            name: &request.name,
            member_ids: request.member_ids.iter().map(UserId::as_str).collect(),
        };
        let room: RoomDto = self
            .json(self.request(Method::POST, "/chat/rooms").json(&body), "room")
            .await?;
        Ok(room.into())
    }

    async fn invite(&self, room_id: RoomId, user_ids: Vec<UserId>) -> Result<(), ChatError> {
        let path = format!("/chat/rooms/{room_id}/invite");
        let body = InviteBody {
            user_ids: user_ids.iter().map(UserId::as_str).collect(),
        };
        self.empty(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn leave(&self, room_id: RoomId) -> Result<(), ChatError> {
        let path = format!("/chat/rooms/{room_id}/leave");
        self.empty(self.request(Method::POST, &path)).await
    }

    async fn send_with_files(
        &self,
        room_id: RoomId,
        content: String,
        files: Vec<OutgoingFile>,
    ) -> Result<Message, ChatError> {
        let file_count = files.len();
        let mut form = Form::new().text("content", content);
        for file in files {
            let mut part = Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(content_type) = &file.content_type {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| ChatError::invalid_input(format!("bad content type: {e}")))?;
            }
            form = form.part("files", part);
        }

        debug!(room_id = %room_id, files = file_count, "Sending message with attachments");
        let path = format!("/chat/rooms/{room_id}/messages");
        let message: MessageDto = self
            .json(self.request(Method::POST, &path).multipart(form), "message")
            .await?;
        Ok(message.into())
    }
}

#[async_trait]
impl NotificationApiPort for ChatHttpClient {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ChatError> {
        let items: Vec<NotificationDto> = self
            .json(self.request(Method::GET, "/notifications"), "notifications")
            .await?;
        Ok(items.into_iter().map(Notification::from).collect())
    }

    async fn fetch_unread_count(&self) -> Result<u32, ChatError> {
        let response = self
            .execute(self.request(Method::GET, "/notifications/unread-count"))
            .await?;
        let bytes = response.bytes().await.map_err(transport_error)?;
        decode_count(&bytes)
    }

    async fn mark_all_read(&self) -> Result<(), ChatError> {
        self.empty(self.request(Method::PATCH, "/notifications/read-all"))
            .await
    }

    async fn delete_all(&self) -> Result<(), ChatError> {
        self.empty(self.request(Method::DELETE, "/notifications"))
            .await
    }
}
