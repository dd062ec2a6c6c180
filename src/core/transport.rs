use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tracing::debug;

use crate::api::ChatRequest;
use crate::core::error::ChatError;

const ERROR_BODY_PREVIEW_BYTES: usize = 512;
const ERROR_BODY_PREVIEW_TIMEOUT: Duration = Duration::from_millis(250);

/// Raw response body chunks. An item error means the body broke off after it
/// started; the stream ending means the reply is complete.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, String>>;

/// One request/response exchange with the remote endpoint.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `request` and resolves once response headers arrive. Failing to
    /// connect or a non-success status is a [`ChatError::Transport`].
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, ChatError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn with_connect_timeout(
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, endpoint))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| ChatError::transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body_preview(response).await;
            debug!(
                status = status.as_u16(),
                body = %body.trim(),
                "Chat endpoint returned an error status"
            );
            return Err(ChatError::http_status(status.as_u16()));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(|err| err.to_string()));
        Ok(body.boxed())
    }
}

/// First few hundred bytes of an error response, for diagnostics only. A
/// server that never finishes the body must not hold up the status error.
async fn error_body_preview(response: reqwest::Response) -> String {
    let mut preview = Vec::new();
    let mut body = response.bytes_stream();
    let read = async {
        while let Some(Ok(chunk)) = body.next().await {
            preview.extend_from_slice(&chunk);
            if preview.len() >= ERROR_BODY_PREVIEW_BYTES {
                break;
            }
        }
    };
    let _ = tokio::time::timeout(ERROR_BODY_PREVIEW_TIMEOUT, read).await;
    preview.truncate(ERROR_BODY_PREVIEW_BYTES);
    String::from_utf8_lossy(&preview).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatMessage;
    use crate::utils::test_utils::{read_http_request, spawn_http_server};
    use tokio::io::AsyncWriteExt;

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hello".into(),
            }],
            session_id: "abc".into(),
            model: "gpt-4o-mini".into(),
            memory: false,
        }
    }

    async fn collect(mut body: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.extend(chunk.expect("chunk"));
        }
        out
    }

    #[tokio::test]
    async fn posts_json_and_streams_body() {
        let (addr, server) = spawn_http_server(|mut stream| async move {
            let (request_line, headers, body) = read_http_request(&mut stream).await?;
            let response = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\
                            connection: close\r\n\r\nHi there";
            stream
                .write_all(response.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            Ok((request_line, headers, body))
        })
        .await;

        let transport = HttpTransport::new(format!("http://{addr}/api/chat"));
        let body = transport.open(&request()).await.expect("open");
        assert_eq!(collect(body).await, b"Hi there");

        let (request_line, headers, body) = server.await.expect("join").expect("server");
        assert_eq!(request_line, "POST /api/chat HTTP/1.1");
        assert!(headers.iter().any(|(name, value)| {
            name.eq_ignore_ascii_case("content-type") && value == "application/json"
        }));
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["session_id"], "abc");
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_error() {
        let (addr, server) = spawn_http_server(|mut stream| async move {
            read_http_request(&mut stream).await?;
            let response = "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 4\r\n\
                            connection: close\r\n\r\nboom";
            stream
                .write_all(response.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            Ok(())
        })
        .await;

        let transport = HttpTransport::new(format!("http://{addr}/api/chat"));
        let err = match transport.open(&request()).await {
            Ok(_) => panic!("expected transport error"),
            Err(err) => err,
        };
        assert_eq!(err, ChatError::http_status(500));
        server.await.expect("join").expect("server");
    }

    #[tokio::test]
    async fn unterminated_error_body_does_not_block_open() {
        let (addr, server) = spawn_http_server(|mut stream| async move {
            read_http_request(&mut stream).await?;
            let head = "HTTP/1.1 500 Internal Server Error\r\n\
                        transfer-encoding: chunked\r\n\r\n5\r\nhello\r\n";
            stream
                .write_all(head.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;

        let transport = HttpTransport::new(format!("http://{addr}/api/chat"));
        let result = tokio::time::timeout(Duration::from_secs(3), transport.open(&request()))
            .await
            .expect("open should not wait for the error body to finish");
        match result {
            Ok(_) => panic!("expected transport error"),
            Err(err) => assert_eq!(err, ChatError::http_status(500)),
        }
        server.abort();
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let transport = HttpTransport::new(format!("http://{addr}/api/chat"));
        let err = match transport.open(&request()).await {
            Ok(_) => panic!("expected transport error"),
            Err(err) => err,
        };
        assert!(matches!(err, ChatError::Transport { status: None, .. }));
    }
}
