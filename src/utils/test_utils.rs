use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::ChatRequest;
use crate::core::error::ChatError;
use crate::core::message::Message;
use crate::core::transport::{ByteStream, ChatTransport};

pub type HttpRequestParts = (String, Vec<(String, String)>, Vec<u8>);

/// Binds an ephemeral port and serves exactly one connection with `handler`.
pub async fn spawn_http_server<F, Fut, T>(handler: F) -> (SocketAddr, JoinHandle<Result<T, String>>)
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
        handler(stream).await
    });
    (addr, task)
}

pub async fn read_http_request(stream: &mut TcpStream) -> Result<HttpRequestParts, String> {
    use tokio::io::AsyncReadExt;

    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.expect("header end should exist");
    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing HTTP request line".to_string())?
        .to_string();

    let mut headers = Vec::new();
    let mut content_length = 0_usize;
    for line in lines {
        let mut parts = line.splitn(2, ':');
        let Some(name) = parts.next() else {
            continue;
        };
        let value = parts.next().unwrap_or_default().trim().to_string();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().map_err(|err| err.to_string())?;
        }
        headers.push((name.to_string(), value));
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length.saturating_sub(body.len())];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok((request_line, headers, body))
}

/// Feeds body chunks into a [`ScriptedTransport`] stream one at a time.
/// Dropping the feeder ends the body.
pub struct ChunkFeeder {
    tx: mpsc::UnboundedSender<Result<Vec<u8>, String>>,
}

impl ChunkFeeder {
    pub fn chunk(&self, bytes: impl AsRef<[u8]>) {
        let _ = self.tx.send(Ok(bytes.as_ref().to_vec()));
    }

    pub fn fail(&self, message: &str) {
        let _ = self.tx.send(Err(message.to_string()));
    }

    pub fn done(self) {}

    /// True once the consuming side has dropped the body.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

enum ScriptedResponse {
    Refuse(ChatError),
    Body(mpsc::UnboundedReceiver<Result<Vec<u8>, String>>),
}

/// In-memory transport answering each `open` with the next scripted response
/// and recording every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a streamed reply and returns the handle that drives it.
    pub fn push_stream(&self) -> ChunkFeeder {
        let (tx, rx) = mpsc::unbounded_channel();
        self.responses
            .lock()
            .unwrap()
            .push_back(ScriptedResponse::Body(rx));
        ChunkFeeder { tx }
    }

    /// Queues a reply that is already complete.
    pub fn push_body(&self, chunks: &[&str]) {
        let feeder = self.push_stream();
        for chunk in chunks {
            feeder.chunk(chunk);
        }
        feeder.done();
    }

    pub fn push_error(&self, error: ChatError) {
        self.responses
            .lock()
            .unwrap()
            .push_back(ScriptedResponse::Refuse(error));
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(ScriptedResponse::Refuse(error)) => Err(error),
            Some(ScriptedResponse::Body(rx)) => {
                let body = futures_util::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                });
                Ok(body.boxed())
            }
            None => Err(ChatError::transport("no scripted response")),
        }
    }
}

pub fn create_test_messages() -> Vec<Message> {
    vec![
        Message::user("Hello"),
        Message::assistant("Hi there!"),
        Message::user("How are you?"),
        Message::assistant("I'm doing well, thank you for asking!"),
    ]
}
