//! Upstream connection establishment.
//!
//! [`UpstreamConnector`] is the seam between the relay loop and the transport
//! used to reach the transcription service. The production implementation opens
//! a tokio-tungstenite client socket with the configured credential attached to
//! the handshake.

use std::time::Duration;

use async_trait::async_trait;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

use super::{
    error::{RelayError, RelayResult},
    frame::Frame,
};
use crate::config::RelayConfig;

/// A bidirectional frame socket: a stream of inbound frames and a sink for
/// outbound ones.
pub trait FrameSocket:
    Stream<Item = RelayResult<Frame>> + Sink<Frame, Error = RelayError> + Send + Unpin + 'static
{
}

impl<T> FrameSocket for T where
    T: Stream<Item = RelayResult<Frame>> + Sink<Frame, Error = RelayError> + Send + Unpin + 'static
{
}

pub type BoxFrameSocket = Box<dyn FrameSocket>;

/// Opens the outbound half of a connection pair.
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    async fn connect(&self) -> RelayResult<BoxFrameSocket>;
}

/// Connects to the AssemblyAI realtime endpoint over tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct AssemblyAiConnector {
    url: String,
    authorization: HeaderValue,
    connect_timeout: Option<Duration>,
}

impl AssemblyAiConnector {
    pub fn new(url: impl Into<String>, api_key: &str) -> RelayResult<Self> {
        let mut authorization = HeaderValue::from_str(api_key)
            .map_err(|e| RelayError::InvalidRequest(format!("invalid API key header: {e}")))?;
        authorization.set_sensitive(true);
        Ok(Self {
            url: url.into(),
            authorization,
            connect_timeout: None,
        })
    }

    pub fn from_config(config: &RelayConfig) -> RelayResult<Self> {
        Ok(Self::new(config.upstream_url.as_str(), &config.api_key)?
            .with_connect_timeout(config.connect_timeout))
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UpstreamConnector for AssemblyAiConnector {
    async fn connect(&self) -> RelayResult<BoxFrameSocket> {
        let mut request = self.url.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.authorization.clone());

        let handshake = connect_async(request);
        let (stream, response) = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, handshake)
                .await
                .map_err(|_| RelayError::ConnectTimeout(limit))??,
            None => handshake.await?,
        };

        debug!(
            url = %self.url,
            status = %response.status(),
            "Upstream handshake complete"
        );
        let socket: BoxFrameSocket = Box::new(upstream_socket(stream));
        Ok(socket)
    }
}

/// Adapt a tungstenite client stream into a [`FrameSocket`].
pub fn upstream_socket(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> impl FrameSocket {
    stream
        .sink_map_err(RelayError::Upstream)
        .with(|frame: Frame| future::ready(Ok::<_, RelayError>(frame.into_upstream())))
        .filter_map(|event| {
            future::ready(match event {
                Ok(message) => Frame::from_upstream(message).map(Ok),
                Err(e) => Some(Err(RelayError::Upstream(e))),
            })
        })
}
