//! Connection pair relay loop.
//!
//! A [`ConnectionPair`] owns one client socket and one upstream socket for the
//! lifetime of a browser session. A single task multiplexes the upstream
//! handshake, client events and upstream events:
//!
//! - client frames are forwarded only while the upstream handle is OPEN and
//!   are dropped otherwise (no queue)
//! - upstream frames are forwarded to the client unconditionally
//! - a close or error on either side drives the other side to CLOSED and ends
//!   the pair

use std::{fmt, future::Future, pin::pin};

use futures::{
    future,
    stream::{SplitSink, SplitStream},
    Sink, SinkExt, Stream, StreamExt,
};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{
    error::{RelayError, RelayResult},
    frame::{CloseReason, Frame},
    upstream::FrameSocket,
};

/// Lifecycle of one end of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Upstream,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => f.write_str("client"),
            Side::Upstream => f.write_str("upstream"),
        }
    }
}

/// Why a pair ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Client sent a close frame or disconnected.
    ClientClosed,
    /// Client socket failed.
    ClientError,
    /// Upstream sent a close frame, carrying its status if any.
    UpstreamClosed(Option<CloseReason>),
    /// Upstream socket failed after the handshake.
    UpstreamError,
    /// Upstream handshake never completed.
    UpstreamConnectFailed,
}

/// Per-pair frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairStats {
    pub to_upstream: u64,
    pub to_client: u64,
    /// Client frames discarded because upstream was not OPEN.
    pub dropped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOutcome {
    pub id: Uuid,
    pub termination: Termination,
    pub stats: PairStats,
}

/// Write half of one end of a pair plus its lifecycle state.
struct Handle<S> {
    side: Side,
    state: HandleState,
    sink: Option<S>,
}

impl<S> Handle<S>
where
    S: Sink<Frame, Error = RelayError> + Unpin,
{
    fn open(side: Side, sink: S) -> Self {
        Self {
            side,
            state: HandleState::Open,
            sink: Some(sink),
        }
    }

    fn connecting(side: Side) -> Self {
        Self {
            side,
            state: HandleState::Connecting,
            sink: None,
        }
    }

    fn attach(&mut self, sink: S) {
        self.sink = Some(sink);
        self.state = HandleState::Open;
    }

    fn state(&self) -> HandleState {
        self.state
    }

    fn is_open(&self) -> bool {
        self.state == HandleState::Open
    }

    async fn send(&mut self, frame: Frame) -> RelayResult<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.send(frame).await,
            None => Ok(()),
        }
    }

    /// The peer failed or vanished; nothing is sent.
    fn mark_closed(&mut self) {
        self.state = HandleState::Closed;
    }

    /// The peer started the closing handshake. The transport queues its reply
    /// while reading, so flush it out before the socket is dropped.
    async fn ack_close(&mut self) {
        if matches!(self.state, HandleState::Closing | HandleState::Closed) {
            return;
        }
        self.state = HandleState::Closing;

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.flush().await.and(sink.close().await) {
                debug!(side = %self.side, error = %e, "Close acknowledgement not delivered");
            }
        }

        self.state = HandleState::Closed;
    }

    /// Drive the handle to CLOSED. A no-op once the handle is closing or closed.
    async fn close(&mut self, reason: Option<CloseReason>) {
        if matches!(self.state, HandleState::Closing | HandleState::Closed) {
            return;
        }
        self.state = HandleState::Closing;

        if let Some(sink) = self.sink.as_mut() {
            let sent = match reason {
                Some(reason) => sink.send(Frame::Close(Some(reason))).await,
                None => Ok(()),
            };
            if let Err(e) = sent.and(sink.close().await) {
                debug!(side = %self.side, error = %e, "Close on terminated connection ignored");
            }
        }

        self.state = HandleState::Closed;
    }
}

/// One client session paired with one upstream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionPair {
    id: Uuid,
}

impl ConnectionPair {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Relay frames between `client` and the socket produced by `connect`
    /// until either side terminates.
    ///
    /// `connect` is polled alongside the client stream, so client frames are
    /// consumed (and dropped) while the upstream handshake is in flight.
    pub async fn run<C, U, F>(self, client: C, connect: F) -> PairOutcome
    where
        C: FrameSocket,
        U: FrameSocket,
        F: Future<Output = RelayResult<U>>,
    {
        let span = info_span!("relay_pair", pair_id = %self.id);
        self.relay(client, connect).instrument(span).await
    }

    async fn relay<C, U, F>(self, client: C, connect: F) -> PairOutcome
    where
        C: FrameSocket,
        U: FrameSocket,
        F: Future<Output = RelayResult<U>>,
    {
        let (client_sink, mut client_stream): (SplitSink<C, Frame>, SplitStream<C>) =
            client.split();
        let mut inbound = Handle::open(Side::Client, client_sink);
        let mut outbound: Handle<SplitSink<U, Frame>> = Handle::connecting(Side::Upstream);
        let mut upstream_stream: Option<SplitStream<U>> = None;
        let mut connect = pin!(connect);
        let mut stats = PairStats::default();

        debug!("Client connected, opening upstream connection");

        let termination = loop {
            tokio::select! {
                result = &mut connect, if outbound.state() == HandleState::Connecting => {
                    match result {
                        Ok(socket) => {
                            let (sink, stream) = socket.split();
                            outbound.attach(sink);
                            upstream_stream = Some(stream);
                            info!("Upstream connection open");
                        }
                        Err(err) => {
                            error!(error = %err, "AssemblyAI WS error");
                            outbound.mark_closed();
                            inbound.close(Some(CloseReason::upstream_error())).await;
                            break Termination::UpstreamConnectFailed;
                        }
                    }
                }
                event = client_stream.next() => match event {
                    Some(Ok(Frame::Close(_))) => {
                        inbound.ack_close().await;
                        outbound.close(None).await;
                        break Termination::ClientClosed;
                    }
                    None => {
                        inbound.mark_closed();
                        outbound.close(None).await;
                        break Termination::ClientClosed;
                    }
                    Some(Ok(frame)) => {
                        if !outbound.is_open() {
                            stats.dropped += 1;
                            debug!("Upstream not open, dropping client message");
                            continue;
                        }
                        if let Err(err) = outbound.send(frame).await {
                            error!(error = %err, "AssemblyAI WS error");
                            outbound.mark_closed();
                            inbound.close(Some(CloseReason::upstream_error())).await;
                            break Termination::UpstreamError;
                        }
                        stats.to_upstream += 1;
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "Client WS error");
                        inbound.mark_closed();
                        outbound.close(Some(CloseReason::client_error())).await;
                        break Termination::ClientError;
                    }
                },
                event = next_frame(&mut upstream_stream) => match event {
                    Some(Ok(Frame::Close(reason))) => {
                        outbound.ack_close().await;
                        inbound.close(reason.clone()).await;
                        break Termination::UpstreamClosed(reason);
                    }
                    Some(Ok(frame)) => {
                        if let Err(err) = inbound.send(frame).await {
                            error!(error = %err, "Client WS error");
                            inbound.mark_closed();
                            outbound.close(Some(CloseReason::client_error())).await;
                            break Termination::ClientError;
                        }
                        stats.to_client += 1;
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "AssemblyAI WS error");
                        outbound.mark_closed();
                        inbound.close(Some(CloseReason::upstream_error())).await;
                        break Termination::UpstreamError;
                    }
                    None => {
                        warn!("Upstream stream ended without a close frame");
                        outbound.mark_closed();
                        inbound.close(Some(CloseReason::upstream_error())).await;
                        break Termination::UpstreamError;
                    }
                },
            }
        };

        info!(
            termination = ?termination,
            to_upstream = stats.to_upstream,
            to_client = stats.to_client,
            dropped = stats.dropped,
            "Relay pair closed"
        );

        PairOutcome {
            id: self.id,
            termination,
            stats,
        }
    }
}

impl Default for ConnectionPair {
    fn default() -> Self {
        Self::new()
    }
}

/// Next item of an optional stream; pends forever while the stream is absent.
async fn next_frame<S>(stream: &mut Option<S>) -> Option<S::Item>
where
    S: Stream + Unpin,
{
    match stream.as_mut() {
        Some(stream) => stream.next().await,
        None => future::pending().await,
    }
}
