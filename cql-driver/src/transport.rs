//! Connections to single hosts.
//!
//! The [`Connection`] trait is what the request execution engine talks to. [`TransportTcp`] is
//! the default implementation: a single TCP connection multiplexing concurrent requests over
//! protocol stream ids. Responses are matched back to requests by stream id, so many requests
//! can be in flight at once.
use derive_more::Constructor;
use futures::FutureExt;
use fxhash::FxHashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{split, AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::*;

#[cfg(test)]
use mockall::*;

use crate::frame::message_request::RequestBody;
use crate::frame::message_response::ResponseBody;
use crate::frame::{write_frame, Response, StreamId, Version, EVENT_STREAM_ID};
use crate::frame_parser::read_response;
use crate::future::BoxFuture;
use crate::Error;
use crate::Result;

/// Established connection to a single host, with the protocol version already negotiated.
pub trait Connection: Send + Sync {
    /// Sends a request and waits for its response. ERROR responses are returned as
    /// [`Error::Server`].
    fn send<'a>(&'a self, request: &'a RequestBody) -> BoxFuture<'a, Result<Response>>;

    /// Protocol version used by this connection.
    fn version(&self) -> Version;

    /// Returns associated host address.
    fn address(&self) -> SocketAddr;

    /// Checks if the connection is broken (e.g. after read or write errors).
    fn is_broken(&self) -> bool;
}

#[cfg(test)]
mock! {
    pub Connection {
    }

    impl Connection for Connection {
        fn send(&self, request: &RequestBody) -> BoxFuture<'static, Result<Response>>;

        fn version(&self) -> Version;

        fn address(&self) -> SocketAddr;

        fn is_broken(&self) -> bool;
    }
}

/// Default TCP transport.
pub struct TransportTcp {
    inner: AsyncTransport,
}

impl TransportTcp {
    pub async fn new(
        addr: SocketAddr,
        version: Version,
        request_timeout: Duration,
        buffer_size: usize,
        tcp_nodelay: bool,
    ) -> io::Result<TransportTcp> {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(tcp_nodelay)?;

        let (read_half, write_half) = split(socket);
        Ok(TransportTcp {
            inner: AsyncTransport::new(
                addr,
                version,
                request_timeout,
                buffer_size,
                read_half,
                write_half,
            ),
        })
    }
}

impl Connection for TransportTcp {
    #[inline]
    fn send<'a>(&'a self, request: &'a RequestBody) -> BoxFuture<'a, Result<Response>> {
        self.inner.send(request).boxed()
    }

    #[inline]
    fn version(&self) -> Version {
        self.inner.version
    }

    #[inline]
    fn address(&self) -> SocketAddr {
        self.inner.addr
    }

    #[inline]
    fn is_broken(&self) -> bool {
        self.inner.is_broken()
    }
}

struct AsyncTransport {
    addr: SocketAddr,
    version: Version,
    request_timeout: Duration,
    write_sender: mpsc::Sender<Vec<u8>>,
    response_handler_map: Arc<ResponseHandlerMap>,
    is_broken: Arc<AtomicBool>,
    processing_handle: JoinHandle<()>,
}

impl Drop for AsyncTransport {
    fn drop(&mut self) {
        self.processing_handle.abort();
    }
}

impl AsyncTransport {
    fn new<T: AsyncRead + AsyncWrite + Send + 'static>(
        addr: SocketAddr,
        version: Version,
        request_timeout: Duration,
        buffer_size: usize,
        read_half: ReadHalf<T>,
        write_half: WriteHalf<T>,
    ) -> Self {
        let (write_sender, write_receiver) = mpsc::channel(buffer_size);
        let is_broken = Arc::new(AtomicBool::new(false));
        let response_handler_map = Arc::new(ResponseHandlerMap::new(version));

        let processing_handle = tokio::spawn(
            Self::start_processing(
                write_receiver,
                read_half,
                write_half,
                response_handler_map.clone(),
                is_broken.clone(),
            )
            .instrument(debug_span!("transport", %addr)),
        );

        AsyncTransport {
            addr,
            version,
            request_timeout,
            write_sender,
            response_handler_map,
            is_broken,
            processing_handle,
        }
    }

    #[inline]
    fn is_broken(&self) -> bool {
        self.is_broken.load(Ordering::Relaxed)
    }

    async fn send(&self, request: &RequestBody) -> Result<Response> {
        if self.is_broken() {
            return Err(Error::ConnectionClosed(self.addr));
        }

        // fail before taking a stream id, if the request cannot be expressed
        request.check_version(self.version)?;

        let (sender, receiver) = oneshot::channel();
        let stream_id = self.response_handler_map.add_handler(sender)?;

        let data = match write_frame(stream_id, request, self.version) {
            Ok(data) => data,
            Err(error) => {
                self.response_handler_map.release(stream_id);
                return Err(error);
            }
        };

        if self.write_sender.send(data).await.is_err() {
            self.response_handler_map.release(stream_id);
            return Err(Error::ConnectionClosed(self.addr));
        }

        match tokio::time::timeout(self.request_timeout, receiver).await {
            Ok(Ok(response)) => response.and_then(|response| into_result(response, self.addr)),
            Ok(Err(_)) => Err(Error::ConnectionClosed(self.addr)),
            Err(_) => {
                // a late response must not be delivered to a request reusing the id
                self.response_handler_map.orphan(stream_id);
                Err(Error::Timeout(format!(
                    "No response from {} within {:?}",
                    self.addr, self.request_timeout
                )))
            }
        }
    }

    async fn start_processing<T: AsyncRead + AsyncWrite>(
        write_receiver: mpsc::Receiver<Vec<u8>>,
        read_half: ReadHalf<T>,
        write_half: WriteHalf<T>,
        response_handler_map: Arc<ResponseHandlerMap>,
        is_broken: Arc<AtomicBool>,
    ) {
        let writer = Self::start_writing(write_receiver, BufWriter::new(write_half));
        let reader = Self::start_reading(read_half, &response_handler_map);

        let result = tokio::try_join!(writer, reader);
        is_broken.store(true, Ordering::Relaxed);

        if let Err(error) = result {
            error!(%error, "Transport error!");
            response_handler_map.signal_error(&error.to_string());
        }
    }

    async fn start_reading<T: AsyncRead>(
        mut read_half: ReadHalf<T>,
        response_handler_map: &ResponseHandlerMap,
    ) -> Result<()> {
        loop {
            let response = read_response(&mut read_half).await?;
            if response.stream_id >= 0 {
                response_handler_map.send_response(response.stream_id, response)?;
            } else if response.stream_id == EVENT_STREAM_ID {
                debug!(opcode = %response.opcode(), "Ignoring server event.");
            } else {
                warn!(stream_id = response.stream_id, "Unexpected negative stream id.");
            }
        }
    }

    async fn start_writing(
        mut write_receiver: mpsc::Receiver<Vec<u8>>,
        mut write_half: impl AsyncWrite + Unpin,
    ) -> Result<()> {
        while let Some(mut data) = write_receiver.recv().await {
            loop {
                write_half.write_all(&data).await?;

                data = match write_receiver.try_recv() {
                    Ok(data) => data,
                    Err(_) => break,
                }
            }

            write_half.flush().await?;
        }

        Ok(())
    }
}

fn into_result(response: Response, addr: SocketAddr) -> Result<Response> {
    match response.body {
        ResponseBody::Error(body) => Err(Error::Server { body, addr }),
        _ => Ok(response),
    }
}

type ResponseHandler = oneshot::Sender<Result<Response>>;

enum Slot {
    Waiting(ResponseHandler),
    // the request timed out, but the id stays taken until the server answers
    Orphaned,
}

struct HandlerState {
    slots: FxHashMap<StreamId, Slot>,
    next_stream_id: StreamId,
}

struct ResponseHandlerMap {
    state: Mutex<HandlerState>,
    max_stream_id: StreamId,
}

impl ResponseHandlerMap {
    fn new(version: Version) -> Self {
        ResponseHandlerMap {
            state: Mutex::new(HandlerState {
                slots: Default::default(),
                next_stream_id: 0,
            }),
            max_stream_id: if version.stream_id_len() == 1 {
                i8::MAX as StreamId
            } else {
                StreamId::MAX
            },
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the handler under a free stream id.
    fn add_handler(&self, handler: ResponseHandler) -> Result<StreamId> {
        let mut state = self.lock();
        let id_count = self.max_stream_id as usize + 1;
        if state.slots.len() >= id_count {
            return Err(Error::General(format!(
                "All {id_count} stream ids are in use"
            )));
        }

        loop {
            let stream_id = state.next_stream_id;
            state.next_stream_id = if stream_id >= self.max_stream_id {
                0
            } else {
                stream_id + 1
            };

            if let std::collections::hash_map::Entry::Vacant(entry) =
                state.slots.entry(stream_id)
            {
                entry.insert(Slot::Waiting(handler));
                return Ok(stream_id);
            }
        }
    }

    fn send_response(&self, stream_id: StreamId, response: Response) -> Result<()> {
        match self.lock().slots.remove(&stream_id) {
            Some(Slot::Waiting(handler)) => {
                let _ = handler.send(Ok(response));
                Ok(())
            }
            Some(Slot::Orphaned) => {
                trace!(stream_id, "Discarding response to timed out request.");
                Ok(())
            }
            // unmatched stream - probably a bug somewhere
            None => Err(Error::General(format!("Unmatched stream id: {stream_id}"))),
        }
    }

    fn orphan(&self, stream_id: StreamId) {
        if let Some(slot) = self.lock().slots.get_mut(&stream_id) {
            *slot = Slot::Orphaned;
        }
    }

    fn release(&self, stream_id: StreamId) {
        self.lock().slots.remove(&stream_id);
    }

    fn signal_error(&self, error: &str) {
        for (_, slot) in self.lock().slots.drain() {
            if let Slot::Waiting(handler) = slot {
                let _ = handler.send(Err(Error::Io(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    error.to_string(),
                ))));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::message_error::{AdditionalErrorInfo, ErrorBody};
    use crate::frame::message_query::BodyReqQuery;
    use crate::frame::write_response_frame;
    use crate::frame_parser::read_request;
    use crate::query::QueryParams;
    use tokio::io::{duplex, DuplexStream};

    fn transport(version: Version, request_timeout: Duration) -> (AsyncTransport, DuplexStream) {
        let (client, server) = duplex(64 * 1024);
        let (read_half, write_half) = split(client);

        (
            AsyncTransport::new(
                "127.0.0.1:9042".parse().unwrap(),
                version,
                request_timeout,
                16,
                read_half,
                write_half,
            ),
            server,
        )
    }

    fn query() -> RequestBody {
        RequestBody::Query(BodyReqQuery::new("SELECT".into(), QueryParams::default()))
    }

    #[tokio::test]
    async fn should_match_responses_to_requests() {
        let (transport, mut server) = transport(Version::V4, Duration::from_secs(5));

        let server = tokio::spawn(async move {
            let (first, _) = read_request(&mut server).await.unwrap();
            let (second, _) = read_request(&mut server).await.unwrap();
            assert_ne!(first.stream_id, second.stream_id);

            // answer in reverse order
            for header in [second, first] {
                let body = if header.stream_id == first.stream_id {
                    ResponseBody::Ready
                } else {
                    ResponseBody::Error(ErrorBody {
                        error_code: 0x1001,
                        message: "overloaded".into(),
                        additional_info: AdditionalErrorInfo::Overloaded,
                    })
                };

                server
                    .write_all(
                        &write_response_frame(header.stream_id, &body, Version::V4).unwrap(),
                    )
                    .await
                    .unwrap();
            }

            server
        });

        let first_request = query();
        let second_request = query();
        let (first, second) = tokio::join!(
            transport.send(&first_request),
            transport.send(&second_request)
        );

        let _server = server.await.unwrap();

        let responses = [first, second];
        assert_eq!(
            responses
                .iter()
                .filter(|response| matches!(response, Ok(response) if response.body == ResponseBody::Ready))
                .count(),
            1
        );
        assert_eq!(
            responses
                .iter()
                .filter(|response| matches!(response, Err(Error::Server { .. })))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn should_time_out_and_discard_late_response() {
        let (transport, mut server) = transport(Version::V4, Duration::from_millis(50));

        let request = query();
        let (result, (header, _)) = tokio::join!(transport.send(&request), async {
            read_request(&mut server).await.unwrap()
        });
        assert!(matches!(result, Err(Error::Timeout(_))));

        // the late response must be swallowed, keeping the connection usable
        server
            .write_all(
                &write_response_frame(header.stream_id, &ResponseBody::Ready, Version::V4)
                    .unwrap(),
            )
            .await
            .unwrap();

        let (result, _) = tokio::join!(transport.send(&request), async {
            let (header, _) = read_request(&mut server).await.unwrap();
            server
                .write_all(
                    &write_response_frame(header.stream_id, &ResponseBody::Ready, Version::V4)
                        .unwrap(),
                )
                .await
                .unwrap();
        });

        assert_eq!(result.unwrap().body, ResponseBody::Ready);
        assert!(!transport.is_broken());
    }

    #[tokio::test]
    async fn should_fail_pending_requests_when_closed() {
        let (transport, mut server) = transport(Version::V4, Duration::from_secs(5));

        let request = query();
        let (result, _) = tokio::join!(transport.send(&request), async {
            read_request(&mut server).await.unwrap();
            drop(server);
        });

        assert!(matches!(result, Err(Error::Io(_))));

        tokio::task::yield_now().await;
        assert!(transport.is_broken());
        assert!(matches!(
            transport.send(&request).await,
            Err(Error::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn should_reject_unsupported_request() {
        let (transport, _server) = transport(Version::V1, Duration::from_secs(5));

        let mut params = QueryParams::default();
        params.page_size = Some(10);
        let request = RequestBody::Query(BodyReqQuery::new("SELECT".into(), params));

        assert!(matches!(
            transport.send(&request).await,
            Err(Error::UnsupportedFeature { .. })
        ));
    }

    #[test]
    fn should_limit_stream_ids_by_version() {
        let map = ResponseHandlerMap::new(Version::V2);
        let mut receivers = vec![];
        for expected in 0..=127 {
            let (sender, receiver) = oneshot::channel();
            receivers.push(receiver);
            assert_eq!(map.add_handler(sender).unwrap(), expected);
        }

        let (sender, _receiver) = oneshot::channel();
        assert!(map.add_handler(sender).is_err());

        map.release(5);
        let (sender, _receiver) = oneshot::channel();
        assert_eq!(map.add_handler(sender).unwrap(), 5);
    }
}
