use cql_driver::frame::message_request::RequestBody;
use cql_driver::frame::message_response::ResponseBody;
use cql_driver::frame::message_result::ResResultBody;
use cql_driver::frame::write_response_frame;
use cql_driver::frame_parser::read_request;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};

type Responder = dyn Fn(&RequestBody) -> ResponseBody + Send + Sync;

/// Minimal in-process server answering every request frame with the body produced by a
/// responder function. Records every request it receives.
pub struct FakeServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RequestBody>>>,
    task: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start(
        responder: impl Fn(&RequestBody) -> ResponseBody + Send + Sync + 'static,
    ) -> FakeServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(vec![]));
        let responder: Arc<Responder> = Arc::new(responder);

        let task = tokio::spawn({
            let requests = requests.clone();
            async move {
                let mut connections = JoinSet::new();
                while let Ok((socket, _)) = listener.accept().await {
                    connections.spawn(serve(socket, responder.clone(), requests.clone()));
                }
            }
        });

        FakeServer {
            addr,
            requests,
            task,
        }
    }

    /// Starts a server which handles the handshake and answers everything else with given body.
    pub async fn answering(body: ResponseBody) -> FakeServer {
        FakeServer::start(move |request| match request {
            RequestBody::Startup(_) => ResponseBody::Ready,
            _ => body.clone(),
        })
        .await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn requests(&self) -> Vec<RequestBody> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut socket: TcpStream,
    responder: Arc<Responder>,
    requests: Arc<Mutex<Vec<RequestBody>>>,
) {
    while let Ok((header, request)) = read_request(&mut socket).await {
        let body = responder(&request);
        requests.lock().unwrap().push(request);

        let frame = write_response_frame(header.stream_id, &body, header.version).unwrap();
        if socket.write_all(&frame).await.is_err() {
            return;
        }
    }
}

/// Returns an address nothing listens on.
pub async fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn void() -> ResponseBody {
    ResponseBody::Result(ResResultBody::Void)
}
