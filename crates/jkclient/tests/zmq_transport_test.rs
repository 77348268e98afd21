//
// zmq_transport_test.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Talks to a fake kernel over real ZeroMQ sockets on localhost.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use jkclient::transport::ZmqTransport;
use jkclient::wire_message::WireMessage;
use jkclient::{KernelConnection, KernelEvents, PollTimeout, ReplyCallbacks, Session};
use jkshared::connection_info::ConnectionInfo;
use jkshared::jupyter_message::JupyterChannel;
use jkshared::kernel_info::KernelInfoReply;
use serde_json::json;
use zeromq::{PubSocket, RouterSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

const KEY: &str = "6f2b1c2e-zmq-test";

fn pick_port() -> u16 {
    portpicker::pick_unused_port().expect("no free ports")
}

fn local_connection_info() -> ConnectionInfo {
    ConnectionInfo {
        transport: String::from("tcp"),
        ip: String::from("127.0.0.1"),
        shell_port: pick_port(),
        iopub_port: pick_port(),
        stdin_port: pick_port(),
        control_port: pick_port(),
        hb_port: pick_port(),
        key: KEY.to_string(),
        signature_scheme: String::from("hmac-sha256"),
        kernel_name: None,
    }
}

fn to_zmq(frames: Vec<Vec<u8>>) -> ZmqMessage {
    let mut frames = frames.into_iter();
    let mut message = ZmqMessage::from(frames.next().unwrap_or_default());
    for frame in frames {
        message.push_back(frame.into());
    }
    message
}

/// What the fake kernel saw.
struct KernelReport {
    identities: Vec<String>,
    msg_type: String,
    session: String,
}

/// Serve one `kernel_info_request`, then broadcast `status: busy` until
/// told to stop.
fn run_kernel(info: ConnectionInfo, bound: mpsc::Sender<()>, stop: Arc<AtomicBool>) -> KernelReport {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let session = Session::new(&info.key, "kernel").unwrap();

        let mut shell = RouterSocket::new();
        shell.bind(&info.address(JupyterChannel::Shell)).await.unwrap();
        let mut iopub = PubSocket::new();
        iopub.bind(&info.address(JupyterChannel::IOPub)).await.unwrap();
        let mut stdin = RouterSocket::new();
        stdin.bind(&info.address(JupyterChannel::Stdin)).await.unwrap();
        let mut control = RouterSocket::new();
        control.bind(&info.address(JupyterChannel::Control)).await.unwrap();
        bound.send(()).unwrap();

        let request = shell.recv().await.unwrap();
        let frames = request.into_vec().into_iter().map(|f| f.to_vec()).collect();
        let wire = WireMessage::from_frames(frames).unwrap();
        let identities = wire.identity_strings();
        let request = session.deserialize(wire.parts).unwrap();

        let reply = session.build(
            "kernel_info_reply",
            Some(json!({
                "status": "ok",
                "protocol_version": "5.3",
                "implementation": "fake",
                "implementation_version": "0.1",
                "language_info": {"name": "echo"},
                "banner": "fake kernel"
            })),
            Some(&request.header),
            None,
        );
        shell
            .send(to_zmq(session.serialize(&reply, &wire.identities).unwrap()))
            .await
            .unwrap();

        // Subscriptions propagate asynchronously, so keep publishing until
        // the client has seen one
        let deadline = Instant::now() + Duration::from_secs(10);
        while !stop.load(Ordering::SeqCst) && Instant::now() < deadline {
            let status = session.build(
                "status",
                Some(json!({"execution_state": "busy"})),
                Some(&request.header),
                None,
            );
            iopub
                .send(to_zmq(
                    session
                        .serialize(&status, &[b"kernel.fake.status".to_vec()])
                        .unwrap(),
                ))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        KernelReport {
            identities,
            msg_type: request.header.msg_type,
            session: request.header.session,
        }
    })
}

struct BusyFlag(Rc<Cell<bool>>);

impl KernelEvents for BusyFlag {
    fn on_status(&mut self, busy: bool) {
        if busy {
            self.0.set(true);
        }
    }
}

fn poll_until(connection: &KernelConnection, done: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for the kernel");
        connection
            .poll(PollTimeout::After(Duration::from_millis(100)))
            .unwrap();
    }
}

#[test]
fn test_round_trip_over_zeromq() {
    let info = local_connection_info();
    let stop = Arc::new(AtomicBool::new(false));
    let (bound_tx, bound_rx) = mpsc::channel();
    let kernel = {
        let info = info.clone();
        let stop = stop.clone();
        std::thread::spawn(move || run_kernel(info, bound_tx, stop))
    };
    bound_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("kernel sockets bound");

    let session = Session::new(KEY, "tester").unwrap();
    let session_id = session.session_id().to_string();
    let transport = ZmqTransport::new(&session_id).unwrap();
    let connection = KernelConnection::open(info, session, transport).unwrap();

    let busy = Rc::new(Cell::new(false));
    connection.set_events(BusyFlag(busy.clone()));

    let reply: Rc<RefCell<Option<KernelInfoReply>>> = Rc::new(RefCell::new(None));
    let sink = reply.clone();
    connection
        .kernel_info_request(ReplyCallbacks::new().on_ok(move |info| {
            *sink.borrow_mut() = Some(info);
        }))
        .unwrap();

    poll_until(&connection, || reply.borrow().is_some());
    let reply = reply.borrow_mut().take().unwrap();
    assert_eq!(reply.language_name(), Some("echo"));
    assert_eq!(reply.banner, "fake kernel");

    poll_until(&connection, || busy.get());
    assert!(connection.is_busy());

    stop.store(true, Ordering::SeqCst);
    connection.close();

    let report = kernel.join().unwrap();
    assert_eq!(report.msg_type, "kernel_info_request");
    assert_eq!(report.session, session_id);
    // The DEALER socket announces the session ID as its identity
    assert_eq!(report.identities, vec![session_id]);
}

#[test]
fn test_immediate_poll_with_nothing_queued() {
    let info = local_connection_info();
    let stop = Arc::new(AtomicBool::new(true));
    let (bound_tx, bound_rx) = mpsc::channel();
    let kernel_info = info.clone();
    // The kernel waits for a request that never comes; the thread is left
    // to end with the process
    std::thread::spawn(move || run_kernel(kernel_info, bound_tx, stop));
    bound_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("kernel sockets bound");

    let session = Session::new(KEY, "tester").unwrap();
    let transport = ZmqTransport::new(session.session_id()).unwrap();
    let connection = KernelConnection::open(info, session, transport).unwrap();

    assert_eq!(connection.poll(PollTimeout::Immediate).unwrap(), 0);

    let started = Instant::now();
    assert_eq!(
        connection
            .poll(PollTimeout::After(Duration::from_millis(200)))
            .unwrap(),
        0
    );
    assert!(started.elapsed() >= Duration::from_millis(150));
}
