use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use svdb_client::{spawn_poller, ClientConfig, ClientError, Connection, Poller, Tick};
use svdb_common::Request;
use svdb_engine::{SharedValue, ValueCell};

/// Accepts one connection, answers `expected` NUL-terminated requests with
/// `handler`, then closes the socket. Returns the requests it saw.
fn spawn_server(
    expected: usize,
    handler: fn(usize, &str) -> String,
) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();

    let join = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let mut writer = stream.try_clone().expect("clone");
        let mut reader = BufReader::new(stream);
        let mut seen = Vec::with_capacity(expected);
        for idx in 0..expected {
            let request = read_request(&mut reader).expect("read request");
            let reply = handler(idx, &request);
            writer.write_all(reply.as_bytes()).expect("reply");
            writer.write_all(b"\0").expect("reply");
            seen.push(request);
        }
        seen
    });

    (addr, join)
}

fn read_request(reader: &mut BufReader<TcpStream>) -> io::Result<String> {
    let mut buf = Vec::new();
    if reader.read_until(0, &mut buf)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
    }
    if buf.pop() != Some(0) {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "missing nul"));
    }
    String::from_utf8(buf).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "utf8"))
}

fn connect(addr: String) -> Connection {
    let config = ClientConfig {
        addr,
        connect_timeout: Some(Duration::from_secs(1)),
        read_timeout: Some(Duration::from_secs(5)),
        write_timeout: Some(Duration::from_secs(1)),
        ..ClientConfig::default()
    };
    Connection::connect(&config).expect("client")
}

#[derive(Clone, Default)]
struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn connection_write_read_roundtrip() {
    let (addr, server) = spawn_server(2, |idx, request| {
        if idx == 0 {
            assert_eq!(request, "write 17");
        } else {
            assert_eq!(request, "read");
        }
        "17".to_string()
    });

    let mut conn = connect(addr);
    assert_eq!(conn.write(17).unwrap(), 17);
    assert_eq!(conn.read().unwrap(), 17);
    assert_eq!(server.join().unwrap(), vec!["write 17", "read"]);
}

#[test]
fn closed_server_is_reported() {
    let (addr, server) = spawn_server(0, |_, _| String::new());
    let mut conn = connect(addr);
    server.join().unwrap();

    let err = conn.exec(&Request::Read).unwrap_err();
    assert!(matches!(err, ClientError::Closed | ClientError::Io(_)));
}

#[test]
fn garbage_reply_is_a_protocol_error() {
    let (addr, _server) = spawn_server(1, |_, _| "banana".to_string());
    let mut conn = connect(addr);

    assert!(matches!(conn.read(), Err(ClientError::Protocol(_))));
}

#[test]
fn tick_reports_request_and_reply() {
    let (addr, _server) = spawn_server(2, |idx, _| (if idx == 0 { "3" } else { "8" }).to_string());
    let cell = SharedValue::new(3);
    let mut poller = Poller::new(connect(addr));

    let first = poller.tick(&cell).unwrap();
    assert_eq!(
        first,
        Tick {
            request: Request::Write(3),
            reply: "3".to_string(),
        }
    );

    let second = poller.tick(&cell).unwrap();
    assert_eq!(second.request, Request::Read);
    assert_eq!(second.reply, "8");
}

#[test]
fn idle_poller_only_reads() {
    let (addr, server) = spawn_server(4, |_, _| "0".to_string());
    let cell = Arc::new(SharedValue::default());
    let output = SharedOutput::default();

    let poller = spawn_poller(connect(addr), cell, Duration::from_millis(5), output.clone())
        .expect("poller");

    let seen = server.join().unwrap();
    assert_eq!(seen, vec!["read"; 4]);

    // The fake server hung up, so the poller ends on its own, seeing
    // either EOF or a reset depending on timing.
    assert!(matches!(poller.join(), Ok(()) | Err(ClientError::Io(_))));
    assert_eq!(output.text(), "0\n0\n0\n0\n");
}

#[test]
fn changed_value_is_written_once() {
    let (addr, server) = spawn_server(3, |_, _| "8".to_string());
    let cell = Arc::new(SharedValue::new(8));

    let poller = spawn_poller(connect(addr), cell, Duration::from_millis(5), io::sink())
        .expect("poller");

    assert_eq!(server.join().unwrap(), vec!["write 8", "read", "read"]);
    assert!(matches!(poller.join(), Ok(()) | Err(ClientError::Io(_))));
}

#[test]
fn change_and_revert_within_a_tick_is_not_sent() {
    let (addr, server) = spawn_server(3, |_, _| "0".to_string());
    let cell = Arc::new(SharedValue::default());
    let mut poller = Poller::new(connect(addr));

    poller.tick(cell.as_ref()).unwrap();
    cell.set(5);
    cell.set(0);
    poller.tick(cell.as_ref()).unwrap();
    cell.set(1);
    poller.tick(cell.as_ref()).unwrap();

    assert_eq!(server.join().unwrap(), vec!["read", "read", "write 1"]);
}

#[test]
fn stop_unblocks_a_sleeping_poller() {
    let (addr, _server) = spawn_server(1, |_, _| "0".to_string());
    let cell = Arc::new(SharedValue::default());

    let poller = spawn_poller(connect(addr), cell, Duration::from_secs(60), io::sink())
        .expect("poller");
    thread::sleep(Duration::from_millis(50));

    poller.stop();
    poller.join().expect("poller exit");
}
