//! End-to-end tests driving the daemon over loopback TCP.

use std::net::SocketAddr;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pwd_filter::{Dictionary, PasswordFilter, PolicyConfig, Server, ServerSettings, WordList};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

struct CountingDictionary {
    inner: WordList,
    lookups: AtomicUsize,
}

impl CountingDictionary {
    fn new(words: &[&str]) -> Self {
        Self {
            inner: WordList::from_words(words),
            lookups: AtomicUsize::new(0),
        }
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Dictionary for CountingDictionary {
    fn contains(&self, password: &str) -> bool {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.contains(password)
    }
}

/// Collects formatted log output from a test-local subscriber.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

struct TestServer {
    addr: SocketAddr,
    dictionary: Arc<CountingDictionary>,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn test_settings() -> ServerSettings {
    ServerSettings {
        listen: "127.0.0.1:0".parse().unwrap(),
        io_timeout: Duration::from_millis(500),
        ..ServerSettings::default()
    }
}

fn start(policy: PolicyConfig, settings: ServerSettings) -> TestServer {
    let dictionary = Arc::new(CountingDictionary::new(&["Password1!", "Summer2024!"]));
    let filter = PasswordFilter::new(Arc::new(policy), dictionary.clone());
    let server = Server::new(filter, settings);

    let listener = server.bind().expect("Failed to bind test server");
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(server.serve(listener, shutdown.clone()));

    TestServer {
        addr,
        dictionary,
        shutdown,
    }
}

/// Sends `payload`, half-closes, and returns everything the server wrote
/// before closing the connection.
async fn query(addr: SocketAddr, payload: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("Failed to connect");
    stream.write_all(payload).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut reply = String::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut reply))
        .await
        .expect("Server did not close the connection");
    match read {
        Ok(_) => {}
        // Closing with unread input may reset instead of a clean FIN
        Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {}
        Err(e) => panic!("Failed to read reply: {}", e),
    }
    reply
}

#[tokio::test]
async fn test_compliant_password_accepted() {
    let server = start(PolicyConfig::default(), test_settings());
    assert_eq!(query(server.addr, b"test\nAbcdef1!\n").await, "true\n");
    assert_eq!(server.dictionary.lookups(), 1);
}

#[tokio::test]
async fn test_repeat_rejected_without_dictionary_lookup() {
    let server = start(PolicyConfig::default(), test_settings());
    assert_eq!(query(server.addr, b"test\naaaBBB11!!\n").await, "false\n");
    assert_eq!(server.dictionary.lookups(), 0);
}

#[tokio::test]
async fn test_empty_password_in_permissive_mode() {
    let server = start(PolicyConfig::permissive(), test_settings());
    assert_eq!(query(server.addr, b"test\n\n").await, "false\n");
    assert_eq!(server.dictionary.lookups(), 0);
}

#[tokio::test]
async fn test_dictionary_password_rejected() {
    let server = start(PolicyConfig::default(), test_settings());
    assert_eq!(query(server.addr, b"test\nPassword1!\n").await, "false\n");
    assert_eq!(query(server.addr, b"test\npASSWORD1!\n").await, "false\n");
    assert_eq!(server.dictionary.lookups(), 2);
}

#[tokio::test]
async fn test_unknown_command_gets_no_response() {
    let server = start(PolicyConfig::default(), test_settings());
    assert_eq!(query(server.addr, b"ping\nAbcdef1!\n").await, "");
    assert_eq!(query(server.addr, b"").await, "");
    assert_eq!(server.dictionary.lookups(), 0);
}

#[tokio::test]
async fn test_unknown_command_is_logged() {
    let logs = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    // The current-thread test runtime polls the server tasks on this thread
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = start(PolicyConfig::default(), test_settings());
    assert_eq!(query(server.addr, b"ping\n").await, "");

    let output = logs.contents();
    assert!(output.contains("WARN"), "missing warn entry in {:?}", output);
    assert!(
        output.contains("did not receive test command"),
        "missing unknown-command entry in {:?}",
        output
    );
}

#[tokio::test]
async fn test_missing_password_line_rejected() {
    let server = start(PolicyConfig::permissive(), test_settings());
    assert_eq!(query(server.addr, b"test\n").await, "false\n");
    assert_eq!(server.dictionary.lookups(), 0);
}

#[tokio::test]
async fn test_crlf_lines_accepted() {
    let server = start(PolicyConfig::default(), test_settings());
    assert_eq!(query(server.addr, b"test\r\nAbcdef1!\r\n").await, "true\n");
}

#[tokio::test]
async fn test_malformed_rules_line_keeps_default() {
    let policy = PolicyConfig::from_str_source("min.length\nmin.uppercase=2\n");
    let server = start(policy, test_settings());
    // 7 characters: default min.length of 8 still applies
    assert_eq!(query(server.addr, b"test\nABcde1!\n").await, "false\n");
    // min.uppercase=2 was applied
    assert_eq!(query(server.addr, b"test\nAbcdef1!\n").await, "false\n");
    assert_eq!(query(server.addr, b"test\nABcdef1!\n").await, "true\n");
}

fn password_line(password: &[u8]) -> Vec<u8> {
    let mut payload = b"test\n".to_vec();
    payload.extend_from_slice(password);
    payload.push(b'\n');
    payload
}

#[tokio::test]
async fn test_long_compliant_password_accepted() {
    let policy = PolicyConfig {
        max_repeats: None,
        ..PolicyConfig::default()
    };
    let server = start(policy, test_settings());
    let mut password = b"Ab1!".to_vec();
    password.extend(std::iter::repeat_n(b'x', 5000));
    assert_eq!(query(server.addr, &password_line(&password)).await, "true\n");
}

#[tokio::test]
async fn test_password_line_at_and_above_cap() {
    let settings = ServerSettings {
        max_line_length: 16,
        ..test_settings()
    };
    let server = start(PolicyConfig::permissive(), settings);

    let at_cap = [b'x'; 16];
    assert_eq!(query(server.addr, &password_line(&at_cap)).await, "true\n");

    let above_cap = [b'x'; 64];
    assert_eq!(query(server.addr, &password_line(&above_cap)).await, "false\n");
    assert_eq!(server.dictionary.lookups(), 1);
}

#[tokio::test]
async fn test_oversized_command_closes_connection() {
    let settings = ServerSettings {
        max_line_length: 16,
        ..test_settings()
    };
    let server = start(PolicyConfig::permissive(), settings);
    let mut payload = vec![b'x'; 64];
    payload.extend_from_slice(b"\nAbcdef1!\n");
    assert_eq!(query(server.addr, &payload).await, "");
}

#[tokio::test]
async fn test_stalled_client_is_timed_out() {
    let server = start(PolicyConfig::default(), test_settings());

    let mut stalled = TcpStream::connect(server.addr).await.unwrap();
    stalled.write_all(b"test\n").await.unwrap();

    let mut reply = String::new();
    tokio::time::timeout(Duration::from_secs(5), stalled.read_to_string(&mut reply))
        .await
        .expect("Server kept the stalled connection open")
        .unwrap();
    assert_eq!(reply, "");
}

#[tokio::test]
async fn test_connection_ceiling_releases_after_timeout() {
    let settings = ServerSettings {
        max_connections: 1,
        ..test_settings()
    };
    let server = start(PolicyConfig::default(), settings);

    // Occupies the only slot until its read deadline expires
    let _stalled = TcpStream::connect(server.addr).await.unwrap();

    assert_eq!(query(server.addr, b"test\nAbcdef1!\n").await, "true\n");
}

#[tokio::test]
async fn test_faulty_connection_does_not_affect_others() {
    let server = start(PolicyConfig::default(), test_settings());

    assert_eq!(query(server.addr, b"test\n\xff\xfe\n").await, "");

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let addr = server.addr;
            tokio::spawn(async move { query(addr, b"test\nAbcdef1!\n").await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), "true\n");
    }
}
