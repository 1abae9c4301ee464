//! Client for Tor's control port.
//!
//! A [`Controller`] opens a text-based, line-oriented connection to a
//! running Tor process, authenticates using whichever method both sides
//! support, issues commands (`GETINFO`, `SETCONF`, `SIGNAL`, ...), and
//! dispatches asynchronous `650` events to registered listeners without
//! letting a slow listener block the socket reader.

#![warn(missing_docs)]

pub mod auth;
mod err;
pub mod event;
pub mod message;

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub use auth::{AuthMethods, ProtocolInfo};
pub use err::{Error, Result};
pub use event::Event;
pub use message::ControlMessage;

/// How a [`Controller`] should authenticate, in the preference order the
/// control protocol recommends: try each in turn against what
/// `PROTOCOLINFO` actually advertised.
#[derive(Clone, Debug)]
pub enum Auth {
    /// Authenticate with `AUTHENTICATE` and no credentials.
    None,
    /// Authenticate via the SAFECOOKIE challenge/response, given the
    /// authentication cookie file's raw bytes.
    SafeCookie(Vec<u8>),
    /// Authenticate by sending the raw authentication cookie bytes.
    Cookie(Vec<u8>),
    /// Authenticate with a control port password.
    Password(String),
}

/// An event listener: a callback plus the set of event names it should
/// receive.
struct Listener {
    events: Vec<String>,
    callback: Box<dyn Fn(Event) + Send + 'static>,
}

/// Shared state behind the controller's two locks: one FIFO queue of
/// waiters for ordinary replies, and the registered event listeners.
struct Shared {
    send_lock: Mutex<TcpStream>,
    reply_rx: Mutex<mpsc::Receiver<Result<ControlMessage>>>,
    listeners: Mutex<Vec<Listener>>,
    closed: std::sync::atomic::AtomicBool,
}

/// A connection to a Tor process's control port.
pub struct Controller {
    shared: Arc<Shared>,
    reader_thread: Option<JoinHandle<()>>,
    event_thread: Option<JoinHandle<()>>,
    event_tx: mpsc::Sender<Event>,
}

impl Controller {
    /// Connect to a control port listening at `addr` (e.g. `127.0.0.1:9051`).
    pub fn connect(addr: impl std::net::ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|e| Error::Io(e.to_string()))?;
        Self::from_stream(stream)
    }

    /// Wrap an already-open control socket.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let write_half = stream.try_clone().map_err(|e| Error::Io(e.to_string()))?;
        let read_half = stream;

        let (reply_tx, reply_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel::<Event>();

        let shared = Arc::new(Shared {
            send_lock: Mutex::new(write_half),
            reply_rx: Mutex::new(reply_rx),
            listeners: Mutex::new(Vec::new()),
            closed: std::sync::atomic::AtomicBool::new(false),
        });

        let reader_shared = Arc::clone(&shared);
        let reader_event_tx = event_tx.clone();
        let reader_thread = std::thread::Builder::new()
            .name("tor-control-reader".into())
            .spawn(move || reader_loop(read_half, reply_tx, reader_event_tx, reader_shared))
            .map_err(|e| Error::Io(e.to_string()))?;

        let event_shared = Arc::clone(&shared);
        let event_thread = std::thread::Builder::new()
            .name("tor-control-events".into())
            .spawn(move || event_loop(event_rx, event_shared))
            .map_err(|e| Error::Io(e.to_string()))?;

        Ok(Controller {
            shared,
            reader_thread: Some(reader_thread),
            event_thread: Some(event_thread),
            event_tx,
        })
    }

    /// Send a raw command line (without its terminating CRLF) and block
    /// until its reply arrives.
    ///
    /// Commands like `GETINFO`, `GETCONF`, `SETCONF`, `RESETCONF`,
    /// `SIGNAL`, `SETEVENTS`, `USEFEATURE`, `AUTHENTICATE`, `QUIT`,
    /// `LOADCONF`, and `+POSTDESCRIPTOR` are all sent this way, verbatim.
    pub fn msg(&self, command: &str) -> Result<ControlMessage> {
        if self.shared.closed.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::ControllerClosed);
        }
        {
            let mut sock = self.shared.send_lock.lock().expect("send lock poisoned");
            let line = command.trim_end_matches(['\r', '\n']);
            write!(sock, "{line}\r\n").map_err(|e| Error::Io(e.to_string()))?;
            sock.flush().map_err(|e| Error::Io(e.to_string()))?;
        }
        let reply_rx = self.shared.reply_rx.lock().expect("reply queue poisoned");
        reply_rx
            .recv()
            .map_err(|_| Error::ControllerClosed)?
    }

    /// Send a command and turn a non-2xx/3xx reply into
    /// [`Error::CommandFailed`].
    fn msg_checked(&self, command: &str) -> Result<ControlMessage> {
        let reply = self.msg(command)?;
        if !reply.is_ok() {
            let message = reply
                .lines()
                .last()
                .map(|l| l.text.clone())
                .unwrap_or_default();
            return Err(Error::CommandFailed {
                command: command.to_owned(),
                code: reply.code(),
                message,
            });
        }
        Ok(reply)
    }

    /// Authenticate to the control port, trying `auth` against whatever
    /// methods `PROTOCOLINFO` reports the port actually supports.
    ///
    /// Callers reading the cookie file themselves for [`Auth::SafeCookie`]
    /// or [`Auth::Cookie`] should resolve its path with
    /// [`ProtocolInfo::cookie_path_outside_jail`] first, to account for Tor
    /// reporting a path inside its own chroot.
    pub fn authenticate(&self, auth: &Auth) -> Result<()> {
        let info_reply = self.msg_checked("PROTOCOLINFO 1")?;
        let info = ProtocolInfo::parse(&info_reply)?;

        match auth {
            Auth::None if info.auth_methods.null => {
                self.msg_checked("AUTHENTICATE")?;
            }
            Auth::SafeCookie(cookie) if info.auth_methods.safecookie => {
                let client = auth::SafeCookieClient::new(cookie.clone());
                let challenge = self.msg_checked(&format!(
                    "AUTHCHALLENGE SAFECOOKIE {}",
                    client.client_nonce_hex()
                ))?;
                let line = challenge
                    .lines()
                    .first()
                    .ok_or_else(|| Error::Malformed("empty AUTHCHALLENGE reply".into()))?;
                let (server_hash, server_nonce) = parse_authchallenge(&line.text)?;
                let response = client.respond(&server_hash, &server_nonce)?;
                self.msg_checked(&format!("AUTHENTICATE {response}"))?;
            }
            Auth::Cookie(cookie) if info.auth_methods.cookie => {
                self.msg_checked(&format!("AUTHENTICATE {}", hex::encode(cookie)))?;
            }
            Auth::Password(password) if info.auth_methods.password => {
                let escaped = password.replace('\\', "\\\\").replace('"', "\\\"");
                self.msg_checked(&format!("AUTHENTICATE \"{escaped}\""))?;
            }
            _ => {
                return Err(Error::UnsupportedAuth(format!(
                    "{auth:?} not offered by control port (methods: {:?})",
                    info.auth_methods
                )))
            }
        }
        Ok(())
    }

    /// Send `GETINFO <key>` and return its parsed `key -> value` map.
    pub fn get_info(&self, keys: &[&str]) -> Result<Vec<(String, String)>> {
        let reply = self.msg_checked(&format!("GETINFO {}", keys.join(" ")))?;
        Ok(reply.into_info_map())
    }

    /// Send `GETCONF <key>` and return its parsed `key -> value` map.
    pub fn get_conf(&self, keys: &[&str]) -> Result<Vec<(String, String)>> {
        let reply = self.msg_checked(&format!("GETCONF {}", keys.join(" ")))?;
        Ok(reply.into_info_map())
    }

    /// Send `SIGNAL <name>` (e.g. `NEWNYM`, `SHUTDOWN`, `HUP`).
    pub fn signal(&self, name: &str) -> Result<()> {
        self.msg_checked(&format!("SIGNAL {name}")).map(|_| ())
    }

    /// Register `callback` for the given event names, re-issuing
    /// `SETEVENTS` with the union of every registered listener's events.
    ///
    /// The callback runs on a dedicated worker thread, distinct from the
    /// socket reader, so a slow callback cannot block further reads.
    pub fn add_event_listener(
        &self,
        events: &[&str],
        callback: impl Fn(Event) + Send + 'static,
    ) -> Result<()> {
        {
            let mut listeners = self.shared.listeners.lock().expect("listener list poisoned");
            listeners.push(Listener {
                events: events.iter().map(|s| s.to_string()).collect(),
                callback: Box::new(callback),
            });
        }
        self.resync_events()
    }

    /// Remove every listener (this crate identifies listeners by
    /// registration, not by callback identity; callers that need to
    /// remove one listener while keeping others should track their own
    /// index and call [`Controller::set_event_listeners`] instead).
    pub fn remove_all_event_listeners(&self) -> Result<()> {
        self.shared.listeners.lock().expect("listener list poisoned").clear();
        self.resync_events()
    }

    /// Re-issue `SETEVENTS` with the union of every registered listener's
    /// event names (possibly empty, which disables event delivery).
    fn resync_events(&self) -> Result<()> {
        let union = {
            let listeners = self.shared.listeners.lock().expect("listener list poisoned");
            let mut names: Vec<String> = listeners
                .iter()
                .flat_map(|l| l.events.iter().cloned())
                .collect();
            names.sort();
            names.dedup();
            names
        };
        if union.is_empty() {
            self.msg_checked("SETEVENTS")?;
        } else {
            self.msg_checked(&format!("SETEVENTS {}", union.join(" ")))?;
        }
        Ok(())
    }

    /// Close the control connection: stop the event worker, close the
    /// socket, and fail any reply waiter still blocked in
    /// [`Controller::msg`].
    pub fn close(&self) {
        self.shared.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        if let Ok(sock) = self.shared.send_lock.lock() {
            let _ = sock.shutdown(std::net::Shutdown::Both);
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.close();
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
        // dropping event_tx (implicitly, when Controller drops) lets the
        // event thread's recv() return Err and exit; join it after.
        drop(self.event_tx.clone());
        if let Some(handle) = self.event_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Parse an `AUTHCHALLENGE` reply's single line:
/// `AUTHCHALLENGE SERVERHASH=<hex> SERVERNONCE=<hex>`.
fn parse_authchallenge(text: &str) -> Result<(String, String)> {
    let rest = text
        .trim()
        .strip_prefix("AUTHCHALLENGE ")
        .ok_or_else(|| Error::Malformed(format!("not an AUTHCHALLENGE reply: {text:?}")))?;
    let mut server_hash = None;
    let mut server_nonce = None;
    for token in rest.split_whitespace() {
        if let Some(v) = token.strip_prefix("SERVERHASH=") {
            server_hash = Some(v.to_owned());
        } else if let Some(v) = token.strip_prefix("SERVERNONCE=") {
            server_nonce = Some(v.to_owned());
        }
    }
    match (server_hash, server_nonce) {
        (Some(h), Some(n)) => Ok((h, n)),
        _ => Err(Error::Malformed(format!("incomplete AUTHCHALLENGE reply: {text:?}"))),
    }
}

/// Continually read [`ControlMessage`]s from the control socket,
/// dispatching `650` events to the event worker and everything else to
/// the reply channel.
fn reader_loop(
    stream: TcpStream,
    reply_tx: mpsc::Sender<Result<ControlMessage>>,
    event_tx: mpsc::Sender<Event>,
    shared: Arc<Shared>,
) {
    let mut reader = BufReader::new(stream);
    loop {
        if shared.closed.load(std::sync::atomic::Ordering::SeqCst) {
            break;
        }
        let result = ControlMessage::read(|| read_crlf_line(&mut reader));
        match result {
            Ok(message) if message.is_event() => {
                if let Some(event) = Event::from_message(message) {
                    if event_tx.send(event).is_err() {
                        break;
                    }
                }
            }
            Ok(message) => {
                if reply_tx.send(Ok(message)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = reply_tx.send(Err(e));
                break;
            }
        }
    }
    shared.closed.store(true, std::sync::atomic::Ordering::SeqCst);
}

/// Read one CRLF- (or bare LF-) terminated line from the control socket.
fn read_crlf_line(reader: &mut BufReader<TcpStream>) -> Result<String> {
    let mut raw = Vec::new();
    let n = reader
        .read_until(b'\n', &mut raw)
        .map_err(|e| Error::Io(e.to_string()))?;
    if n == 0 {
        return Err(Error::Io("control socket closed".into()));
    }
    while raw.last() == Some(&b'\n') || raw.last() == Some(&b'\r') {
        raw.pop();
    }
    String::from_utf8(raw).map_err(|e| Error::Malformed(format!("non-UTF-8 control line: {e}")))
}

/// Dispatch events to every listener subscribed to that event's name, on a
/// thread distinct from the socket reader.
fn event_loop(event_rx: mpsc::Receiver<Event>, shared: Arc<Shared>) {
    for event in event_rx {
        let listeners = shared.listeners.lock().expect("listener list poisoned");
        for listener in listeners.iter() {
            if listener.events.iter().any(|e| e.eq_ignore_ascii_case(&event.name)) {
                (listener.callback)(event.clone());
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::TcpListener;

    /// Spin up a fake control port that replies to `GETINFO version` and
    /// then echoes a canned `650 BW` event, to exercise the reader/event
    /// split without a real Tor process.
    fn spawn_fake_tor() -> (Controller, std::thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line, "GETINFO version\r\n");
            writer
                .write_all(b"250-version=0.4.7.13\r\n250 OK\r\n")
                .unwrap();
        });
        let controller = Controller::connect(addr).unwrap();
        (controller, server)
    }

    #[test]
    fn getinfo_round_trip() {
        let (controller, server) = spawn_fake_tor();
        let info = controller.get_info(&["version"]).unwrap();
        assert_eq!(info, vec![("version".to_owned(), "0.4.7.13".to_owned())]);
        server.join().unwrap();
    }

    #[test]
    fn authchallenge_parsing() {
        let (hash, nonce) = parse_authchallenge(
            "AUTHCHALLENGE SERVERHASH=aabbcc SERVERNONCE=ddeeff",
        )
        .unwrap();
        assert_eq!(hash, "aabbcc");
        assert_eq!(nonce, "ddeeff");
    }

    #[test]
    fn authchallenge_rejects_missing_fields() {
        assert!(parse_authchallenge("AUTHCHALLENGE SERVERHASH=aabbcc").is_err());
    }
}
