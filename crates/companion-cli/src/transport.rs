//! Line-delimited JSON transport to a companion relay.
//!
//! Each request is one JSON object per line: `{"id", "type", "params"}`. The
//! relay answers with `{"id", "ok", "result", "error"}` on its own line.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::time::Duration;

use companion_bridge::{
    CompanionReply, CompanionTransport, Handshake, HandshakeRequest, TransportError,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEndpoint {
    Tcp(SocketAddr),
    #[cfg(unix)]
    Unix(PathBuf),
}

impl RelayEndpoint {
    pub fn parse(text: &str) -> Result<Self, String> {
        if let Some(rest) = text.strip_prefix("tcp://") {
            let addr = rest.parse::<SocketAddr>().map_err(|err| err.to_string())?;
            return Ok(Self::Tcp(addr));
        }
        #[cfg(unix)]
        if let Some(rest) = text.strip_prefix("unix://") {
            return Ok(Self::Unix(PathBuf::from(rest)));
        }
        Err(format!("unsupported endpoint '{text}'"))
    }
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PollResult {
    #[serde(default)]
    replies: Vec<CompanionReply>,
}

/// [`CompanionTransport`] over a TCP or Unix socket to a relay process that
/// talks to the device.
#[derive(Debug)]
pub struct LineTransport {
    seq: u64,
    reader: BufReader<RelayStream>,
}

impl LineTransport {
    pub fn connect(endpoint: &RelayEndpoint, timeout: Option<Duration>) -> io::Result<Self> {
        let stream = match endpoint {
            RelayEndpoint::Tcp(addr) => RelayStream::Tcp(TcpStream::connect(addr)?),
            #[cfg(unix)]
            RelayEndpoint::Unix(path) => {
                RelayStream::Unix(std::os::unix::net::UnixStream::connect(path)?)
            }
        };
        stream.set_read_timeout(timeout)?;
        Ok(Self {
            seq: 1,
            reader: BufReader::new(stream),
        })
    }

    fn next_id(&mut self) -> u64 {
        let id = self.seq;
        self.seq = self.seq.saturating_add(1);
        id
    }

    fn request(&mut self, kind: &str, params: Option<Value>) -> Result<Value, TransportError> {
        let id = self.next_id();
        let mut payload = json!({ "id": id, "type": kind });
        if let Some(params) = params {
            payload["params"] = params;
        }
        let line = serde_json::to_string(&payload)
            .map_err(|err| TransportError::Protocol(err.to_string().into()))?;
        {
            let stream = self.reader.get_mut();
            stream.write_all(line.as_bytes()).map_err(io_error)?;
            stream.write_all(b"\n").map_err(io_error)?;
            stream.flush().map_err(io_error)?;
        }
        // Answers to requests that timed out earlier arrive first; drop them.
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).map_err(io_error)?;
            if read == 0 {
                return Err(TransportError::LinkLost);
            }
            let response: RelayResponse = serde_json::from_str(&line)
                .map_err(|err| TransportError::Protocol(err.to_string().into()))?;
            if response.id < id {
                debug!("discarding late answer to request {}", response.id);
                continue;
            }
            if response.id > id {
                return Err(TransportError::Protocol(
                    format!("response id {} is ahead of request {id}", response.id).into(),
                ));
            }
            if !response.ok {
                let message = response
                    .error
                    .unwrap_or_else(|| "request failed".to_string());
                return Err(TransportError::Rejected(message.into()));
            }
            debug!("relay answered {kind} request {id}");
            return Ok(response.result.unwrap_or(Value::Null));
        }
    }
}

impl CompanionTransport for LineTransport {
    fn handshake(&mut self, request: &HandshakeRequest) -> Result<Handshake, TransportError> {
        let params = serde_json::to_value(request)
            .map_err(|err| TransportError::Protocol(err.to_string().into()))?;
        let result = self.request("handshake", Some(params))?;
        if result.is_null() {
            return Ok(Handshake::default());
        }
        serde_json::from_value(result).map_err(|err| TransportError::Protocol(err.to_string().into()))
    }

    fn transmit(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let command: Value = serde_json::from_slice(payload)
            .map_err(|err| TransportError::Protocol(err.to_string().into()))?;
        self.request("eval", Some(command)).map(|_| ())
    }

    fn poll(&mut self) -> Result<Vec<CompanionReply>, TransportError> {
        let result = self.request("poll", None)?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        let result: PollResult = serde_json::from_value(result)
            .map_err(|err| TransportError::Protocol(err.to_string().into()))?;
        Ok(result.replies)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.request("reset", None).map(|_| ())
    }
}

fn io_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::UnexpectedEof => TransportError::LinkLost,
        _ => TransportError::Io(err.to_string().into()),
    }
}

#[derive(Debug)]
enum RelayStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl RelayStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            RelayStream::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            RelayStream::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }
}

impl Read for RelayStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            RelayStream::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            RelayStream::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for RelayStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            RelayStream::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            RelayStream::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            RelayStream::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            RelayStream::Unix(stream) => stream.flush(),
        }
    }
}
