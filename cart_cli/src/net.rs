//! TCP plumbing for the line protocol.
//!
//! Both directions frame messages with `;`. Inbound lines become
//! `Event::Net` on the controller channel; whatever the controller answers
//! is written back on the same connection.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use cart_core::Event;
use cart_traits::{BoxError, ItemLookup, Lookup, Uplink};
use crossbeam_channel as xch;
use eyre::{Result, WrapErr};

const REPLY_WAIT: Duration = Duration::from_secs(2);

/// Read `;`-terminated frames from `stream` and forward them to the
/// controller until the peer hangs up or the controller goes away.
fn pump(stream: TcpStream, events: &xch::Sender<Event>) -> std::io::Result<()> {
    let peer = stream.peer_addr().ok();
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b';', &mut buf)? == 0 {
            tracing::debug!(?peer, "peer closed");
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf).trim().to_owned();
        if line.is_empty() {
            continue;
        }
        let (reply_tx, reply_rx) = xch::bounded(1);
        if events.send(Event::Net { line, reply: reply_tx }).is_err() {
            return Ok(());
        }
        // Replies are optional; a timeout only means there is nothing to say.
        if let Ok(reply) = reply_rx.recv_timeout(REPLY_WAIT) {
            writer.write_all(reply.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
    }
}

/// Bind `addr` and serve each connection on its own thread.
pub fn spawn_server(addr: &str, events: xch::Sender<Event>) -> Result<SocketAddr> {
    let listener =
        TcpListener::bind(addr).wrap_err_with(|| format!("bind protocol server on {addr}"))?;
    let local = listener.local_addr()?;
    tracing::info!(%local, "protocol server listening");
    std::thread::spawn(move || {
        for conn in listener.incoming() {
            match conn {
                Ok(stream) => {
                    let events = events.clone();
                    std::thread::spawn(move || {
                        if let Err(e) = pump(stream, &events) {
                            tracing::warn!(error = %e, "connection dropped");
                        }
                    });
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            }
        }
    });
    Ok(local)
}

/// Outbound link to the store backend. Connects on first send and
/// reconnects after a write failure; replies from the peer are fed back in
/// as `Event::Net`.
pub struct TcpUplink {
    addr: String,
    stream: Option<TcpStream>,
    events: xch::Sender<Event>,
}

impl TcpUplink {
    pub fn new(addr: impl Into<String>, events: xch::Sender<Event>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
            events,
        }
    }

    fn connect(&mut self) -> std::io::Result<&mut TcpStream> {
        if self.stream.is_none() {
            let stream = TcpStream::connect(&self.addr)?;
            let inbound = stream.try_clone()?;
            let events = self.events.clone();
            std::thread::spawn(move || {
                if let Err(e) = pump(inbound, &events) {
                    tracing::debug!(error = %e, "uplink reader stopped");
                }
            });
            tracing::info!(addr = %self.addr, "uplink connected");
            self.stream = Some(stream);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| std::io::Error::other("uplink not connected"))
    }
}

impl Uplink for TcpUplink {
    fn send(&mut self, line: &str) -> std::result::Result<(), BoxError> {
        let stream = self.connect()?;
        let sent = stream
            .write_all(line.as_bytes())
            .and_then(|()| stream.write_all(b"\n"))
            .and_then(|()| stream.flush());
        if let Err(e) = sent {
            self.stream = None;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Item lookup answered by the backend: every code is `Pending` and the
/// controller sends `upc_lookup` over the uplink.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteLookup;

impl ItemLookup for RemoteLookup {
    fn lookup(&mut self, _upc: &str) -> std::result::Result<Lookup, BoxError> {
        Ok(Lookup::Pending)
    }
}
