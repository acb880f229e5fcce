// src/reload/websocket.rs

//! LiveReload-compatible WebSocket broadcaster.
//!
//! Speaks the subset of the LiveReload protocol browsers need: a `hello`
//! handshake on connect and a `reload` command per completed recipe. The
//! script injected by the static server (and the browser extensions) both
//! understand it.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

use crate::reload::ReloadChannel;

pub const LIVERELOAD_PROTOCOL: &str = "http://livereload.com/protocols/official-7";

/// A peer that has not finished the WebSocket handshake by then is dropped.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Work for the broadcaster thread, the only owner of client sockets.
#[derive(Debug)]
enum ReloadMsg {
    Client(WebSocket<TcpStream>),
    Reload(String),
}

/// Live-reload server.
///
/// One thread accepts TCP connections and hands each handshake to its own
/// short-lived thread. Finished clients and reload notifications flow over
/// a channel to a broadcaster thread, so [`ReloadChannel::recipe_completed`]
/// never touches a socket.
#[derive(Debug)]
pub struct WebSocketReload {
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<ReloadMsg>,
    clients: Arc<AtomicUsize>,
}

impl WebSocketReload {
    /// Bind `hostname:port` and start accepting browser connections on a
    /// background thread. Port `0` picks a free port.
    pub fn bind(hostname: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((hostname, port))
            .with_context(|| format!("binding live reload socket on {hostname}:{port}"))?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let clients = Arc::new(AtomicUsize::new(0));

        let count = Arc::clone(&clients);
        thread::Builder::new()
            .name("livereload-broadcast".to_string())
            .spawn(move || broadcast_loop(rx, count))
            .context("spawning live reload broadcaster thread")?;

        let accept_tx = tx.clone();
        thread::Builder::new()
            .name("livereload-accept".to_string())
            .spawn(move || accept_loop(listener, accept_tx))
            .context("spawning live reload acceptor thread")?;

        info!(%addr, "live reload server listening");
        Ok(Self { addr, tx, clients })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Clients currently registered with the broadcaster.
    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }
}

impl ReloadChannel for WebSocketReload {
    fn recipe_completed(&self, recipe: &str) {
        debug!(recipe = %recipe, clients = self.client_count(), "broadcasting reload");
        if self.tx.send(ReloadMsg::Reload(reload_message(recipe))).is_err() {
            warn!(recipe = %recipe, "live reload broadcaster is gone; notification dropped");
        }
    }
}

/// The `reload` command sent after a recipe completes.
pub fn reload_message(recipe: &str) -> String {
    json!({
        "command": "reload",
        "path": "/",
        "liveCSS": true,
        "recipe": recipe,
    })
    .to_string()
}

/// The server half of the LiveReload handshake.
pub fn hello_message() -> String {
    json!({
        "command": "hello",
        "protocols": [LIVERELOAD_PROTOCOL],
        "serverName": env!("CARGO_PKG_NAME"),
    })
    .to_string()
}

fn accept_loop(listener: TcpListener, tx: mpsc::UnboundedSender<ReloadMsg>) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "live reload accept failed");
                continue;
            }
        };

        let tx = tx.clone();
        let spawned = thread::Builder::new()
            .name("livereload-handshake".to_string())
            .spawn(move || {
                if let Some(ws) = handshake(stream) {
                    let _ = tx.send(ReloadMsg::Client(ws));
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "could not spawn live reload handshake thread");
        }
    }
}

/// Complete the WebSocket upgrade and send `hello`. Returns `None` for
/// peers that stall, fail the handshake or hang up.
fn handshake(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    let peer = stream.peer_addr().ok();
    if let Err(e) = stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .and_then(|()| stream.set_write_timeout(Some(WRITE_TIMEOUT)))
    {
        warn!(?peer, error = %e, "could not set live reload socket timeouts");
        return None;
    }

    let mut ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            debug!(?peer, error = %e, "live reload handshake failed");
            return None;
        }
    };

    // Clients are never read from after the handshake.
    if let Err(e) = ws.get_ref().set_read_timeout(None) {
        debug!(?peer, error = %e, "could not clear live reload read timeout");
    }
    if let Err(e) = ws.send(Message::text(hello_message())) {
        debug!(?peer, error = %e, "live reload hello failed");
        return None;
    }

    debug!(?peer, "live reload client connected");
    Some(ws)
}

/// Owns every connected client. Blocking writes happen here, off the async
/// runtime.
fn broadcast_loop(mut rx: mpsc::UnboundedReceiver<ReloadMsg>, count: Arc<AtomicUsize>) {
    let mut clients: Vec<WebSocket<TcpStream>> = Vec::new();

    while let Some(msg) = rx.blocking_recv() {
        match msg {
            ReloadMsg::Client(ws) => clients.push(ws),
            ReloadMsg::Reload(payload) => {
                let before = clients.len();
                clients.retain_mut(|ws| ws.send(Message::text(payload.clone())).is_ok());

                let dropped = before - clients.len();
                if dropped > 0 {
                    debug!(dropped, "removed disconnected live reload clients");
                }
            }
        }
        count.store(clients.len(), Ordering::SeqCst);
    }
    debug!("live reload broadcaster stopped");
}
