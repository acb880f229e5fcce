// src/exec/serve.rs

//! `kind = "serve"`: static development server over `tiny_http`.
//!
//! The server is started the first time the task runs and keeps running in
//! a background thread; later runs of the same task are no-ops.

use std::fs;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use percent_encoding::percent_decode_str;
use tiny_http::{Header, Request, Response, Server};
use tracing::{debug, info, warn};

use crate::exec::action::{BoxFuture, TaskAction};

/// Serves files over HTTP.
pub trait FileServer: Send + Sync {
    /// Bind and start serving in the background. Must not block.
    fn start(&self) -> Result<SocketAddr>;

    fn describe(&self) -> String;
}

/// Serves files from a list of roots searched in order; the first root that
/// has the requested path wins. Directories without an `index.html` get a
/// plain listing.
#[derive(Debug, Clone)]
pub struct StaticFileServer {
    hostname: String,
    port: u16,
    roots: Vec<PathBuf>,
    livereload_port: Option<u16>,
}

impl StaticFileServer {
    pub fn new(hostname: impl Into<String>, port: u16, roots: Vec<PathBuf>) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            roots,
            livereload_port: None,
        }
    }

    /// Inject a live-reload client into served HTML pages.
    pub fn with_livereload(mut self, port: Option<u16>) -> Self {
        self.livereload_port = port;
        self
    }
}

impl FileServer for StaticFileServer {
    fn start(&self) -> Result<SocketAddr> {
        let server = Server::http((self.hostname.as_str(), self.port))
            .map_err(|e| anyhow!("binding http://{}:{}: {}", self.hostname, self.port, e))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| anyhow!("http server is not bound to an IP address"))?;

        let roots = self.roots.clone();
        let livereload_port = self.livereload_port;
        std::thread::Builder::new()
            .name("sitewatch-http".to_string())
            .spawn(move || {
                for request in server.incoming_requests() {
                    if let Err(err) = handle_request(request, &roots, livereload_port) {
                        warn!(error = %err, "http request failed");
                    }
                }
                debug!("http server loop finished");
            })
            .context("spawning http server thread")?;

        Ok(addr)
    }

    fn describe(&self) -> String {
        format!("http://{}:{} from {:?}", self.hostname, self.port, self.roots)
    }
}

/// Opens a URL for the user to look at.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Hands the URL to the platform's default browser launcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let mut cmd = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        } else {
            Command::new("xdg-open")
        };

        cmd.arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("launching a browser for {url}"))?;
        Ok(())
    }
}

/// Task action that makes sure a [`FileServer`] is running.
pub struct ServeTask {
    server: Arc<dyn FileServer>,
    bound: Mutex<Option<SocketAddr>>,
    browser: Option<Arc<dyn BrowserOpener>>,
}

impl ServeTask {
    pub fn new(server: Arc<dyn FileServer>) -> Self {
        Self {
            server,
            bound: Mutex::new(None),
            browser: None,
        }
    }

    /// Open the served site once, right after the server first binds.
    pub fn with_browser(mut self, browser: Option<Arc<dyn BrowserOpener>>) -> Self {
        self.browser = browser;
        self
    }

    /// Address the server is listening on, once started.
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        self.bound.lock().ok().and_then(|guard| *guard)
    }

    fn ensure_started(&self) -> Result<()> {
        let mut bound = self
            .bound
            .lock()
            .map_err(|_| anyhow!("serve state mutex poisoned"))?;

        if let Some(addr) = *bound {
            debug!(%addr, "server already running");
            return Ok(());
        }

        let addr = self.server.start()?;
        info!(%addr, "serving on http://{}", addr);
        *bound = Some(addr);

        if let Some(browser) = &self.browser {
            let url = format!("http://{addr}/");
            match browser.open(&url) {
                Ok(()) => debug!(%url, "opened browser"),
                Err(err) => warn!(%url, error = %err, "could not open browser"),
            }
        }
        Ok(())
    }
}

impl TaskAction for ServeTask {
    fn run(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(std::future::ready(self.ensure_started()))
    }

    fn describe(&self) -> String {
        format!("serve: {}", self.server.describe())
    }
}

fn handle_request(request: Request, roots: &[PathBuf], livereload_port: Option<u16>) -> Result<()> {
    let Some(rel) = url_to_relative_path(request.url()) else {
        return respond_text(request, 400, "bad request");
    };

    let mut listing_dir: Option<PathBuf> = None;
    for root in roots {
        let candidate = root.join(&rel);
        if candidate.is_dir() {
            let index = candidate.join("index.html");
            if index.is_file() {
                return respond_file(request, &index, livereload_port);
            }
            listing_dir.get_or_insert(candidate);
        } else if candidate.is_file() {
            return respond_file(request, &candidate, livereload_port);
        }
    }

    match listing_dir {
        Some(dir) => respond_listing(request, &dir),
        None => respond_text(request, 404, "not found"),
    }
}

/// Decode the URL path and reject anything escaping the roots.
pub fn url_to_relative_path(url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let decoded = percent_decode_str(path).decode_utf8().ok()?;

    let rel = PathBuf::from(decoded.trim_start_matches('/'));
    let safe = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    safe.then_some(rel)
}

fn respond_file(request: Request, path: &Path, livereload_port: Option<u16>) -> Result<()> {
    let content_type = content_type_for(path);
    let mut body = fs::read(path).with_context(|| format!("reading {:?}", path))?;

    if let (Some(port), "text/html; charset=utf-8") = (livereload_port, content_type) {
        body = inject_livereload(body, port);
    }

    let mut response = Response::from_data(body);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
        response = response.with_header(header);
    }
    request.respond(response)?;
    Ok(())
}

fn respond_listing(request: Request, dir: &Path) -> Result<()> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .with_context(|| format!("listing {:?}", dir))?
        .filter_map(|e| e.ok())
        .map(|e| {
            let mut name = e.file_name().to_string_lossy().into_owned();
            if e.path().is_dir() {
                name.push('/');
            }
            name
        })
        .collect();
    names.sort();

    let mut html = String::from("<!doctype html><meta charset=\"utf-8\"><ul>\n");
    for name in names {
        html.push_str(&format!("<li><a href=\"{0}\">{0}</a></li>\n", name));
    }
    html.push_str("</ul>\n");

    let mut response = Response::from_string(html);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
        response = response.with_header(header);
    }
    request.respond(response)?;
    Ok(())
}

fn respond_text(request: Request, status: u16, text: &str) -> Result<()> {
    request.respond(Response::from_string(text).with_status_code(status))?;
    Ok(())
}

/// Insert a tiny WebSocket client before `</body>` (or at the end).
pub fn inject_livereload(body: Vec<u8>, port: u16) -> Vec<u8> {
    let script = format!(
        "<script>(function(){{var ws=new WebSocket(\"ws://\"+location.hostname+\":{port}/livereload\");\
ws.onmessage=function(e){{try{{if(JSON.parse(e.data).command===\"reload\"){{location.reload();}}}}catch(_){{}}}};}})();</script>"
    );

    let html = String::from_utf8_lossy(&body);
    let out = match html.rfind("</body>") {
        Some(idx) => format!("{}{}{}", &html[..idx], script, &html[idx..]),
        None => format!("{html}{script}"),
    };
    out.into_bytes()
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}
