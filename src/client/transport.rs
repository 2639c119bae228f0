//! Streaming transports that deliver raw feed lines.
//!
//! The coordinator only needs three things from a transport: start it, pull
//! the next line, and stop it. [`LineTransport`] captures that, so the feed
//! can come from a child process printing lines to stdout
//! ([`ProcessTransport`]), from a WebSocket
//! ([`WebSocketTransport`](super::websocket::WebSocketTransport)), or from a
//! scripted source in tests.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::error::Error;

/// A restartable source of raw feed lines
///
/// `next_line` returns `Ok(None)` once the stream has ended. After `stop`,
/// `start` may be called again to reconnect.
#[async_trait]
pub trait LineTransport: Send {
    /// Open the stream
    async fn start(&mut self) -> Result<(), Error>;

    /// Wait for the next line
    async fn next_line(&mut self) -> Result<Option<String>, Error>;

    /// Close the stream and release its resources
    async fn stop(&mut self) -> Result<(), Error>;
}

#[async_trait]
impl<T: LineTransport + ?Sized> LineTransport for Box<T> {
    async fn start(&mut self) -> Result<(), Error> {
        (**self).start().await
    }

    async fn next_line(&mut self) -> Result<Option<String>, Error> {
        (**self).next_line().await
    }

    async fn stop(&mut self) -> Result<(), Error> {
        (**self).stop().await
    }
}

/// Runs a streamer program and reads one feed line per stdout line
///
/// The child is killed on [`stop`](LineTransport::stop) and when the
/// transport is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use poloniex_book::client::ProcessTransport;
///
/// let transport = ProcessTransport::new("python")
///     .arg("streamer.py")
///     .arg("BTC_ETH");
/// ```
#[derive(Debug)]
pub struct ProcessTransport {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
    lines: Option<Lines<BufReader<ChildStdout>>>,
}

impl ProcessTransport {
    /// Create a transport for `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            child: None,
            lines: None,
        }
    }

    /// Append a command-line argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several command-line arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Whether a child process is currently attached
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

#[async_trait]
impl LineTransport for ProcessTransport {
    async fn start(&mut self) -> Result<(), Error> {
        if self.child.is_some() {
            return Err(Error::InvalidState("process transport already started".into()));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Transport("child stdout not captured".into()))?;

        info!(program = %self.program, pid = ?child.id(), "streamer process started");
        self.lines = Some(BufReader::new(stdout).lines());
        self.child = Some(child);
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, Error> {
        let lines = self
            .lines
            .as_mut()
            .ok_or_else(|| Error::Transport("process transport not started".into()))?;
        Ok(lines.next_line().await?)
    }

    async fn stop(&mut self) -> Result<(), Error> {
        self.lines = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if let Err(e) = child.kill().await {
            // Already exited on its own
            debug!(error = %e, "streamer process kill failed");
        }
        match child.wait().await {
            Ok(status) => info!(%status, "streamer process stopped"),
            Err(e) => warn!(error = %e, "failed to reap streamer process"),
        }
        Ok(())
    }
}
