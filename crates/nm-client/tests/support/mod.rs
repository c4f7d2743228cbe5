//! Fake daemon bound to a Unix socket in a temporary directory.

use std::io::ErrorKind;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use nm_client::codec::{read_frame, write_frame};
use serde_json::Value;
use tempfile::TempDir;

const NO_LIMIT: usize = usize::MAX;
const ACCEPT_DEADLINE: Duration = Duration::from_secs(5);

/// One scripted answer to a single request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Frames written in order after the request is read.
    Frames(Vec<Value>),
    /// Close the connection without writing anything.
    Hangup,
}

/// Daemon that accepts one client and answers each request from a script.
pub struct FakeDaemon {
    _dir: TempDir,
    path: PathBuf,
    requests: Arc<Mutex<Vec<Value>>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl FakeDaemon {
    /// Binds a socket and serves `script`, one entry per request.
    pub fn spawn(script: Vec<Reply>) -> Result<Self> {
        let dir = tempfile::tempdir().context("create socket dir")?;
        let path = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&path).context("bind fake daemon")?;
        listener
            .set_nonblocking(true)
            .context("fake daemon nonblocking")?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || serve(&listener, &script, &recorded));
        Ok(Self {
            _dir: dir,
            path,
            requests,
            handle: Some(handle),
        })
    }

    /// Socket path clients should connect to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for the script to finish and returns the decoded requests.
    pub fn finish(mut self) -> Result<Vec<Value>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake daemon thread panicked"))??;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }
}

fn serve(listener: &UnixListener, script: &[Reply], requests: &Mutex<Vec<Value>>) -> Result<()> {
    let mut stream = accept(listener)?;
    for reply in script {
        let body = read_frame(&mut stream, NO_LIMIT).context("read request")?;
        let request = serde_json::from_slice(&body).context("decode request")?;
        requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?
            .push(request);
        match reply {
            Reply::Frames(frames) => {
                for frame in frames {
                    let encoded = serde_json::to_vec(frame)?;
                    write_frame(&mut stream, &encoded, NO_LIMIT).context("write reply")?;
                }
            }
            Reply::Hangup => return Ok(()),
        }
    }
    Ok(())
}

fn accept(listener: &UnixListener) -> Result<UnixStream> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream
                    .set_nonblocking(false)
                    .context("blocking client stream")?;
                return Ok(stream);
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock && Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(error) => return Err(error).context("accept client"),
        }
    }
}
