use std::env;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::{TraciClient, TraciError};

/// Resolves a SUMO tool name to `$SUMO_HOME/bin/<name>` when `SUMO_HOME` is
/// set, otherwise to the bare name so it is looked up on `PATH`.
pub fn sumo_bin(name: &str) -> PathBuf {
    match env::var_os("SUMO_HOME") {
        Some(home) => Path::new(&home).join("bin").join(name),
        None => PathBuf::from(name),
    }
}

/// How to start SUMO for a session.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Use `sumo-gui` instead of `sumo`.
    pub gui: bool,
    pub net: PathBuf,
    pub routes: PathBuf,
    pub additional: PathBuf,
    /// Fixed TraCI port, or `None` to pick a free one.
    pub port: Option<u16>,
    pub connect_attempts: u32,
    pub retry_delay: Duration,
}

impl LaunchOptions {
    fn args(&self, port: u16) -> Vec<String> {
        vec![
            "-n".into(),
            self.net.display().to_string(),
            "-r".into(),
            self.routes.display().to_string(),
            "--additional-files".into(),
            self.additional.display().to_string(),
            "--remote-port".into(),
            port.to_string(),
        ]
    }
}

/// A SUMO child process, killed when dropped.
#[derive(Debug)]
pub struct SumoProcess {
    child: Child,
}

impl Drop for SumoProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> Result<u16, TraciError> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Starts SUMO with a TraCI server and connects to it.
///
/// The returned client owns the child process.
///
/// # Errors
///
/// Returns `TraciError::Launch` if the binary cannot be spawned and
/// `TraciError::ConnectTimeout` if no connection succeeds within
/// `connect_attempts` tries.
pub fn launch(opts: &LaunchOptions) -> Result<TraciClient, TraciError> {
    let port = match opts.port {
        Some(p) => p,
        None => free_port()?,
    };
    let binary = sumo_bin(if opts.gui { "sumo-gui" } else { "sumo" });
    let args = opts.args(port);
    info!(binary = %binary.display(), args = %args.join(" "), "launching SUMO");

    let child = Command::new(&binary)
        .args(&args)
        .stdin(Stdio::null())
        .spawn()
        .map_err(|source| TraciError::Launch {
            binary: binary.display().to_string(),
            source,
        })?;
    let process = SumoProcess { child };

    let mut client =
        connect_with_retries(port, opts.connect_attempts, opts.retry_delay)?.attach(process);
    let (api, version) = client.version()?;
    info!(api, %version, port, "connected to SUMO");
    Ok(client)
}

fn connect_with_retries(
    port: u16,
    attempts: u32,
    delay: Duration,
) -> Result<TraciClient, TraciError> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match TraciClient::connect(port) {
            Ok(client) => return Ok(client),
            Err(e) => {
                debug!(attempt, port, error = %e, "TraCI server not ready");
                thread::sleep(delay);
            }
        }
    }
    Err(TraciError::ConnectTimeout { port, attempts })
}
