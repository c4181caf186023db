//! Server management - spawning and health checking the static file server

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Handle to a running `uiregress-web` process
#[derive(Debug)]
pub struct ServerHandle {
    child: Child,
    base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn the static file server and wait until it answers health checks.
    pub async fn spawn(config: ServerConfig) -> HarnessResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://127.0.0.1:{port}");

        info!("spawning static server on port {}", port);

        let child = Command::new(&config.binary_path)
            .env("UIREGRESS_WEB_ADDR", format!("127.0.0.1:{port}"))
            .env("UIREGRESS_WEB_STATIC_DIR", &config.static_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                HarnessError::ServerStartup(format!(
                    "failed to spawn {}: {}",
                    config.binary_path.display(),
                    e
                ))
            })?;

        let handle = ServerHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("static server is healthy at {}", base_url);
        Ok(handle)
    }

    async fn wait_for_healthy(&self, timeout: Duration) -> HarnessResult<()> {
        let health_url = format!("{}/health", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => warn!("health check returned {}", resp.status()),
                Err(e) => {
                    if attempts == 1 {
                        info!("waiting for static server to start...");
                    }
                    // Connection refused is expected while the server starts.
                    if !e.is_connect() {
                        warn!("health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(HarnessError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server, SIGTERM first then kill.
    pub fn stop(&mut self) {
        info!("stopping static server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(200));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Configuration for spawning the static file server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the uiregress-web binary
    pub binary_path: PathBuf,

    /// Directory holding the page under test
    pub static_dir: PathBuf,

    /// Port to listen on (None = find a free one)
    pub port: Option<u16>,

    /// How long to wait for the server to come up
    pub startup_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("target/debug/uiregress-web"),
            static_dir: PathBuf::from("crates/web/static"),
            port: None,
            startup_timeout: Duration::from_secs(30),
        }
    }
}

fn find_free_port() -> HarnessResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|e| HarnessError::ServerStartup(format!("no free port: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| HarnessError::ServerStartup(format!("no free port: {e}")))?
        .port();
    Ok(port)
}
