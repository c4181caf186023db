//! Browser session management over a spawned Playwright driver
//!
//! The automation driver is an external collaborator: a Node process running
//! Playwright, spawned once per session and controlled over a JSON-lines
//! stdin/stdout protocol. One session per scenario, exclusively owned by it.
//! Release is guaranteed on every exit path: the normal path goes through
//! [`BrowserSession::close`], and `Drop` kills whatever is left.

use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};

/// Budget for driver startup, including browser launch.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Budget for a single protocol command round-trip. A hung browser is cut
/// off here and surfaces as that scenario's failure instead of hanging the
/// whole run.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::fmt::Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!(
                "unknown browser '{other}' (expected chromium, firefox or webkit)"
            )),
        }
    }
}

/// Options applied when a browser is launched.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// One reply line from the driver.
#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

struct DriverPipe {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

/// An opaque handle to one running browser instance.
pub struct BrowserSession {
    kind: Browser,
    child: Child,
    pipe: Mutex<DriverPipe>,
    next_id: AtomicU64,
    // Holds the driver script for the lifetime of the process.
    _driver_dir: tempfile::TempDir,
}

impl BrowserSession {
    /// Spawn the driver and wait for it to report a ready browser.
    ///
    /// Fails with [`HarnessError::DriverNotFound`] when `node` is missing
    /// and [`HarnessError::BrowserLaunch`] when the browser itself cannot
    /// be started (binary absent, invalid options).
    pub async fn launch(kind: Browser, options: &LaunchOptions) -> HarnessResult<Self> {
        check_node_installed()?;

        let driver_dir = tempfile::tempdir()?;
        let script_path = driver_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_JS)?;

        debug!("launching {} (headless: {})", kind, options.headless);

        let mut child = Command::new("node")
            .arg(&script_path)
            .arg(kind.as_str())
            .arg(options.headless.to_string())
            .arg(options.viewport_width.to_string())
            .arg(options.viewport_height.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| HarnessError::BrowserLaunch {
                browser: kind.to_string(),
                reason: format!("failed to spawn driver: {e}"),
            })?;

        let stdin = child.stdin.take().expect("driver stdin is piped");
        let stdout = child.stdout.take().expect("driver stdout is piped");
        let stderr = child.stderr.take().expect("driver stderr is piped");

        // Drain driver diagnostics so the pipe never backs up.
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "uiregress::driver", "{}", line);
            }
        });

        let mut lines = BufReader::new(stdout).lines();

        let ready = timeout(LAUNCH_TIMEOUT, lines.next_line()).await;
        let ready_line = match ready {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) | Ok(Err(_)) => {
                let _ = child.start_kill();
                return Err(HarnessError::BrowserLaunch {
                    browser: kind.to_string(),
                    reason: "driver exited before reporting ready".to_string(),
                });
            }
            Err(_) => {
                let _ = child.start_kill();
                return Err(HarnessError::BrowserLaunch {
                    browser: kind.to_string(),
                    reason: format!("driver did not become ready within {LAUNCH_TIMEOUT:?}"),
                });
            }
        };

        #[derive(Deserialize)]
        struct Ready {
            ready: bool,
            #[serde(default)]
            error: Option<String>,
        }

        let ready: Ready = serde_json::from_str(&ready_line).map_err(|e| {
            let _ = child.start_kill();
            HarnessError::BrowserLaunch {
                browser: kind.to_string(),
                reason: format!("unparseable ready line '{ready_line}': {e}"),
            }
        })?;

        if !ready.ready {
            let _ = child.start_kill();
            return Err(HarnessError::BrowserLaunch {
                browser: kind.to_string(),
                reason: ready
                    .error
                    .unwrap_or_else(|| "driver reported failure".to_string()),
            });
        }

        debug!("{} session ready", kind);

        Ok(Self {
            kind,
            child,
            pipe: Mutex::new(DriverPipe { stdin, lines }),
            next_id: AtomicU64::new(1),
            _driver_dir: driver_dir,
        })
    }

    pub fn kind(&self) -> Browser {
        self.kind
    }

    /// Navigate to an absolute URL and wait for the load event.
    pub async fn goto(&self, url: &str) -> HarnessResult<()> {
        let reply = self.request(json!({ "cmd": "goto", "url": url })).await?;
        if reply.ok {
            Ok(())
        } else {
            Err(HarnessError::Navigation {
                url: url.to_string(),
                reason: reply.error.unwrap_or_else(|| "unknown".to_string()),
            })
        }
    }

    /// Replace the content of the input matching `selector`.
    pub async fn fill(&self, selector: &str, value: &str) -> HarnessResult<()> {
        self.expect_ok(json!({ "cmd": "fill", "selector": selector, "value": value }))
            .await
    }

    pub async fn click(&self, selector: &str) -> HarnessResult<()> {
        self.expect_ok(json!({ "cmd": "click", "selector": selector }))
            .await
    }

    /// Inner text of the first match, or `None` when nothing matches yet.
    pub async fn text(&self, selector: &str) -> HarnessResult<Option<String>> {
        let reply = self
            .request(json!({ "cmd": "text", "selector": selector }))
            .await?;
        if !reply.ok {
            return Err(HarnessError::Driver(
                reply.error.unwrap_or_else(|| "unknown".to_string()),
            ));
        }
        Ok(reply.value.as_str().map(str::to_string))
    }

    pub async fn is_visible(&self, selector: &str) -> HarnessResult<bool> {
        let reply = self
            .request(json!({ "cmd": "visible", "selector": selector }))
            .await?;
        if !reply.ok {
            return Err(HarnessError::Driver(
                reply.error.unwrap_or_else(|| "unknown".to_string()),
            ));
        }
        Ok(reply.value.as_bool().unwrap_or(false))
    }

    pub async fn current_url(&self) -> HarnessResult<String> {
        let reply = self.request(json!({ "cmd": "url" })).await?;
        match reply.value.as_str() {
            Some(url) if reply.ok => Ok(url.to_string()),
            _ => Err(HarnessError::Driver(
                reply.error.unwrap_or_else(|| "driver returned no url".to_string()),
            )),
        }
    }

    /// Capture a full-page screenshot to `path`.
    pub async fn screenshot(&self, path: &Path) -> HarnessResult<()> {
        self.expect_ok(json!({ "cmd": "screenshot", "path": path.to_string_lossy() }))
            .await
    }

    /// Close the browser and reap the driver process.
    ///
    /// The protocol close is best-effort; the child is killed if it does not
    /// exit promptly, so a session never outlives this call.
    pub async fn close(mut self) {
        if let Ok(reply) = self.request(json!({ "cmd": "close" })).await {
            if !reply.ok {
                warn!("driver close reported: {:?}", reply.error);
            }
        }

        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("{} driver exited: {}", self.kind, status),
            _ => {
                warn!("{} driver did not exit, killing", self.kind);
                let _ = self.child.start_kill();
            }
        }
    }

    async fn expect_ok(&self, payload: serde_json::Value) -> HarnessResult<()> {
        let reply = self.request(payload).await?;
        if reply.ok {
            Ok(())
        } else {
            Err(HarnessError::Driver(
                reply.error.unwrap_or_else(|| "unknown".to_string()),
            ))
        }
    }

    async fn request(&self, mut payload: serde_json::Value) -> HarnessResult<DriverReply> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        payload["id"] = json!(id);

        let mut pipe = self.pipe.lock().await;

        let mut line = serde_json::to_string(&payload)?;
        line.push('\n');
        pipe.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| HarnessError::Driver(format!("driver pipe closed: {e}")))?;
        pipe.stdin
            .flush()
            .await
            .map_err(|e| HarnessError::Driver(format!("driver pipe closed: {e}")))?;

        // The driver replies in order; skip anything with a stale id.
        loop {
            let next = timeout(COMMAND_TIMEOUT, pipe.lines.next_line())
                .await
                .map_err(|_| {
                    HarnessError::Driver(format!(
                        "no reply to command {id} within {COMMAND_TIMEOUT:?}"
                    ))
                })?
                .map_err(|e| HarnessError::Driver(format!("driver pipe read failed: {e}")))?
                .ok_or_else(|| HarnessError::Driver("driver exited mid-command".to_string()))?;

            let reply: DriverReply = serde_json::from_str(&next)
                .map_err(|e| HarnessError::Driver(format!("bad reply '{next}': {e}")))?;
            if reply.id == id {
                return Ok(reply);
            }
            debug!("skipping stale driver reply {}", reply.id);
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Backstop for early-return paths; `close` reaps the child first on
        // the normal path, making this a no-op there.
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.start_kill();
        }
    }
}

fn check_node_installed() -> HarnessResult<()> {
    let status = std::process::Command::new("node")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(HarnessError::DriverNotFound),
    }
}

/// The driver program, written to a scratch directory at launch.
const DRIVER_JS: &str = r#"// uiregress browser driver: JSON-lines over stdio.
const readline = require('readline');

const [browserName, headlessArg, widthArg, heightArg] = process.argv.slice(2);

async function main() {
  let playwright;
  try {
    playwright = require('playwright');
  } catch (err) {
    console.log(JSON.stringify({ ready: false, error: 'playwright module not available: ' + err.message }));
    process.exit(1);
  }

  const browserType = playwright[browserName];
  if (!browserType) {
    console.log(JSON.stringify({ ready: false, error: 'unknown browser: ' + browserName }));
    process.exit(1);
  }

  let browser;
  try {
    browser = await browserType.launch({ headless: headlessArg === 'true' });
  } catch (err) {
    console.log(JSON.stringify({ ready: false, error: err.message }));
    process.exit(1);
  }

  const context = await browser.newContext({
    viewport: { width: parseInt(widthArg, 10), height: parseInt(heightArg, 10) },
  });
  const page = await context.newPage();

  console.log(JSON.stringify({ ready: true }));

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let req;
    try {
      req = JSON.parse(line);
    } catch (err) {
      console.log(JSON.stringify({ id: 0, ok: false, error: 'bad request: ' + err.message }));
      continue;
    }
    const reply = { id: req.id, ok: true, value: null };
    try {
      switch (req.cmd) {
        case 'goto':
          await page.goto(req.url, { waitUntil: 'load' });
          break;
        case 'fill':
          await page.fill(req.selector, req.value, { timeout: 5000 });
          break;
        case 'click':
          await page.click(req.selector, { timeout: 5000 });
          break;
        case 'text': {
          const el = await page.$(req.selector);
          reply.value = el ? await el.innerText() : null;
          break;
        }
        case 'visible': {
          const el = await page.$(req.selector);
          reply.value = el ? await el.isVisible() : false;
          break;
        }
        case 'url':
          reply.value = page.url();
          break;
        case 'screenshot':
          await page.screenshot({ path: req.path, fullPage: true });
          break;
        case 'close':
          console.log(JSON.stringify(reply));
          await browser.close();
          process.exit(0);
        default:
          reply.ok = false;
          reply.error = 'unknown command: ' + req.cmd;
      }
    } catch (err) {
      reply.ok = false;
      reply.error = err.message;
    }
    console.log(JSON.stringify(reply));
  }

  await browser.close();
}

main().catch((err) => {
  console.log(JSON.stringify({ ready: false, error: err.message }));
  process.exit(1);
});
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Browser::Chromium, "chromium")]
    #[test_case(Browser::Firefox, "firefox")]
    #[test_case(Browser::Webkit, "webkit")]
    fn browser_names_round_trip(browser: Browser, name: &str) {
        assert_eq!(browser.as_str(), name);
        assert_eq!(name.parse::<Browser>().unwrap(), browser);
    }

    #[test]
    fn unknown_browser_name_is_rejected() {
        assert!("chrome".parse::<Browser>().is_err());
    }

    #[test]
    fn default_launch_options() {
        let options = LaunchOptions::default();
        assert!(options.headless);
        assert_eq!(options.viewport_width, 1280);
        assert_eq!(options.viewport_height, 720);
    }

    #[test]
    fn parses_ok_reply() {
        let reply: DriverReply =
            serde_json::from_str(r#"{"id":3,"ok":true,"value":"https://x/inventory.html"}"#)
                .unwrap();
        assert_eq!(reply.id, 3);
        assert!(reply.ok);
        assert_eq!(reply.value.as_str(), Some("https://x/inventory.html"));
    }

    #[test]
    fn parses_error_reply_without_value() {
        let reply: DriverReply =
            serde_json::from_str(r#"{"id":4,"ok":false,"error":"timeout exceeded"}"#).unwrap();
        assert!(!reply.ok);
        assert_eq!(reply.error.as_deref(), Some("timeout exceeded"));
        assert!(reply.value.is_null());
    }
}
