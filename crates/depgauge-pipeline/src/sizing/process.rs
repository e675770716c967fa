//! External tools behind the sizing seams: `git`, `go` and `gocloc`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::{LineCounter, Materializer};
use crate::error::{PipelineError, Result};

/// Subdirectory of the scratch workdir used as the module cache.
const MODCACHE_DIR: &str = "modcache";

/// Run `program` to completion, capturing its output.
///
/// The child is killed if the returned future is dropped (timeout, cancel).
async fn run<I, S>(program: &str, args: I, envs: &[(&str, &OsStr)]) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in envs {
        command.env(key, value);
    }

    command.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::process(program, "executable not found on PATH")
        } else {
            PipelineError::process(program, e.to_string())
        }
    })
}

fn failure(program: &str, output: &Output) -> PipelineError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    PipelineError::process(
        program,
        format!("exited with {}: {}", output.status, stderr.trim()),
    )
}

// ============================================================================
// git
// ============================================================================

/// Shallow-clones a repository URL.
#[derive(Debug, Clone)]
pub struct GitCloneMaterializer {
    program: String,
}

impl GitCloneMaterializer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitCloneMaterializer {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait]
impl Materializer for GitCloneMaterializer {
    async fn materialize(&self, location: &str, workdir: &Path) -> Result<PathBuf> {
        let dest = workdir.join("src");
        debug!(url = %location, dest = %dest.display(), "Cloning");

        let output = run(
            &self.program,
            [
                OsStr::new("clone"),
                OsStr::new("--depth"),
                OsStr::new("1"),
                OsStr::new("--quiet"),
                OsStr::new(location),
                dest.as_os_str(),
            ],
            &[("GIT_TERMINAL_PROMPT", OsStr::new("0"))],
        )
        .await?;

        if !output.status.success() {
            return Err(failure(&self.program, &output));
        }
        Ok(dest)
    }
}

// ============================================================================
// go mod download
// ============================================================================

/// One object of `go mod download -json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModuleDownload {
    #[serde(default)]
    dir: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Extract the extracted source directory from `go mod download -json`.
fn parse_module_download(program: &str, stdout: &[u8]) -> Result<PathBuf> {
    let download: ModuleDownload =
        serde_json::from_slice(stdout).map_err(|e| PipelineError::tool_output(program, e))?;

    if let Some(error) = download.error.filter(|e| !e.is_empty()) {
        return Err(PipelineError::process(program, error));
    }
    download
        .dir
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| PipelineError::tool_output(program, "no Dir in download result"))
}

/// `module@version` as `go mod download` expects it.
fn download_target(location: &str) -> String {
    if location.contains('@') {
        location.to_string()
    } else {
        format!("{}@latest", location)
    }
}

/// Downloads a Go module into a module cache private to the workdir.
#[derive(Debug, Clone)]
pub struct GoModuleMaterializer {
    program: String,
}

impl GoModuleMaterializer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GoModuleMaterializer {
    fn default() -> Self {
        Self::new("go")
    }
}

#[async_trait]
impl Materializer for GoModuleMaterializer {
    async fn materialize(&self, location: &str, workdir: &Path) -> Result<PathBuf> {
        let modcache = workdir.join(MODCACHE_DIR);
        let target = download_target(location);
        debug!(module = %target, modcache = %modcache.display(), "Downloading module");

        let output = run(
            &self.program,
            ["mod", "download", "-json", target.as_str()],
            &[
                ("GOMODCACHE", modcache.as_os_str()),
                ("GOFLAGS", OsStr::new("-modcacherw")),
                ("GO111MODULE", OsStr::new("on")),
            ],
        )
        .await?;

        // The JSON object carries the error even when the exit status is non-zero
        match parse_module_download(&self.program, &output.stdout) {
            Ok(dir) => Ok(dir),
            Err(_) if !output.status.success() => Err(failure(&self.program, &output)),
            Err(e) => Err(e),
        }
    }

    async fn release(&self, workdir: &Path) -> Result<()> {
        let modcache = workdir.join(MODCACHE_DIR);
        if !modcache.exists() {
            return Ok(());
        }

        let output = run(
            &self.program,
            ["clean", "-modcache"],
            &[("GOMODCACHE", modcache.as_os_str())],
        )
        .await?;
        if !output.status.success() {
            return Err(failure(&self.program, &output));
        }
        Ok(())
    }
}

// ============================================================================
// gocloc
// ============================================================================

#[derive(Debug, Deserialize)]
struct ClocReport {
    total: ClocTotal,
}

#[derive(Debug, Deserialize)]
struct ClocTotal {
    code: u64,
}

/// Read `total.code` from `gocloc --output-type=json`.
fn parse_cloc_report(program: &str, stdout: &[u8]) -> Result<u64> {
    let report: ClocReport =
        serde_json::from_slice(stdout).map_err(|e| PipelineError::tool_output(program, e))?;
    Ok(report.total.code)
}

/// Counts lines of code with `gocloc`.
#[derive(Debug, Clone)]
pub struct ClocCounter {
    program: String,
}

impl ClocCounter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ClocCounter {
    fn default() -> Self {
        Self::new("gocloc")
    }
}

#[async_trait]
impl LineCounter for ClocCounter {
    async fn count(&self, path: &Path) -> Result<u64> {
        let output = run(
            &self.program,
            [OsStr::new("--output-type=json"), path.as_os_str()],
            &[],
        )
        .await?;

        if !output.status.success() {
            return Err(failure(&self.program, &output));
        }
        parse_cloc_report(&self.program, &output.stdout)
    }
}
