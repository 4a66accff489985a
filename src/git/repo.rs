//! Git process invocation
//!
//! All commands run with the repository root as working directory and are
//! bounded by a timeout. A hung process is killed and reported as
//! [`GitError::Timeout`].

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use super::blame::{AncestryCheck, BlameMap, BlameParser};

/// Default per-invocation timeout
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Git ref not found: {0}")]
    RefNotFound(String),

    #[error("git blame failed for {path} (exit {code}): {stderr}")]
    BlameFailed {
        path: PathBuf,
        code: String,
        stderr: String,
    },

    #[error("git blame returned no data for {0}")]
    NoBlameData(PathBuf),

    #[error("git {command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Malformed blame line: {0}")]
    Malformed(String),
}

/// How to invoke git
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    /// Executable name or path
    pub command: String,

    /// Upper bound for a single invocation
    pub timeout: Duration,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            command: "git".to_string(),
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }
}

/// Captured result of a finished git process
#[derive(Debug)]
struct ProcessOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl ProcessOutput {
    fn code(&self) -> String {
        self.status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string())
    }
}

/// A git work tree
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
    settings: GitSettings,
}

impl GitRepo {
    /// Opens the repository containing `path` (a file or directory)
    pub fn discover(path: &Path, settings: GitSettings) -> Result<Self, GitError> {
        let dir = if path.is_dir() {
            path
        } else {
            path.parent().unwrap_or(Path::new("."))
        };

        if !dir.is_dir() {
            return Err(GitError::NotARepository(path.to_path_buf()));
        }

        let output = run_git(&settings, dir, ["rev-parse", "--show-toplevel"])?;
        let root = output.stdout.trim();
        if !output.status.success() || root.is_empty() {
            return Err(GitError::NotARepository(path.to_path_buf()));
        }

        Ok(Self {
            root: PathBuf::from(root),
            settings,
        })
    }

    /// Root of the work tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git<I, S>(&self, args: I) -> Result<ProcessOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        run_git(&self.settings, &self.root, args)
    }

    /// Resolves a ref to the most recent commit reachable from it
    pub fn rev_list(&self, reference: &str) -> Result<String, GitError> {
        let output = self.git(["rev-list", "-1", reference, "--"])?;
        let hash = output.stdout.trim();

        if !output.status.success() || hash.is_empty() {
            return Err(GitError::RefNotFound(reference.to_string()));
        }

        Ok(hash.to_string())
    }

    /// Blames a file, keeping only commits strictly after `changes_since`
    pub fn blame_file(&self, path: &Path, changes_since: Option<&str>) -> Result<BlameMap, GitError> {
        let since = changes_since.map(|r| self.rev_list(r)).transpose()?;

        let path = if path.is_absolute() {
            path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
        } else {
            self.root.join(path)
        };

        let output = self.git([
            OsStr::new("blame"),
            OsStr::new("-p"),
            OsStr::new("--incremental"),
            OsStr::new("--"),
            path.as_os_str(),
        ])?;

        if !output.status.success() {
            return Err(GitError::BlameFailed {
                code: output.code(),
                path,
                stderr: output.stderr.trim().to_string(),
            });
        }

        if output.stdout.trim().is_empty() {
            return Err(GitError::NoBlameData(path));
        }

        let blame = BlameParser::new(since.as_deref(), self).parse(&output.stdout)?;
        debug!(
            path = %path.display(),
            lines = blame.len(),
            since = since.as_deref().unwrap_or("-"),
            "Parsed blame"
        );

        Ok(blame)
    }
}

impl AncestryCheck for GitRepo {
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError> {
        let output = self.git(["merge-base", "--is-ancestor", ancestor, descendant])?;
        Ok(output.status.success())
    }
}

/// Runs git in `dir`, killing it when the timeout elapses
fn run_git<I, S>(settings: &GitSettings, dir: &Path, args: I) -> Result<ProcessOutput, GitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let label = args
        .first()
        .map(|a| a.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut child = Command::new(&settings.command)
        .args(&args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain both pipes so a chatty process cannot block on a full buffer
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + settings.timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(GitError::Timeout {
                command: label,
                seconds: settings.timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(ProcessOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_settings() {
        let settings = GitSettings::default();
        assert_eq!(settings.command, "git");
        assert_eq!(settings.timeout, DEFAULT_GIT_TIMEOUT);
    }

    #[test]
    fn missing_directory_is_not_a_repository() {
        let err = GitRepo::discover(Path::new("/definitely/not/here/page.md"), GitSettings::default())
            .unwrap_err();
        assert!(matches!(err, GitError::NotARepository(_)));
    }

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let settings = GitSettings {
            command: "markweave-no-such-git".to_string(),
            timeout: DEFAULT_GIT_TIMEOUT,
        };
        let err = GitRepo::discover(dir.path(), settings).unwrap_err();
        assert!(matches!(err, GitError::Spawn(_)));
    }

    #[test]
    fn error_messages_are_distinct() {
        let not_repo = GitError::NotARepository(PathBuf::from("/x")).to_string();
        let no_ref = GitError::RefNotFound("v1".to_string()).to_string();
        let no_data = GitError::NoBlameData(PathBuf::from("/x")).to_string();

        assert!(not_repo.contains("Not a git repository"));
        assert!(no_ref.contains("ref not found"));
        assert!(no_data.contains("no data"));
    }
}
