//! E2E harness: a temp workspace and a runner for the tissue binary.

// Each integration test binary compiles this module; not every test
// uses every helper.
#![allow(dead_code)]

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Output;

use tempfile::TempDir;

#[derive(Debug)]
pub struct TissueRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl TissueRun {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {}", self.stdout))
    }
}

pub struct TissueWorkspace {
    _temp_dir: TempDir,
    pub root: PathBuf,
}

impl TissueWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().join("project");
        std::fs::create_dir_all(&root).expect("project dir");
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root.join(".tissue")
    }

    pub fn log_path(&self) -> PathBuf {
        self.store_dir().join("issues.jsonl")
    }

    pub fn db_path(&self) -> PathBuf {
        self.store_dir().join("issues.db")
    }

    /// A std Command pointed at the binary with cwd in this workspace.
    /// Exposed for tests that need to spawn without waiting.
    pub fn command<I, S>(&self, args: I) -> std::process::Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_tissue"));
        cmd.current_dir(&self.root);
        cmd.args(args);
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("TISSUE_DIR");
        cmd
    }
}

pub fn run_tissue<I, S>(workspace: &TissueWorkspace, args: I) -> TissueRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output: Output = workspace.command(args).output().expect("run tissue");
    TissueRun {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        status: output.status,
    }
}

/// Run and require success, returning stdout.
pub fn run_ok<I, S>(workspace: &TissueWorkspace, args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let run = run_tissue(workspace, args);
    assert!(
        run.success(),
        "command failed\nstdout: {}\nstderr: {}",
        run.stdout,
        run.stderr
    );
    run.stdout
}

/// Create an issue and return its id, parsed from "Created <id>: ...".
pub fn create_issue(workspace: &TissueWorkspace, title: &str) -> String {
    let stdout = run_ok(workspace, ["create", title]);
    parse_created_id(&stdout)
}

pub fn parse_created_id(stdout: &str) -> String {
    let line = stdout.lines().next().unwrap_or("");
    line.strip_prefix("Created ")
        .and_then(|rest| rest.split(':').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| panic!("no issue id in output: {stdout}"))
        .to_string()
}
