use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug)]
pub struct BugmailRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl BugmailRun {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&extract_json_payload(&self.stdout)).unwrap_or_else(|e| {
            panic!(
                "stdout is not JSON ({e}):\n{}\nstderr:\n{}",
                self.stdout, self.stderr
            )
        })
    }
}

/// JSON document at the end of mixed output, skipping log lines before it.
pub fn extract_json_payload(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    output.trim().to_string()
}

pub struct Workspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    /// A workspace with `bugmail init` already run.
    pub fn initialized() -> Self {
        let workspace = Self::new();
        let run = run_bugmail(&workspace, ["init"]);
        assert!(run.status.success(), "init failed: {}", run.stderr);
        workspace
    }

    pub fn write_message(&self, name: &str, raw: &[u8]) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, raw).expect("write message");
        path
    }
}

pub fn run_bugmail<I, S>(workspace: &Workspace, args: I) -> BugmailRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_bugmail_with_env(workspace, args, std::iter::empty::<(String, String)>())
}

pub fn run_bugmail_with_env<I, S, E, K, V>(workspace: &Workspace, args: I, env_vars: E) -> BugmailRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bugmail"));
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    for var in [
        "BUGMAIL_DIR",
        "BUGMAIL_IMAP_HOST",
        "BUGMAIL_IMAP_USER",
        "BUGMAIL_IMAP_PASSWORD",
    ] {
        cmd.env_remove(var);
    }
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "bugmail=debug");
    cmd.env("HOME", &workspace.root);

    let output = cmd.output().expect("run bugmail");
    BugmailRun {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        status: output.status,
    }
}
