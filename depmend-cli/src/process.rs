//! Real process-backed capability implementations.
//!
//! The remediation engine and the health auditor depend on injected
//! capabilities (`ValidationCommand`, `EnvironmentProbe`). This module
//! provides the production implementations that spawn the actual
//! ecosystem tooling via `tokio::process`, each call bounded by a
//! timeout so callers never block indefinitely.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use depmend_core::types::Ecosystem;
use depmend_health::environment::EnvironmentProbe;
use depmend_remedy::command::{
    CommandOutcome, DynValidationCommand, EcosystemCommands, ValidationCommand,
};

/// A validation command that spawns an external process.
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessCommand {
    /// Create a process command.
    pub fn new(program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.to_owned(),
            args: args.iter().map(|s| (*s).to_owned()).collect(),
            timeout,
        }
    }
}

impl ValidationCommand for ProcessCommand {
    async fn run(&self, manifest_dir: &Path) -> CommandOutcome {
        debug!(
            program = %self.program,
            args = ?self.args,
            dir = %manifest_dir.display(),
            "running validation command"
        );

        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.program)
                .args(&self.args)
                .current_dir(manifest_dir)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Err(_) => CommandOutcome::failed(format!(
                "{} timed out after {}s",
                self.program,
                self.timeout.as_secs()
            )),
            Ok(Err(e)) => {
                CommandOutcome::failed(format!("failed to spawn {}: {e}", self.program))
            }
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&stderr);
                }

                CommandOutcome {
                    success: output.status.success(),
                    output: text,
                }
            }
        }
    }
}

/// A command for ecosystems without the corresponding artifact (pip has
/// no lock file to regenerate). Always succeeds without side effects.
pub struct NoopCommand {
    note: &'static str,
}

impl NoopCommand {
    /// Create a no-op command with an explanatory note.
    pub fn new(note: &'static str) -> Self {
        Self { note }
    }
}

impl ValidationCommand for NoopCommand {
    async fn run(&self, _manifest_dir: &Path) -> CommandOutcome {
        CommandOutcome::ok(self.note)
    }
}

/// Build the production command set for every supported ecosystem.
pub fn default_commands(timeout: Duration) -> HashMap<Ecosystem, EcosystemCommands> {
    let mut commands: HashMap<Ecosystem, EcosystemCommands> = HashMap::new();

    let cmd = |program: &str, args: &[&str]| -> Arc<dyn DynValidationCommand> {
        Arc::new(ProcessCommand::new(program, args, timeout))
    };

    commands.insert(
        Ecosystem::Npm,
        EcosystemCommands::new(
            cmd("npm", &["install", "--package-lock-only", "--ignore-scripts"]),
            cmd("npm", &["install", "--dry-run", "--ignore-scripts"]),
        ),
    );

    commands.insert(
        Ecosystem::Cargo,
        EcosystemCommands::new(
            cmd("cargo", &["generate-lockfile"]),
            cmd("cargo", &["metadata", "--format-version", "1"]),
        ),
    );

    commands.insert(
        Ecosystem::Pip,
        EcosystemCommands::new(
            Arc::new(NoopCommand::new("pip manages no lock artifact")),
            cmd(
                "python3",
                &["-m", "pip", "install", "--dry-run", "-r", "requirements.txt"],
            ),
        ),
    );

    commands.insert(
        Ecosystem::Pipenv,
        EcosystemCommands::new(cmd("pipenv", &["lock"]), cmd("pipenv", &["verify"])),
    );

    commands.insert(
        Ecosystem::Go,
        EcosystemCommands::new(cmd("go", &["mod", "tidy"]), cmd("go", &["mod", "verify"])),
    );

    commands
}

/// Production environment probe: shells out for tool versions and disk
/// space. Any failure degrades to `None` so the corresponding health
/// category is skipped rather than failed.
pub struct SystemProbe {
    timeout: Duration,
}

impl SystemProbe {
    /// Create a probe with a per-invocation timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn capture(&self, program: &str, args: &[&str]) -> Option<String> {
        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(program)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout);
                text.lines().next().map(|line| line.trim().to_owned())
            }
            _ => None,
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl EnvironmentProbe for SystemProbe {
    async fn tool_version(&self, ecosystem: Ecosystem) -> Option<String> {
        match ecosystem {
            Ecosystem::Npm => self.capture("npm", &["--version"]).await,
            Ecosystem::Cargo => self.capture("cargo", &["--version"]).await,
            Ecosystem::Pip => self.capture("python3", &["-m", "pip", "--version"]).await,
            Ecosystem::Pipenv => self.capture("pipenv", &["--version"]).await,
            Ecosystem::Go => self.capture("go", &["version"]).await,
        }
    }

    async fn free_disk_mb(&self, path: &Path) -> Option<u64> {
        // POSIX df: -P 고정 포맷, -m 1MB 블록. 두 번째 라인의 네 번째
        // 컬럼이 available
        let path_str = path.to_str()?;
        let output = self.capture_df(path_str).await?;
        parse_df_available_mb(&output)
    }
}

impl SystemProbe {
    async fn capture_df(&self, path: &str) -> Option<String> {
        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new("df")
                .args(["-P", "-m", path])
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            _ => None,
        }
    }
}

/// `df -P -m` 출력에서 available MB를 파싱합니다.
fn parse_df_available_mb(df_output: &str) -> Option<u64> {
    let data_line = df_output.lines().nth(1)?;
    let available = data_line.split_whitespace().nth(3)?;
    available.parse().ok()
}
