//! CLI argument definitions for depmend.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Dependency health and auto-remediation engine.
///
/// Scans a source tree for package manifests, resolves declared version
/// constraints against package registries, detects conflicts, optionally
/// remediates them under a backup/validate/rollback protocol, and writes
/// a scored health report.
#[derive(Parser, Debug)]
#[command(name = "depmend")]
#[command(version, about, long_about = None)]
pub struct DepmendCli {
    /// Path to depmend.toml configuration file.
    ///
    /// When the default path does not exist, built-in defaults are used.
    #[arg(short, long, default_value = "/etc/depmend/depmend.toml")]
    pub config: PathBuf,

    /// Root directory to scan (takes precedence over the config file).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Remediation mode (conservative, aggressive, security-only).
    #[arg(long)]
    pub mode: Option<String>,

    /// Apply remediations. Without this flag the run is detect/audit only.
    #[arg(long)]
    pub fix: bool,

    /// Report output path (takes precedence over the config file).
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Ecosystems to exclude from the scan (repeatable).
    #[arg(long = "exclude-ecosystem")]
    pub exclude_ecosystems: Vec<String>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without running.
    #[arg(long)]
    pub validate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = DepmendCli::parse_from(["depmend"]);
        assert!(!cli.fix);
        assert!(!cli.validate);
        assert_eq!(cli.config, PathBuf::from("/etc/depmend/depmend.toml"));
    }

    #[test]
    fn parses_full_invocation() {
        let cli = DepmendCli::parse_from([
            "depmend",
            "--root",
            "/srv/app",
            "--mode",
            "security-only",
            "--fix",
            "--report",
            "/tmp/report.json",
            "--exclude-ecosystem",
            "go",
            "--exclude-ecosystem",
            "pipenv",
            "--log-format",
            "pretty",
        ]);

        assert_eq!(cli.root, Some(PathBuf::from("/srv/app")));
        assert_eq!(cli.mode.as_deref(), Some("security-only"));
        assert!(cli.fix);
        assert_eq!(cli.report, Some(PathBuf::from("/tmp/report.json")));
        assert_eq!(cli.exclude_ecosystems, vec!["go", "pipenv"]);
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
    }
}
