//! End-to-end orchestrator runs with injected capabilities.
//!
//! These tests drive complete scan -> detect -> remediate -> audit ->
//! report runs against temp directories, with a fake registry resolver,
//! a fake environment probe, and fake validation commands, so no
//! network access or real package tooling is required.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use depmend_cli::orchestrator::{Orchestrator, exit_code};
use depmend_core::config::DepmendConfig;
use depmend_core::types::{
    ActionOutcome, CheckStatus, ConflictKind, Ecosystem, OverallStatus, RegistryPackageInfo,
};
use depmend_health::environment::EnvironmentProbe;
use depmend_registry::client::{
    DynRegistryResolver, RegistryResolver, ResolveOutcome,
};
use depmend_remedy::command::{
    CommandOutcome, DynValidationCommand, EcosystemCommands, ValidationCommand,
};

// =============================================================================
// Fakes
// =============================================================================

/// Registry resolver backed by a fixed response table.
#[derive(Clone, Default)]
struct FakeRegistry {
    outcomes: HashMap<String, ResolveOutcome>,
    calls: Arc<AtomicUsize>,
}

impl FakeRegistry {
    fn with_found(mut self, package: &str, latest: &str, available: &[&str]) -> Self {
        self.outcomes.insert(
            package.to_owned(),
            ResolveOutcome::Found(RegistryPackageInfo {
                name: package.to_owned(),
                ecosystem: Ecosystem::Npm,
                latest: latest.to_owned(),
                available: available.iter().map(|s| (*s).to_owned()).collect(),
                deprecated: false,
            }),
        );
        self
    }

    fn with_not_found(mut self, package: &str) -> Self {
        self.outcomes
            .insert(package.to_owned(), ResolveOutcome::NotFound);
        self
    }

    fn with_unavailable(mut self, package: &str, reason: &str) -> Self {
        self.outcomes.insert(
            package.to_owned(),
            ResolveOutcome::Unavailable {
                reason: reason.to_owned(),
            },
        );
        self
    }
}

impl RegistryResolver for FakeRegistry {
    async fn resolve(&self, _ecosystem: Ecosystem, package: &str) -> ResolveOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .get(package)
            .cloned()
            .unwrap_or(ResolveOutcome::NotFound)
    }
}

/// Environment probe reporting healthy tooling and ample disk.
struct HealthyProbe;

impl EnvironmentProbe for HealthyProbe {
    async fn tool_version(&self, _ecosystem: Ecosystem) -> Option<String> {
        Some("1.0.0-test".to_owned())
    }

    async fn free_disk_mb(&self, _path: &Path) -> Option<u64> {
        Some(50_000)
    }
}

/// Validation command with a fixed result.
struct FixedCommand(CommandOutcome);

impl ValidationCommand for FixedCommand {
    async fn run(&self, _dir: &Path) -> CommandOutcome {
        self.0.clone()
    }
}

fn passing_commands() -> HashMap<Ecosystem, EcosystemCommands> {
    let ok: Arc<dyn DynValidationCommand> =
        Arc::new(FixedCommand(CommandOutcome::ok("resolved")));
    EcosystemCommands::map_for_all(Arc::clone(&ok), ok)
}

fn failing_validation_commands() -> HashMap<Ecosystem, EcosystemCommands> {
    let ok: Arc<dyn DynValidationCommand> =
        Arc::new(FixedCommand(CommandOutcome::ok("lock regenerated")));
    let fail: Arc<dyn DynValidationCommand> = Arc::new(FixedCommand(CommandOutcome::failed(
        "npm ERR! ERESOLVE unable to resolve dependency tree",
    )));
    EcosystemCommands::map_for_all(ok, fail)
}

// =============================================================================
// Helpers
// =============================================================================

fn test_config(root: &Path) -> DepmendConfig {
    let mut config = DepmendConfig::default();
    config.scan.root = root.display().to_string();
    config.general.report_path = root
        .join("out")
        .join("health-report.json")
        .display()
        .to_string();
    config.remedy.backup_dir = root.join("backups").display().to_string();
    config.health.advisory_db_path = root.join("advisories").display().to_string();
    config
}

fn orchestrator(
    config: DepmendConfig,
    registry: FakeRegistry,
    commands: HashMap<Ecosystem, EcosystemCommands>,
    fix: bool,
) -> Orchestrator {
    let resolver: Arc<dyn DynRegistryResolver> = Arc::new(registry);
    Orchestrator::new(config, resolver, Arc::new(HealthyProbe), commands, fix).unwrap()
}

fn write_manifest(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// Runs without manifests
// =============================================================================

#[tokio::test]
async fn empty_root_completes_with_explicit_result() {
    // Given: a source tree without any package manifests
    let tmp = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        test_config(tmp.path()),
        FakeRegistry::default(),
        passing_commands(),
        false,
    );

    // When: running
    let report = orch.run().await.unwrap();

    // Then: the run succeeds with an explicit "no manifests found" result
    assert_eq!(report.overall, OverallStatus::Healthy);
    assert_eq!(report.score, 100);
    assert!(report.manifests.is_empty());
    let discovery = report
        .checks
        .iter()
        .find(|c| c.category == "manifest-discovery")
        .unwrap();
    assert_eq!(
        discovery.details.get("result").map(String::as_str),
        Some("no manifests found")
    );

    // And: the report file is written and parseable
    let report_path = tmp.path().join("out").join("health-report.json");
    let content = std::fs::read_to_string(report_path).unwrap();
    assert!(content.contains("\"run_id\""));
}

#[tokio::test]
async fn invalid_root_aborts_the_run() {
    // Given: a scan root that does not exist
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(tmp.path());
    config.scan.root = tmp.path().join("nope").display().to_string();

    let orch = orchestrator(config, FakeRegistry::default(), passing_commands(), false);

    // Then: this is root-level misconfiguration and the run errors
    assert!(orch.run().await.is_err());
}

// =============================================================================
// Conservative bump: applied, validated, backup retained
// =============================================================================

#[tokio::test]
async fn conservative_bump_applied_and_validated() {
    // Given: pkg-x declared as ^1.2.0 with registry latest 1.3.0
    let tmp = tempfile::tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "package.json",
        "{\n  \"dependencies\": {\n    \"pkg-x\": \"^1.2.0\"\n  }\n}",
    );

    let registry = FakeRegistry::default().with_found("pkg-x", "1.3.0", &["1.2.0", "1.3.0"]);
    let orch = orchestrator(test_config(tmp.path()), registry, passing_commands(), true);

    // When: running in conservative mode with fixes enabled
    let report = orch.run().await.unwrap();

    // Then: one applied action ^1.2.0 -> ^1.3.0
    assert_eq!(report.actions.len(), 1);
    let action = &report.actions[0];
    assert_eq!(action.old_version, "^1.2.0");
    assert_eq!(action.new_version, "^1.3.0");
    assert_eq!(action.outcome, ActionOutcome::Applied);

    // And: the manifest on disk reflects the bump
    let content = std::fs::read_to_string(tmp.path().join("package.json")).unwrap();
    assert!(content.contains("\"pkg-x\": \"^1.3.0\""));

    // And: a backup exists inside the retention window
    let backups: Vec<_> = std::fs::read_dir(tmp.path().join("backups"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "bak"))
        .collect();
    assert_eq!(backups.len(), 1);
}

// =============================================================================
// Missing package -> conflict, no action
// =============================================================================

#[tokio::test]
async fn missing_package_yields_conflict_without_action() {
    // Given: pkg-y declared but absent from the registry
    let tmp = tempfile::tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "package.json",
        r#"{ "dependencies": { "pkg-y": "^2.0.0" } }"#,
    );

    let registry = FakeRegistry::default().with_not_found("pkg-y");
    let orch = orchestrator(test_config(tmp.path()), registry, passing_commands(), true);

    // When: running with fixes enabled
    let report = orch.run().await.unwrap();

    // Then: one NotFound conflict and no remediation action
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].kind, ConflictKind::NotFound);
    assert!(report.actions.is_empty());

    // And: conflicts are a hard error category -> critical overall
    assert_eq!(report.overall, OverallStatus::Critical);
    assert_eq!(exit_code(report.overall), 2);
}

// =============================================================================
// Validation failure -> rollback
// =============================================================================

#[tokio::test]
async fn validation_failure_rolls_back_bit_for_bit() {
    // Given: a bump is planned but validation always fails
    let tmp = tempfile::tempdir().unwrap();
    let original = "{\n  \"dependencies\": {\n    \"pkg-x\": \"^1.2.0\"\n  }\n}";
    let manifest_path = write_manifest(tmp.path(), "package.json", original);

    let registry = FakeRegistry::default().with_found("pkg-x", "1.3.0", &["1.2.0", "1.3.0"]);
    let orch = orchestrator(
        test_config(tmp.path()),
        registry,
        failing_validation_commands(),
        true,
    );

    // When: running with fixes enabled
    let report = orch.run().await.unwrap();

    // Then: the action failed with the validator output verbatim
    assert_eq!(report.actions.len(), 1);
    match &report.actions[0].outcome {
        ActionOutcome::Failed { reason } => {
            assert!(reason.contains("ERESOLVE"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }

    // And: the manifest is restored bit-for-bit
    assert_eq!(std::fs::read_to_string(&manifest_path).unwrap(), original);

    // And: the rollback is surfaced as a recommendation
    assert!(
        report
            .recommendations
            .iter()
            .any(|r| r.contains("manual intervention needed"))
    );
}

// =============================================================================
// Missing advisory source -> skipped, not penalized
// =============================================================================

#[tokio::test]
async fn missing_advisory_source_is_skipped_not_penalized() {
    // Given: npm and go manifests, advisory data only for npm
    let tmp = tempfile::tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "package.json",
        r#"{ "dependencies": { "lodash": "^4.17.21" } }"#,
    );
    let go_dir = tmp.path().join("service");
    std::fs::create_dir_all(&go_dir).unwrap();
    write_manifest(
        &go_dir,
        "go.mod",
        "module example.com/svc\n\nrequire github.com/pkg/errors v0.9.1\n",
    );

    let advisory_dir = tmp.path().join("advisories");
    std::fs::create_dir_all(&advisory_dir).unwrap();
    std::fs::write(advisory_dir.join("npm.json"), "[]").unwrap();

    let registry = FakeRegistry::default()
        .with_found("lodash", "4.17.21", &["4.17.21"])
        .with_found("github.com/pkg/errors", "v0.9.1", &["v0.9.1"]);
    let orch = orchestrator(test_config(tmp.path()), registry, passing_commands(), false);

    // When: running
    let report = orch.run().await.unwrap();

    // Then: the go category is skipped, the npm category ran
    let go_scan = report
        .checks
        .iter()
        .find(|c| c.category == "vulnerability-scan (go)")
        .unwrap();
    assert_eq!(go_scan.status, CheckStatus::Skipped);

    let npm_scan = report
        .checks
        .iter()
        .find(|c| c.category == "vulnerability-scan (npm)")
        .unwrap();
    assert_eq!(npm_scan.status, CheckStatus::Healthy);

    // And: the gap does not penalize the overall result
    assert_eq!(report.score, 100);
    assert_eq!(report.overall, OverallStatus::Healthy);
}

// =============================================================================
// Resolver failures stay out of the conflict list
// =============================================================================

#[tokio::test]
async fn transient_resolver_failure_is_logged_not_flagged() {
    // Given: the registry times out for one declaration
    let tmp = tempfile::tempdir().unwrap();
    write_manifest(
        tmp.path(),
        "package.json",
        r#"{ "dependencies": { "flaky-pkg": "^1.0.0" } }"#,
    );

    let registry =
        FakeRegistry::default().with_unavailable("flaky-pkg", "timeout after 30s");
    let orch = orchestrator(test_config(tmp.path()), registry, passing_commands(), false);

    // When: running
    let report = orch.run().await.unwrap();

    // Then: no conflict, but the skip is visible in the run log
    assert!(report.conflicts.is_empty());
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].package, "flaky-pkg");
    assert!(report.unresolved[0].reason.contains("timeout"));
}

// =============================================================================
// At-most-one resolution per package across manifests
// =============================================================================

#[tokio::test]
async fn shared_package_is_resolved_once() {
    // Given: three manifests referencing the same package
    let tmp = tempfile::tempdir().unwrap();
    for sub in ["a", "b", "c"] {
        let dir = tmp.path().join(sub);
        std::fs::create_dir_all(&dir).unwrap();
        write_manifest(
            &dir,
            "package.json",
            r#"{ "dependencies": { "shared-dep": "^1.0.0" } }"#,
        );
    }

    let registry = FakeRegistry::default().with_found("shared-dep", "1.0.0", &["1.0.0"]);
    let calls = Arc::clone(&registry.calls);
    let orch = orchestrator(test_config(tmp.path()), registry, passing_commands(), false);

    // When: running
    let report = orch.run().await.unwrap();

    // Then: all three manifests are in the report
    assert_eq!(report.manifests.len(), 3);

    // And: exactly one outbound lookup for the shared package, plus one
    // for the reachability probe
    assert!(calls.load(Ordering::SeqCst) <= 2);
}

// =============================================================================
// Determinism of the reported conflict list
// =============================================================================

#[tokio::test]
async fn conflict_list_is_deterministic_across_runs() {
    // Given: several conflicting declarations across manifests
    let tmp = tempfile::tempdir().unwrap();
    for (sub, pkg) in [("svc-b", "zeta-pkg"), ("svc-a", "alpha-pkg")] {
        let dir = tmp.path().join(sub);
        std::fs::create_dir_all(&dir).unwrap();
        write_manifest(
            &dir,
            "package.json",
            &format!(r#"{{ "dependencies": {{ "{pkg}": "^1.0.0" }} }}"#),
        );
    }

    let registry = FakeRegistry::default()
        .with_not_found("zeta-pkg")
        .with_not_found("alpha-pkg");

    // When: running twice against the same registry snapshot
    let first = orchestrator(
        test_config(tmp.path()),
        registry.clone(),
        passing_commands(),
        false,
    )
    .run()
    .await
    .unwrap();
    let second = orchestrator(test_config(tmp.path()), registry, passing_commands(), false)
        .run()
        .await
        .unwrap();

    // Then: identical, identically-ordered conflict lists
    assert_eq!(first.conflicts, second.conflicts);
    assert_eq!(first.conflicts[0].name, "alpha-pkg");
    assert_eq!(first.conflicts[1].name, "zeta-pkg");
}
