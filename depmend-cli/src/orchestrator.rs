//! Run orchestration -- scan, detect, remediate, audit, report.
//!
//! The [`Orchestrator`] is the central coordinator of `depmend-cli`.
//! It owns the run-scoped configuration and sequences the pipeline:
//!
//! ```text
//! scan --> detect --> (optional) remediate --> audit --> report
//! ```
//!
//! All component-level failures are aggregated into a single
//! [`HealthReport`]; only root-level misconfiguration (invalid scan
//! root, unwritable report path) aborts the run. A run that finds zero
//! manifests completes successfully with an explicit "no manifests
//! found" result.
//!
//! The registry resolver, the environment probe, and the per-ecosystem
//! validation commands are injected capabilities, so integration tests
//! drive complete runs without network access or real package tooling.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use anyhow::Result;
use tracing::{info, warn};

use depmend_core::config::DepmendConfig;
use depmend_core::metrics as m;
use depmend_core::types::{
    ActionOutcome, CheckStatus, Ecosystem, HealthCheckResult, HealthReport, OverallStatus,
    RemediationMode,
};
use depmend_health::checks::HealthChecker;
use depmend_health::config::HealthCheckConfig;
use depmend_health::environment::{DynEnvironmentProbe, environment_checks};
use depmend_health::report::{build_recommendations, write_report};
use depmend_health::score::{compute_score, derive_overall};
use depmend_registry::advisory::AdvisoryDb;
use depmend_registry::cache::CachedResolver;
use depmend_registry::client::{DynRegistryResolver, RegistryResolver, ResolveOutcome};
use depmend_remedy::backup::BackupStore;
use depmend_remedy::command::EcosystemCommands;
use depmend_remedy::config::RemediationConfig;
use depmend_remedy::detect::ConflictDetector;
use depmend_remedy::engine::RemediationEngine;
use depmend_scanner::config::ScannerConfig;
use depmend_scanner::walker::{ManifestScanner, ScanOutput};

/// Adapter so a boxed `DynRegistryResolver` can flow through the
/// generic `RegistryResolver` plumbing (cache, detector).
struct SharedResolver(Arc<dyn DynRegistryResolver>);

impl RegistryResolver for SharedResolver {
    async fn resolve(&self, ecosystem: Ecosystem, package: &str) -> ResolveOutcome {
        self.0.resolve(ecosystem, package).await
    }
}

/// The main run orchestrator.
pub struct Orchestrator {
    config: DepmendConfig,
    resolver: Arc<dyn DynRegistryResolver>,
    probe: Arc<dyn DynEnvironmentProbe>,
    commands: HashMap<Ecosystem, EcosystemCommands>,
    apply_fixes: bool,
}

impl Orchestrator {
    /// Build an orchestrator from a validated configuration and the
    /// injected capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(
        config: DepmendConfig,
        resolver: Arc<dyn DynRegistryResolver>,
        probe: Arc<dyn DynEnvironmentProbe>,
        commands: HashMap<Ecosystem, EcosystemCommands>,
        apply_fixes: bool,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        Ok(Self {
            config,
            resolver,
            probe,
            commands,
            apply_fixes,
        })
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &DepmendConfig {
        &self.config
    }

    /// Execute one complete run and write the report.
    ///
    /// # Errors
    ///
    /// Returns an error only for root-level problems: the scan root is
    /// not a directory, or the report cannot be written. Everything
    /// else is captured inside the returned report.
    pub async fn run(&self) -> Result<HealthReport> {
        let started = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let root = PathBuf::from(&self.config.scan.root);
        let mode = RemediationMode::from_str_loose(&self.config.remedy.mode)
            .unwrap_or(RemediationMode::Conservative);

        info!(run_id = %run_id, root = %root.display(), mode = %mode, "depmend run starting");

        // Root-level misconfiguration aborts the entire run
        if !root.is_dir() {
            return Err(anyhow::anyhow!(
                "scan root {} is not a directory",
                root.display()
            ));
        }

        // --- Scan (single-threaded filesystem walk) ---
        let scanner_config = ScannerConfig::from_core(&self.config.scan);
        let scan_output = {
            let scanner = ManifestScanner::new(scanner_config)
                .map_err(|e| anyhow::anyhow!("failed to build scanner: {}", e))?;
            tokio::task::spawn_blocking(move || scanner.scan())
                .await
                .map_err(|e| anyhow::anyhow!("scan task failed: {}", e))?
                .map_err(|e| anyhow::anyhow!("scan failed: {}", e))?
        };

        info!(
            manifests = scan_output.manifests.len(),
            declarations = scan_output.declarations.len(),
            skipped = scan_output.skipped.len(),
            "scan completed"
        );

        if scan_output.manifests.is_empty() {
            let report = self
                .empty_run_report(run_id, mode, root, &scan_output)
                .await?;
            return Ok(report);
        }

        // --- Advisory DB (shared by remediation and audit) ---
        let advisory_path = PathBuf::from(&self.config.health.advisory_db_path);
        let advisories = tokio::task::spawn_blocking(move || AdvisoryDb::load_from_dir(&advisory_path))
            .await
            .map_err(|e| anyhow::anyhow!("advisory load task failed: {}", e))?;
        let advisories = Arc::new(match advisories {
            Ok(db) => db,
            Err(e) => {
                warn!(error = %e, "failed to load advisory db, continuing without advisories");
                AdvisoryDb::empty()
            }
        });

        // --- Detect (bounded worker pool over the run cache) ---
        let cached = self.build_cached_resolver();
        let detector = ConflictDetector::new(
            Arc::clone(&cached),
            self.config.registry.concurrency,
        );
        let detection = detector.detect(&scan_output.declarations).await;

        info!(
            conflicts = detection.conflicts.len(),
            unresolved = detection.unresolved.len(),
            "conflict detection completed"
        );

        // --- Remediate (optional) ---
        let deadline = (self.config.health.run_deadline_secs > 0)
            .then(|| started + Duration::from_secs(self.config.health.run_deadline_secs));

        let (actions, declarations, manifests) = if self.apply_fixes {
            let remedy_config = {
                let mut rc = RemediationConfig::from_core(&self.config.remedy);
                rc.mode = mode;
                rc.concurrency = self.config.registry.concurrency;
                rc
            };
            let backups = Arc::new(
                BackupStore::new(remedy_config.backup_dir.clone(), remedy_config.retention())
                    .map_err(|e| anyhow::anyhow!("failed to prepare backup dir: {}", e))?,
            );

            let engine = RemediationEngine::new(
                remedy_config,
                Arc::clone(&backups),
                self.commands.clone(),
                Arc::clone(&advisories),
            );

            let plans = engine.plan(
                &scan_output.manifests,
                &scan_output.declarations,
                &detection.resolved,
            );
            info!(manifests_planned = plans.len(), "remediation planned");

            let actions = engine.remediate_all(plans, deadline).await;

            match backups.purge_expired().await {
                Ok(purged) if purged > 0 => info!(purged, "expired backups purged"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "backup purge failed"),
            }

            // Re-scan after successful mutations so the audit reflects
            // the post-remediation state of the tree
            if actions
                .iter()
                .any(|a| a.outcome == ActionOutcome::Applied)
            {
                let scanner_config = ScannerConfig::from_core(&self.config.scan);
                let rescan = tokio::task::spawn_blocking(move || {
                    ManifestScanner::new(scanner_config).and_then(|s| s.scan())
                })
                .await
                .map_err(|e| anyhow::anyhow!("re-scan task failed: {}", e))?;

                match rescan {
                    Ok(output) => (actions, output.declarations, output.manifests),
                    Err(e) => {
                        warn!(error = %e, "re-scan after remediation failed, auditing pre-fix state");
                        (
                            actions,
                            scan_output.declarations.clone(),
                            scan_output.manifests.clone(),
                        )
                    }
                }
            } else {
                (
                    actions,
                    scan_output.declarations.clone(),
                    scan_output.manifests.clone(),
                )
            }
        } else {
            (
                Vec::new(),
                scan_output.declarations.clone(),
                scan_output.manifests.clone(),
            )
        };

        // --- Audit ---
        let health_config = HealthCheckConfig::from_core(&self.config.health);
        let min_free_disk_mb = health_config.min_free_disk_mb;
        let checker = HealthChecker::new(health_config, Arc::clone(&advisories));

        let mut checks = Vec::new();
        checks.push(discovery_check(&scan_output));
        checks.push(checker.lockfile_presence(&manifests));
        let (staleness_check, stale_count) =
            checker.staleness(&declarations, &detection.resolved);
        checks.push(staleness_check);
        checks.push(checker.conflicts(&detection.conflicts));
        let (vuln_checks, vulnerabilities) =
            checker.vulnerability_scan(&manifests, &declarations);
        checks.extend(vuln_checks);

        let ecosystems: Vec<Ecosystem> = {
            let mut ecosystems: Vec<Ecosystem> =
                manifests.iter().map(|m| m.ecosystem).collect();
            ecosystems.sort();
            ecosystems.dedup();
            ecosystems
        };
        let env_checks = environment_checks(
            self.probe.as_ref(),
            cached.as_ref(),
            &ecosystems,
            &PathBuf::from(&self.config.remedy.backup_dir),
            min_free_disk_mb,
        )
        .await;
        checks.extend(env_checks);

        // --- Score and report ---
        let score = compute_score(&checks, &vulnerabilities, stale_count);
        let overall = derive_overall(&checks, &vulnerabilities, score);

        metrics::gauge!(m::HEALTH_SCORE).set(f64::from(score));
        metrics::histogram!(m::RUN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        let recommendations = build_recommendations(
            &detection.conflicts,
            &vulnerabilities,
            &actions,
            &detection.resolved,
            stale_count,
        );

        let report = HealthReport {
            run_id,
            generated_at: SystemTime::now(),
            mode,
            root,
            overall,
            score,
            manifests,
            checks,
            conflicts: detection.conflicts,
            actions,
            vulnerabilities,
            unresolved: detection.unresolved,
            recommendations,
        };

        self.persist(&report, &cached).await?;

        info!(
            run_id = %report.run_id,
            score = report.score,
            overall = %report.overall,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "depmend run completed"
        );

        Ok(report)
    }

    /// Build the run-scoped caching resolver over the injected client.
    fn build_cached_resolver(&self) -> Arc<CachedResolver<SharedResolver>> {
        let inner = SharedResolver(Arc::clone(&self.resolver));
        let cached = if self.config.registry.disk_cache_path.is_empty() {
            CachedResolver::new(inner)
        } else {
            CachedResolver::with_disk_cache(
                inner,
                &self.config.registry.disk_cache_path,
                Duration::from_secs(self.config.registry.disk_cache_ttl_secs),
            )
        };
        Arc::new(cached)
    }

    /// Produce the report for a run that found no manifests.
    async fn empty_run_report(
        &self,
        run_id: String,
        mode: RemediationMode,
        root: PathBuf,
        scan_output: &ScanOutput,
    ) -> Result<HealthReport> {
        let mut check = HealthCheckResult::healthy("manifest-discovery");
        check
            .details
            .insert("result".to_owned(), "no manifests found".to_owned());
        for (path, reason) in &scan_output.skipped {
            check.issues.push(format!("{path}: {reason}"));
        }

        let report = HealthReport {
            run_id,
            generated_at: SystemTime::now(),
            mode,
            root,
            overall: OverallStatus::Healthy,
            score: 100,
            manifests: Vec::new(),
            checks: vec![check],
            conflicts: Vec::new(),
            actions: Vec::new(),
            vulnerabilities: Vec::new(),
            unresolved: Vec::new(),
            recommendations: Vec::new(),
        };

        let cached = self.build_cached_resolver();
        self.persist(&report, &cached).await?;
        Ok(report)
    }

    /// Write the report and flush the disk cache.
    async fn persist(
        &self,
        report: &HealthReport,
        cached: &Arc<CachedResolver<SharedResolver>>,
    ) -> Result<()> {
        let report_path = PathBuf::from(&self.config.general.report_path);
        write_report(report, &report_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to write report: {}", e))?;

        if let Err(e) = cached.persist().await {
            warn!(error = %e, "failed to persist registry disk cache");
        }

        Ok(())
    }
}

/// Build the discovery summary check from the scan output.
fn discovery_check(scan_output: &ScanOutput) -> HealthCheckResult {
    let mut check = HealthCheckResult::healthy("manifest-discovery");
    check.details.insert(
        "manifests_found".to_owned(),
        scan_output.manifests.len().to_string(),
    );
    check.details.insert(
        "declarations_parsed".to_owned(),
        scan_output.declarations.len().to_string(),
    );

    for (path, reason) in &scan_output.skipped {
        check.issues.push(format!("{path}: {reason}"));
    }
    if !scan_output.skipped.is_empty() {
        check.status = CheckStatus::Warning;
    }

    check
}

/// Map the report's overall status to the CLI exit code.
///
/// 0 = healthy or warning (warnings are noted, not fatal), 2 = critical.
pub fn exit_code(overall: OverallStatus) -> i32 {
    match overall {
        OverallStatus::Healthy | OverallStatus::Warning => 0,
        OverallStatus::Critical => 2,
    }
}
