//! 백업 저장소 -- 매니페스트 변경 전 백업 생성/복원/보존 관리
//!
//! [`BackupStore`]는 매니페스트 변경의 안전장치입니다:
//!
//! - 파일 F에 대한 쓰기 전에 F의 백업이 존재하고 읽을 수 있어야 합니다.
//!   백업 생성이 실패하면 F의 변경은 시작되지 않습니다 (fail-closed).
//! - 같은 대상 경로에 대한 백업/복원은 경로별 뮤텍스로 직렬화되어
//!   동시 런 파이프라인끼리 경합하지 않습니다.
//! - 성공한 교정의 백업은 보존 기간(기본 7일)이 지나면 정리됩니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use depmend_core::metrics as m;

use crate::error::RemedyError;

/// 생성된 백업 레코드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// 원본 매니페스트 경로
    pub original_path: PathBuf,
    /// 백업 파일 경로
    pub backup_path: PathBuf,
    /// 생성 시각
    pub created_at: SystemTime,
}

/// 백업 저장소
///
/// 경로별 락 맵으로 같은 매니페스트에 대한 동시 백업/복원을 직렬화합니다.
pub struct BackupStore {
    dir: PathBuf,
    retention: Duration,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl BackupStore {
    /// 백업 디렉토리를 준비하고 저장소를 생성합니다.
    ///
    /// # Errors
    ///
    /// 디렉토리 생성 실패 시 `RemedyError::Io` 반환
    pub fn new(dir: impl Into<PathBuf>, retention: Duration) -> Result<Self, RemedyError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| RemedyError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        Ok(Self {
            dir,
            retention,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// 백업 디렉토리 경로를 반환합니다.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 대상 경로의 직렬화 락을 얻습니다.
    pub async fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 원본 파일의 백업을 생성하고 읽기 검증까지 수행합니다.
    ///
    /// 반환된 레코드가 존재해야만 원본에 대한 쓰기가 허용됩니다.
    ///
    /// # Errors
    ///
    /// 원본 읽기, 백업 쓰기, 읽기 검증 중 하나라도 실패하면 에러 --
    /// 이 경우 호출자는 해당 매니페스트의 변경을 중단해야 합니다.
    pub async fn create(&self, original: &Path) -> Result<BackupRecord, RemedyError> {
        let lock = self.path_lock(original).await;
        let _guard = lock.lock().await;

        let content = std::fs::read(original).map_err(|e| RemedyError::Backup {
            path: original.display().to_string(),
            reason: format!("failed to read original: {e}"),
        })?;

        let file_name = original
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RemedyError::Backup {
                path: original.display().to_string(),
                reason: "original path has no file name".to_owned(),
            })?;

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let backup_path = self.dir.join(format!("{file_name}.{stamp}.bak"));

        std::fs::write(&backup_path, &content).map_err(|e| RemedyError::Backup {
            path: backup_path.display().to_string(),
            reason: format!("failed to write backup: {e}"),
        })?;

        // 읽기 검증: 백업이 원본과 바이트 단위로 일치해야 함
        let readback = std::fs::read(&backup_path).map_err(|e| RemedyError::Backup {
            path: backup_path.display().to_string(),
            reason: format!("failed to read back backup: {e}"),
        })?;
        if readback != content {
            let _ = std::fs::remove_file(&backup_path);
            return Err(RemedyError::Backup {
                path: backup_path.display().to_string(),
                reason: "backup readback does not match original".to_owned(),
            });
        }

        metrics::counter!(m::REMEDY_BACKUPS_CREATED_TOTAL).increment(1);
        debug!(
            original = %original.display(),
            backup = %backup_path.display(),
            "backup created"
        );

        Ok(BackupRecord {
            original_path: original.to_path_buf(),
            backup_path,
            created_at: SystemTime::now(),
        })
    }

    /// 백업에서 원본을 복원합니다.
    ///
    /// 복원 후 원본 내용은 백업과 바이트 단위로 동일합니다.
    /// 쓰기는 임시 파일 + rename으로 원자적으로 수행됩니다.
    pub async fn restore(&self, record: &BackupRecord) -> Result<(), RemedyError> {
        let lock = self.path_lock(&record.original_path).await;
        let _guard = lock.lock().await;

        let content = std::fs::read(&record.backup_path).map_err(|e| RemedyError::Rollback {
            path: record.backup_path.display().to_string(),
            reason: format!("failed to read backup: {e}"),
        })?;

        atomic_write(&record.original_path, &content).map_err(|e| RemedyError::Rollback {
            path: record.original_path.display().to_string(),
            reason: e,
        })?;

        metrics::counter!(m::REMEDY_ROLLBACKS_TOTAL).increment(1);
        info!(
            original = %record.original_path.display(),
            backup = %record.backup_path.display(),
            "manifest restored from backup"
        );

        Ok(())
    }

    /// 보존 기간이 지난 백업 파일을 정리합니다.
    ///
    /// 정리한 파일 수를 반환합니다. 개별 파일 삭제 실패는 경고 후 계속합니다.
    pub async fn purge_expired(&self) -> Result<usize, RemedyError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| RemedyError::Io {
            path: self.dir.display().to_string(),
            source: e,
        })?;

        let now = SystemTime::now();
        let mut purged = 0;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "failed to read backup entry");
                    continue;
                }
            };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bak") {
                continue;
            }

            let modified = match entry.metadata().and_then(|md| md.modified()) {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read backup mtime");
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= self.retention {
                continue;
            }

            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), age_secs = age.as_secs(), "purged expired backup");
                    purged += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to purge backup");
                }
            }
        }

        Ok(purged)
    }
}

/// 임시 파일에 쓴 뒤 rename으로 원자적으로 교체합니다.
pub(crate) fn atomic_write(target: &Path, content: &[u8]) -> Result<(), String> {
    let tmp_path = target.with_extension("depmend-tmp");
    std::fs::write(&tmp_path, content)
        .map_err(|e| format!("failed to write {}: {e}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, target).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        format!("failed to rename into {}: {e}", target.display())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path, retention: Duration) -> BackupStore {
        BackupStore::new(dir.join("backups"), retention).unwrap()
    }

    #[tokio::test]
    async fn create_produces_readable_identical_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("package.json");
        std::fs::write(&manifest, "{ \"name\": \"app\" }").unwrap();

        let store = store(tmp.path(), Duration::from_secs(3600));
        let record = store.create(&manifest).await.unwrap();

        assert!(record.backup_path.exists());
        let backup_content = std::fs::read(&record.backup_path).unwrap();
        let original_content = std::fs::read(&manifest).unwrap();
        assert_eq!(backup_content, original_content);
    }

    #[tokio::test]
    async fn create_fails_for_missing_original() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), Duration::from_secs(3600));

        let result = store.create(&tmp.path().join("missing.json")).await;
        assert!(matches!(result, Err(RemedyError::Backup { .. })));
    }

    #[tokio::test]
    async fn restore_recovers_original_bit_for_bit() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("Cargo.toml");
        let original = "[dependencies]\nserde = \"1.0\"\n";
        std::fs::write(&manifest, original).unwrap();

        let store = store(tmp.path(), Duration::from_secs(3600));
        let record = store.create(&manifest).await.unwrap();

        // 변경 후 복원
        std::fs::write(&manifest, "[dependencies]\nserde = \"9.9\"\n").unwrap();
        store.restore(&record).await.unwrap();

        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), original);
    }

    #[tokio::test]
    async fn purge_removes_only_expired_backups() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("go.mod");
        std::fs::write(&manifest, "module x\n").unwrap();

        // 보존 기간 0초 → 모든 백업이 즉시 만료 대상
        let store = store(tmp.path(), Duration::ZERO);
        let record = store.create(&manifest).await.unwrap();
        assert!(record.backup_path.exists());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let purged = store.purge_expired().await.unwrap();
        assert_eq!(purged, 1);
        assert!(!record.backup_path.exists());
    }

    #[tokio::test]
    async fn purge_keeps_recent_backups() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("go.mod");
        std::fs::write(&manifest, "module x\n").unwrap();

        let store = store(tmp.path(), Duration::from_secs(3600));
        let record = store.create(&manifest).await.unwrap();

        let purged = store.purge_expired().await.unwrap();
        assert_eq!(purged, 0);
        assert!(record.backup_path.exists());
    }

    #[tokio::test]
    async fn purge_ignores_non_backup_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), Duration::ZERO);
        std::fs::write(store.dir().join("notes.txt"), "keep me").unwrap();

        let purged = store.purge_expired().await.unwrap();
        assert_eq!(purged, 0);
        assert!(store.dir().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn same_path_backups_get_distinct_files() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("package.json");
        std::fs::write(&manifest, "{}").unwrap();

        let store = store(tmp.path(), Duration::from_secs(3600));
        let first = store.create(&manifest).await.unwrap();
        let second = store.create(&manifest).await.unwrap();

        assert_ne!(first.backup_path, second.backup_path);
        assert!(first.backup_path.exists());
        assert!(second.backup_path.exists());
    }

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("file.txt");
        std::fs::write(&target, "old").unwrap();

        atomic_write(&target, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        // 임시 파일은 남지 않음
        assert!(!tmp.path().join("file.depmend-tmp").exists());
    }
}
