//! 런 캐시 -- (생태계, 패키지) 단위 해석 결과 메모이제이션
//!
//! [`CachedResolver`]는 한 런 동안 동일 패키지에 대한 아웃바운드 조회가
//! 정확히 한 번만 발생하도록 보장합니다. 동시 조회는 `OnceCell`로
//! 합류(coalesce)되어 먼저 시작된 조회의 결과를 공유합니다.
//!
//! 캐시는 런 객체에 스코프가 한정됩니다 -- 프로세스 전역 싱글턴이 아니므로
//! 동시 실행되는 런(예: 테스트)끼리 상태를 공유하지 않습니다.
//!
//! 선택적으로 TTL 기반 디스크 캐시를 아래에 둘 수 있습니다. 디스크 캐시에는
//! 확정 결과(Found/NotFound)만 기록되고 일시적 실패는 기록되지 않습니다.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use depmend_core::metrics as m;
use depmend_core::types::Ecosystem;

use crate::client::{RegistryResolver, ResolveOutcome};
use crate::error::RegistryError;

type CacheKey = (Ecosystem, String);

/// 런 스코프 캐싱 해석기
///
/// 내부 해석기를 감싸 (ecosystem, package) 단위로 결과를 메모이제이션합니다.
pub struct CachedResolver<R> {
    inner: Arc<R>,
    slots: Mutex<HashMap<CacheKey, Arc<OnceCell<ResolveOutcome>>>>,
    disk: Option<Mutex<DiskCache>>,
}

impl<R: RegistryResolver> CachedResolver<R> {
    /// 디스크 캐시 없이 캐싱 해석기를 생성합니다.
    pub fn new(inner: R) -> Self {
        Self {
            inner: Arc::new(inner),
            slots: Mutex::new(HashMap::new()),
            disk: None,
        }
    }

    /// TTL 디스크 캐시를 겹쳐 캐싱 해석기를 생성합니다.
    ///
    /// 캐시 파일이 없거나 손상되었으면 빈 캐시로 시작합니다 (경고 로그).
    pub fn with_disk_cache(inner: R, path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let disk = DiskCache::load(path.into(), ttl);
        Self {
            inner: Arc::new(inner),
            slots: Mutex::new(HashMap::new()),
            disk: Some(Mutex::new(disk)),
        }
    }

    /// 캐시된 키 수를 반환합니다 (테스트/진단용).
    pub async fn cached_count(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// 디스크 캐시를 파일로 기록합니다.
    ///
    /// 디스크 캐시가 비활성이면 no-op입니다.
    pub async fn persist(&self) -> Result<(), RegistryError> {
        if let Some(disk) = &self.disk {
            disk.lock().await.save()?;
        }
        Ok(())
    }

    async fn resolve_cached(&self, ecosystem: Ecosystem, package: &str) -> ResolveOutcome {
        let key = (ecosystem, package.to_owned());

        let cell = {
            let mut slots = self.slots.lock().await;
            if slots.contains_key(&key) {
                metrics::counter!(m::REGISTRY_CACHE_HITS_TOTAL).increment(1);
            }
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(|| async {
            // 디스크 캐시 조회
            if let Some(disk) = &self.disk
                && let Some(outcome) = disk.lock().await.lookup(&key)
            {
                debug!(ecosystem = %ecosystem, package, "disk cache hit");
                metrics::counter!(m::REGISTRY_CACHE_HITS_TOTAL).increment(1);
                return outcome;
            }

            let outcome = self.inner.resolve(ecosystem, package).await;

            // 확정 결과만 디스크에 기록
            if let Some(disk) = &self.disk
                && !matches!(outcome, ResolveOutcome::Unavailable { .. })
            {
                disk.lock().await.insert(key, outcome.clone());
            }

            outcome
        })
        .await
        .clone()
    }
}

impl<R: RegistryResolver> RegistryResolver for CachedResolver<R> {
    async fn resolve(&self, ecosystem: Ecosystem, package: &str) -> ResolveOutcome {
        self.resolve_cached(ecosystem, package).await
    }
}

/// 디스크 캐시 파일 형식
#[derive(Debug, Default, Serialize, Deserialize)]
struct DiskCacheFile {
    entries: HashMap<String, DiskCacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiskCacheEntry {
    outcome: ResolveOutcome,
    stored_at_unix: u64,
}

/// TTL 기반 디스크 캐시
struct DiskCache {
    path: PathBuf,
    ttl: Duration,
    file: DiskCacheFile,
    dirty: bool,
}

impl DiskCache {
    /// 캐시 파일을 로드합니다. 없거나 손상되었으면 빈 캐시로 시작합니다.
    fn load(path: PathBuf, ttl: Duration) -> Self {
        let file = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<DiskCacheFile>(&content) {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt disk cache, starting empty");
                    DiskCacheFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DiskCacheFile::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read disk cache, starting empty");
                DiskCacheFile::default()
            }
        };

        Self {
            path,
            ttl,
            file,
            dirty: false,
        }
    }

    fn cache_key(key: &CacheKey) -> String {
        format!("{}:{}", key.0, key.1)
    }

    /// TTL이 지나지 않은 엔트리를 조회합니다.
    fn lookup(&self, key: &CacheKey) -> Option<ResolveOutcome> {
        let entry = self.file.entries.get(&Self::cache_key(key))?;
        let now = unix_now();
        if now.saturating_sub(entry.stored_at_unix) > self.ttl.as_secs() {
            return None;
        }
        Some(entry.outcome.clone())
    }

    fn insert(&mut self, key: CacheKey, outcome: ResolveOutcome) {
        self.file.entries.insert(
            Self::cache_key(&key),
            DiskCacheEntry {
                outcome,
                stored_at_unix: unix_now(),
            },
        );
        self.dirty = true;
    }

    /// 만료 엔트리를 제거하고 캐시를 파일에 기록합니다.
    fn save(&mut self) -> Result<(), RegistryError> {
        if !self.dirty {
            return Ok(());
        }

        let now = unix_now();
        let ttl_secs = self.ttl.as_secs();
        self.file
            .entries
            .retain(|_, entry| now.saturating_sub(entry.stored_at_unix) <= ttl_secs);

        let json = serde_json::to_string(&self.file).map_err(|e| RegistryError::DiskCache {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RegistryError::DiskCache {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        // 임시 파일에 쓴 뒤 rename으로 원자적 교체
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, &json).map_err(|e| RegistryError::DiskCache {
            path: tmp_path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| RegistryError::DiskCache {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.dirty = false;
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
