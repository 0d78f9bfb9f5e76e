//! 에러 타입 — 도메인별 에러 정의

/// Depmend 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DepmendError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 매니페스트 스캔 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// 레지스트리 해석 에러
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// 매니페스트 변경/교정 에러
    #[error("mutation error: {0}")]
    Mutation(#[from] MutationError),

    /// 건강 검사/감사 에러
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 매니페스트 스캔 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 디렉토리 순회 실패
    #[error("walk failed: {0}")]
    WalkFailed(String),

    /// 매니페스트 파싱 실패
    #[error("manifest parse failed: {0}")]
    ParseFailed(String),

    /// 지원하지 않는 매니페스트 형식
    #[error("unsupported manifest: {0}")]
    Unsupported(String),
}

/// 레지스트리 해석 에러
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// 레지스트리 접근 불가 (네트워크/타임아웃)
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// 레지스트리 응답 파싱 실패
    #[error("registry response parse failed: {0}")]
    ParseFailed(String),

    /// 캐시 접근 실패
    #[error("cache failed: {0}")]
    CacheFailed(String),
}

/// 매니페스트 변경/교정 에러
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// 백업 생성 실패 — 해당 매니페스트의 변경은 시작 전에 중단됨
    #[error("backup failed: {0}")]
    BackupFailed(String),

    /// 매니페스트 재작성 실패
    #[error("mutation failed: {0}")]
    MutateFailed(String),

    /// 검증 명령 실패 — 자동 롤백이 수행됨
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// 백업 복원 실패
    #[error("rollback failed: {0}")]
    RollbackFailed(String),
}

/// 건강 검사/감사 에러
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// 검사 수행 실패
    #[error("check failed: {0}")]
    CheckFailed(String),

    /// 어드바이저리 DB 에러
    #[error("advisory db error: {0}")]
    AdvisoryDb(String),

    /// 리포트 기록 실패
    #[error("report write failed: {0}")]
    ReportWrite(String),
}
