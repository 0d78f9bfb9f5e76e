//! 검증 명령 capability -- 외부 도구 주입 지점
//!
//! 생태계별 의존성 해석 검사와 lock 파일 재생성 명령은 이 모듈의
//! trait으로 추상화됩니다. 실제 프로세스 실행 구현은 `depmend-cli`에
//! 있으며, 테스트는 프로세스를 띄우지 않는 가짜 구현을 주입합니다.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use depmend_core::types::Ecosystem;
use depmend_registry::BoxFuture;

/// 외부 명령 실행 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// 성공 여부 (종료 코드 0)
    pub success: bool,
    /// 명령 출력 (stdout + stderr, 실패 시 리포트에 원문 그대로 노출)
    pub output: String,
}

impl CommandOutcome {
    /// 성공 결과를 생성합니다.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    /// 실패 결과를 생성합니다.
    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// 검증 명령 capability trait
///
/// 구현체는 매니페스트 디렉토리에서 명령을 실행하고
/// 성공 여부와 출력을 반환합니다. panic하거나 에러를 던지지 않습니다.
pub trait ValidationCommand: Send + Sync {
    /// 매니페스트 디렉토리에서 명령을 실행합니다.
    fn run(&self, manifest_dir: &Path) -> impl Future<Output = CommandOutcome> + Send;
}

/// dyn-compatible 검증 명령 trait
///
/// `ValidationCommand`는 RPITIT를 사용하므로 `dyn ValidationCommand`가 불가합니다.
/// `DynValidationCommand`는 `BoxFuture`를 반환하여 trait object로
/// 명령을 주입할 수 있게 합니다.
pub trait DynValidationCommand: Send + Sync {
    /// 매니페스트 디렉토리에서 명령을 실행합니다.
    fn run<'a>(&'a self, manifest_dir: &'a Path) -> BoxFuture<'a, CommandOutcome>;
}

/// ValidationCommand를 구현한 타입은 자동으로 DynValidationCommand도 구현됩니다.
impl<T: ValidationCommand> DynValidationCommand for T {
    fn run<'a>(&'a self, manifest_dir: &'a Path) -> BoxFuture<'a, CommandOutcome> {
        Box::pin(ValidationCommand::run(self, manifest_dir))
    }
}

/// 생태계 하나에 주입되는 명령 쌍
#[derive(Clone)]
pub struct EcosystemCommands {
    /// lock/해석 산출물 재생성 명령
    pub lock_regen: Arc<dyn DynValidationCommand>,
    /// 의존성 해석 검사 명령
    pub validate: Arc<dyn DynValidationCommand>,
}

impl EcosystemCommands {
    /// 명령 쌍을 생성합니다.
    pub fn new(
        lock_regen: Arc<dyn DynValidationCommand>,
        validate: Arc<dyn DynValidationCommand>,
    ) -> Self {
        Self {
            lock_regen,
            validate,
        }
    }

    /// 생태계별 명령 맵을 만드는 헬퍼 (테스트용).
    pub fn map_for_all(
        lock_regen: Arc<dyn DynValidationCommand>,
        validate: Arc<dyn DynValidationCommand>,
    ) -> HashMap<Ecosystem, EcosystemCommands> {
        Ecosystem::ALL
            .iter()
            .map(|eco| {
                (
                    *eco,
                    EcosystemCommands::new(Arc::clone(&lock_regen), Arc::clone(&validate)),
                )
            })
            .collect()
    }
}
