//! Process table probe - OS 프로세스 테이블 조회
//!
//! 프로세스 테이블은 외부 읽기 전용 협력자다. 코어에 OS 호출을 흩뿌리지
//! 않고 `ProcessTable` 트레이트 뒤로 모아서, 리컨실러와 status 조회가
//! 같은 창구를 쓰고 테스트는 가짜 테이블을 꽂을 수 있게 한다.
//!
//! ## 플랫폼 지원
//! - sysinfo 크레이트 기반 (Linux /proc, macOS, Windows)

use std::sync::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// 프로세스 리소스 사용량 스냅샷
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessMetrics {
    /// CPU 사용률 (0.0 - 100.0+, 멀티코어 시 100% 초과 가능)
    pub cpu_percent: f32,

    /// 전체 메모리 대비 사용률 (%)
    pub mem_percent: f32,
}

/// OS 프로세스 테이블 인터페이스
pub trait ProcessTable: Send + Sync {
    /// 해당 pid 의 프로세스가 현재 테이블에 존재하는지
    fn alive(&self, pid: u32) -> bool;

    /// 프로세스 시작 시각 (epoch 초). 없으면 None
    fn start_time(&self, pid: u32) -> Option<u64>;

    /// CPU/메모리 사용량. 프로세스가 없으면 None
    fn metrics(&self, pid: u32) -> Option<ProcessMetrics>;
}

/// sysinfo 기반 구현
///
/// `System` 을 유지한 채 pid 단위로 갱신한다. CPU 사용률은 두 번째
/// 샘플부터 의미가 있다 (같은 pid 의 첫 조회는 0.0).
pub struct SystemProbe {
    sys: Mutex<System>,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
        }
    }

    fn refresh(&self, sys: &mut System, pid: Pid, kind: ProcessRefreshKind) {
        sys.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, kind);
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProbe {
    fn alive(&self, pid: u32) -> bool {
        let mut sys = self.sys.lock().unwrap_or_else(|e| e.into_inner());
        let target = Pid::from_u32(pid);
        self.refresh(&mut sys, target, ProcessRefreshKind::new());
        sys.process(target).is_some()
    }

    fn start_time(&self, pid: u32) -> Option<u64> {
        let mut sys = self.sys.lock().unwrap_or_else(|e| e.into_inner());
        let target = Pid::from_u32(pid);
        self.refresh(&mut sys, target, ProcessRefreshKind::new());
        sys.process(target).map(|p| p.start_time())
    }

    fn metrics(&self, pid: u32) -> Option<ProcessMetrics> {
        let mut sys = self.sys.lock().unwrap_or_else(|e| e.into_inner());
        let target = Pid::from_u32(pid);
        self.refresh(
            &mut sys,
            target,
            ProcessRefreshKind::new().with_cpu().with_memory(),
        );
        sys.refresh_memory();
        let total = sys.total_memory();
        sys.process(target).map(|p| ProcessMetrics {
            cpu_percent: p.cpu_usage(),
            mem_percent: if total > 0 {
                (p.memory() as f32 / total as f32) * 100.0
            } else {
                0.0
            },
        })
    }
}
