//! Harbor Config - 통합 설정
//!
//! 데이터 디렉토리 안의 config.json 으로 관리한다. 모든 필드에 기본값이
//! 있으므로 파일이 없어도 바로 동작한다 (레퍼런스 동작과 동일).

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};

/// 설정 파일명
pub const HARBOR_CONFIG_FILE: &str = "config.json";

/// BotHarbor 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarborConfig {
    /// 버전 (마이그레이션용)
    pub version: u32,

    /// 업로드된 스크립트 디렉토리 (데이터 디렉토리 기준 상대 경로)
    pub bots_dir: String,

    /// 봇별 로그 디렉토리
    pub logs_dir: String,

    /// 프로세스 레지스트리 파일명
    pub pid_file: String,

    /// 스크립트를 실행할 인터프리터
    pub interpreter: String,

    /// 업로드를 허용할 스크립트 확장자 (점 포함)
    pub script_extension: String,

    /// 누락 모듈 설치 명령 (모듈명이 마지막 인자로 붙음)
    pub install_command: Vec<String>,

    /// tailLog 기본 줄 수
    pub default_tail_lines: usize,
}

impl Default for HarborConfig {
    fn default() -> Self {
        Self {
            version: 1,
            bots_dir: "bots".to_string(),
            logs_dir: "logs".to_string(),
            pid_file: "pids.json".to_string(),
            interpreter: "python3".to_string(),
            script_extension: ".py".to_string(),
            install_command: vec![
                "python3".to_string(),
                "-m".to_string(),
                "pip".to_string(),
                "install".to_string(),
            ],
            default_tail_lines: 20,
        }
    }
}

impl HarborConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 데이터 디렉토리에서 로드, 없으면 기본값
    pub fn load(store: &JsonStore) -> Result<Self> {
        Ok(store
            .load_optional::<HarborConfig>(HARBOR_CONFIG_FILE)?
            .unwrap_or_default())
    }

    /// 데이터 디렉토리에 저장
    pub fn save(&self, store: &JsonStore) -> Result<()> {
        store.save(HARBOR_CONFIG_FILE, self)
    }

    // ========================================================================
    // Builders (테스트/임베딩용)
    // ========================================================================

    /// 인터프리터 설정
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// 스크립트 확장자 설정
    pub fn with_script_extension(mut self, ext: impl Into<String>) -> Self {
        self.script_extension = ext.into();
        self
    }

    /// 설치 명령 설정
    pub fn with_install_command(mut self, cmd: Vec<String>) -> Self {
        self.install_command = cmd;
        self
    }

    /// tail 기본 줄 수 설정
    pub fn with_default_tail_lines(mut self, lines: usize) -> Self {
        self.default_tail_lines = lines;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarborConfig::default();
        assert_eq!(config.bots_dir, "bots");
        assert_eq!(config.logs_dir, "logs");
        assert_eq!(config.pid_file, "pids.json");
        assert_eq!(config.script_extension, ".py");
        assert_eq!(config.default_tail_lines, 20);
    }

    #[test]
    fn test_builders() {
        let config = HarborConfig::new()
            .with_interpreter("sh")
            .with_script_extension(".sh")
            .with_install_command(vec!["true".to_string()])
            .with_default_tail_lines(5);
        assert_eq!(config.interpreter, "sh");
        assert_eq!(config.script_extension, ".sh");
        assert_eq!(config.install_command, vec!["true"]);
        assert_eq!(config.default_tail_lines, 5);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        // camelCase 필드 일부만 있는 파일도 나머지는 기본값으로 채워진다
        let config: HarborConfig =
            serde_json::from_str(r#"{"interpreter": "python3.12"}"#).unwrap();
        assert_eq!(config.interpreter, "python3.12");
        assert_eq!(config.bots_dir, "bots");
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let config = HarborConfig::new().with_interpreter("sh");
        config.save(&store).unwrap();

        let loaded = HarborConfig::load(&store).unwrap();
        assert_eq!(loaded.interpreter, "sh");
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let loaded = HarborConfig::load(&store).unwrap();
        assert_eq!(loaded.interpreter, "python3");
    }
}
