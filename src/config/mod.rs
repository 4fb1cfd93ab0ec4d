//! 호스트 설정 — `config/node-bridge.toml` + 환경변수 오버라이드
//!
//! 파일이 없거나 일부 키가 빠져 있어도 전부 기본값으로 동작합니다.
//! 파일을 읽은 뒤 `NODE_BRIDGE_PORT`가 설정돼 있으면 포트를 덮어씁니다.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/node-bridge.toml";

/// 환경변수: 설정 파일 경로 오버라이드
pub const CONFIG_PATH_ENV: &str = "NODE_BRIDGE_CONFIG";
/// 환경변수: 포트 오버라이드
pub const PORT_ENV: &str = "NODE_BRIDGE_PORT";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BridgeConfig {
    pub protocol: String,
    pub address: String,
    pub port: u16,
    pub node_path: String,
    pub npm_path: String,
    /// 자식 프로세스로 띄울 서버 구현체
    pub server_source: PathBuf,
    pub service_timeout_secs: f64,
    pub test_timeout_secs: f64,
    pub node_version_required: Vec<u64>,
    pub npm_version_required: Vec<u64>,
    /// 시작 전에 node/npm 버전 게이트를 통과해야 하는지
    pub verify_toolchain: bool,
    /// 시작 시 서버 소스 디렉토리에 `npm install`을 돌릴지
    pub install_on_start: bool,
    /// 호스트 프로세스 종료 시 자식을 같이 종료할지
    pub shutdown_on_exit: bool,
    /// install-deps / uninstall-deps 명령이 다루는 디렉토리들
    pub package_dependencies: Vec<PathBuf>,
    pub services: Vec<ServiceEntry>,
}

/// `[[services]]` 테이블 하나 — 검증 전의 원시 형태
#[derive(Deserialize, Debug, Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub source: PathBuf,
    pub timeout_secs: Option<f64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            address: "127.0.0.1".to_string(),
            port: 63578,
            node_path: "node".to_string(),
            npm_path: "npm".to_string(),
            server_source: PathBuf::from("runtime/server.js"),
            service_timeout_secs: 10.0,
            test_timeout_secs: 2.0,
            node_version_required: vec![18, 0, 0],
            npm_version_required: vec![8, 0, 0],
            verify_toolchain: true,
            install_on_start: false,
            shutdown_on_exit: true,
            package_dependencies: Vec::new(),
            services: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// 기본 경로(또는 `NODE_BRIDGE_CONFIG`)에서 설정을 읽습니다.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Self {
        let raw = std::fs::read_to_string(path).unwrap_or_default();
        let mut cfg: Self = toml::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("failed to parse {}: {} — using defaults", path, e);
            Self::default()
        });
        cfg.apply_env_overrides();
        cfg
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var(PORT_ENV) {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("ignoring unparseable {}={:?}", PORT_ENV, port),
            }
        }
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.service_timeout_secs)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.test_timeout_secs)
    }
}
