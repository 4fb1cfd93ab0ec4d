//! Config Snapshot — 자식 프로세스에 넘겨주는 불변 설정 묶음
//!
//! 매 시작마다 새로 만들어 임시 파일로 직렬화하고, 자식은 `--config <path>`
//! 로 이 파일을 읽어 스스로를 구성합니다. argv로 넘기지 않는 이유는
//! 커맨드라인 길이 제한 때문입니다. 파일 수명은 spawn 호출 범위로
//! 한정됩니다 — 자식이 읽고 나면 지워져도 됩니다.

use serde::Serialize;
use std::io::Write;
use tempfile::NamedTempFile;

#[derive(Serialize, Debug, Clone)]
pub struct ConfigSnapshot {
    pub address: String,
    pub port: u16,
    /// 자식이 준비 완료 시 stdout 첫 줄로 찍어야 하는 토큰
    pub startup_output: String,
    pub test_endpoint: String,
    pub expected_test_output: String,
    pub add_service_endpoint: String,
    pub expected_add_service_output: String,
    pub get_endpoints_endpoint: String,
    pub blacklisted_endpoints: Vec<String>,
    pub services: Vec<SnapshotService>,
}

#[derive(Serialize, Debug, Clone)]
pub struct SnapshotService {
    pub name: String,
    pub path_to_source: String,
}

impl ConfigSnapshot {
    /// 스냅샷을 임시 파일에 JSON으로 기록합니다. 반환된 핸들이 살아 있는
    /// 동안만 파일이 존재합니다.
    pub fn write_temp(&self) -> std::io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.flush()?;
        Ok(file)
    }

    pub fn to_pretty_json(&self) -> String {
        // Serialize 구현이 있는 구조체이므로 실패하지 않습니다
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigSnapshot {
        ConfigSnapshot {
            address: "127.0.0.1".to_string(),
            port: 63578,
            startup_output: "__NODE_SERVER_IS_RUNNING__".to_string(),
            test_endpoint: "/__test__".to_string(),
            expected_test_output: "token".to_string(),
            add_service_endpoint: "/__add_service__".to_string(),
            expected_add_service_output: "__ADDED_ENDPOINT__".to_string(),
            get_endpoints_endpoint: "/__get_endpoints__".to_string(),
            blacklisted_endpoints: vec!["".into(), "*".into(), "/".into()],
            services: vec![SnapshotService {
                name: "/echo".to_string(),
                path_to_source: "runtime/services/echo.js".to_string(),
            }],
        }
    }

    #[test]
    fn test_temp_file_holds_complete_snapshot() {
        let file = sample().write_temp().unwrap();
        let raw = std::fs::read_to_string(file.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        // 자식이 기대하는 필드가 전부 있어야 합니다
        for key in [
            "address",
            "port",
            "startup_output",
            "test_endpoint",
            "expected_test_output",
            "add_service_endpoint",
            "expected_add_service_output",
            "get_endpoints_endpoint",
            "blacklisted_endpoints",
            "services",
        ] {
            assert!(value.get(key).is_some(), "missing field {}", key);
        }
        assert_eq!(value["services"][0]["name"], "/echo");
        assert_eq!(
            value["services"][0]["path_to_source"],
            "runtime/services/echo.js"
        );
    }

    #[test]
    fn test_file_is_deleted_with_handle() {
        let file = sample().write_temp().unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }
}
