//! 서비스 디스크립터 — configuration-as-data
//!
//! 어떤 엔드포인트를 어떤 소스 파일이 구현하는지를 기술하는 불변 값입니다.
//! 애플리케이션 시작 시점에 한 번 검증되고, 이후로는 변경되지 않습니다.
//! 동적 임포트 경로 탐색 같은 것은 없습니다 — 디스크립터 목록이 전부입니다.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("service source does not exist: {0}")]
    SourceDoesNotExist(PathBuf),

    #[error("malformed service name: {0:?}")]
    MalformedServiceName(String),
}

/// 검증을 통과한 서비스 기술자. 필드는 생성 이후 변하지 않습니다.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    name: String,
    source: PathBuf,
    timeout: Duration,
}

impl ServiceDescriptor {
    /// 디스크립터를 만들면서 검증합니다:
    /// - `source`는 디스크에 존재해야 함
    /// - `name`은 `/`로 시작하는 상대 경로여야 하며, 정확히 `/`이거나
    ///   절대 URL(스킴/호스트 포함)이면 안 됨
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let name = name.into();
        let source = source.into();

        if !source.exists() {
            return Err(ServiceError::SourceDoesNotExist(source));
        }
        if !name.starts_with('/')
            || name == "/"
            || name.starts_with("//")
            || name.contains("://")
        {
            return Err(ServiceError::MalformedServiceName(name));
        }

        Ok(Self {
            name,
            source,
            timeout,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn existing_source() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "module.exports = function() {{}};").unwrap();
        file
    }

    #[test]
    fn test_valid_descriptor() {
        let src = existing_source();
        let desc =
            ServiceDescriptor::new("/echo", src.path(), Duration::from_secs(10)).unwrap();
        assert_eq!(desc.name(), "/echo");
        assert_eq!(desc.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_missing_source_rejected() {
        let result = ServiceDescriptor::new(
            "/echo",
            "/no/such/file.js",
            Duration::from_secs(10),
        );
        assert!(matches!(result, Err(ServiceError::SourceDoesNotExist(_))));
    }

    #[test]
    fn test_malformed_names_rejected() {
        let src = existing_source();
        for name in ["echo", "/", "//host/echo", "http://example.com/echo", ""] {
            let result = ServiceDescriptor::new(name, src.path(), Duration::from_secs(1));
            assert!(
                matches!(result, Err(ServiceError::MalformedServiceName(_))),
                "name {:?} should be rejected",
                name
            );
        }
    }
}
