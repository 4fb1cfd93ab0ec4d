//! 시맨틱 버전 튜플 — node / npm 최소 버전 게이트의 기반
//!
//! 버전은 세 개 이상의 숫자로 이뤄진 튜플로 취급하며, 비교는 순수
//! 사전식(lexicographic)입니다. 누락된 뒤쪽 자리를 0으로 채우는 일은
//! 없습니다. 비교 전에 양쪽 피연산자 모두 형태 검증을 거칩니다.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("versions must have at least three numbers defined. Received {0:?}")]
    TooFewComponents(Vec<u64>),

    #[error("versions can only contain numbers. Received {0:?}")]
    NonNumeric(String),

    #[error("empty version string")]
    Empty,
}

/// 순서 있는 버전 튜플. `v22.14.0` / `10.9.2` 양쪽 표기를 모두 파싱합니다.
/// (node는 `v` 접두사를 붙여 출력하고, npm은 붙이지 않음)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(Vec<u64>);

impl Version {
    pub fn new(components: Vec<u64>) -> Self {
        Self(components)
    }

    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let raw = raw.trim();
        let stripped = raw.strip_prefix('v').unwrap_or(raw);
        if stripped.is_empty() {
            return Err(VersionError::Empty);
        }

        let mut components = Vec::new();
        for part in stripped.split('.') {
            let number: u64 = part
                .trim()
                .parse()
                .map_err(|_| VersionError::NonNumeric(raw.to_string()))?;
            components.push(number);
        }
        Ok(Self(components))
    }

    /// 튜플 형태 검증 — 세 자리 미만이면 비교 대상이 될 수 없습니다.
    pub fn validate(&self) -> Result<(), VersionError> {
        if self.0.len() < 3 {
            return Err(VersionError::TooFewComponents(self.0.clone()));
        }
        Ok(())
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl From<Vec<u64>> for Version {
    fn from(components: Vec<u64>) -> Self {
        Self::new(components)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", text.join("."))
    }
}

/// `required`가 `current`보다 사전식으로 큰지 여부.
///
/// 같은 튜플은 outdated가 아닙니다. 한쪽이 먼저 소진되면 접두사가 같다는
/// 뜻이므로, 자릿수가 더 많은 `required`만 outdated로 판정합니다.
pub fn is_outdated(current: &Version, required: &Version) -> Result<bool, VersionError> {
    current.validate()?;
    required.validate()?;

    for (cur, req) in current.0.iter().zip(required.0.iter()) {
        if req > cur {
            return Ok(true);
        }
        if req < cur {
            return Ok(false);
        }
    }
    Ok(required.0.len() > current.0.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(components: &[u64]) -> Version {
        Version::new(components.to_vec())
    }

    #[test]
    fn test_parse_node_style() {
        assert_eq!(Version::parse("v22.14.0").unwrap(), v(&[22, 14, 0]));
        assert_eq!(Version::parse("  v18.0.0  ").unwrap(), v(&[18, 0, 0]));
    }

    #[test]
    fn test_parse_npm_style() {
        assert_eq!(Version::parse("10.9.2").unwrap(), v(&[10, 9, 2]));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Version::parse("garbage"),
            Err(VersionError::NonNumeric(_))
        ));
        assert!(matches!(
            Version::parse("1.2.x"),
            Err(VersionError::NonNumeric(_))
        ));
        assert!(matches!(Version::parse(""), Err(VersionError::Empty)));
    }

    #[test]
    fn test_equal_versions_are_never_outdated() {
        assert!(!is_outdated(&v(&[2, 0, 0]), &v(&[2, 0, 0])).unwrap());
    }

    #[test]
    fn test_outdated_iff_required_is_greater() {
        assert!(is_outdated(&v(&[1, 9, 9]), &v(&[2, 0, 0])).unwrap());
        assert!(is_outdated(&v(&[2, 0, 0]), &v(&[2, 0, 1])).unwrap());
        assert!(!is_outdated(&v(&[2, 0, 1]), &v(&[2, 0, 0])).unwrap());
        assert!(!is_outdated(&v(&[3, 0, 0]), &v(&[2, 99, 99])).unwrap());
    }

    #[test]
    fn test_longer_required_prefix_equal_is_outdated() {
        // 사전식 비교 — 접두사가 같으면 자릿수가 더 많은 쪽이 큽니다
        assert!(is_outdated(&v(&[2, 0, 0]), &v(&[2, 0, 0, 1])).unwrap());
        assert!(!is_outdated(&v(&[2, 0, 0, 1]), &v(&[2, 0, 0])).unwrap());
    }

    #[test]
    fn test_short_tuples_raise_structural_error() {
        assert!(matches!(
            is_outdated(&v(&[1, 2]), &v(&[1, 2, 3])),
            Err(VersionError::TooFewComponents(_))
        ));
        assert!(matches!(
            is_outdated(&v(&[1, 2, 3]), &v(&[1])),
            Err(VersionError::TooFewComponents(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(v(&[18, 0, 0]).to_string(), "18.0.0");
    }
}
