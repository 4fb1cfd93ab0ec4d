//! ServiceRegistry — 자식 프로세스에 등록된 엔드포인트 관리
//!
//! 진실의 원천은 자식이 광고하는 엔드포인트 집합입니다. 로컬 캐시를
//! 권위 있는 상태로 두지 않는 이유: 같은 주소/포트를 공유하는 다른
//! supervisor 인스턴스가 우리가 모르는 엔드포인트를 추가할 수 있기
//! 때문입니다(의도된 동작 — 프로세스 공유 시나리오).

use super::{NodeServer, ServerError, ADD_SERVICE_ENDPOINT, ADD_SERVICE_OUTPUT,
    GET_ENDPOINTS_ENDPOINT};
use crate::utils::html_to_plain_text;
use std::path::{Path, PathBuf};

impl NodeServer {
    /// 엔드포인트 하나를 자식에 등록합니다.
    ///
    /// 블랙리스트·형식 검사를 먼저 하고, 자식이 이미 광고 중인
    /// 엔드포인트라면 등록 호출 없이 성공합니다(같은 프로세스에 대한
    /// 중복 등록은 no-op).
    pub fn register_service(
        &mut self,
        endpoint: &str,
        path_to_source: &Path,
    ) -> Result<(), ServerError> {
        if !endpoint.starts_with('/') || Self::is_blacklisted(endpoint) {
            return Err(ServerError::MalformedEndpoint(endpoint.to_string()));
        }

        self.ensure_started()?;

        if self.get_endpoints()?.iter().any(|e| e == endpoint) {
            tracing::debug!("endpoint {} already registered, skipping", endpoint);
            return Ok(());
        }

        tracing::info!(
            "adding service at {:?} with source {}",
            endpoint,
            path_to_source.display()
        );

        let url = self.absolute_url(ADD_SERVICE_ENDPOINT);
        let source = path_to_source.to_string_lossy();
        let response = self.http.post_form(
            &url,
            &[("endpoint", endpoint), ("path_to_source", &source)],
            self.config.service_timeout(),
        )?;

        // 성공 판정은 상태 코드와 본문 토큰 양쪽 모두입니다
        if response.status != 200 || response.body != ADD_SERVICE_OUTPUT {
            return Err(ServerError::AddService {
                endpoint: endpoint.to_string(),
                message: html_to_plain_text(&response.body),
            });
        }
        Ok(())
    }

    /// 자식이 현재 광고 중인 엔드포인트 목록. 블랙리스트 항목은 걸러냅니다.
    pub fn get_endpoints(&mut self) -> Result<Vec<String>, ServerError> {
        self.ensure_started()?;

        let url = self.absolute_url(GET_ENDPOINTS_ENDPOINT);
        let response = self
            .http
            .get(&url, &[], self.config.service_timeout())?;
        let response = self.validate_response(&url, response)?;

        let endpoints: Vec<String> = serde_json::from_str(&response.body)?;
        Ok(endpoints
            .into_iter()
            .filter(|e| !Self::is_blacklisted(e.as_str()))
            .collect())
    }

    /// 구성된 디스크립터 중 자식이 아직 모르는 것을 전부 등록합니다.
    /// cold start 직후와 warm start(입양) 직후 양쪽에서 호출됩니다 —
    /// 입양한 프로세스도 우리 서비스 목록을 갖추게 됩니다.
    pub fn sync_services(&mut self) -> Result<(), ServerError> {
        let known = self.get_endpoints()?;
        let pending: Vec<(String, PathBuf)> = self
            .services
            .iter()
            .filter(|s| !known.iter().any(|k| k == s.name()))
            .map(|s| (s.name().to_string(), s.source().to_path_buf()))
            .collect();

        for (name, source) in pending {
            self.register_service(&name, &source)?;
        }
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;

    #[test]
    fn test_malformed_endpoints_rejected_before_any_network_io() {
        // 서버가 떠 있지 않아도 형식 검사는 즉시 실패해야 합니다
        let config = BridgeConfig {
            verify_toolchain: false,
            ..BridgeConfig::default()
        };
        let mut server = NodeServer::new(config, Vec::new());

        for endpoint in ["", "*", "/", "noslash", super::super::TEST_ENDPOINT] {
            let result = server.register_service(endpoint, Path::new("echo.js"));
            assert!(
                matches!(result, Err(ServerError::MalformedEndpoint(_))),
                "endpoint {:?} should be rejected",
                endpoint
            );
        }
    }
}
