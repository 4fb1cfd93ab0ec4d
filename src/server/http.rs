//! HTTP 전송 계층 — ureq 기반 블로킹 클라이언트
//!
//! 전송 실패를 타입 있는 에러로 분류하는 곳입니다: 연결 거부/리셋은
//! `Connection`, 타임아웃은 `Timeout`. 재시도는 어디에서도 하지 않습니다 —
//! 한 번 실패하면 그대로 호출자에게 올라갑니다.

use super::ServerError;
use serde_json::Value;
use std::time::Duration;

/// 상태 코드와 본문을 그대로 들고 있는 응답. 해석은 호출자 몫입니다.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: String,
}

pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    /// 쿼리 파라미터를 붙인 GET
    pub fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<ServiceResponse, ServerError> {
        let mut req = self.agent.get(url).timeout(timeout);
        for (key, value) in params {
            req = req.query(key, value);
        }
        self.finish(url, req.call())
    }

    /// application/x-www-form-urlencoded POST
    pub fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<ServiceResponse, ServerError> {
        let req = self.agent.post(url).timeout(timeout);
        self.finish(url, req.send_form(fields))
    }

    /// JSON 본문 POST
    pub fn post_json(
        &self,
        url: &str,
        body: Value,
        timeout: Duration,
    ) -> Result<ServiceResponse, ServerError> {
        let req = self.agent.post(url).timeout(timeout);
        self.finish(url, req.send_json(body))
    }

    fn finish(
        &self,
        url: &str,
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<ServiceResponse, ServerError> {
        let response = match result {
            Ok(response) => response,
            // ureq는 4xx/5xx도 Err로 돌려주지만, 우리 입장에서는
            // 유효한 프로토콜 응답입니다
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(classify_transport(url, transport));
            }
        };

        let status = response.status();
        let body = response.into_string().map_err(|e| {
            if matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                ServerError::Timeout {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ServerError::Connection {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        Ok(ServiceResponse { status, body })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_transport(url: &str, transport: ureq::Transport) -> ServerError {
    let detail = transport.to_string();
    if is_timeout(&transport) {
        ServerError::Timeout {
            url: url.to_string(),
            detail,
        }
    } else {
        ServerError::Connection {
            url: url.to_string(),
            detail,
        }
    }
}

/// 소스 체인을 따라가며 I/O 타임아웃이 원인인지 확인합니다.
fn is_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        current = e.source();
    }
    false
}
