//! ServerHandle / ServiceProxy — 조립 경계에서 쓰는 공유 핸들
//!
//! supervisor는 애플리케이션 시작 시점에 한 번 만들어 핸들로 돌려
//! 쓰는 물건입니다(전역 싱글턴 없음). 핸들은 `Arc<Mutex<..>>` 래퍼라
//! 자유롭게 복제할 수 있고, 내부 `NodeServer`는 락 없이 단일 스레드
//! 감각 그대로 남습니다 — start/stop 동시 호출 경합은 이 뮤텍스가
//! 막아 줍니다.

use super::{NodeServer, ServerError, ServerState, ServiceResponse, StartOptions};
use crate::service::ServiceDescriptor;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Clone)]
pub struct ServerHandle {
    inner: Arc<Mutex<NodeServer>>,
}

impl ServerHandle {
    pub fn new(server: NodeServer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(server)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, NodeServer>, ServerError> {
        self.inner.lock().map_err(|e| {
            tracing::error!("server handle lock poisoned: {}", e);
            ServerError::LockPoisoned
        })
    }

    pub fn start(&self) -> Result<(), ServerError> {
        self.lock()?.start()
    }

    pub fn start_with(&self, opts: StartOptions) -> Result<(), ServerError> {
        self.lock()?.start_with(opts)
    }

    pub fn stop(&self) -> Result<(), ServerError> {
        self.lock()?.stop();
        Ok(())
    }

    pub fn test(&self) -> Result<bool, ServerError> {
        Ok(self.lock()?.test())
    }

    pub fn state(&self) -> Result<ServerState, ServerError> {
        Ok(self.lock()?.state())
    }

    pub fn server_url(&self) -> Result<String, ServerError> {
        Ok(self.lock()?.server_url())
    }

    pub fn get_endpoints(&self) -> Result<Vec<String>, ServerError> {
        self.lock()?.get_endpoints()
    }

    /// 엔드포인트를 등록하고, 그 엔드포인트에 묶인 호출 가능한 프록시를
    /// 돌려줍니다. 타임아웃은 기본 서비스 타임아웃입니다.
    pub fn add_service(
        &self,
        endpoint: &str,
        path_to_source: &Path,
    ) -> Result<ServiceProxy, ServerError> {
        let timeout = {
            let mut server = self.lock()?;
            server.register_service(endpoint, path_to_source)?;
            server.config().service_timeout()
        };
        Ok(ServiceProxy {
            handle: self.clone(),
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    /// 디스크립터를 등록하고 디스크립터 자체의 타임아웃을 쓰는 프록시를
    /// 돌려줍니다.
    pub fn service_proxy(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> Result<ServiceProxy, ServerError> {
        self.lock()?
            .register_service(descriptor.name(), descriptor.source())?;
        Ok(ServiceProxy {
            handle: self.clone(),
            endpoint: descriptor.name().to_string(),
            timeout: descriptor.timeout(),
        })
    }
}

/// `(supervisor, endpoint)`에 묶인 호출 단위. 이름 있는 파라미터를 쿼리
/// 파라미터로 넘깁니다.
#[derive(Clone)]
pub struct ServiceProxy {
    handle: ServerHandle,
    endpoint: String,
    timeout: Duration,
}

impl ServiceProxy {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// GET 호출. 2xx가 아닌 응답은 서비스 수준 에러로 올라옵니다.
    pub fn call(&self, params: &[(&str, &str)]) -> Result<ServiceResponse, ServerError> {
        self.call_with_timeout(params, self.timeout)
    }

    pub fn call_with_timeout(
        &self,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<ServiceResponse, ServerError> {
        self.handle
            .lock()?
            .get_service(&self.endpoint, params, Some(timeout))
            .map_err(|e| self.as_service_error(e))
    }

    /// JSON 본문 변형 — 선택적 캐시 키와 함께 POST합니다.
    pub fn post(
        &self,
        data: serde_json::Value,
        cache_key: Option<&str>,
    ) -> Result<ServiceResponse, ServerError> {
        self.handle
            .lock()?
            .post_service(&self.endpoint, data, cache_key, Some(self.timeout))
            .map_err(|e| self.as_service_error(e))
    }

    /// 서버 수준 `Response` 에러를 이 서비스의 에러로 바꿔 올립니다.
    /// 전송 에러(Connection/Timeout)는 분류를 유지한 채 그대로 통과합니다.
    fn as_service_error(&self, err: ServerError) -> ServerError {
        match err {
            ServerError::Response { message, .. } => ServerError::Service {
                endpoint: self.endpoint.clone(),
                message,
            },
            other => other,
        }
    }
}
