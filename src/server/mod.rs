//! ProcessSupervisor — node 자식 프로세스의 수명 주기 관리
//!
//! 시작 핸드셰이크는 자식의 stdout 첫 줄로만 이뤄집니다: 준비가 끝난
//! 자식은 약속된 토큰을 한 줄 찍고, 우리는 그 줄을 읽을 때까지
//! 블로킹합니다. 이 대기에는 의도적으로 타임아웃이 없습니다 — 아무것도
//! 출력하지 않는 자식은 호출 스레드를 그대로 세워 둡니다(알려진 제약).
//!
//! 소유권 규칙: 한 supervisor 인스턴스가 spawn한 OS 프로세스는 그
//! 인스턴스만 종료할 수 있습니다. 같은 주소/포트를 바라보는 다른
//! 인스턴스는 liveness probe로 관찰만 하고, `stop()`은 자기 상태만
//! 바꿉니다.

pub mod http;
pub mod proxy;
mod registry;
pub mod shutdown;
pub mod snapshot;

use crate::config::BridgeConfig;
use crate::service::{ServiceDescriptor, ServiceError};
use crate::toolchain::{node::Node, npm::Npm, ToolchainError};
use crate::utils::{apply_creation_flags, html_to_plain_text};
use crate::version::Version;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

pub use http::{HttpClient, ServiceResponse};
pub use proxy::{ServerHandle, ServiceProxy};
pub use snapshot::{ConfigSnapshot, SnapshotService};

/// 자식이 준비 완료를 알리는 stdout 토큰 (논블로킹 모드)
pub const STARTUP_OUTPUT: &str = "__NODE_SERVER_IS_RUNNING__";
/// 서비스 등록 성공 시 자식이 돌려주는 본문
pub const ADD_SERVICE_OUTPUT: &str = "__ADDED_ENDPOINT__";

pub const TEST_ENDPOINT: &str = "/__test__";
pub const ADD_SERVICE_ENDPOINT: &str = "/__add_service__";
pub const GET_ENDPOINTS_ENDPOINT: &str = "/__get_endpoints__";

/// 서비스로 등록할 수 없는 예약 이름들
pub const BLACKLISTED_ENDPOINTS: [&str; 6] = [
    "",
    "*",
    "/",
    TEST_ENDPOINT,
    ADD_SERVICE_ENDPOINT,
    GET_ENDPOINTS_ENDPOINT,
];

/// liveness probe가 기대하는 응답 본문 — 호스트 프로세스마다 무작위로
/// 생성됩니다. 같은 포트에 물린 무관한 서비스가 probe를 통과하는 일을
/// 막습니다. 토큰은 Config Snapshot에 실려 자식에게 전달됩니다.
pub fn expected_test_output() -> &'static str {
    static TOKEN: OnceLock<String> = OnceLock::new();
    TOKEN.get_or_init(|| format!("__SERVER_TEST_{}__", uuid::Uuid::new_v4().simple()))
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to start node server: {output}")]
    Start { output: String },

    #[error("a process is already listening at {url}. {output}")]
    AddressInUse { url: String, output: String },

    #[error("connection to {url} failed: {detail}")]
    Connection { url: String, detail: String },

    #[error("request to {url} timed out: {detail}")]
    Timeout { url: String, detail: String },

    #[error("error at {url}: {message}")]
    Response { url: String, message: String },

    #[error("error at service {endpoint}: {message}")]
    Service { endpoint: String, message: String },

    #[error("failed to add service {endpoint}: {message}")]
    AddService { endpoint: String, message: String },

    #[error("malformed endpoint: {0:?}")]
    MalformedEndpoint(String),

    #[error("invalid endpoint listing: {0}")]
    EndpointListing(#[from] serde_json::Error),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Descriptor(#[from] ServiceError),

    #[error("server handle lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    NotStarted,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub struct StartOptions {
    /// node inspect 모드로 띄우고 exclusive + blocking을 강제
    pub debug: bool,
    /// 주소/포트에 이미 살아 있는 프로세스가 있으면 spawn 없이 입양 (warm start)
    pub use_existing_process: bool,
    /// stdio를 물려주고 자식이 끝날 때까지 기다리기
    pub blocking: bool,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            debug: false,
            use_existing_process: true,
            blocking: false,
        }
    }
}

/// python 프로세스 옆에 상주하며 HTTP로 응답하는 node 서버...가 아니라,
/// 그 서버를 소유하는 supervisor입니다. 논리 서버 하나당 인스턴스 하나.
pub struct NodeServer {
    config: BridgeConfig,
    services: Vec<ServiceDescriptor>,
    http: HttpClient,
    node: Node,
    npm: Npm,
    state: ServerState,
    child: Option<Child>,
}

impl NodeServer {
    pub fn new(config: BridgeConfig, services: Vec<ServiceDescriptor>) -> Self {
        let node = Node::new(&config.node_path);
        let npm = Npm::new(&config.npm_path);
        Self {
            config,
            services,
            http: HttpClient::new(),
            node,
            npm,
            state: ServerState::NotStarted,
            child: None,
        }
    }

    /// 설정 파일의 `[[services]]` 항목을 검증해 supervisor를 구성합니다.
    pub fn from_config(config: BridgeConfig) -> Result<Self, ServiceError> {
        let default_timeout = config.service_timeout();
        let mut services = Vec::with_capacity(config.services.len());
        for entry in &config.services {
            let timeout = entry
                .timeout_secs
                .map(Duration::from_secs_f64)
                .unwrap_or(default_timeout);
            services.push(ServiceDescriptor::new(&entry.name, &entry.source, timeout)?);
        }
        Ok(Self::new(config, services))
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn server_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.config.protocol, self.config.address, self.config.port
        )
    }

    pub fn absolute_url(&self, endpoint: &str) -> String {
        let separator = if endpoint.starts_with('/') { "" } else { "/" };
        format!("{}{}{}", self.server_url(), separator, endpoint)
    }

    pub fn start(&mut self) -> Result<(), ServerError> {
        self.start_with(StartOptions::default())
    }

    pub fn ensure_started(&mut self) -> Result<(), ServerError> {
        if self.state != ServerState::Running {
            self.start()?;
        }
        Ok(())
    }

    pub fn start_with(&mut self, opts: StartOptions) -> Result<(), ServerError> {
        let mut opts = opts;
        if opts.debug {
            opts.use_existing_process = false;
            opts.blocking = true;
        }

        // warm start가 최우선 경로입니다 — 다른 무엇보다 먼저 확인
        if opts.use_existing_process && self.test() {
            tracing::info!("adopting existing process at {}", self.server_url());
            self.state = ServerState::Running;
            self.sync_services()?;
            return Ok(());
        }

        if !opts.use_existing_process && self.test() {
            return Err(ServerError::AddressInUse {
                url: self.server_url(),
                output: String::new(),
            });
        }

        if self.config.verify_toolchain {
            self.node
                .ensure_version_gte(&Version::from(self.config.node_version_required.clone()))?;
            self.npm
                .ensure_version_gte(&Version::from(self.config.npm_version_required.clone()))?;
        }

        if self.config.install_on_start {
            if let Some(dir) = self.config.server_source.parent() {
                self.npm.install(dir, &[], true)?;
            }
        }

        let snapshot = self.snapshot(opts.blocking);
        let config_file = snapshot.write_temp()?;

        let mut cmd = Command::new(self.node.path());
        if opts.debug {
            cmd.arg("inspect");
        }
        cmd.arg(&self.config.server_source)
            .arg("--config")
            .arg(config_file.path());
        apply_creation_flags(&mut cmd);

        tracing::info!(
            "starting node server: {} {}",
            self.node.path().display(),
            self.config.server_source.display()
        );

        if opts.blocking {
            // stdio를 그대로 물려주고 자식이 끝날 때까지 포그라운드 점유
            let status = cmd.status().map_err(|e| ServerError::Start {
                output: format!(
                    "failed to spawn {}: {}",
                    self.config.server_source.display(),
                    e
                ),
            })?;
            tracing::info!("node server exited with {}", status);
            return Ok(());
        }

        // stdout과 stderr를 한 파이프로 합칩니다 — 핸드셰이크 줄과 에러
        // 메시지가 같은 스트림으로 들어와야 분류가 가능합니다
        let (reader, writer) = std::io::pipe()?;
        cmd.stdout(writer.try_clone()?);
        cmd.stderr(writer);

        let mut child = cmd.spawn().map_err(|e| ServerError::Start {
            output: format!(
                "failed to spawn {}: {}",
                self.config.server_source.display(),
                e
            ),
        })?;
        // 부모 쪽 쓰기 끝을 닫아야 자식 종료 시 EOF가 옵니다
        drop(cmd);

        let mut reader = BufReader::new(reader);
        let mut output = String::new();
        // 자식이 첫 줄을 쓸 때까지 무기한 블로킹 (문서화된 제약)
        reader.read_line(&mut output)?;

        if output.trim_end() != STARTUP_OUTPUT {
            let _ = child.kill();
            let _ = child.wait();
            let _ = reader.read_to_string(&mut output);

            if output.contains("EADDRINUSE") {
                return Err(ServerError::AddressInUse {
                    url: self.server_url(),
                    output,
                });
            }
            return Err(ServerError::Start { output });
        }

        if self.config.shutdown_on_exit {
            shutdown::register(child.id());
        }
        self.child = Some(child);
        self.state = ServerState::Running;

        // 자식이 성공을 주장했어도 실제로 닿는지 확인합니다
        if !self.test() {
            self.stop();
            return Err(ServerError::Start {
                output: format!(
                    "server at {} claimed startup but failed the liveness probe at {}",
                    self.server_url(),
                    TEST_ENDPOINT
                ),
            });
        }

        self.sync_services()?;
        tracing::info!("node server running at {}", self.server_url());
        Ok(())
    }

    /// 멱등 종료. 이 인스턴스가 spawn한 자식에게만 종료 신호를 보내며,
    /// 입양한 프로세스는 건드리지 않습니다. 신호 전달까지만 보장하고
    /// 자식의 실제 종료는 기다리지 않습니다.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if self.state != ServerState::Stopped {
                let pid = child.id();
                shutdown::terminate(pid);
                shutdown::unregister(pid);
                tracing::info!("terminated node server process (pid {})", pid);
            }
            let _ = child.try_wait();
        }
        self.state = ServerState::Stopped;
    }

    /// liveness probe — 짧은 타임아웃으로 예약 엔드포인트를 찔러 봅니다.
    /// 핵심 코드 전체에서 유일하게 실패를 정상 신호로 취급하는 곳입니다:
    /// 어떤 전송 에러든, 본문 불일치든 모두 false.
    pub fn test(&self) -> bool {
        let url = self.absolute_url(TEST_ENDPOINT);
        match self.http.get(&url, &[], self.config.test_timeout()) {
            Ok(response) => response.status == 200 && response.body == expected_test_output(),
            Err(_) => false,
        }
    }

    /// 이 인스턴스가 spawn한 자식이 끝날 때까지 블로킹합니다.
    /// 입양한 프로세스라면 기다릴 대상이 없으므로 `None`.
    pub fn wait(&mut self) -> Result<Option<ExitStatus>, ServerError> {
        match self.child.as_mut() {
            Some(child) => Ok(Some(child.wait()?)),
            None => Ok(None),
        }
    }

    /// 일반 서비스 호출 (GET + 쿼리 파라미터)
    pub fn get_service(
        &mut self,
        endpoint: &str,
        params: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<ServiceResponse, ServerError> {
        self.ensure_started()?;
        let timeout = timeout.unwrap_or_else(|| self.config.service_timeout());
        let url = self.absolute_url(endpoint);
        tracing::debug!("GET {} params={:?}", url, params);
        let response = self.http.get(&url, params, timeout)?;
        self.validate_response(&url, response)
    }

    /// JSON 본문 변형 — `{"data": .., "cache_key": ..}` 를 POST합니다.
    pub fn post_service(
        &mut self,
        endpoint: &str,
        data: serde_json::Value,
        cache_key: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<ServiceResponse, ServerError> {
        self.ensure_started()?;
        let timeout = timeout.unwrap_or_else(|| self.config.service_timeout());
        let url = self.absolute_url(endpoint);
        tracing::debug!("POST {} cache_key={:?}", url, cache_key);
        let body = serde_json::json!({
            "data": data,
            "cache_key": cache_key,
        });
        let response = self.http.post_json(&url, body, timeout)?;
        self.validate_response(&url, response)
    }

    /// 200이 아니면 본문을 평문으로 풀어 `Response` 에러로 바꿉니다.
    fn validate_response(
        &self,
        url: &str,
        response: ServiceResponse,
    ) -> Result<ServiceResponse, ServerError> {
        if response.status != 200 {
            return Err(ServerError::Response {
                url: url.to_string(),
                message: html_to_plain_text(&response.body),
            });
        }
        Ok(response)
    }

    /// 매 시작마다 새로 만드는 Config Snapshot
    pub fn snapshot(&self, blocking: bool) -> ConfigSnapshot {
        let startup_output = if blocking {
            format!("Node server listening at {}", self.server_url())
        } else {
            STARTUP_OUTPUT.to_string()
        };
        ConfigSnapshot {
            address: self.config.address.clone(),
            port: self.config.port,
            startup_output,
            test_endpoint: TEST_ENDPOINT.to_string(),
            expected_test_output: expected_test_output().to_string(),
            add_service_endpoint: ADD_SERVICE_ENDPOINT.to_string(),
            expected_add_service_output: ADD_SERVICE_OUTPUT.to_string(),
            get_endpoints_endpoint: GET_ENDPOINTS_ENDPOINT.to_string(),
            blacklisted_endpoints: BLACKLISTED_ENDPOINTS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            services: self
                .services
                .iter()
                .map(|s| SnapshotService {
                    name: s.name().to_string(),
                    path_to_source: s.source().to_string_lossy().into_owned(),
                })
                .collect(),
        }
    }

    pub(crate) fn is_blacklisted(endpoint: &str) -> bool {
        BLACKLISTED_ENDPOINTS.contains(&endpoint)
    }
}

impl Drop for NodeServer {
    fn drop(&mut self) {
        // 소유한 자식이 남아 있으면 정리 (입양분은 child가 None)
        if self.child.is_some() && self.state == ServerState::Running {
            self.stop();
        }
    }
}
