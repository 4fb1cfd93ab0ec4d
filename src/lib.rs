pub mod config;
pub mod server;  // 프로세스 supervisor + 서비스 레지스트리 + HTTP 프록시
pub mod service;
pub mod toolchain;
pub mod utils;
pub mod version;
