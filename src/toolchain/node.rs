//! 시스템 node 실행 파일 래퍼

use super::{Tool, ToolchainError};
use crate::version::Version;
use std::path::{Path, PathBuf};

pub struct Node {
    tool: Tool,
}

impl Node {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            tool: Tool::new("Node.js", path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        self.tool.path()
    }

    pub fn ensure_installed(&self) -> Result<(), ToolchainError> {
        self.tool.ensure_installed()
    }

    pub fn version(&self) -> Result<Version, ToolchainError> {
        self.tool.installed_version()
    }

    pub fn ensure_version_gte(&self, required: &Version) -> Result<(), ToolchainError> {
        self.tool.ensure_version_gte(required)
    }

    /// node를 주어진 인자로 실행하고 `(stderr, stdout)`을 반환합니다.
    pub fn run(&self, args: &[&str]) -> Result<(String, String), ToolchainError> {
        self.tool.run(args)
    }
}
