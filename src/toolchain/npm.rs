//! 시스템 npm 실행 파일 래퍼 — 버전 게이트 + install/uninstall

use super::{Tool, ToolchainError};
use crate::utils::apply_creation_flags;
use crate::version::Version;
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct Npm {
    tool: Tool,
}

impl Npm {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            tool: Tool::new("NPM", path.into()),
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

    /// npm을 주어진 인자로 실행하고 `(stderr, stdout)`을 반환합니다.
    pub fn run(&self, args: &[&str]) -> Result<(String, String), ToolchainError> {
        self.tool.run(args)
    }

    /// `target_dir`에서 `npm install [extra_args..]`를 실행합니다.
    ///
    /// `npm warn`으로 시작하는 stderr 라인은 경고 로그로만 남기고 넘어가며,
    /// 그 외의 stderr는 설치 실패로 취급합니다. `silent`가 아니면 stdout을
    /// info 레벨로 그대로 흘려보냅니다.
    pub fn install(
        &self,
        target_dir: &Path,
        extra_args: &[&str],
        silent: bool,
    ) -> Result<(String, String), ToolchainError> {
        if !target_dir.is_dir() {
            return Err(ToolchainError::BadInstallTarget(target_dir.to_path_buf()));
        }
        self.ensure_installed()?;

        let mut cmd = Command::new(self.tool.path());
        cmd.arg("install").args(extra_args).current_dir(target_dir);
        apply_creation_flags(&mut cmd);

        let output = cmd.output().map_err(|e| ToolchainError::Invocation {
            application: "NPM",
            source: e,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        for line in stderr.lines() {
            let lowered = line.to_lowercase();
            if lowered.starts_with("npm warn") {
                tracing::warn!("{}", line);
            } else if !line.trim().is_empty() {
                return Err(ToolchainError::InstallFailed {
                    dir: target_dir.to_path_buf(),
                    stderr,
                });
            }
        }

        if !silent && !stdout.trim().is_empty() {
            tracing::info!(
                "`npm install` output from {}:\n{}",
                target_dir.display(),
                stdout.trim()
            );
        }

        Ok((stderr, stdout))
    }

    /// `target_dir/node_modules`를 통째로 제거합니다. 없으면 아무 일도 안 합니다.
    pub fn uninstall_dependencies(&self, target_dir: &Path) -> Result<(), ToolchainError> {
        let node_modules = target_dir.join("node_modules");
        if node_modules.is_dir() {
            std::fs::remove_dir_all(&node_modules)?;
            tracing::info!("removed {}", node_modules.display());
        }
        Ok(())
    }
}
