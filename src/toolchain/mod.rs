//! 외부 툴체인 게이트 — node / npm 버전 확인 및 실행 래퍼
//!
//! 각 도구에 `--version`을 한 번만 물어보고 그 결과를 캐싱합니다.
//! 실행 파일 자체를 못 찾는 것(not installed)과, 찾았지만 조회 중
//! stderr를 뱉는 것(interrogation failure)은 서로 다른 에러입니다.

pub mod node;
pub mod npm;

use crate::utils::apply_creation_flags;
use crate::version::{self, Version, VersionError};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("{0} is not installed or cannot be found on the system path")]
    MissingDependency(&'static str),

    #[error(
        "the installed {application} version is outdated. Version {installed} is installed, \
         but version {required} is required. Please update {application}"
    )]
    OutdatedDependency {
        application: &'static str,
        installed: Version,
        required: Version,
    },

    #[error("error interrogating {application}: {stderr}")]
    Interrogation {
        application: &'static str,
        stderr: String,
    },

    #[error(transparent)]
    Malformed(#[from] VersionError),

    #[error("failed to invoke {application}: {source}")]
    Invocation {
        application: &'static str,
        source: std::io::Error,
    },

    #[error("`npm install` target must be an existing directory: {0}")]
    BadInstallTarget(PathBuf),

    #[error("`npm install` failed in {dir}: {stderr}")]
    InstallFailed { dir: PathBuf, stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// `<tool> --version` 조회의 캐싱된 결과
enum Probe {
    /// 프로세스 스폰 자체가 실패 — 설치되지 않은 것으로 취급
    NotInstalled,
    /// 조회 중 stderr가 비어 있지 않음
    InterrogationFailure(String),
    /// stdout을 버전으로 파싱한 결과
    Installed(Result<Version, VersionError>),
}

/// 외부 실행 파일 하나에 대한 핸들. 버전 조회는 인스턴스 수명 동안
/// 한 번만 수행됩니다.
pub(crate) struct Tool {
    application: &'static str,
    path: PathBuf,
    probe: OnceLock<Probe>,
}

impl Tool {
    pub(crate) fn new(application: &'static str, path: PathBuf) -> Self {
        Self {
            application,
            path,
            probe: OnceLock::new(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn probe(&self) -> &Probe {
        self.probe.get_or_init(|| {
            let mut cmd = Command::new(&self.path);
            cmd.arg("--version");
            apply_creation_flags(&mut cmd);

            match cmd.output() {
                Err(e) => {
                    tracing::debug!(
                        "{} interrogation spawn failed ({}): {}",
                        self.application,
                        self.path.display(),
                        e
                    );
                    Probe::NotInstalled
                }
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if !stderr.trim().is_empty() {
                        Probe::InterrogationFailure(stderr.into_owned())
                    } else {
                        let stdout = String::from_utf8_lossy(&output.stdout);
                        Probe::Installed(Version::parse(stdout.trim()))
                    }
                }
            }
        })
    }

    pub(crate) fn ensure_installed(&self) -> Result<(), ToolchainError> {
        match self.probe() {
            Probe::NotInstalled => Err(ToolchainError::MissingDependency(self.application)),
            Probe::InterrogationFailure(stderr) => Err(ToolchainError::Interrogation {
                application: self.application,
                stderr: stderr.clone(),
            }),
            Probe::Installed(_) => Ok(()),
        }
    }

    pub(crate) fn installed_version(&self) -> Result<Version, ToolchainError> {
        self.ensure_installed()?;
        match self.probe() {
            Probe::Installed(parsed) => Ok(parsed.clone()?),
            // ensure_installed가 나머지 두 경우를 이미 걸러냈습니다
            _ => unreachable!("probe state changed after ensure_installed"),
        }
    }

    pub(crate) fn ensure_version_gte(&self, required: &Version) -> Result<(), ToolchainError> {
        let installed = self.installed_version()?;
        if version::is_outdated(&installed, required)? {
            return Err(ToolchainError::OutdatedDependency {
                application: self.application,
                installed,
                required: required.clone(),
            });
        }
        Ok(())
    }

    /// 도구를 인자와 함께 실행하고 `(stderr, stdout)`을 돌려줍니다.
    pub(crate) fn run(&self, args: &[&str]) -> Result<(String, String), ToolchainError> {
        self.ensure_installed()?;

        let mut cmd = Command::new(&self.path);
        cmd.args(args);
        apply_creation_flags(&mut cmd);

        let output = cmd.output().map_err(|e| ToolchainError::Invocation {
            application: self.application,
            source: e,
        })?;

        Ok((
            String::from_utf8_lossy(&output.stderr).into_owned(),
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_reports_not_installed() {
        let tool = Tool::new("Node.js", PathBuf::from("/no/such/binary"));
        assert!(matches!(
            tool.ensure_installed(),
            Err(ToolchainError::MissingDependency("Node.js"))
        ));
        // 버전 게이트도 같은 에러를 먼저 올립니다
        let required = Version::new(vec![18, 0, 0]);
        assert!(matches!(
            tool.ensure_version_gte(&required),
            Err(ToolchainError::MissingDependency(_))
        ));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        fn fake_tool(dir: &std::path::Path, script: &str) -> PathBuf {
            let path = dir.join("fake-tool");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "#!/bin/sh").unwrap();
            writeln!(file, "{}", script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_version_gate_against_fake_tool() {
            let dir = tempfile::tempdir().unwrap();
            let tool = Tool::new("Node.js", fake_tool(dir.path(), "echo v12.13.0"));

            assert!(tool.ensure_installed().is_ok());
            assert_eq!(
                tool.installed_version().unwrap(),
                Version::new(vec![12, 13, 0])
            );
            assert!(tool.ensure_version_gte(&Version::new(vec![12, 0, 0])).is_ok());
            assert!(tool.ensure_version_gte(&Version::new(vec![12, 13, 0])).is_ok());
            assert!(matches!(
                tool.ensure_version_gte(&Version::new(vec![18, 0, 0])),
                Err(ToolchainError::OutdatedDependency { .. })
            ));
        }

        #[test]
        fn test_stderr_during_interrogation_is_distinct_error() {
            let dir = tempfile::tempdir().unwrap();
            let tool = Tool::new("NPM", fake_tool(dir.path(), "echo broken >&2"));

            assert!(matches!(
                tool.ensure_installed(),
                Err(ToolchainError::Interrogation { application: "NPM", .. })
            ));
        }

        #[test]
        fn test_unparseable_version_is_malformed() {
            let dir = tempfile::tempdir().unwrap();
            let tool = Tool::new("Node.js", fake_tool(dir.path(), "echo not-a-version"));

            assert!(tool.ensure_installed().is_ok());
            assert!(matches!(
                tool.installed_version(),
                Err(ToolchainError::Malformed(_))
            ));
        }

        #[test]
        fn test_run_returns_stderr_and_stdout() {
            let dir = tempfile::tempdir().unwrap();
            let tool = Tool::new("Node.js", fake_tool(dir.path(), "echo out; echo err >&2"));

            // probe는 --version 출력("out")을 파싱하려다 실패하지만,
            // ensure_installed 관점에서는 설치된 상태입니다
            let (stderr, stdout) = tool.run(&["whatever"]).unwrap();
            assert_eq!(stdout.trim(), "out");
            assert_eq!(stderr.trim(), "err");
        }
    }
}
