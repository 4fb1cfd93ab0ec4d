//! node-bridge CLI — serve / config / install-deps / uninstall-deps

use anyhow::Context;
use node_bridge::config::BridgeConfig;
use node_bridge::server::{NodeServer, StartOptions};
use node_bridge::toolchain::npm::Npm;

const USAGE: &str = "\
usage: node-bridge <command>

commands:
  serve [--debug] [--blocking] [--exclusive]   start the node server
  config                                       print the resolved config snapshot
  install-deps                                 npm install for registered dependency dirs
  uninstall-deps                               remove node_modules from dependency dirs
";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str);
    let config = BridgeConfig::load();

    match command {
        Some("serve") => serve(config, &args[1..]),
        Some("config") => {
            let server = NodeServer::from_config(config)?;
            println!("{}", server.snapshot(false).to_pretty_json());
            Ok(())
        }
        Some("install-deps") => install_deps(config),
        Some("uninstall-deps") => uninstall_deps(config),
        _ => {
            eprint!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn serve(config: BridgeConfig, flags: &[String]) -> anyhow::Result<()> {
    let opts = StartOptions {
        debug: flags.iter().any(|f| f == "--debug"),
        use_existing_process: !flags.iter().any(|f| f == "--exclusive"),
        blocking: flags.iter().any(|f| f == "--blocking"),
    };

    let mut server = NodeServer::from_config(config)?;
    server.start_with(opts).context("failed to start node server")?;

    // spawn한 자식이 있으면 포그라운드를 붙잡습니다. 입양한 프로세스라면
    // 기다릴 대상이 없으므로 바로 돌아옵니다.
    match server.wait()? {
        Some(status) => tracing::info!("node server exited with {}", status),
        None => tracing::info!("reusing existing process at {}", server.server_url()),
    }
    Ok(())
}

fn install_deps(config: BridgeConfig) -> anyhow::Result<()> {
    let npm = Npm::new(&config.npm_path);
    for dir in dependency_dirs(&config) {
        tracing::info!("npm install in {}", dir.display());
        npm.install(&dir, &[], false)
            .with_context(|| format!("npm install failed in {}", dir.display()))?;
    }
    Ok(())
}

fn uninstall_deps(config: BridgeConfig) -> anyhow::Result<()> {
    let npm = Npm::new(&config.npm_path);
    for dir in dependency_dirs(&config) {
        npm.uninstall_dependencies(&dir)
            .with_context(|| format!("failed to clean {}", dir.display()))?;
    }
    Ok(())
}

/// 서버 런타임 디렉토리 + 설정된 의존성 디렉토리들
fn dependency_dirs(config: &BridgeConfig) -> Vec<std::path::PathBuf> {
    let mut dirs = Vec::new();
    if let Some(runtime_dir) = config.server_source.parent() {
        dirs.push(runtime_dir.to_path_buf());
    }
    dirs.extend(config.package_dependencies.iter().cloned());
    dirs
}
