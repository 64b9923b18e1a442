//! `compose`: runs the environment with Docker Compose.
//!
//! Serves the run, build, and shell categories. All work is delegated to the
//! `docker` CLI; the plugin only assembles command lines and supervises the
//! child processes.
//!
//! Resource names are derived from the project's safe name:
//! - compose project: `berth-{safe}`
//! - container for service `S`: `berth-{safe}_{S}_1`
//!
//! `run` builds the base image first when `image_name` is set, removes any
//! stale containers of the project, and then brings the project up. With
//! `x_proxy_port` set it also forwards that port to the local X server for
//! the lifetime of the run and passes the matching `DISPLAY` to compose, so
//! the compose file can use `${DISPLAY}`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use berth_core::{
    BuilderConfig, Buildable, Pluggable, PluginContext, PluginError, PluginResult, Runnable,
    ShellConfig, Shellable,
};
use serde::Deserialize;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::exec;
use crate::params::PluginParams;
use crate::registry::PluginRegistry;

/// Registry name.
pub const NAME: &str = "compose";

/// Files whose contents determine the image version, relative to the build
/// context.
pub const VERSION_INPUTS: &[&str] = &["Dockerfile", "package.json", "Gemfile.lock"];

/// Hex digits kept from the content hash for the version tag.
const VERSION_LEN: usize = 12;

/// `docker` invocations run by [`cleanup`]: exited containers, then dangling
/// images.
pub const CLEANUP_COMMANDS: &[&[&str]] = &[&["container", "prune", "--force"], &["image", "prune", "--force"]];

/// Host name containers use to reach the machine running Docker.
pub const DEFAULT_DISPLAY_HOST: &str = "host.docker.internal";

/// Manifest parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposeParams {
    /// Compose file passed with `-f`.
    pub composefile: PathBuf,
    /// Fallback image repository for build and publish.
    pub image_name: String,
    /// Explicit `docker` binary. Looked up on `PATH` when absent.
    pub docker: Option<PathBuf>,
    /// Forward this TCP port to the local X server during `run`.
    pub x_proxy_port: Option<u16>,
    /// Host part of the `DISPLAY` handed to containers.
    pub x_display_host: String,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            composefile: PathBuf::from("docker-compose.yml"),
            image_name: String::new(),
            docker: None,
            x_proxy_port: None,
            x_display_host: DEFAULT_DISPLAY_HOST.to_string(),
        }
    }
}

/// Register the `compose` factory.
///
/// # Errors
///
/// Returns an error if the name is already taken.
pub fn register(registry: &mut PluginRegistry) -> PluginResult<()> {
    registry.register(NAME, |params| {
        Ok(Box::new(ComposePlugin::from_params(params)?) as Box<dyn Pluggable>)
    })
}

/// Docker Compose plugin.
#[derive(Debug)]
pub struct ComposePlugin {
    params: ComposeParams,
    ctx: Option<Arc<PluginContext>>,
}

impl ComposePlugin {
    /// Create the plugin from manifest parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidParameters`] if the map does not fit
    /// [`ComposeParams`].
    pub fn from_params(params: &PluginParams) -> PluginResult<Self> {
        Ok(Self::new(params.deserialize()?))
    }

    /// Create the plugin from typed parameters.
    #[must_use]
    pub fn new(params: ComposeParams) -> Self {
        Self { params, ctx: None }
    }

    fn ctx(&self) -> PluginResult<&PluginContext> {
        self.ctx
            .as_deref()
            .ok_or_else(|| PluginError::NotConfigured(NAME.to_string()))
    }

    /// The compose project name, `berth-{safe}`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotConfigured`] before `configure`.
    pub fn project_name(&self) -> PluginResult<String> {
        Ok(format!("berth-{}", self.ctx()?.project_name_safe))
    }

    /// The container name for `service`, `berth-{safe}_{service}_1`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotConfigured`] before `configure`.
    pub fn container_name(&self, service: &str) -> PluginResult<String> {
        Ok(format!("{}_{service}_1", self.project_name()?))
    }

    fn docker(&self) -> PluginResult<PathBuf> {
        locate_docker(self.params.docker.as_deref())
    }

    /// `docker compose -f F -p P <args>`.
    fn compose(&self, args: &[String]) -> PluginResult<Command> {
        let mut full = vec![
            "compose".to_string(),
            "-f".to_string(),
            self.params.composefile.display().to_string(),
            "-p".to_string(),
            self.project_name()?,
        ];
        full.extend_from_slice(args);
        Ok(exec::command(self.docker()?, &full))
    }

    fn image_name<'a>(&'a self, config: &'a BuilderConfig) -> PluginResult<&'a str> {
        if !config.image_name.is_empty() {
            return Ok(&config.image_name);
        }
        if !self.params.image_name.is_empty() {
            return Ok(&self.params.image_name);
        }
        Err(PluginError::InvalidParameters {
            plugin: NAME.to_string(),
            message: "no image name given and no image_name parameter configured".to_string(),
        })
    }
}

fn locate_docker(explicit: Option<&Path>) -> PluginResult<PathBuf> {
    if let Some(docker) = explicit {
        return Ok(docker.to_path_buf());
    }
    which::which("docker").map_err(|e| {
        PluginError::ExecutionFailed(format!("docker not found on PATH: {e}"))
    })
}

/// Remove exited containers and dangling images.
///
/// `docker` defaults to the binary found on `PATH`.
///
/// # Errors
///
/// Returns an error if docker cannot be found or a prune command fails.
pub async fn cleanup(docker: Option<&Path>) -> PluginResult<()> {
    let docker = locate_docker(docker)?;
    for args in CLEANUP_COMMANDS {
        exec::run(exec::command(&docker, *args)).await?;
    }
    info!(docker = %docker.display(), "Removed exited containers and dangling images");
    Ok(())
}

/// `DISPLAY` for a container reaching the X proxy on `host:port`.
#[must_use]
pub fn container_display(host: &str, port: u16) -> String {
    format!("{host}:{}", port.saturating_sub(berth_proxy::DEFAULT_X_PROXY_PORT))
}

/// Forward `port` to the X server named by `display` until `cancel` fires.
#[cfg(unix)]
async fn spawn_x_proxy(port: u16, display: &str, cancel: CancellationToken) -> PluginResult<JoinHandle<()>> {
    use berth_proxy::{ProxyConfig, StreamProxy};

    let proxy_failed = |e: berth_proxy::ProxyError| PluginError::ExecutionFailed(format!("X server proxy: {e}"));
    let socket = berth_proxy::display_socket_path(display).map_err(proxy_failed)?;
    let proxy = StreamProxy::bind(ProxyConfig::on_port(port, socket))
        .await
        .map_err(proxy_failed)?;
    info!(plugin = NAME, listen = %proxy.local_addr(), endpoint = %proxy.endpoint().display(), "X server proxy started");

    Ok(tokio::spawn(async move {
        if let Err(e) = proxy.serve(cancel).await {
            warn!(plugin = NAME, error = %e, "X server proxy failed");
        }
    }))
}

#[cfg(not(unix))]
async fn spawn_x_proxy(_port: u16, _display: &str, _cancel: CancellationToken) -> PluginResult<JoinHandle<()>> {
    Err(PluginError::ExecutionFailed(
        "the X server proxy requires a Unix platform".to_string(),
    ))
}

/// Arguments after `docker compose -f F -p P` for an interactive session.
#[must_use]
pub fn exec_args(config: &ShellConfig) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if !config.user.is_empty() {
        args.push("--user".to_string());
        args.push(config.user.clone());
    }
    args.push(config.service.clone());
    args.extend(config.command.iter().cloned());
    args
}

/// Content version of the build context at `dir`.
///
/// A blake3 hash over the name and contents of each present
/// [`VERSION_INPUTS`] file, truncated to a short hex tag.
///
/// # Errors
///
/// Returns an I/O error if a present input cannot be read.
pub fn content_version(dir: &Path) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    for name in VERSION_INPUTS {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        hasher.update(name.as_bytes());
        hasher.update(&std::fs::read(&path)?);
    }
    let hex = hasher.finalize().to_hex();
    Ok(hex.as_str().chars().take(VERSION_LEN).collect())
}

#[async_trait]
impl Pluggable for ComposePlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn configure(&mut self, ctx: Arc<PluginContext>) {
        self.ctx = Some(ctx);
    }

    async fn teardown(&self) -> PluginResult<()> {
        let project = self.project_name()?;
        info!(plugin = NAME, %project, "Stopping compose project");
        exec::run(self.compose(&["down".to_string()])?).await
    }

    fn as_runnable(&self) -> Option<&dyn Runnable> {
        Some(self)
    }

    fn as_buildable(&self) -> Option<&dyn Buildable> {
        Some(self)
    }

    fn as_shellable(&self) -> Option<&dyn Shellable> {
        Some(self)
    }
}

#[async_trait]
impl Runnable for ComposePlugin {
    async fn run(&self, cancel: CancellationToken) -> PluginResult<()> {
        let ui = &self.ctx()?.ui;
        let project = self.project_name()?;
        ui.stage("Run Docker");

        if self.params.image_name.is_empty() {
            debug!(plugin = NAME, "No image_name configured, skipping base image");
        } else {
            ui.step("Building base image");
            self.build(&BuilderConfig::default()).await?;
        }

        ui.step(&format!("Removing stale containers of '{project}'"));
        exec::run(self.compose(&["down".to_string()])?).await?;

        let mut cmd = self.compose(&["up".to_string(), "--build".to_string()])?;

        // Stops the X proxy however the run ends.
        let proxy_cancel = cancel.child_token();
        let _stop_proxy = proxy_cancel.clone().drop_guard();
        if let Some(port) = self.params.x_proxy_port {
            let display = std::env::var("DISPLAY").map_err(|_| PluginError::InvalidParameters {
                plugin: NAME.to_string(),
                message: "x_proxy_port is set but DISPLAY is not".to_string(),
            })?;
            spawn_x_proxy(port, &display, proxy_cancel).await?;
            let container = container_display(&self.params.x_display_host, port);
            ui.step(&format!("Forwarding port {port} to X display {display} (DISPLAY={container})"));
            cmd.env("DISPLAY", container);
        }

        ui.step(&format!(
            "Starting compose project '{project}' from {}",
            self.params.composefile.display()
        ));
        exec::run_until_cancelled(cmd, &cancel).await
    }
}

#[async_trait]
impl Buildable for ComposePlugin {
    async fn build(&self, config: &BuilderConfig) -> PluginResult<()> {
        let ui = &self.ctx()?.ui;
        let image = self.image_name(config)?;
        ui.stage("Build Docker image");

        let dir = std::env::current_dir()?;
        let version = tokio::task::spawn_blocking(move || content_version(&dir))
            .await
            .map_err(|e| PluginError::ExecutionFailed(format!("version hash task: {e}")))??;
        let tagged = format!("{image}:{version}");
        debug!(plugin = NAME, image = %tagged, "Computed image version");

        let docker = self.docker()?;
        if exec::succeeds(exec::command(&docker, &["image", "inspect", tagged.as_str()])).await? {
            ui.step(&format!("Image {tagged} is up to date, skipping build"));
            return Ok(());
        }

        ui.step(&format!("Building {tagged}"));
        let latest = format!("{image}:latest");
        exec::run(exec::command(
            &docker,
            &["build", "-t", tagged.as_str(), "-t", latest.as_str(), "."],
        ))
        .await
    }

    async fn publish(&self, config: &BuilderConfig) -> PluginResult<()> {
        let ui = &self.ctx()?.ui;
        let latest = format!("{}:latest", self.image_name(config)?);
        ui.stage("Publish Docker image");
        ui.step(&format!("Pushing {latest}"));
        exec::run(exec::command(self.docker()?, &["push", latest.as_str()])).await
    }
}

#[async_trait]
impl Shellable for ComposePlugin {
    async fn shell(&self, config: &ShellConfig) -> PluginResult<()> {
        let ui = &self.ctx()?.ui;
        ui.stage("Interactive Shell");
        ui.step(&format!("Opening '{}' in service '{}'", config.command.join(" "), config.service));
        exec::run(self.compose(&exec_args(config))?).await
    }

    async fn attach(&self, config: &ShellConfig) -> PluginResult<()> {
        let ui = &self.ctx()?.ui;
        let container = self.container_name(&config.service)?;
        ui.stage("Interactive Shell");
        ui.step(&format!("Attaching to container '{container}'"));
        exec::run(exec::command(self.docker()?, &["attach", container.as_str()])).await
    }
}

#[cfg(test)]
mod tests {
    use berth_core::Category;

    use super::*;

    fn configured(project: &str) -> ComposePlugin {
        let mut plugin = ComposePlugin::new(ComposeParams::default());
        plugin.configure(Arc::new(PluginContext::headless(project)));
        plugin
    }

    #[test]
    fn declares_run_build_shell() {
        let caps = ComposePlugin::new(ComposeParams::default()).capabilities();
        assert!(!caps.contains(Category::Sync));
        assert!(caps.contains(Category::Run));
        assert!(caps.contains(Category::Build));
        assert!(caps.contains(Category::Shell));
    }

    #[test]
    fn params_default_and_reject_unknown() {
        let plugin = ComposePlugin::from_params(&PluginParams::empty(NAME)).unwrap();
        assert_eq!(plugin.params.composefile, PathBuf::from("docker-compose.yml"));

        let bad = PluginParams::new(NAME, serde_json::json!({"compose_file": "x.yml"}));
        assert!(matches!(
            ComposePlugin::from_params(&bad),
            Err(PluginError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn resource_names_use_safe_project_name() {
        let plugin = configured("My Project");
        assert_eq!(plugin.project_name().unwrap(), "berth-myproject");
        assert_eq!(plugin.container_name("web").unwrap(), "berth-myproject_web_1");
    }

    #[test]
    fn names_require_configuration() {
        let plugin = ComposePlugin::new(ComposeParams::default());
        assert!(matches!(plugin.project_name(), Err(PluginError::NotConfigured(_))));
    }

    #[test]
    fn exec_args_include_user_only_when_set() {
        let config = ShellConfig::default();
        assert_eq!(exec_args(&config), vec!["exec", "web", "bash"]);

        let config = ShellConfig::merged(
            ShellConfig::empty()
                .with_user("root")
                .with_service("db")
                .with_command(["psql", "-U", "app"]),
        );
        assert_eq!(
            exec_args(&config),
            vec!["exec", "--user", "root", "db", "psql", "-U", "app"]
        );
    }

    #[test]
    fn image_name_prefers_builder_config() {
        let mut plugin = configured("demo");
        plugin.params.image_name = "fallback/app".to_string();

        assert_eq!(
            plugin.image_name(&BuilderConfig::new("explicit/app")).unwrap(),
            "explicit/app"
        );
        assert_eq!(plugin.image_name(&BuilderConfig::default()).unwrap(), "fallback/app");

        plugin.params.image_name.clear();
        assert!(plugin.image_name(&BuilderConfig::default()).is_err());
    }

    #[test]
    fn x_proxy_is_opt_in() {
        let plugin = ComposePlugin::from_params(&PluginParams::empty(NAME)).unwrap();
        assert_eq!(plugin.params.x_proxy_port, None);
        assert_eq!(plugin.params.x_display_host, DEFAULT_DISPLAY_HOST);

        let params = PluginParams::new(NAME, serde_json::json!({"x_proxy_port": 6001, "x_display_host": "192.168.99.1"}));
        let plugin = ComposePlugin::from_params(&params).unwrap();
        assert_eq!(plugin.params.x_proxy_port, Some(6001));
        assert_eq!(plugin.params.x_display_host, "192.168.99.1");
    }

    #[test]
    fn container_display_follows_proxy_port() {
        assert_eq!(container_display("host.docker.internal", 6000), "host.docker.internal:0");
        assert_eq!(container_display("192.168.99.1", 6003), "192.168.99.1:3");
        assert_eq!(container_display("localhost", 80), "localhost:0");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn x_proxy_stops_with_its_token() {
        let cancel = CancellationToken::new();
        let task = spawn_x_proxy(0, ":99", cancel.clone()).await.unwrap();

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn x_proxy_rejects_remote_display() {
        let err = spawn_x_proxy(0, "remote:0", CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("X server proxy"), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cleanup_runs_every_prune_command() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls");
        let fake = dir.path().join("docker");
        std::fs::write(&fake, format!("#!/bin/sh\necho \"$@\" >> {}\n", log.display())).unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        cleanup(Some(&fake)).await.unwrap();

        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls, "container prune --force\nimage prune --force\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cleanup_stops_at_failing_prune() {
        let fake = which::which("false").unwrap();
        assert!(matches!(
            cleanup(Some(&fake)).await,
            Err(PluginError::CommandFailed { .. })
        ));
    }

    #[test]
    fn content_version_tracks_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let empty = content_version(dir.path()).unwrap();
        assert_eq!(empty.len(), VERSION_LEN);

        std::fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        let first = content_version(dir.path()).unwrap();
        assert_ne!(first, empty);
        assert_eq!(first, content_version(dir.path()).unwrap());

        std::fs::write(dir.path().join("unrelated.txt"), "noise").unwrap();
        assert_eq!(first, content_version(dir.path()).unwrap());

        std::fs::write(dir.path().join("Dockerfile"), "FROM debian\n").unwrap();
        assert_ne!(first, content_version(dir.path()).unwrap());
    }
}
