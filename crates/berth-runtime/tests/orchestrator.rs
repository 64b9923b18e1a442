//! Orchestrator lifecycle tests against scripted plugins.

use std::sync::Arc;
use std::time::Duration;

use berth_core::{BuilderConfig, Category, ShellConfig};
use berth_runtime::{
    LifecycleState, Orchestrator, OrchestratorConfig, RuntimeError, ShutdownTrigger, TeardownError,
};
use berth_test::{
    Behavior, Journal, ManifestDir, RecordingUi, ScriptedPlugin, UiLevel, scripted_registry,
    setup_test_logging,
};

const FULL_MANIFEST: &str = r"
name: Demo Project
sync:
  - name: syncer
run:
  - name: runner
build:
  - name: builder
shell:
  - name: sheller
";

fn orchestrator(
    manifest: &ManifestDir,
    plugins: impl IntoIterator<Item = ScriptedPlugin>,
) -> (Orchestrator, RecordingUi) {
    setup_test_logging("debug");
    let ui = RecordingUi::new();
    let orchestrator = Orchestrator::new(
        OrchestratorConfig::new(manifest.path()),
        scripted_registry(plugins),
        Arc::new(ui.clone()),
    );
    (orchestrator, ui)
}

fn full_set() -> [ScriptedPlugin; 4] {
    [
        ScriptedPlugin::new("syncer").syncable(),
        ScriptedPlugin::new("runner").runnable(),
        ScriptedPlugin::new("builder").buildable(),
        ScriptedPlugin::new("sheller").shellable(),
    ]
}

fn interrupt_after(ms: u64) -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(ms))
}

#[test]
fn load_resolves_every_entry_by_name() {
    let manifest = ManifestDir::new(FULL_MANIFEST);
    let plugins = full_set();
    let (mut orch, _ui) = orchestrator(&manifest, plugins.clone());

    orch.load_plugins().unwrap();

    assert_eq!(orch.state(), LifecycleState::Loaded);
    assert_eq!(orch.plugins().len(), 4);
    for plugin in &plugins {
        let name = berth_core::Pluggable::name(plugin);
        assert_eq!(orch.plugin(name).unwrap().name(), name);
        assert_eq!(plugin.stats().configures(), 1);
    }
    assert_eq!(orch.category_plugins(Category::Sync).len(), 1);
    assert_eq!(orch.category_plugins(Category::Shell).len(), 1);

    let ctx = plugins[0].stats().context().unwrap();
    assert_eq!(ctx.project_name, "Demo Project");
    assert_eq!(ctx.project_name_safe, "demoproject");
}

#[test]
fn load_is_a_no_op_once_loaded() {
    let manifest = ManifestDir::new(FULL_MANIFEST);
    let plugins = full_set();
    let (mut orch, _ui) = orchestrator(&manifest, plugins.clone());

    orch.load_plugins().unwrap();
    orch.load_plugins().unwrap();

    assert_eq!(orch.plugins().len(), 4);
    assert_eq!(plugins[0].stats().configures(), 1);
}

#[test]
fn unknown_plugin_leaves_orchestrator_unconfigured() {
    let manifest = ManifestDir::new(
        r"
name: demo
sync:
  - name: syncer
run:
  - name: ghost
",
    );
    let syncer = ScriptedPlugin::new("syncer").syncable();
    let (mut orch, _ui) = orchestrator(&manifest, [syncer.clone()]);

    let err = orch.load_plugins().unwrap_err();
    assert!(
        matches!(&err, RuntimeError::UnknownPlugin { name, category } if name == "ghost" && *category == Category::Run),
        "{err:?}"
    );
    assert!(err.is_configuration());
    assert_eq!(orch.state(), LifecycleState::Unconfigured);
    assert!(orch.plugins().is_empty());
    assert!(orch.context().is_none());
    assert!(matches!(orch.plugin("syncer"), Err(RuntimeError::NotFound(_))));
}

#[test]
fn plugin_in_wrong_category_is_rejected() {
    let manifest = ManifestDir::new(
        r"
name: demo
run:
  - name: syncer
",
    );
    let (mut orch, _ui) = orchestrator(&manifest, [ScriptedPlugin::new("syncer").syncable()]);

    let err = orch.load_plugins().unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::MissingCapability { ref plugin, category: Category::Run } if plugin == "syncer"
    ));
    assert!(orch.plugins().is_empty());
}

#[test]
fn missing_manifest_path_is_fatal() {
    let mut orch = Orchestrator::new(
        OrchestratorConfig::default(),
        scripted_registry(std::iter::empty()),
        Arc::new(RecordingUi::new()),
    );
    let err = orch.load_plugins().unwrap_err();
    assert!(matches!(err, RuntimeError::MissingManifest));
    assert!(err.is_configuration());
}

#[test]
fn unreadable_manifest_is_config_error() {
    let manifest = ManifestDir::new("name: [unclosed");
    let (mut orch, _ui) = orchestrator(&manifest, std::iter::empty());
    let err = orch.load_plugins().unwrap_err();
    assert!(matches!(err, RuntimeError::Config(_)));
    assert_eq!(orch.state(), LifecycleState::Unconfigured);
}

#[tokio::test(flavor = "multi_thread")]
async fn interrupt_tears_down_each_started_plugin_once() {
    let manifest = ManifestDir::new(FULL_MANIFEST);
    let plugins = full_set();
    let (mut orch, ui) = orchestrator(&manifest, plugins.clone());
    let token = orch.cancellation_token();

    let report = orch.run_until(interrupt_after(100)).await.unwrap();

    assert!(matches!(report.trigger, ShutdownTrigger::Interrupted));
    assert!(report.is_success());
    assert_eq!(report.teardown.total(), 2);
    assert_eq!(plugins[0].stats().syncs(), 1);
    assert_eq!(plugins[1].stats().runs(), 1);
    assert_eq!(plugins[0].stats().teardowns(), 1);
    assert_eq!(plugins[1].stats().teardowns(), 1);
    // Build and shell plugins are never started or torn down.
    assert_eq!(plugins[2].stats().teardowns(), 0);
    assert_eq!(plugins[3].stats().teardowns(), 0);

    assert!(token.is_cancelled());
    assert_eq!(orch.state(), LifecycleState::Stopped);
    assert!(ui.contains(UiLevel::Info, "Interrupt received"));
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_sync_tears_down_blocked_runner() {
    let manifest = ManifestDir::new(
        r"
name: demo
sync:
  - name: alpha
run:
  - name: beta
",
    );
    let alpha = ScriptedPlugin::new("alpha")
        .syncable()
        .with_behavior(Behavior::fail("disk full"));
    let beta = ScriptedPlugin::new("beta").runnable();
    let (mut orch, ui) = orchestrator(&manifest, [alpha.clone(), beta.clone()]);

    let report = orch.run_until(std::future::pending()).await.unwrap();

    let failure = report.trigger.failure().expect("plugin failure should trigger shutdown");
    assert_eq!(failure.plugin, "alpha");
    assert_eq!(failure.category, Category::Sync);
    assert!(failure.error.to_string().contains("disk full"));

    assert_eq!(alpha.stats().teardowns(), 1);
    assert_eq!(beta.stats().teardowns(), 1);
    assert_eq!(report.teardown.completed.len(), 2);

    let error_at = ui.position("disk full").unwrap();
    let notice_at = ui.position("Shutting down").unwrap();
    assert!(error_at < notice_at);
    assert!(ui.contains(UiLevel::Error, "alpha"));
}

#[tokio::test(flavor = "multi_thread")]
async fn only_first_failure_triggers_but_all_are_torn_down() {
    let manifest = ManifestDir::new(
        r"
name: demo
sync:
  - name: early
run:
  - name: late
  - name: steady
",
    );
    let early = ScriptedPlugin::new("early")
        .syncable()
        .with_behavior(Behavior::fail("first"));
    let late = ScriptedPlugin::new("late")
        .runnable()
        .with_behavior(Behavior::Hang);
    let steady = ScriptedPlugin::new("steady").runnable();
    let (mut orch, _ui) = orchestrator(&manifest, [early.clone(), late.clone(), steady.clone()]);

    let report = orch.run_until(std::future::pending()).await.unwrap();

    assert_eq!(report.trigger.failure().unwrap().plugin, "early");
    for plugin in [&early, &late, &steady] {
        assert_eq!(plugin.stats().teardowns(), 1);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failures_after_the_trigger_are_reported_as_late() {
    let manifest = ManifestDir::new(
        r"
name: demo
sync:
  - name: early
run:
  - name: second
  - name: slow
",
    );
    let early = ScriptedPlugin::new("early")
        .syncable()
        .with_behavior(Behavior::fail("first"));
    let second = ScriptedPlugin::new("second")
        .runnable()
        .with_behavior(Behavior::FailOnCancel("second".into()));
    let slow = ScriptedPlugin::new("slow")
        .runnable()
        .with_teardown_delay(Duration::from_millis(200));
    let (mut orch, _ui) = orchestrator(&manifest, [early.clone(), second.clone(), slow.clone()]);

    let report = orch.run_until(std::future::pending()).await.unwrap();

    assert_eq!(report.trigger.failure().unwrap().plugin, "early");
    assert_eq!(report.late_failures.len(), 1);
    let late = &report.late_failures[0];
    assert_eq!(late.plugin, "second");
    assert_eq!(late.category, Category::Run);
    assert!(late.error.to_string().contains("second"));
    assert!(!report.is_success());
    for plugin in [&early, &second, &slow] {
        assert_eq!(plugin.stats().teardowns(), 1);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_while_stopping_after_interrupt_is_not_success() {
    let manifest = ManifestDir::new(
        r"
name: demo
run:
  - name: grumpy
  - name: slow
",
    );
    let grumpy = ScriptedPlugin::new("grumpy")
        .runnable()
        .with_behavior(Behavior::FailOnCancel("exit 137".into()));
    let slow = ScriptedPlugin::new("slow")
        .runnable()
        .with_teardown_delay(Duration::from_millis(200));
    let (mut orch, _ui) = orchestrator(&manifest, [grumpy, slow]);

    let report = orch.run_until(interrupt_after(50)).await.unwrap();

    assert!(matches!(report.trigger, ShutdownTrigger::Interrupted));
    assert!(report.teardown.is_clean());
    assert_eq!(report.late_failures.len(), 1);
    assert_eq!(report.late_failures[0].plugin, "grumpy");
    assert!(!report.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn delayed_failure_triggers_shutdown() {
    let manifest = ManifestDir::new(
        r"
name: demo
sync:
  - name: flaky
run:
  - name: server
",
    );
    let flaky = ScriptedPlugin::new("flaky")
        .syncable()
        .with_behavior(Behavior::FailAfter(Duration::from_millis(50), "connection reset".into()));
    let server = ScriptedPlugin::new("server").runnable();
    let (mut orch, _ui) = orchestrator(&manifest, [flaky.clone(), server.clone()]);

    let started = tokio::time::Instant::now();
    let report = tokio::time::timeout(Duration::from_secs(10), orch.run_until(std::future::pending()))
        .await
        .expect("delayed failure should end the run")
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
    let failure = report.trigger.failure().unwrap();
    assert_eq!(failure.plugin, "flaky");
    assert!(failure.error.to_string().contains("connection reset"));
    assert!(report.late_failures.is_empty());
    assert_eq!(server.stats().teardowns(), 1);
    assert_eq!(flaky.stats().teardowns(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_return_does_not_trigger_shutdown() {
    let manifest = ManifestDir::new(
        r"
name: demo
run:
  - name: oneshot
",
    );
    let oneshot = ScriptedPlugin::new("oneshot")
        .runnable()
        .with_behavior(Behavior::Succeed);
    let (mut orch, _ui) = orchestrator(&manifest, [oneshot.clone()]);

    let started = tokio::time::Instant::now();
    let report = orch.run_until(interrupt_after(200)).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(matches!(report.trigger, ShutdownTrigger::Interrupted));
    assert_eq!(oneshot.stats().teardowns(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn teardown_failures_are_collected_not_short_circuited() {
    let manifest = ManifestDir::new(
        r"
name: demo
sync:
  - name: broken
  - name: fine
",
    );
    let broken = ScriptedPlugin::new("broken")
        .syncable()
        .with_teardown_error("stuck volume");
    let fine = ScriptedPlugin::new("fine").syncable();
    let (mut orch, ui) = orchestrator(&manifest, [broken.clone(), fine.clone()]);

    let report = orch.run_until(interrupt_after(50)).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.teardown.completed, vec!["fine".to_string()]);
    assert_eq!(report.teardown.failures.len(), 1);
    let failure = &report.teardown.failures[0];
    assert_eq!(failure.plugin, "broken");
    assert!(matches!(&failure.error, TeardownError::Failed(e) if e.to_string().contains("stuck volume")));
    assert_eq!(fine.stats().teardowns(), 1);
    assert!(ui.contains(UiLevel::Warn, "teardown of 'broken' failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_teardown_is_bounded_by_timeout() {
    let manifest = ManifestDir::new(
        r"
name: demo
run:
  - name: slow
  - name: quick
",
    );
    let slow = ScriptedPlugin::new("slow")
        .runnable()
        .with_teardown_delay(Duration::from_secs(30));
    let quick = ScriptedPlugin::new("quick").runnable();
    setup_test_logging("debug");
    let mut orch = Orchestrator::new(
        OrchestratorConfig::new(manifest.path()).with_teardown_timeout(Duration::from_millis(100)),
        scripted_registry([slow.clone(), quick.clone()]),
        Arc::new(RecordingUi::new()),
    );

    let report = tokio::time::timeout(Duration::from_secs(10), orch.run_until(interrupt_after(50)))
        .await
        .expect("teardown timeout should bound the run")
        .unwrap();

    assert_eq!(report.teardown.completed, vec!["quick".to_string()]);
    assert!(matches!(
        report.teardown.failures[0].error,
        TeardownError::TimedOut(limit) if limit == Duration::from_millis(100)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn second_run_is_rejected() {
    let manifest = ManifestDir::new(FULL_MANIFEST);
    let plugins = full_set();
    let (mut orch, _ui) = orchestrator(&manifest, plugins.clone());

    orch.run_until(interrupt_after(20)).await.unwrap();
    let err = orch.run_until(interrupt_after(20)).await.unwrap_err();

    assert!(matches!(
        err,
        RuntimeError::InvalidState { operation: "run", state: LifecycleState::Stopped }
    ));
    assert_eq!(plugins[0].stats().syncs(), 1);
    assert_eq!(plugins[0].stats().teardowns(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn explicit_teardown_after_run_is_empty() {
    let manifest = ManifestDir::new(FULL_MANIFEST);
    let plugins = full_set();
    let (mut orch, _ui) = orchestrator(&manifest, plugins.clone());

    orch.run_until(interrupt_after(20)).await.unwrap();
    let again = orch.teardown().await;

    assert_eq!(again.total(), 0);
    assert_eq!(plugins[0].stats().teardowns(), 1);
}

#[tokio::test]
async fn build_runs_sequentially_and_stops_at_first_error() {
    let manifest = ManifestDir::new(
        r"
name: demo
build:
  - name: first
  - name: second
  - name: third
",
    );
    let journal = Journal::new();
    let first = ScriptedPlugin::new("first").buildable().with_journal(&journal);
    let second = ScriptedPlugin::new("second")
        .buildable()
        .with_build_error("no Dockerfile")
        .with_journal(&journal);
    let third = ScriptedPlugin::new("third").buildable().with_journal(&journal);
    let (mut orch, _ui) = orchestrator(&manifest, [first.clone(), second, third.clone()]);

    let err = orch.build(&BuilderConfig::new("acme/app")).await.unwrap_err();

    assert!(matches!(&err, RuntimeError::Plugin { plugin, .. } if plugin == "second"));
    assert_eq!(
        journal
            .entries()
            .into_iter()
            .filter(|e| e.ends_with(":build"))
            .collect::<Vec<_>>(),
        vec!["first:build", "second:build"]
    );
    assert_eq!(third.stats().builds(), 0);
    assert_eq!(first.stats().last_builder().unwrap().image_name, "acme/app");
}

#[tokio::test]
async fn publish_calls_every_builder() {
    let manifest = ManifestDir::new(
        r"
name: demo
build:
  - name: first
  - name: second
",
    );
    let first = ScriptedPlugin::new("first").buildable();
    let second = ScriptedPlugin::new("second").buildable();
    let (mut orch, _ui) = orchestrator(&manifest, [first.clone(), second.clone()]);

    orch.publish(&BuilderConfig::default()).await.unwrap();

    assert_eq!(first.stats().publishes(), 1);
    assert_eq!(second.stats().publishes(), 1);
}

#[tokio::test]
async fn shell_merges_overrides_onto_default() {
    let manifest = ManifestDir::new(FULL_MANIFEST);
    let plugins = full_set();
    let (mut orch, _ui) = orchestrator(&manifest, plugins.clone());

    orch.shell("sheller", ShellConfig::empty().with_service("worker"))
        .await
        .unwrap();

    let seen = plugins[3].stats().last_shell().unwrap();
    assert_eq!(seen.service, "worker");
    assert_eq!(seen.command, vec!["bash".to_string()]);
    assert_eq!(seen.user, "");

    orch.attach("sheller", ShellConfig::empty()).await.unwrap();
    let seen = plugins[3].stats().last_shell().unwrap();
    assert_eq!(seen, ShellConfig::default());
    assert_eq!(plugins[3].stats().attaches(), 1);
}

#[test]
fn shell_plugin_distinguishes_missing_from_incapable() {
    let manifest = ManifestDir::new(FULL_MANIFEST);
    let (mut orch, _ui) = orchestrator(&manifest, full_set());
    orch.load_plugins().unwrap();

    assert!(orch.shell_plugin("sheller").is_ok());
    assert!(matches!(
        orch.shell_plugin("nobody"),
        Err(RuntimeError::NotFound(name)) if name == "nobody"
    ));
    assert!(matches!(
        orch.shell_plugin("runner"),
        Err(RuntimeError::MissingCapability { category: Category::Shell, .. })
    ));
}

#[tokio::test]
async fn shell_on_unknown_plugin_is_not_found() {
    let manifest = ManifestDir::new(FULL_MANIFEST);
    let (mut orch, _ui) = orchestrator(&manifest, full_set());

    let err = orch.shell("nobody", ShellConfig::empty()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::NotFound(_)));
    assert!(!err.is_configuration());
}
