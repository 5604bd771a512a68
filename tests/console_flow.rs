//! End-to-end console flows through the public API.
//!
//! Runs on paused tokio time with in-process stand-ins for the backend, so
//! nothing here touches the network.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tayka::api::{ControlAck, ControlApi};
use tayka::clock::MonotonicClock;
use tayka::config::{load_config, Config, ConsoleMode};
use tayka::error::{ApiError, StreamError};
use tayka::runtime::{
    spawn_orchestrator, spawn_orchestrator_with, OrchestratorDeps, RuntimeEvent,
    RuntimeEventStream,
};
use tayka::scenario::Scenario;
use tayka::stream::{Connection, Frame, Transport};
use tayka::types::{Module, Outcome};

fn write_temp_files(files: &[(&str, String)]) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!("tayka-console-flow-{}-{nanos}", std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir");
    for (name, body) in files {
        fs::write(dir.join(name), body).expect("write temp file");
    }
    dir
}

async fn next_event(events: &mut RuntimeEventStream) -> RuntimeEvent {
    tokio::time::timeout(Duration::from_secs(120), events.recv())
        .await
        .expect("runtime event timeout")
        .expect("runtime event stream closed")
        .event
}

async fn collect_until_closed(events: &mut RuntimeEventStream) -> Vec<RuntimeEvent> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(events).await;
        let done = matches!(&event, RuntimeEvent::RunChanged(run) if run.ended_at.is_some());
        seen.push(event);
        if done {
            return seen;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_file_drives_simulated_run() {
    let scenario = json!([{
        "scenarioId": "SCN-T",
        "scenarioName": "Liman Tatbikatı",
        "steps": [
            {"step": 1, "description": "Hedef tespit edildi"},
            {"step": 2, "description": "Roket angajmanı", "status": "yüksek"},
            {"step": 3, "description": "Hedef etkisiz"}
        ]
    }]);
    let dir = write_temp_files(&[("scenario.json", scenario.to_string())]);
    let scenario_path = dir.join("scenario.json");
    let toml = format!(
        "[console]\nmode = \"simulated\"\ncontext = \"Liman\"\n\n[simulation]\ntick_interval_ms = 500\napproval_request_delay_ms = 100\napproval_window_secs = 5\nscenario_file = {:?}\n",
        scenario_path.to_string_lossy()
    );
    let config_dir = write_temp_files(&[("tayka.toml", toml)]);
    let config_path = config_dir.join("tayka.toml");
    let config = load_config(Some(config_path.to_string_lossy().as_ref())).expect("load config");
    assert_eq!(config.simulation.tick_interval_ms, 500);

    let (console, mut events) = spawn_orchestrator(&config).expect("spawn");
    console.start(None).await.expect("start");
    loop {
        if let RuntimeEvent::ApprovalChanged(window) = next_event(&mut events).await {
            if window.requested && !window.consumed {
                break;
            }
        }
    }
    console.approve(Module::Albatur).await.expect("approve");
    let seen = collect_until_closed(&mut events).await;

    let outputs: Vec<String> = seen
        .iter()
        .filter_map(|event| match event {
            RuntimeEvent::Output(line) => Some(line.message.clone()),
            _ => None,
        })
        .collect();
    assert!(outputs
        .iter()
        .any(|line| line == "Scenario Liman Tatbikatı step 3: Hedef etkisiz"));
    assert!(outputs.iter().any(|line| line == "Simulation stopped: Liman Tatbikatı"));
    let Some(RuntimeEvent::RunChanged(run)) = seen.last() else {
        panic!("last event should close the run");
    };
    assert_eq!(run.outcome, Some(Outcome::Success));
    assert_eq!(run.context, "Liman");
    assert_eq!(run.approved_module, Some(Module::Albatur));

    let view = console.view();
    assert!(!view.run_active);
    assert_eq!(view.record.map(|record| record.source), Some("ALBATUR".to_string()));

    console.shutdown().await.expect("shutdown");
    let _ = fs::remove_dir_all(&dir);
    let _ = fs::remove_dir_all(&config_dir);
}

struct FeedTransport {
    frames: Mutex<Option<VecDeque<Frame>>>,
}

struct FeedConnection {
    frames: VecDeque<Frame>,
}

#[async_trait]
impl Transport for FeedTransport {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Connection>, StreamError> {
        match self.frames.lock().expect("feed lock").take() {
            Some(frames) => Ok(Box::new(FeedConnection { frames })),
            None => Err(StreamError::Connect("feed exhausted".into())),
        }
    }
}

#[async_trait]
impl Connection for FeedConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame, StreamError>> {
        match self.frames.pop_front() {
            Some(frame) => Some(Ok(frame)),
            // Stay open once the script is played.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {}
}

#[derive(Default)]
struct AckingApi {
    calls: Mutex<Vec<String>>,
}

impl AckingApi {
    fn record(&self, call: String) -> Result<ControlAck, ApiError> {
        self.calls.lock().expect("calls lock").push(call);
        Ok(ControlAck { body: json!("ok") })
    }
}

#[async_trait]
impl ControlApi for AckingApi {
    async fn start_run(&self, _seed: Option<tayka::types::Scalar>) -> Result<ControlAck, ApiError> {
        self.record("start".into())
    }

    async fn approve(&self, module: Module) -> Result<ControlAck, ApiError> {
        self.record(format!("approve:{}", module.wire_name()))
    }

    async fn abort(&self) -> Result<ControlAck, ApiError> {
        self.record("abort".into())
    }

    async fn health(&self) -> Result<ControlAck, ApiError> {
        Err(ApiError::Status {
            code: 502,
            message: "tunnel offline".into(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn backend_run_with_operator_abort() {
    let frames = vec![
        Frame::Text(json!({"event": {"type": "SIM_STARTED", "source": "radar"}}).to_string()),
        Frame::Text("TESPİT: Deniz Hedefi | Gemi | seviye=orta".to_string()),
        Frame::Text(
            json!({
                "type": "SIM_RECOMMENDATION",
                "payload": {"modules": [{"module": "BORAN", "successRate": 0.8}]}
            })
            .to_string(),
        ),
    ];
    let transport = Arc::new(FeedTransport {
        frames: Mutex::new(Some(frames.into())),
    });
    let api = Arc::new(AckingApi::default());
    let mut config = Config::default();
    config.console.mode = ConsoleMode::Backend;
    config.backend.ws_url = "ws://feed.test/ws".into();
    let deps = OrchestratorDeps {
        clock: Arc::new(MonotonicClock::new()),
        transport,
        api: api.clone(),
        scenario: Scenario::builtin(),
    };
    let (console, mut events) = spawn_orchestrator_with(&config, deps);

    let mut saw_status = false;
    let mut saw_recommendation = false;
    while !(saw_status && saw_recommendation) {
        match next_event(&mut events).await {
            RuntimeEvent::StatusPatch(patch) => {
                saw_status |= patch.threat.title.as_deref() == Some("Deniz Hedefi");
            }
            RuntimeEvent::Recommendation(_) => saw_recommendation = true,
            _ => {}
        }
    }
    assert!(console.view().run_active);

    console.health().await.expect("health");
    loop {
        if let RuntimeEvent::Warning(warning) = next_event(&mut events).await {
            assert!(warning.message.contains("tunnel offline"));
            break;
        }
    }

    console.end().await.expect("end");
    let seen = collect_until_closed(&mut events).await;
    let Some(RuntimeEvent::RunChanged(run)) = seen.last() else {
        panic!("last event should close the run");
    };
    assert_eq!(run.outcome, Some(Outcome::Failure));
    assert_eq!(run.fail_silent_reason.as_deref(), Some("Abort"));

    // The abort call completes after the run is already closed.
    loop {
        if let RuntimeEvent::Output(line) = next_event(&mut events).await {
            if line.message == "Abort sent" {
                break;
            }
        }
    }
    assert_eq!(api.calls.lock().expect("calls lock").clone(), vec!["abort".to_string()]);
}
