//! CLI runtime-event renderer adapter.
//!
//! This module translates typed orchestrator events into terminal rendering
//! updates, keeping the mapping out of `main.rs`.

mod handlers;

use tayka::render::RenderSink;
use tayka::runtime::{RuntimeEvent, RuntimeEventEnvelope};

pub(crate) use handlers::status::render_view;

/// Render-time state mirrored from the interactive loop.
pub(crate) struct RuntimeEventRenderContext<'a> {
    pub renderer: &'a dyn RenderSink,
    /// Show log lines that were not also sent to the operator output.
    pub verbose: bool,
    /// Last run announced as started.
    pub announced_run: &'a mut Option<u64>,
}

/// Consume queued runtime events and render them.
pub(crate) fn process_runtime_events(
    events: &mut Vec<RuntimeEventEnvelope>,
    ctx: &mut RuntimeEventRenderContext<'_>,
) {
    for envelope in events.drain(..) {
        match envelope.event {
            RuntimeEvent::Lifecycle(event) => handlers::status::handle_lifecycle(ctx, event),
            RuntimeEvent::Output(line) => ctx.renderer.output(&line.message),
            RuntimeEvent::LogAppended(event) => {
                if ctx.verbose {
                    ctx.renderer.activity(&event.line.message);
                }
            }
            RuntimeEvent::StatusPatch(patch) => handlers::status::handle_status_patch(ctx, &patch),
            RuntimeEvent::ConnectionChanged(state) => {
                handlers::status::handle_connection(ctx, state)
            }
            RuntimeEvent::Recommendation(rec) => {
                handlers::status::handle_recommendation(ctx, &rec)
            }
            RuntimeEvent::RunChanged(run) => handlers::run::handle_run_changed(ctx, &run),
            RuntimeEvent::ApprovalChanged(window) => handlers::run::handle_approval(ctx, &window),
            RuntimeEvent::EventRecord(record) => handlers::run::handle_record(ctx, &record),
            RuntimeEvent::Rejected(event) => handlers::warning::handle_rejected(ctx, event),
            RuntimeEvent::Warning(event) => handlers::warning::handle_warning(ctx, event),
            RuntimeEvent::Error(event) => handlers::warning::handle_error(ctx, event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::sync::{Arc, Mutex};
    use tayka::approval::ApprovalWindow;
    use tayka::run::{LogLine, RunSummary};
    use tayka::runtime::{
        ConnectionState, Operation, RejectedEvent, WarningEvent,
    };
    use tayka::telemetry::StatusPatch;
    use tayka::types::{Module, Outcome};

    #[derive(Clone, Default)]
    struct MockRenderer {
        entries: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl MockRenderer {
        fn record(&self, kind: &str, message: &str) {
            self.entries
                .lock()
                .expect("mock renderer lock")
                .push((kind.to_string(), message.to_string()));
        }

        fn saw(&self, kind: &str, needle: &str) -> bool {
            self.entries
                .lock()
                .expect("mock renderer lock")
                .iter()
                .any(|(k, msg)| k == kind && msg.contains(needle))
        }

        fn count(&self, kind: &str) -> usize {
            self.entries
                .lock()
                .expect("mock renderer lock")
                .iter()
                .filter(|(k, _)| k == kind)
                .count()
        }
    }

    impl RenderSink for MockRenderer {
        fn prompt(&self) {}

        fn output(&self, line: &str) {
            self.record("output", line);
        }

        fn section(&self, title: &str) {
            self.record("section", title);
        }

        fn field(&self, key: &str, value: &str) {
            self.record("field", &format!("{key}:{value}"));
        }

        fn activity(&self, text: &str) {
            self.record("activity", text);
        }

        fn approval(&self, text: &str) {
            self.record("approval", text);
        }

        fn warn(&self, msg: &str) {
            self.record("warn", msg);
        }

        fn error(&self, msg: &str) {
            self.record("error", msg);
        }
    }

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts)
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn envelope(seq: u64, event: RuntimeEvent) -> RuntimeEventEnvelope {
        RuntimeEventEnvelope {
            seq,
            ts_unix_ms: seq,
            event,
        }
    }

    fn summary(ended: bool) -> RunSummary {
        RunSummary {
            id: 3,
            context: "Simulation".into(),
            seed: None,
            started_at: at("2024-05-01T10:00:00Z"),
            ended_at: ended.then(|| at("2024-05-01T10:00:12Z")),
            outcome: ended.then_some(Outcome::Success),
            fail_silent_reason: None,
            approved_module: ended.then_some(Module::Boran),
            ammo: None,
            energy: None,
            duration_sec: if ended { 12 } else { 0 },
            log_count: 4,
        }
    }

    #[test]
    fn run_start_is_announced_once_and_close_is_summarized() {
        let renderer = MockRenderer::default();
        let mut announced = None;
        let mut ctx = RuntimeEventRenderContext {
            renderer: &renderer,
            verbose: false,
            announced_run: &mut announced,
        };
        let mut events = vec![
            envelope(1, RuntimeEvent::RunChanged(summary(false))),
            envelope(2, RuntimeEvent::RunChanged(summary(false))),
            envelope(3, RuntimeEvent::RunChanged(summary(true))),
        ];
        process_runtime_events(&mut events, &mut ctx);

        assert_eq!(renderer.count("activity"), 1);
        assert!(renderer.saw("activity", "Run #3 started"));
        assert!(renderer.saw("section", "Run #3 finished: success"));
        assert!(renderer.saw("field", "duration:12s"));
        assert!(renderer.saw("field", "module:BORAN"));
        assert!(events.is_empty());
    }

    #[test]
    fn log_lines_only_render_when_verbose() {
        let renderer = MockRenderer::default();
        let mut announced = None;
        let line = LogLine::new(at("2024-05-01T10:00:00Z"), "Stream connected");
        let log = RuntimeEvent::LogAppended(tayka::runtime::LogEvent {
            run_id: None,
            line: line.clone(),
        });

        let mut ctx = RuntimeEventRenderContext {
            renderer: &renderer,
            verbose: false,
            announced_run: &mut announced,
        };
        process_runtime_events(&mut vec![envelope(1, log.clone())], &mut ctx);
        assert_eq!(renderer.count("activity"), 0);

        ctx.verbose = true;
        process_runtime_events(
            &mut vec![
                envelope(2, log),
                envelope(3, RuntimeEvent::Output(line)),
            ],
            &mut ctx,
        );
        assert!(renderer.saw("activity", "Stream connected"));
        assert!(renderer.saw("output", "Stream connected"));
    }

    #[test]
    fn warnings_rejections_and_connection_render() {
        let renderer = MockRenderer::default();
        let mut announced = None;
        let mut ctx = RuntimeEventRenderContext {
            renderer: &renderer,
            verbose: false,
            announced_run: &mut announced,
        };
        let mut patch = StatusPatch::default();
        patch.classification.level = Some("YÜKSEK".into());
        let mut events = vec![
            envelope(
                1,
                RuntimeEvent::Rejected(RejectedEvent {
                    operation: Operation::Approve,
                    reason: "no approval requested".into(),
                }),
            ),
            envelope(
                2,
                RuntimeEvent::Warning(WarningEvent {
                    message: "stream error: refused".into(),
                }),
            ),
            envelope(
                3,
                RuntimeEvent::ConnectionChanged(ConnectionState::Reconnecting {
                    attempt: 2,
                    delay_ms: 2000,
                }),
            ),
            envelope(4, RuntimeEvent::StatusPatch(patch)),
            envelope(
                5,
                RuntimeEvent::ApprovalChanged(ApprovalWindow {
                    requested: true,
                    consumed: false,
                    expired: false,
                    deadline: Some(at("2024-05-01T10:00:16Z")),
                }),
            ),
        ];
        process_runtime_events(&mut events, &mut ctx);

        assert!(renderer.saw("warn", "approve rejected: no approval requested"));
        assert!(renderer.saw("warn", "stream error: refused"));
        assert!(renderer.saw("activity", "reconnecting in 2s (attempt 2)"));
        assert!(renderer.saw("field", "threat level:YÜKSEK"));
        assert!(renderer.saw("approval", "10:00:16"));
    }
}
