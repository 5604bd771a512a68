//! Lifecycle, connection, live-status and recommendation handlers.

use tayka::render::RenderSink;
use tayka::runtime::{ConnectionState, ConsoleView, LifecycleEvent};
use tayka::telemetry::{Recommendation, StatusPatch};

use crate::cli_event_renderer::RuntimeEventRenderContext;

pub(in crate::cli_event_renderer) fn handle_lifecycle(
    ctx: &RuntimeEventRenderContext<'_>,
    event: LifecycleEvent,
) {
    match event {
        LifecycleEvent::Started { mode } => {
            ctx.renderer.activity(&format!("console ready ({mode} mode)"))
        }
        LifecycleEvent::Stopped => ctx.renderer.activity("console stopped"),
    }
}

pub(in crate::cli_event_renderer) fn handle_connection(
    ctx: &RuntimeEventRenderContext<'_>,
    state: ConnectionState,
) {
    let text = match state {
        ConnectionState::Reconnecting { attempt, delay_ms } => format!(
            "stream: reconnecting in {}s (attempt {attempt})",
            (delay_ms as f64 / 1000.0).round() as u64
        ),
        other => format!("stream: {}", other.label()),
    };
    ctx.renderer.activity(&text);
}

pub(in crate::cli_event_renderer) fn handle_status_patch(
    ctx: &RuntimeEventRenderContext<'_>,
    patch: &StatusPatch,
) {
    render_status_fields(ctx.renderer, patch);
}

pub(in crate::cli_event_renderer) fn handle_recommendation(
    ctx: &RuntimeEventRenderContext<'_>,
    recommendation: &Recommendation,
) {
    render_recommendation(ctx.renderer, recommendation);
}

/// Render the full snapshot for the `status` command.
pub(crate) fn render_view(renderer: &dyn RenderSink, view: &ConsoleView) {
    renderer.section(&format!("console ({} mode)", view.mode));
    renderer.field("stream", view.connection.label());
    match &view.run {
        Some(run) => {
            let state = if view.run_active {
                "active".to_string()
            } else {
                run.outcome
                    .map(|outcome| outcome.to_string())
                    .unwrap_or_else(|| "closed".to_string())
            };
            renderer.field("run", &format!("#{} {state}", run.id));
            if let Some(module) = run.approved_module {
                renderer.field("module", module.as_str());
            }
        }
        None => renderer.field("run", "none"),
    }
    let approval = if view.fail_silent {
        "expired (fail-silent)"
    } else if view.approval_permitted {
        "awaiting decision"
    } else if view.approval.consumed {
        "consumed"
    } else {
        "idle"
    };
    renderer.field("approval", approval);
    if let Some(record) = &view.record {
        renderer.field(
            "record",
            &format!("{} {} ({})", record.level, record.status.as_str(), record.source),
        );
    }
    render_status_fields(renderer, &view.status);
    if let Some(recommendation) = &view.recommendation {
        render_recommendation(renderer, recommendation);
    }
}

fn render_status_fields(renderer: &dyn RenderSink, status: &StatusPatch) {
    let rows = [
        ("threat", status.threat.title.as_ref()),
        ("threat tag", status.threat.tag.as_ref()),
        ("threat level", status.classification.level.as_ref()),
        ("ayaz", status.trace.ayaz.as_ref()),
        ("environment", status.environment.status.as_ref()),
        ("wind", status.environment.wind.as_ref()),
        ("visibility", status.environment.visibility.as_ref()),
        ("primary", status.recommendation.primary.as_ref()),
        ("alternative", status.recommendation.alt.as_ref()),
    ];
    for (key, value) in rows {
        if let Some(value) = value {
            renderer.field(key, value);
        }
    }
    for (module, text) in &status.resource {
        renderer.field(module.as_str(), text);
    }
}

fn render_recommendation(renderer: &dyn RenderSink, recommendation: &Recommendation) {
    renderer.section("recommendation");
    for (module, metrics) in &recommendation.metrics_by_module {
        let parts = [
            ("success", metrics.success.as_deref()),
            ("duration", metrics.duration.as_deref()),
            ("cost", metrics.cost.as_deref()),
            ("status", metrics.status.as_deref()),
        ];
        let summary = parts
            .iter()
            .filter_map(|(key, value)| value.map(|value| format!("{key}={value}")))
            .collect::<Vec<_>>()
            .join(" ");
        renderer.field(module, if summary.is_empty() { "-" } else { &summary });
    }
}
