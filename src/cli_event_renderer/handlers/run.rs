//! Run, approval-window and event-record handlers.

use tayka::approval::ApprovalWindow;
use tayka::run::RunSummary;
use tayka::runtime::EventRecord;

use crate::cli_event_renderer::RuntimeEventRenderContext;

pub(in crate::cli_event_renderer) fn handle_run_changed(
    ctx: &mut RuntimeEventRenderContext<'_>,
    run: &RunSummary,
) {
    if run.ended_at.is_none() {
        if *ctx.announced_run != Some(run.id) {
            *ctx.announced_run = Some(run.id);
            ctx.renderer
                .activity(&format!("Run #{} started ({})", run.id, run.context));
        }
        return;
    }

    let outcome = run
        .outcome
        .map(|outcome| outcome.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    ctx.renderer
        .section(&format!("Run #{} finished: {outcome}", run.id));
    ctx.renderer
        .field("duration", &format!("{}s", run.duration_sec));
    if let Some(module) = run.approved_module {
        ctx.renderer.field("module", module.as_str());
    }
    if let Some(reason) = &run.fail_silent_reason {
        ctx.renderer.field("reason", reason);
    }
    if let Some(ammo) = &run.ammo {
        ctx.renderer.field("ammo", &ammo.to_string());
    }
    if let Some(energy) = &run.energy {
        ctx.renderer.field("energy", &energy.to_string());
    }
}

pub(in crate::cli_event_renderer) fn handle_approval(
    ctx: &RuntimeEventRenderContext<'_>,
    window: &ApprovalWindow,
) {
    if !window.requested || window.consumed || window.expired {
        return;
    }
    if let Some(deadline) = window.deadline {
        ctx.renderer.approval(&format!(
            "decision window open until {} UTC",
            deadline.format("%H:%M:%S")
        ));
    }
}

pub(in crate::cli_event_renderer) fn handle_record(
    ctx: &RuntimeEventRenderContext<'_>,
    record: &EventRecord,
) {
    if !ctx.verbose {
        return;
    }
    ctx.renderer.activity(&format!(
        "[record #{}] {} {} {} ({})",
        record.id,
        record.kind,
        record.level,
        record.status.as_str(),
        record.source
    ));
}
