//! Warning, error and rejection handlers.

use tayka::runtime::{ErrorEvent, RejectedEvent, WarningEvent};

use crate::cli_event_renderer::RuntimeEventRenderContext;

pub(in crate::cli_event_renderer) fn handle_warning(
    ctx: &RuntimeEventRenderContext<'_>,
    event: WarningEvent,
) {
    ctx.renderer.warn(&event.message);
}

pub(in crate::cli_event_renderer) fn handle_error(
    ctx: &RuntimeEventRenderContext<'_>,
    event: ErrorEvent,
) {
    ctx.renderer.error(&event.message);
}

pub(in crate::cli_event_renderer) fn handle_rejected(
    ctx: &RuntimeEventRenderContext<'_>,
    event: RejectedEvent,
) {
    ctx.renderer
        .warn(&format!("{} rejected: {}", event.operation, event.reason));
}
