//! Runtime event-family handlers used by the CLI reducer.

pub(super) mod run;
pub(super) mod status;
pub(super) mod warning;
