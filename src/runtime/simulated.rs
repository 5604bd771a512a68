//! Scripted driver: advances a scenario on a fixed tick, no backend.

use async_trait::async_trait;
use std::time::Duration;

use super::driver::{DriverInput, RunDriver};
use super::schema::{EventRecord, RecordStatus};
use super::state::{ConsoleState, RECORD_KIND};
use crate::config::SimulationConfig;
use crate::scenario::{level_for_step, Scenario, StepLevel};
use crate::timers::{self, TimerHandle};
use crate::types::{Module, Outcome, Scalar};

pub(crate) struct SimulatedDriver {
    scenario: Scenario,
    tick_interval: Duration,
    approval_delay: Duration,
    ticker: Option<TimerHandle>,
    run_id: Option<u64>,
    next_step: usize,
}

impl SimulatedDriver {
    pub(crate) fn new(scenario: Scenario, config: &SimulationConfig) -> Self {
        Self {
            scenario,
            tick_interval: config.tick_interval(),
            approval_delay: config.approval_request_delay(),
            ticker: None,
            run_id: None,
            next_step: 0,
        }
    }

    fn stop(&mut self, state: &mut ConsoleState) {
        self.ticker = None;
        self.run_id = None;
        state.log_and_output(format!("Simulation stopped: {}", self.scenario.name));
    }

    fn tick(&mut self, state: &mut ConsoleState, run_id: u64) {
        if self.run_id != Some(run_id) || state.active_id() != Some(run_id) {
            return;
        }
        let Some(step) = self.scenario.steps.get(self.next_step).cloned() else {
            return;
        };
        self.next_step += 1;
        let is_last = self.next_step >= self.scenario.steps.len();
        tracing::debug!(run_id, step = step.step, is_last, "scenario tick");

        if let Some(mut record) = state.record().cloned() {
            record.status = if is_last {
                RecordStatus::Resolved
            } else {
                RecordStatus::InProgress
            };
            record.level = level_for_step(&step).as_str().to_string();
            state.set_record(record);
        }
        state.log_and_output(format!(
            "Scenario {} step {}: {}",
            self.scenario.name, step.step, step.description
        ));

        if is_last {
            self.stop(state);
            state.finish_run(Outcome::Success, None);
        }
    }
}

#[async_trait]
impl RunDriver for SimulatedDriver {
    fn on_start(&mut self, state: &mut ConsoleState, run_id: u64, _seed: Option<Scalar>) {
        self.run_id = Some(run_id);
        self.next_step = 0;
        state.log_and_output(format!("Simulation started: {}", self.scenario.name));

        let record = state.active_run().map(|run| EventRecord {
            id: run.id,
            time: run.started_at,
            kind: RECORD_KIND.to_string(),
            level: StepLevel::Medium.as_str().to_string(),
            status: RecordStatus::Detected,
            source: format!("scenario:{}", self.scenario.id),
        });
        if let Some(record) = record {
            state.set_record(record);
        }

        state.schedule_approval_request(self.approval_delay);
        // First step runs immediately, then one per interval.
        self.ticker = Some(timers::every(
            self.tick_interval,
            state.inputs.clone(),
            DriverInput::Tick { run_id },
        ));
    }

    fn on_approve(&mut self, state: &mut ConsoleState, module: Module) {
        state.log_and_output(format!("Approve sent (simulated): module={module}"));
    }

    fn on_abort(&mut self, state: &mut ConsoleState, _run_id: u64) {
        self.stop(state);
    }

    fn on_health(&mut self, state: &mut ConsoleState) {
        state.log_and_output("Health OK: simulated");
    }

    fn on_input(&mut self, state: &mut ConsoleState, input: DriverInput) {
        match input {
            DriverInput::Tick { run_id } => self.tick(state, run_id),
            other => tracing::debug!(input = ?other, "simulated driver ignores input"),
        }
    }

    async fn teardown(&mut self, _state: &mut ConsoleState) {
        self.ticker = None;
        self.run_id = None;
    }
}
