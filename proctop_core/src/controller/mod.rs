//! The monitor controller: a single tokio task that owns all mutable state.
//!
//! Callers hold a cheap [`Controller`] handle and talk to the task over an
//! mpsc channel. Collection passes run on the blocking pool and report back
//! to the task, so lifecycle commands are served while a pass is in flight.

pub mod state;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::{Config, OptionsUpdate, OutputFormat};
use crate::delta::PreviousSample;
use crate::error::{Error, Result};
use crate::output;
use crate::persist::{self, ReportLog};
use crate::provider::MetricsProvider;
use crate::render::render;
use crate::sampler::Sampler;
use crate::types::Report;

pub use state::{Counters, DetailedStatus, Lifecycle, Status, Transition};
use state::ControllerState;

const COMMAND_QUEUE: usize = 32;

enum Command {
    Start(Option<Config>, oneshot::Sender<Result<Transition>>),
    Pause(oneshot::Sender<Transition>),
    Stop(oneshot::Sender<Transition>),
    SetOptions(OptionsUpdate, oneshot::Sender<Result<Config>>),
    Status(oneshot::Sender<Status>),
    StatusDetailed(oneshot::Sender<DetailedStatus>),
    ActiveLog(oneshot::Sender<Option<ReportLog>>),
    Nudge,
}

enum Event {
    Fire(u64),
    // None when the pass panicked
    PassDone(Option<PassOutcome>),
}

struct PassOutcome {
    epoch: u64,
    report: Report,
    next: PreviousSample,
    dropped: usize,
    written: Result<Option<ReportLog>>,
}

/// One-shot timer backed by a sleeping task. Every arm/cancel bumps the
/// generation so a fire that raced an abort is recognised as stale.
#[derive(Default)]
struct Timer {
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl Timer {
    fn arm(&mut self, after: Duration, events: &mpsc::UnboundedSender<Event>) {
        self.cancel();
        let generation = self.generation;
        let events = events.clone();
        self.task = Some(tokio::spawn(async move {
            sleep(after).await;
            let _ = events.send(Event::Fire(generation));
        }));
    }

    fn cancel(&mut self) {
        if let Some(t) = self.task.take() {
            t.abort();
        }
        self.generation += 1;
    }

    fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && self.generation == generation
    }
}

/// Handle to a running controller task. Cloning shares the same task; the
/// task exits once every handle is dropped.
#[derive(Clone)]
pub struct Controller {
    tx: mpsc::Sender<Command>,
}

impl Controller {
    /// Spawn the controller task on the current tokio runtime, in `Idle`.
    pub fn spawn(provider: Arc<dyn MetricsProvider>) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let actor = Actor {
            state: ControllerState::default(),
            sampler: Sampler::new(provider),
            timer: Timer::default(),
            events: events_tx,
        };
        tokio::spawn(actor.run(rx, events_rx));
        Self { tx }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| Error::ControllerGone)?;
        rx.await.map_err(|_| Error::ControllerGone)
    }

    /// Begin sampling, optionally replacing the configuration first. The
    /// first pass runs after `first_interval`, later ones every `interval`.
    pub async fn start(&self, config: Option<Config>) -> Result<Transition> {
        self.request(|r| Command::Start(config, r)).await?
    }

    pub async fn pause(&self) -> Result<Transition> {
        self.request(Command::Pause).await
    }

    /// Back to `Idle` from any state; forgets the previous sample.
    pub async fn stop(&self) -> Result<Transition> {
        self.request(Command::Stop).await
    }

    /// Apply `update` and return the resulting config. On error nothing changes.
    pub async fn set_options(&self, update: OptionsUpdate) -> Result<Config> {
        self.request(|r| Command::SetOptions(update, r)).await?
    }

    pub async fn status(&self) -> Result<Status> {
        self.request(Command::Status).await
    }

    pub async fn status_detailed(&self) -> Result<DetailedStatus> {
        self.request(Command::StatusDetailed).await
    }

    /// Replay a report log. With no path, replays the structured log this
    /// controller has been appending to, or `None` if it never wrote one.
    pub async fn load(&self, path: Option<&Path>) -> Result<Option<Vec<Report>>> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match self.request(Command::ActiveLog).await? {
                Some(log) => log.path().to_path_buf(),
                None => return Ok(None),
            },
        };
        let shown = path.clone();
        tokio::task::spawn_blocking(move || persist::replay(&path))
            .await
            .map_err(|e| Error::InvalidFile {
                path: shown,
                reason: e.to_string(),
            })?
            .map(Some)
    }

    /// Ask for an immediate pass. Ignored unless running.
    pub async fn nudge(&self) -> Result<()> {
        self.tx
            .send(Command::Nudge)
            .await
            .map_err(|_| Error::ControllerGone)
    }
}

struct Actor {
    state: ControllerState,
    sampler: Sampler,
    timer: Timer,
    events: mpsc::UnboundedSender<Event>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                Some(ev) = events.recv() => match ev {
                    Event::Fire(generation) => self.on_fire(generation),
                    Event::PassDone(outcome) => self.on_pass_done(outcome),
                },
            }
        }
        self.timer.cancel();
        debug!("controller handles dropped, shutting down");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start(config, reply) => {
                let _ = reply.send(self.start(config));
            }
            Command::Pause(reply) => {
                let _ = reply.send(self.pause());
            }
            Command::Stop(reply) => {
                let _ = reply.send(self.stop());
            }
            Command::SetOptions(update, reply) => {
                let res = self.state.config.apply(&update).map(|next| {
                    self.state.config = next.clone();
                    next
                });
                if let Err(e) = &res {
                    debug!(error = %e, "rejected option update");
                }
                let _ = reply.send(res);
            }
            Command::Status(reply) => {
                let _ = reply.send(self.state.status());
            }
            Command::StatusDetailed(reply) => {
                let _ = reply.send(DetailedStatus {
                    status: self.state.status(),
                    counters: self.state.counters(),
                });
            }
            Command::ActiveLog(reply) => {
                let _ = reply.send(self.state.active_log.clone());
            }
            Command::Nudge => {
                if self.state.lifecycle == Lifecycle::Running {
                    self.on_tick();
                } else {
                    debug!(state = ?self.state.lifecycle, "ignoring tick while not running");
                }
            }
        }
    }

    fn start(&mut self, config: Option<Config>) -> Result<Transition> {
        if self.state.lifecycle == Lifecycle::Running {
            return Ok(Transition::AlreadyActive);
        }
        if let Some(config) = config {
            config.validate()?;
            self.state.config = config;
        }
        self.state.lifecycle = Lifecycle::Running;
        self.timer.arm(self.state.config.first_interval(), &self.events);
        info!(
            interval_ms = self.state.config.interval_ms,
            first_ms = self.state.config.first_interval().as_millis() as u64,
            "monitor started"
        );
        Ok(Transition::Started)
    }

    fn pause(&mut self) -> Transition {
        if self.state.lifecycle != Lifecycle::Running {
            return Transition::AlreadyHalted;
        }
        self.timer.cancel();
        self.state.lifecycle = Lifecycle::Paused;
        info!("monitor paused");
        Transition::Paused
    }

    fn stop(&mut self) -> Transition {
        self.timer.cancel();
        self.state.lifecycle = Lifecycle::Idle;
        self.state.previous = PreviousSample::default();
        self.state.epoch += 1;
        info!("monitor stopped");
        Transition::Stopped
    }

    fn on_fire(&mut self, generation: u64) {
        if !self.timer.is_current(generation) {
            return;
        }
        self.timer.task = None;
        if self.state.lifecycle != Lifecycle::Running {
            return;
        }
        self.timer.arm(self.state.config.interval(), &self.events);
        self.on_tick();
    }

    fn on_tick(&mut self) {
        self.state.ticks += 1;
        if self.state.in_flight {
            self.state.skipped_ticks += 1;
            debug!("previous pass still running, skipping tick");
            return;
        }
        self.state.in_flight = true;

        let sampler = self.sampler.clone();
        let previous = self.state.previous.clone();
        let config = self.state.config.clone();
        let epoch = self.state.epoch;
        let events = self.events.clone();
        tokio::spawn(async move {
            let pass = tokio::task::spawn_blocking(move || run_pass(&sampler, &previous, &config, epoch));
            let outcome = match pass.await {
                Ok(o) => Some(o),
                Err(e) => {
                    error!(error = %e, "collection pass failed");
                    None
                }
            };
            let _ = events.send(Event::PassDone(outcome));
        });
    }

    fn on_pass_done(&mut self, outcome: Option<PassOutcome>) {
        self.state.in_flight = false;
        let Some(pass) = outcome else { return };

        self.state.passes += 1;
        self.state.dropped_processes += pass.dropped as u64;
        match pass.written {
            Ok(Some(log)) => self.state.active_log = Some(log),
            Ok(None) => {}
            Err(e) => {
                self.state.write_failures += 1;
                error!(error = %e, "failed to write report");
            }
        }
        if pass.epoch == self.state.epoch {
            self.state.previous = pass.next;
        } else {
            debug!("pass finished after stop, cache stays cleared");
        }

        let processes = pass.report.samples.len();
        let reductions = pass.report.system.reductions_delta;
        if self.state.config.debug {
            info!(pass = self.state.passes, processes, dropped = pass.dropped, reductions, "pass complete");
        } else {
            debug!(pass = self.state.passes, processes, dropped = pass.dropped, reductions, "pass complete");
        }
        self.state.last_report = Some(pass.report);
    }
}

fn run_pass(sampler: &Sampler, previous: &PreviousSample, config: &Config, epoch: u64) -> PassOutcome {
    let collection = sampler.collect();
    let dropped = collection.dropped;
    let (report, next) = Report::build(collection, previous);
    let written = dispatch(&report, config);
    PassOutcome {
        epoch,
        report,
        next,
        dropped,
        written,
    }
}

/// Send the report where `config` says. Returns the log when it went to a structured log.
fn dispatch(report: &Report, config: &Config) -> Result<Option<ReportLog>> {
    match (&config.format, &config.file) {
        (OutputFormat::Structured, Some(path)) => {
            let log = ReportLog::new(path.clone());
            log.append(report)?;
            Ok(Some(log))
        }
        _ => {
            output::write_text(&config.target(), &render(report, &config.render_options()))?;
            Ok(None)
        }
    }
}
