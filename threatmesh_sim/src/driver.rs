//! Async driver - owns a [`Scheduler`] on its own task and paces it with an
//! [`EngineContext`] clock.
//!
//! Every mutation goes through a command channel, so graph edits and
//! automatic ticks are serialized on one task and never interleave with a
//! tick in flight:
//!
//! ```text
//!  SimulationHandle ──mpsc<Command>──► SimulationDriver ──► Scheduler
//!        ▲                                  │
//!        └────────── broadcast<SimFrame> ◄──┘ (one frame per tick)
//! ```

use crate::exporter::SimFrame;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use threatmesh_core::{
    Agent, AgentId, EngineError, Graph, GraphStats, Relationship, Role, Scheduler, SchedulerState,
    TickReport,
};
use threatmesh_env::EngineContext;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 32;
const FRAME_BUFFER: usize = 64;

/// Errors returned through a [`SimulationHandle`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Simulation driver is no longer running")]
    Closed,
}

/// Point-in-time copy of the graph and pacing state.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub tick: u64,
    pub state: SchedulerState,
    pub threat: f64,
    pub stats: GraphStats,
    pub agents: Vec<Agent>,
    pub relationships: Vec<Relationship>,
}

impl GraphSnapshot {
    fn of(scheduler: &Scheduler) -> Self {
        Self {
            tick: scheduler.tick_count(),
            state: scheduler.state(),
            threat: scheduler.current_threat(),
            stats: scheduler.stats(),
            agents: scheduler.agents().to_vec(),
            relationships: scheduler.relationships().to_vec(),
        }
    }
}

enum Command {
    Step(oneshot::Sender<TickReport>),
    Run(u64, oneshot::Sender<Vec<TickReport>>),
    Start(Duration, oneshot::Sender<Result<(), EngineError>>),
    Pause(oneshot::Sender<bool>),
    Resume(oneshot::Sender<bool>),
    Stop(oneshot::Sender<()>),
    AddAgent {
        role: Role,
        uncertainty: Option<f64>,
        reply: oneshot::Sender<Result<Agent, EngineError>>,
    },
    AddRelationship {
        source: AgentId,
        target: AgentId,
        reply: oneshot::Sender<Result<Relationship, EngineError>>,
    },
    RemoveAgent {
        id: AgentId,
        reply: oneshot::Sender<Result<Agent, EngineError>>,
    },
    Probe {
        id: AgentId,
        reply: oneshot::Sender<Result<TickReport, EngineError>>,
    },
    Snapshot(oneshot::Sender<GraphSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// The task that owns the scheduler.
pub struct SimulationDriver<C: EngineContext> {
    ctx: Arc<C>,
    scheduler: Scheduler,
    commands: mpsc::Receiver<Command>,
}

impl<C: EngineContext> SimulationDriver<C> {
    /// Moves `scheduler` onto a background task spawned through `ctx` and
    /// returns a handle to it.
    pub fn spawn(ctx: Arc<C>, mut scheduler: Scheduler) -> SimulationHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (frame_tx, _) = broadcast::channel(FRAME_BUFFER);

        let frames = frame_tx.clone();
        let clock = Arc::clone(&ctx);
        scheduler.subscribe(move |report: &TickReport, graph: &Graph| {
            if frames.receiver_count() > 0 {
                let frame = SimFrame::capture(report, graph, clock.now().as_secs_f64());
                // Lagging receivers drop frames; nobody listening is fine too
                let _ = frames.send(frame);
            }
        });

        let driver = Self {
            ctx: Arc::clone(&ctx),
            scheduler,
            commands: command_rx,
        };
        ctx.spawn("threatmesh-driver", driver.run());

        SimulationHandle {
            commands: command_tx,
            frames: frame_tx,
        }
    }

    async fn run(mut self) {
        info!(seed = self.ctx.seed(), "simulation driver started");

        // Elapsed clock time is fed to the scheduler on every pass, so a
        // command that wins the select only shortens the next wait
        let mut last = self.ctx.now();
        let mut was_running = false;

        loop {
            let now = self.ctx.now();
            if was_running {
                let fired = self.scheduler.advance(now.saturating_sub(last));
                if fired > 0 {
                    debug!(fired, "pacer fired");
                }
            }
            last = now;

            let running = self.scheduler.state() == SchedulerState::Running;
            was_running = running;
            let wait = self.scheduler.until_next_tick();

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => {
                        self.handle(command);
                        // Time spent idle or paused never counts toward a tick
                        was_running &= self.scheduler.state() == SchedulerState::Running;
                    }
                    None => break,
                },

                _ = self.ctx.sleep(wait), if running => {}
            }
        }

        self.scheduler.stop();
        info!(ticks = self.scheduler.tick_count(), "simulation driver stopped");
    }

    fn handle(&mut self, command: Command) {
        // A dropped reply receiver just means the caller stopped waiting
        match command {
            Command::Step(reply) => {
                let _ = reply.send(self.scheduler.step());
            }
            Command::Run(n, reply) => {
                let _ = reply.send(self.scheduler.run(n));
            }
            Command::Start(interval, reply) => {
                let _ = reply.send(self.scheduler.start(interval));
            }
            Command::Pause(reply) => {
                let _ = reply.send(self.scheduler.pause());
            }
            Command::Resume(reply) => {
                let _ = reply.send(self.scheduler.resume());
            }
            Command::Stop(reply) => {
                self.scheduler.stop();
                let _ = reply.send(());
            }
            Command::AddAgent {
                role,
                uncertainty,
                reply,
            } => {
                let _ = reply.send(self.scheduler.add_agent(role, uncertainty));
            }
            Command::AddRelationship {
                source,
                target,
                reply,
            } => {
                let _ = reply.send(self.scheduler.add_relationship(source, target));
            }
            Command::RemoveAgent { id, reply } => {
                let _ = reply.send(self.scheduler.remove_agent(id));
            }
            Command::Probe { id, reply } => {
                let _ = reply.send(self.scheduler.probe(id));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(GraphSnapshot::of(&self.scheduler));
            }
            Command::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }
}

/// Cloneable client for a running [`SimulationDriver`].
#[derive(Clone)]
pub struct SimulationHandle {
    commands: mpsc::Sender<Command>,
    frames: broadcast::Sender<SimFrame>,
}

impl SimulationHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DriverError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| DriverError::Closed)?;
        response.await.map_err(|_| DriverError::Closed)
    }

    /// Receives one frame per completed tick from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SimFrame> {
        self.frames.subscribe()
    }

    pub async fn step(&self) -> Result<TickReport, DriverError> {
        self.request(Command::Step).await
    }

    pub async fn run(&self, n: u64) -> Result<Vec<TickReport>, DriverError> {
        self.request(|reply| Command::Run(n, reply)).await
    }

    pub async fn start(&self, interval: Duration) -> Result<(), DriverError> {
        Ok(self.request(|reply| Command::Start(interval, reply)).await??)
    }

    pub async fn pause(&self) -> Result<bool, DriverError> {
        self.request(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<bool, DriverError> {
        self.request(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<(), DriverError> {
        self.request(Command::Stop).await
    }

    pub async fn add_agent(
        &self,
        role: Role,
        uncertainty: Option<f64>,
    ) -> Result<Agent, DriverError> {
        Ok(self
            .request(|reply| Command::AddAgent {
                role,
                uncertainty,
                reply,
            })
            .await??)
    }

    pub async fn add_relationship(
        &self,
        source: AgentId,
        target: AgentId,
    ) -> Result<Relationship, DriverError> {
        Ok(self
            .request(|reply| Command::AddRelationship {
                source,
                target,
                reply,
            })
            .await??)
    }

    pub async fn remove_agent(&self, id: AgentId) -> Result<Agent, DriverError> {
        Ok(self
            .request(|reply| Command::RemoveAgent { id, reply })
            .await??)
    }

    pub async fn probe(&self, id: AgentId) -> Result<TickReport, DriverError> {
        Ok(self.request(|reply| Command::Probe { id, reply }).await??)
    }

    pub async fn snapshot(&self) -> Result<GraphSnapshot, DriverError> {
        self.request(Command::Snapshot).await
    }

    /// Stops the driver task. Later requests fail with [`DriverError::Closed`].
    pub async fn shutdown(&self) -> Result<(), DriverError> {
        self.request(Command::Shutdown).await
    }
}
