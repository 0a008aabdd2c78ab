//! JSON exporter for external graph visualizers.
//!
//! Each frame is a full copy of the graph after one tick, plus the events
//! (role changes, critic conversions) that tick produced.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use threatmesh_core::{Agent, Graph, GraphStats, Relationship, Role, TickReport};

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Tick that produced this frame
    pub tick: u64,

    /// Simulation time in seconds
    pub time_sec: f64,

    /// Threat score after the tick
    pub threat: f64,

    /// Counters for on-screen display
    pub stats: GraphStats,

    pub agents: Vec<AgentState>,
    pub relationships: Vec<EdgeState>,

    /// Events (role changes, conversions)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// State of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub id: String,
    pub role: Role,
    pub uncertainty: f64,
    pub aggressiveness: f64,
    pub vigilance: f64,
}

impl From<&Agent> for AgentState {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id().as_uuid().to_string(),
            role: agent.role(),
            uncertainty: agent.uncertainty(),
            aggressiveness: agent.aggressiveness(),
            vigilance: agent.vigilance(),
        }
    }
}

/// One relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeState {
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl From<&Relationship> for EdgeState {
    fn from(rel: &Relationship) -> Self {
        Self {
            source: rel.source().as_uuid().to_string(),
            target: rel.target().as_uuid().to_string(),
            weight: rel.weight(),
        }
    }
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimFrame {
    /// Captures the graph as it stands after `report`'s tick.
    pub fn capture(report: &TickReport, graph: &Graph, time_sec: f64) -> Self {
        let mut events: Vec<SimEvent> = report
            .role_changes
            .iter()
            .map(|(id, role)| SimEvent {
                message: format!("observer {} became {}", id, role),
                level: None,
            })
            .collect();
        events.extend(report.converted.iter().map(|id| SimEvent {
            message: format!("meta-critic converted {} to defender", id),
            level: Some("warn".to_string()),
        }));

        Self {
            tick: report.tick,
            time_sec,
            threat: report.threat,
            stats: GraphStats::from_graph(graph),
            agents: graph.agents().iter().map(AgentState::from).collect(),
            relationships: graph.relationships().iter().map(EdgeState::from).collect(),
            events,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_threat: Option<f64>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            final_threat: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, final_threat: Option<f64>) {
        self.passed = passed;
        self.final_threat = final_threat;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
