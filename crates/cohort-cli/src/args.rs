//! Command-line argument definitions.
//!
//! Argument structs carry the clap derives and convert into the core
//! parameter types with `From`, so the core crate stays free of clap.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use cohort_core::params::{
    ArchiveSession, AssignAgent, CheckGate, CreateSession, ExportSession, RecordOutput,
    SetTaskStatus,
};

/// Plan quality gate and multi-agent session coordinator
///
/// Validates structured implementation plans, runs sessions in which several
/// agents execute a plan phase by phase, and synthesises the results. Use
/// `serve` to expose the same operations to AI assistants over MCP.
#[derive(Parser)]
#[command(version, about, name = "cohort")]
pub struct Args {
    /// Path to the SQLite database file. Defaults to
    /// $XDG_DATA_HOME/cohort/cohort.db
    #[arg(long, global = true)]
    pub database_file: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate, store and refine plans
    #[command(alias = "p")]
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Create and drive multi-agent sessions
    #[command(alias = "s")]
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Report task progress as an assigned agent
    #[command(alias = "t")]
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Start the MCP server on stdio
    Serve,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Score a plan document without storing it
    #[command(alias = "v")]
    Validate(ValidateArgs),
    /// Validate a plan document and store it
    #[command(alias = "i")]
    Import(PlanFileArgs),
    /// Show a stored plan with its last score
    #[command(alias = "s")]
    Show(WorkorderArgs),
    /// List stored plans
    #[command(alias = "l")]
    List,
    /// Run the automatic refinement loop on a stored plan
    #[command(alias = "r")]
    Refine(WorkorderArgs),
}

#[derive(ClapArgs)]
pub struct ValidateArgs {
    /// Path to the plan JSON document
    pub file: PathBuf,
    /// Minimum length of a section body before it is flagged as thin
    #[arg(long)]
    pub min_section_length: Option<usize>,
}

#[derive(ClapArgs)]
pub struct PlanFileArgs {
    /// Path to the plan JSON document
    pub file: PathBuf,
}

#[derive(ClapArgs)]
pub struct WorkorderArgs {
    /// Work-order id, e.g. WO-AUTH-001
    pub workorder_id: String,
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Create a session for a plan that passed validation
    #[command(alias = "c")]
    Create(CreateSessionArgs),
    /// List sessions
    #[command(alias = "l")]
    List(ListSessionsArgs),
    /// Show a session roster and its agents' records
    #[command(alias = "s")]
    Show(SessionArgs),
    /// Assign an agent to a phase
    #[command(alias = "a")]
    Assign(AssignArgs),
    /// Run the pre-flight conflict audit
    Audit(SessionArgs),
    /// Lock the plan and start execution
    Start(SessionArgs),
    /// Check whether a phase may hand over
    #[command(alias = "g")]
    Gate(GateArgs),
    /// Close the current phase and authorise the next
    Advance(SessionArgs),
    /// Build the consolidated report of a completed session
    Synthesize(SessionArgs),
    /// Archive a completed session
    Archive(ArchiveArgs),
    /// Write the session records as JSON files
    Export(ExportArgs),
}

#[derive(ClapArgs)]
pub struct SessionArgs {
    /// Session identifier
    pub session_id: String,
}

#[derive(ClapArgs)]
pub struct CreateSessionArgs {
    /// Work-order id of a stored, passing plan
    pub workorder_id: String,
    /// Session id to use instead of a generated one
    #[arg(long)]
    pub id: Option<String>,
}

impl From<CreateSessionArgs> for CreateSession {
    fn from(val: CreateSessionArgs) -> Self {
        CreateSession {
            workorder_id: val.workorder_id,
            session_id: val.id,
        }
    }
}

#[derive(ClapArgs)]
pub struct ListSessionsArgs {
    /// Include archived sessions
    #[arg(short, long)]
    pub archived: bool,
}

#[derive(ClapArgs)]
pub struct AssignArgs {
    pub session_id: String,
    pub agent_id: String,
    /// Phase the agent works in
    pub phase: String,
    /// Task ids; defaults to every unassigned task of the phase
    #[arg(long, value_delimiter = ',')]
    pub tasks: Vec<String>,
    /// Paths the agent must not modify (comma-separated)
    #[arg(long = "forbid", value_delimiter = ',')]
    pub forbidden_paths: Vec<String>,
    /// Paths the agent intends to write (comma-separated)
    #[arg(long = "claim", value_delimiter = ',')]
    pub claimed_paths: Vec<String>,
}

impl From<AssignArgs> for AssignAgent {
    fn from(val: AssignArgs) -> Self {
        AssignAgent {
            session_id: val.session_id,
            agent_id: val.agent_id,
            phase: val.phase,
            tasks: val.tasks,
            forbidden_paths: val.forbidden_paths,
            claimed_paths: val.claimed_paths,
        }
    }
}

#[derive(ClapArgs)]
pub struct GateArgs {
    pub session_id: String,
    /// Phase to check; defaults to the authorised phase
    #[arg(long)]
    pub phase: Option<String>,
}

impl From<GateArgs> for CheckGate {
    fn from(val: GateArgs) -> Self {
        CheckGate {
            session_id: val.session_id,
            phase: val.phase,
        }
    }
}

#[derive(ClapArgs)]
pub struct ArchiveArgs {
    pub session_id: String,
    /// Also write an archive copy to <DIR>/archive/<SESSION>/
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

impl From<ArchiveArgs> for ArchiveSession {
    fn from(val: ArchiveArgs) -> Self {
        ArchiveSession {
            session_id: val.session_id,
            directory: val.dir.map(|dir| dir.display().to_string()),
        }
    }
}

#[derive(ClapArgs)]
pub struct ExportArgs {
    pub session_id: String,
    /// Export root; files land in <DIR>/<SESSION>/
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

impl From<ExportArgs> for ExportSession {
    fn from(val: ExportArgs) -> Self {
        ExportSession {
            session_id: val.session_id,
            directory: val.dir.display().to_string(),
        }
    }
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Change the status of one of your tasks
    #[command(alias = "s")]
    Set(SetTaskArgs),
    /// Record a deliverable for the session report
    #[command(alias = "o")]
    Output(OutputArgs),
}

#[derive(ClapArgs)]
pub struct SetTaskArgs {
    pub session_id: String,
    pub agent_id: String,
    pub task_id: String,
    /// not_started, in_progress, blocked or complete
    pub status: String,
    /// Owner token printed by `session assign`
    #[arg(long)]
    pub token: String,
    /// Note stored with the status change
    #[arg(short, long)]
    pub note: Option<String>,
}

impl From<SetTaskArgs> for SetTaskStatus {
    fn from(val: SetTaskArgs) -> Self {
        SetTaskStatus {
            session_id: val.session_id,
            agent_id: val.agent_id,
            token: val.token,
            task_id: val.task_id,
            status: val.status,
            note: val.note,
        }
    }
}

#[derive(ClapArgs)]
pub struct OutputArgs {
    pub session_id: String,
    pub agent_id: String,
    /// What was delivered
    pub output: String,
    /// Owner token printed by `session assign`
    #[arg(long)]
    pub token: String,
}

impl From<OutputArgs> for RecordOutput {
    fn from(val: OutputArgs) -> Self {
        RecordOutput {
            session_id: val.session_id,
            agent_id: val.agent_id,
            token: val.token,
            output: val.output,
        }
    }
}
