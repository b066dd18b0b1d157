//! Application services
//!
//! Concrete services that drive the interview domain. They depend on I/O
//! boundary traits (FileSystem, Selector) but are themselves concrete structs.

pub mod graph_loader;
pub mod interactive;
pub mod interview;
pub mod session;

pub use graph_loader::{GraphFormat, GraphLoader};
pub use interactive::{InteractiveSession, MenuAction, MenuEntry};
pub use interview::{
    ActiveWeight, CommitOutcome, InterviewEngine, InterviewOptions, InterviewState,
    PendingRefinement, SelectionKind, SelectionSummary,
};
pub use session::{ReplayReport, SessionEvent, SessionScript, SessionService};
