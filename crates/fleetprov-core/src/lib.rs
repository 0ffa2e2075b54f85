// fleetprov-core: Idempotent resource orchestration for fleet telemetry provisioning.

pub mod config;
pub mod error;
pub mod graph;
pub mod invoker;
pub mod loader;
pub mod model;
pub mod orchestrator;
pub mod provision;
pub mod remote;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControlPlaneConfig, EngineConfig, RetryPolicy, RunMode, TlsVerification};
pub use error::CoreError;
pub use fleetprov_api::Error as ApiError;
pub use graph::{GraphBuilder, Plan, PlanStep};
pub use invoker::{Invoker, Mode, Outcome, Prediction, RunOutputs};
pub use loader::{DocumentPaths, SchemaDocuments};
pub use orchestrator::{CompletedResource, Orchestrator, PlannedChange, ResourceFailure, RunReport};
pub use provision::{Stack, StackOutputs, StackSettings, build_stack};
pub use remote::{Offline, RemoteApi, connect};
pub use store::{ResourceRecord, StateStore};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ActionSpec, AssociationBehavior, Campaign, Compression, Guard, LifecycleStatus, ParamValue,
    PhysicalId, ResourceDescriptor, ResourceKind, ResourceSpec, ResponseBinding, bind,
};
