//! Command dispatch framework.
//!
//! This module implements the dispatch pipeline:
//!
//! 1. **Classification** (`classify`): `Envelope` -> `Result<Operation, ClassifyError>`
//! 2. **Middleware** (`middleware`): Tower layers (load-shedding, timeout, metrics)
//! 3. **Routing** (`router`): Resolve the procedure by name, check arity, invoke
//! 4. **Registry** (`registry`): Procedure name -> handler, frozen after startup
//! 5. **Domain handlers** (`domain`): Stores and the procedures built on them
//! 6. **Apps** (`apps`): The procedure sets a server can host

pub mod apps;
pub mod classify;
pub mod config;
pub mod credential;
pub mod domain;
pub mod middleware;
pub mod operation;
pub mod registry;
pub mod router;

// Re-export key types for convenient access.
pub use apps::{build_registry, AppKind};
pub use classify::OperationService;
pub use config::ServerConfig;
pub use middleware::{build_operation_pipeline, OperationPipeline};
pub use operation::{
    ClassifyError, Operation, OperationContext, OperationError, OperationResponse, ProcedureError,
};
pub use registry::{procedure, Procedure, ProcedureRegistry, RegistryError, Visibility};
pub use router::CommandRouter;
