// Domain layer: study, result, LP model and solver contract
pub mod domain;

// Engine: per-scenario LP construction, scheduling and result assembly
pub mod optimizer;

// Solver adapters: Concrete implementations of SolverService
pub mod solver;

// Application layer: gRPC service, client and protobuf mapping
#[cfg(feature = "remote")]
pub mod application;

// Infrastructure layer: External concerns (gRPC server)
#[cfg(feature = "remote")]
pub mod infrastructure;

// Re-export commonly used types
pub use domain::{
    AdequacyError, Consumption, Converter, ConverterSource, Link, LinearProblem, LpError,
    ModelError, Network, Node, Production, ScenarioError, ScenarioFailures, Solution,
    SolutionStatus, SolverBackend, SolverConfig, SolverService, Storage, Study, StudyResult,
    TimeSeries,
};

pub use optimizer::{LpOptimizer, Optimizer, OptimizerConfig};

pub use solver::{GoodLpSolver, SolverFactory};

#[cfg(feature = "highs")]
pub use solver::HighsSolver;

#[cfg(feature = "remote")]
pub use application::{GrpcAdequacyService, RemoteOptimizer};

#[cfg(feature = "remote")]
pub use infrastructure::{serve_with_listener, start_server, ServerConfig};
