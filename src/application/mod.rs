// Application layer: gRPC service, client and protobuf mapping

pub mod client;
pub mod grpc_service;
pub mod mappers;

pub use client::RemoteOptimizer;
pub use grpc_service::GrpcAdequacyService;
