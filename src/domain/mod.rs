// Domain module: study/result models, LP model and solver contract

pub mod error;
pub mod models;
pub mod result;
pub mod series;
pub mod solver_service;
pub mod study;
pub mod value_objects;

pub use error::*;
pub use models::*;
pub use result::*;
pub use series::*;
pub use solver_service::*;
pub use study::*;
pub use value_objects::*;
