pub mod domain;

pub use domain::{
    CommercialRecord, InfrastructureRecord, InterventionCandidate, TableRole, TransformerId,
    UnknownTableRole,
};
