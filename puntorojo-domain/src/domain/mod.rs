pub mod candidate;
mod commercial;
mod infrastructure;
mod role;
mod transformer_id;

pub use candidate::InterventionCandidate;
pub use commercial::CommercialRecord;
pub use infrastructure::InfrastructureRecord;
pub use role::{TableRole, UnknownTableRole};
pub use transformer_id::TransformerId;
