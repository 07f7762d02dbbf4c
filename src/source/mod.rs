// State source abstraction: the remote Atlas API behind a trait so the driver can run against fakes.

pub mod http_source;
pub mod traits;
pub mod types;
