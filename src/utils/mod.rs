pub mod logging;

pub use logging::{HealthChecker, HealthStatus, LogManager, StructuredLogger};
