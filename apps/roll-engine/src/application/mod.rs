//! Application Layer
//!
//! Orchestrates domain logic through use cases. It defines:
//!
//! - **Ports**: Interfaces for reading external data
//! - **Use Cases**: Single-instrument builds and parallel batches
//! - **Services**: The shared calendar cache

pub mod ports;
pub mod services;
pub mod use_cases;

pub use ports::*;
pub use services::*;
pub use use_cases::*;
