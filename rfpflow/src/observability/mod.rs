//! Observability utilities.

mod logging;

pub use logging::{env_filter, init_from_config, init_tracing};
