pub mod availability_handler;
pub mod health;
pub mod metrics;
pub mod ministry_settings_handler;
pub mod scales_handler;
pub mod service_history_handler;
pub mod swap_requests_handler;

pub use health::health_check;
pub use metrics::{metrics_handler, setup_metrics_recorder, MetricsState};
