//! Observability setup for recallbot: structured logging and optional
//! OpenTelemetry trace export.

pub mod tracing_setup;
