//! Metric names and label keys.
//!
//! Keeping every name here keeps dashboards and call sites in agreement.

/// Message pipeline metrics
pub mod dispatch {
    /// Inbound events handed to the engine
    pub const MESSAGES_RECEIVED_TOTAL: &str = "herald_dispatch_messages_received_total";
    /// Commands whose `on_call` ran
    pub const COMMANDS_EXECUTED_TOTAL: &str = "herald_dispatch_commands_executed_total";
    /// Duration of a command's `on_call` in seconds
    pub const COMMAND_DURATION_SECONDS: &str = "herald_dispatch_command_duration_seconds";
    /// Handler errors caught at a module boundary
    pub const HANDLER_ERRORS_TOTAL: &str = "herald_dispatch_handler_errors_total";
    /// Invocations suppressed by a cooldown
    pub const THROTTLED_TOTAL: &str = "herald_dispatch_throttled_total";
    /// Invocations refused by the category or admin gate
    pub const ACCESS_DENIED_TOTAL: &str = "herald_dispatch_access_denied_total";
    /// Prefixed invocations routed to the fallback command
    pub const FALLBACK_TOTAL: &str = "herald_dispatch_fallback_total";
}

/// Plugin registry metrics
pub mod plugins {
    /// Currently loaded command modules
    pub const COMMANDS_LOADED: &str = "herald_plugins_commands_loaded";
    /// Currently loaded event modules
    pub const EVENTS_LOADED: &str = "herald_plugins_events_loaded";
    /// Manifests rejected during load
    pub const LOAD_ERRORS_TOTAL: &str = "herald_plugins_load_errors_total";
    /// Completed reloads
    pub const RELOADS_TOTAL: &str = "herald_plugins_reloads_total";
}

/// Event stream metrics
pub mod stream {
    /// Successful subscriptions
    pub const SUBSCRIPTIONS_TOTAL: &str = "herald_stream_subscriptions_total";
    /// Scheduled refreshes
    pub const REFRESHES_TOTAL: &str = "herald_stream_refreshes_total";
    /// Subscribe failures and terminated streams
    pub const ERRORS_TOTAL: &str = "herald_stream_errors_total";
}

/// Transport call metrics
pub mod transport {
    /// Sends and reactions acknowledged by the backend
    pub const CALLS_TOTAL: &str = "herald_transport_calls_total";
    /// Sends and reactions rejected by the backend
    pub const ERRORS_TOTAL: &str = "herald_transport_errors_total";
}

/// Common label keys
pub mod labels {
    pub const COMMAND: &str = "command";
    pub const MODULE: &str = "module";
    pub const REASON: &str = "reason";
}

/// Histogram buckets
pub mod buckets {
    /// Handler duration buckets (seconds), 1ms to 2 minutes
    pub const HANDLER_DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
    ];
}
