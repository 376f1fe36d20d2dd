//! Conventional topic names used across the agent.
//!
//! Topics are plain strings by design — nothing stops ad-hoc topics — but
//! the components of the system agree on this set.

/// Raw user input entering the system.
pub const USER_INPUT: &str = "user_input";

/// Agent responses on their way out.
pub const AGENT_OUTPUT: &str = "agent_output";

/// System control traffic (shutdown requests, lifecycle notices).
pub const SYSTEM: &str = "system";

/// Trigger firings (keyword/schedule matchers).
pub const TRIGGER: &str = "trigger";

/// Completed interactions handed to context processing.
pub const CONTEXT_PROCESSOR: &str = "context_processor";

/// Component error reports.
pub const SYSTEM_ERROR: &str = "system_error";

/// Operator-facing notifications.
pub const SYSTEM_NOTIFICATION: &str = "system_notification";
