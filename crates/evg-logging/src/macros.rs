//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging context for federate loops."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Context-aware logging macros.

#[doc(hidden)]
#[macro_export]
macro_rules! __evg_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            federate = ctx.federate.unwrap_or(""),
            role = ctx.role.unwrap_or(""),
            terminal = ctx.terminal.unwrap_or(""),
            granted = ctx.granted.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with federate context.
#[macro_export]
macro_rules! evg_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__evg_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__evg_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with federate context.
#[macro_export]
macro_rules! evg_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__evg_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__evg_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with federate context.
#[macro_export]
macro_rules! evg_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__evg_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__evg_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with federate context.
#[macro_export]
macro_rules! evg_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__evg_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__evg_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
