//! Runtime event logging
//!
//! Records class definition, initialization, dispatch-site and reclamation
//! events into a bounded in-memory buffer. Events can be echoed through the
//! `log` facade, either human readable or as JSON.
//!
//! Log Levels:
//! - ERROR: initializer failures
//! - INFO: class definition, initialization
//! - DEBUG: dispatch-site misses and evictions
//! - TRACE: reclamation attempts

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Log level for runtime events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Runtime event types
#[derive(Debug, Clone, PartialEq)]
pub enum VhEvent {
    /// A loader defined a class
    ClassDefined {
        class: String,
        loader: String,
        hidden: bool,
    },

    /// Initialization of a class started on some thread
    InitStart { class: String },

    /// Initialization of a class completed
    InitEnd { class: String, duration_us: u64 },

    /// Initializer failed; the class is now unusable
    InitFailed { class: String, cause: String },

    /// A dispatch site missed and installed a new entry
    SiteMiss { access: String, slot: usize },

    /// A dispatch site replaced a live entry
    SiteEvict { access: String, slot: usize },

    /// The reclamation probe made an attempt
    ReclaimAttempt { attempt: u32, reclaimed: bool },
}

impl VhEvent {
    fn kind(&self) -> &'static str {
        match self {
            VhEvent::ClassDefined { .. } => "class_defined",
            VhEvent::InitStart { .. } => "init_start",
            VhEvent::InitEnd { .. } => "init_end",
            VhEvent::InitFailed { .. } => "init_failed",
            VhEvent::SiteMiss { .. } => "site_miss",
            VhEvent::SiteEvict { .. } => "site_evict",
            VhEvent::ReclaimAttempt { .. } => "reclaim_attempt",
        }
    }

    fn level(&self) -> LogLevel {
        match self {
            VhEvent::InitFailed { .. } => LogLevel::Error,
            VhEvent::ClassDefined { .. } | VhEvent::InitStart { .. } | VhEvent::InitEnd { .. } => {
                LogLevel::Info
            },
            VhEvent::SiteMiss { .. } | VhEvent::SiteEvict { .. } => LogLevel::Debug,
            VhEvent::ReclaimAttempt { .. } => LogLevel::Trace,
        }
    }
}

/// Event logger configuration
#[derive(Debug, Clone)]
pub struct EventLoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Echo events through the `log` facade
    pub console: bool,

    /// Echo as JSON instead of text
    pub json: bool,

    /// Prefix echoed events with a wall-clock timestamp
    pub timestamps: bool,

    /// Maximum number of buffered events; the oldest are dropped first
    pub capacity: usize,
}

impl Default for EventLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            console: false,
            json: false,
            timestamps: true,
            capacity: 4096,
        }
    }
}

/// Event logger - bounded buffer of runtime events
pub struct EventLogger {
    config: EventLoggerConfig,
    events: Mutex<VecDeque<(Instant, VhEvent)>>,
    enabled: AtomicBool,
}

impl EventLogger {
    /// Create new event logger
    pub fn new(config: EventLoggerConfig) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(config.capacity.min(1024))),
            config,
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Record an event
    pub fn log(&self, event: VhEvent) {
        if !self.is_enabled() || event.level() > self.config.level {
            return;
        }

        if self.config.console {
            self.output(&event);
        }

        let mut events = self.events.lock();
        if events.len() >= self.config.capacity {
            events.pop_front();
        }
        events.push_back((Instant::now(), event));
    }

    fn output(&self, event: &VhEvent) {
        let line = if self.config.json {
            Self::render_json(event).to_string()
        } else {
            Self::render_human(event)
        };

        let level: log::Level = event.level().into();
        if self.config.timestamps {
            let now = chrono::Local::now();
            log::log!(
                level,
                "[{}] {}",
                now.format("%Y-%m-%d %H:%M:%S%.3f"),
                line
            );
        } else {
            log::log!(level, "{}", line);
        }
    }

    fn render_human(event: &VhEvent) -> String {
        match event {
            VhEvent::ClassDefined {
                class,
                loader,
                hidden,
            } => {
                let kind = if *hidden { "hidden class" } else { "class" };
                format!("[VH] Defined {} {} in loader {}", kind, class, loader)
            },
            VhEvent::InitStart { class } => format!("[VH] Initializing {}", class),
            VhEvent::InitEnd { class, duration_us } => {
                format!("[VH] Initialized {} ({} us)", class, duration_us)
            },
            VhEvent::InitFailed { class, cause } => {
                format!("[VH] Initialization of {} failed: {}", class, cause)
            },
            VhEvent::SiteMiss { access, slot } => {
                format!("[VH] Site {} miss, installed slot {}", access, slot)
            },
            VhEvent::SiteEvict { access, slot } => {
                format!("[VH] Site {} evicted slot {}", access, slot)
            },
            VhEvent::ReclaimAttempt { attempt, reclaimed } => {
                format!("[VH] Reclaim attempt {} (reclaimed: {})", attempt, reclaimed)
            },
        }
    }

    fn render_json(event: &VhEvent) -> serde_json::Value {
        let mut json = match event {
            VhEvent::ClassDefined {
                class,
                loader,
                hidden,
            } => serde_json::json!({
                "class": class,
                "loader": loader,
                "hidden": hidden
            }),
            VhEvent::InitStart { class } => serde_json::json!({ "class": class }),
            VhEvent::InitEnd { class, duration_us } => serde_json::json!({
                "class": class,
                "duration_us": duration_us
            }),
            VhEvent::InitFailed { class, cause } => serde_json::json!({
                "class": class,
                "cause": cause
            }),
            VhEvent::SiteMiss { access, slot } | VhEvent::SiteEvict { access, slot } => {
                serde_json::json!({
                    "access": access,
                    "slot": slot
                })
            },
            VhEvent::ReclaimAttempt { attempt, reclaimed } => serde_json::json!({
                "attempt": attempt,
                "reclaimed": reclaimed
            }),
        };
        json["type"] = serde_json::Value::from(event.kind());
        json
    }

    /// Snapshot of buffered events
    pub fn get_events(&self) -> Vec<(Instant, VhEvent)> {
        self.events.lock().iter().cloned().collect()
    }

    /// Clear all events
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new(EventLoggerConfig::default())
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<EventLogger> = Mutex::new(EventLogger::default());
}

/// Record an event in the global logger
pub fn log_event(event: VhEvent) {
    GLOBAL_LOGGER.lock().log(event);
}

/// Replace the global logger
pub fn configure_logger(config: EventLoggerConfig) {
    *GLOBAL_LOGGER.lock() = EventLogger::new(config);
}

/// Enable or disable the global logger without dropping its buffer
pub fn set_logging_enabled(enabled: bool) {
    let logger = GLOBAL_LOGGER.lock();
    if enabled {
        logger.enable();
    } else {
        logger.disable();
    }
}

/// Snapshot of the global logger's events
pub fn recorded_events() -> Vec<VhEvent> {
    GLOBAL_LOGGER
        .lock()
        .get_events()
        .into_iter()
        .map(|(_, event)| event)
        .collect()
}

/// Get global logger event count
pub fn get_event_count() -> usize {
    GLOBAL_LOGGER.lock().event_count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defined(name: &str) -> VhEvent {
        VhEvent::ClassDefined {
            class: name.to_string(),
            loader: "app".to_string(),
            hidden: false,
        }
    }

    #[test]
    fn test_event_logger_basic() {
        let logger = EventLogger::default();
        logger.log(defined("Point"));
        assert_eq!(logger.event_count(), 1);
    }

    #[test]
    fn test_event_logger_disable() {
        let logger = EventLogger::default();
        logger.disable();
        logger.log(defined("Point"));
        assert_eq!(logger.event_count(), 0);
    }

    #[test]
    fn test_event_logger_bounded() {
        let logger = EventLogger::new(EventLoggerConfig {
            capacity: 2,
            ..Default::default()
        });
        for name in ["A", "B", "C"] {
            logger.log(defined(name));
        }
        let events = logger.get_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].1, defined("B"));
    }

    #[test]
    fn test_level_filter() {
        let logger = EventLogger::new(EventLoggerConfig {
            level: LogLevel::Info,
            ..Default::default()
        });
        logger.log(VhEvent::SiteMiss {
            access: "get".to_string(),
            slot: 0,
        });
        assert_eq!(logger.event_count(), 0);
    }

    #[test]
    fn test_json_rendering_tags_kind() {
        let json = EventLogger::render_json(&VhEvent::InitFailed {
            class: "Broken".to_string(),
            cause: "boom".to_string(),
        });
        assert_eq!(json["type"], "init_failed");
        assert_eq!(json["cause"], "boom");
    }
}
