//! Named, level-filtered loggers shared by every part of the crate.
//!
//! Each component keeps a `LOGGER` static. Levels can be changed per instance or globally with
//! [`set_log_level`], and embedders can observe every message through [`set_user_log_handler`]
//! (for example to mirror sync diagnostics into an on-screen console).

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock, Weak};

static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INSTANCES: LazyLock<Mutex<Vec<Weak<LoggerInner>>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

type SharedLogHandler = Arc<dyn Fn(&Logger, LogLevel, &[LogArgument]) + Send + Sync + 'static>;

#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("level", &self.log_level())
            .finish()
    }
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        let inner = Arc::new(LoggerInner::new(name.into()));
        track_instance(&inner);
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.log_level.load(Ordering::SeqCst))
    }

    pub fn set_log_level<L>(&self, level: L) -> Result<(), LogError>
    where
        L: IntoLogLevel,
    {
        let level = level.into_log_level()?;
        self.inner.log_level.store(level as u8, Ordering::SeqCst);
        Ok(())
    }

    /// Replaces the sink used for this logger. The handler is responsible for level filtering.
    pub fn set_log_handler<F>(&self, handler: F)
    where
        F: Fn(&Logger, LogLevel, &[LogArgument]) + Send + Sync + 'static,
    {
        *write_lock(&self.inner.log_handler) = Arc::new(handler);
    }

    pub fn reset_log_handler(&self) {
        *write_lock(&self.inner.log_handler) = default_log_handler_arc();
    }

    fn set_user_log_handler(&self, handler: Option<SharedLogHandler>) {
        *write_lock(&self.inner.user_log_handler) = handler;
    }

    pub fn debug(&self, arg: impl IntoLogArgument) {
        self.emit_one(LogLevel::Debug, arg);
    }

    pub fn debug_with<I, T>(&self, args: I)
    where
        I: IntoIterator<Item = T>,
        T: IntoLogArgument,
    {
        self.emit_many(LogLevel::Debug, args);
    }

    pub fn info(&self, arg: impl IntoLogArgument) {
        self.emit_one(LogLevel::Info, arg);
    }

    pub fn info_with<I, T>(&self, args: I)
    where
        I: IntoIterator<Item = T>,
        T: IntoLogArgument,
    {
        self.emit_many(LogLevel::Info, args);
    }

    pub fn warn(&self, arg: impl IntoLogArgument) {
        self.emit_one(LogLevel::Warn, arg);
    }

    pub fn error(&self, arg: impl IntoLogArgument) {
        self.emit_one(LogLevel::Error, arg);
    }

    pub fn error_with<I, T>(&self, args: I)
    where
        I: IntoIterator<Item = T>,
        T: IntoLogArgument,
    {
        self.emit_many(LogLevel::Error, args);
    }

    fn emit_one(&self, level: LogLevel, arg: impl IntoLogArgument) {
        self.dispatch(level, vec![arg.into_log_argument()]);
    }

    fn emit_many<I, T>(&self, level: LogLevel, args: I)
    where
        I: IntoIterator<Item = T>,
        T: IntoLogArgument,
    {
        let arguments = args
            .into_iter()
            .map(IntoLogArgument::into_log_argument)
            .collect();
        self.dispatch(level, arguments);
    }

    fn dispatch(&self, level: LogLevel, arguments: Vec<LogArgument>) {
        let user_handler = read_lock(&self.inner.user_log_handler).clone();
        if let Some(handler) = user_handler {
            handler(self, level, &arguments);
        }
        let handler = read_lock(&self.inner.log_handler).clone();
        handler(self, level, &arguments);
    }
}

struct LoggerInner {
    name: String,
    log_level: AtomicU8,
    log_handler: RwLock<SharedLogHandler>,
    user_log_handler: RwLock<Option<SharedLogHandler>>,
}

impl LoggerInner {
    fn new(name: String) -> Self {
        Self {
            name,
            log_level: AtomicU8::new(GLOBAL_LOG_LEVEL.load(Ordering::SeqCst)),
            log_handler: RwLock::new(default_log_handler_arc()),
            user_log_handler: RwLock::new(None),
        }
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn track_instance(inner: &Arc<LoggerInner>) {
    INSTANCES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push(Arc::downgrade(inner));
}

fn with_instances<F>(mut f: F)
where
    F: FnMut(Logger),
{
    let mut instances = INSTANCES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    instances.retain(|weak| match weak.upgrade() {
        Some(inner) => {
            f(Logger { inner });
            true
        }
        None => false,
    });
}

fn default_log_handler_arc() -> SharedLogHandler {
    Arc::new(default_log_handler)
}

fn default_log_handler(logger: &Logger, level: LogLevel, args: &[LogArgument]) {
    if level < logger.log_level() || level == LogLevel::Silent {
        return;
    }

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let message = build_message(args);
    let line = if message.is_empty() {
        format!("[{}]  {}:", now, logger.name())
    } else {
        format!("[{}]  {}: {}", now, logger.name(), message)
    };
    write_line(level, &line);
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn write_line(level: LogLevel, line: &str) {
    let value = wasm_bindgen::JsValue::from_str(line);
    match level {
        LogLevel::Error => web_sys::console::error_1(&value),
        LogLevel::Warn => web_sys::console::warn_1(&value),
        LogLevel::Debug => web_sys::console::debug_1(&value),
        _ => web_sys::console::log_1(&value),
    }
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
fn write_line(level: LogLevel, line: &str) {
    match level {
        LogLevel::Warn | LogLevel::Error => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}

fn build_message(args: &[LogArgument]) -> String {
    args.iter()
        .filter_map(LogArgument::to_message_fragment)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Verbose = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Silent = 5,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Verbose,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Silent,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "verbose" => Ok(LogLevel::Verbose),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            other => Err(LogError::InvalidLogLevel(other.to_string())),
        }
    }
}

pub trait IntoLogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError>;
}

impl IntoLogLevel for LogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        Ok(self)
    }
}

impl IntoLogLevel for &str {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        LogLevel::from_str(self)
    }
}

impl IntoLogLevel for String {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        LogLevel::from_str(&self)
    }
}

/// Payload handed to user log handlers.
#[derive(Debug, Clone)]
pub struct LogCallbackParams {
    pub level: LogLevel,
    pub message: String,
    pub args: Vec<Value>,
    pub logger_type: String,
}

pub type LogCallback = Arc<dyn Fn(LogCallbackParams) + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq)]
pub enum LogArgument {
    Text(String),
    Value(Value),
    Null,
}

impl LogArgument {
    pub fn to_message_fragment(&self) -> Option<String> {
        match self {
            LogArgument::Text(text) | LogArgument::Value(Value::String(text)) => {
                Some(text.clone())
            }
            LogArgument::Value(Value::Null) | LogArgument::Null => None,
            LogArgument::Value(other) => Some(other.to_string()),
        }
    }

    pub fn to_callback_value(&self) -> Value {
        match self {
            LogArgument::Text(text) => Value::String(text.clone()),
            LogArgument::Value(value) => value.clone(),
            LogArgument::Null => Value::Null,
        }
    }
}

pub trait IntoLogArgument {
    fn into_log_argument(self) -> LogArgument;
}

impl IntoLogArgument for LogArgument {
    fn into_log_argument(self) -> LogArgument {
        self
    }
}

impl IntoLogArgument for String {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Text(self)
    }
}

impl IntoLogArgument for &String {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Text(self.clone())
    }
}

impl IntoLogArgument for &str {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Text(self.to_owned())
    }
}

impl IntoLogArgument for bool {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Value(Value::Bool(self))
    }
}

impl IntoLogArgument for u64 {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Value(Value::from(self))
    }
}

impl IntoLogArgument for usize {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Value(Value::from(self as u64))
    }
}

impl IntoLogArgument for Value {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Value(self)
    }
}

impl IntoLogArgument for &Value {
    fn into_log_argument(self) -> LogArgument {
        LogArgument::Value(self.clone())
    }
}

impl<T> IntoLogArgument for Option<T>
where
    T: IntoLogArgument,
{
    fn into_log_argument(self) -> LogArgument {
        match self {
            Some(value) => value.into_log_argument(),
            None => LogArgument::Null,
        }
    }
}

#[derive(Debug, Clone)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => {
                write!(f, "Invalid value \"{level}\" assigned to `logLevel`")
            }
        }
    }
}

impl std::error::Error for LogError {}

/// Applies `level` to every live logger and to loggers created afterwards.
pub fn set_log_level<L>(level: L) -> Result<(), LogError>
where
    L: IntoLogLevel,
{
    let level = level.into_log_level()?;
    GLOBAL_LOG_LEVEL.store(level as u8, Ordering::SeqCst);
    with_instances(|logger| {
        let _ = logger.set_log_level(level);
    });
    Ok(())
}

/// Installs (or clears, with `None`) a callback receiving every message at or above `level`
/// (each logger's own level when `level` is `None`).
pub fn set_user_log_handler(callback: Option<LogCallback>, level: Option<LogLevel>) {
    with_instances(|logger| match &callback {
        Some(cb) => {
            let cb = Arc::clone(cb);
            logger.set_user_log_handler(Some(Arc::new(
                move |instance: &Logger, message_level, args: &[LogArgument]| {
                    let threshold = level.unwrap_or_else(|| instance.log_level());
                    if message_level < threshold {
                        return;
                    }
                    cb(LogCallbackParams {
                        level: message_level,
                        message: build_message(args),
                        args: args.iter().map(LogArgument::to_callback_value).collect(),
                        logger_type: instance.name().to_owned(),
                    });
                },
            )));
        }
        None => logger.set_user_log_handler(None),
    });
}
