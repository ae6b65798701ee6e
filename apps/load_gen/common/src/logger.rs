//! Leveled logging on top of slog.
//!
//! Two output formats are supported. `text` goes through `slog_term`. `json`
//! goes through [`ArgsJsonDrain`], which writes one object per line with the
//! fixed keys `time`, `level` and `out`; caller-supplied fields are
//! JSON-encoded one by one and nested under `args` so they can never collide
//! with the fixed keys.

use chrono::{Local, SecondsFormat};
use serde::Serialize;
use slog::{Drain, Key, Logger, OwnedKVList, Record, Serializer, KV, o};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

const RESERVED_KEYS: [&str; 3] = ["time", "level", "out"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Anything other than `json` selects the text format.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Severity threshold, least verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Panic,
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Unknown names select `info`.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            "fatal" => LogLevel::Fatal,
            "panic" => LogLevel::Panic,
            _ => LogLevel::Info,
        }
    }

    fn of_record(level: slog::Level) -> Self {
        match level {
            slog::Level::Critical => LogLevel::Fatal,
            slog::Level::Error => LogLevel::Error,
            slog::Level::Warning => LogLevel::Warn,
            slog::Level::Info => LogLevel::Info,
            slog::Level::Debug => LogLevel::Debug,
            slog::Level::Trace => LogLevel::Trace,
        }
    }

    fn permits(self, level: slog::Level) -> bool {
        Self::of_record(level) <= self
    }
}

fn level_name(level: slog::Level) -> &'static str {
    match level {
        slog::Level::Critical => "fatal",
        slog::Level::Error => "error",
        slog::Level::Warning => "warning",
        slog::Level::Info => "info",
        slog::Level::Debug => "debug",
        slog::Level::Trace => "trace",
    }
}

/// Extra key-value pairs attached to a single log line.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    entries: Vec<(&'static str, serde_json::Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl Into<serde_json::Value>) -> Self {
        self.entries.push((key, value.into()));
        self
    }
}

#[derive(Clone, Copy)]
struct FieldsKv<'a>(&'a Fields);

impl KV for FieldsKv<'_> {
    fn serialize(&self, record: &Record, serializer: &mut dyn Serializer) -> slog::Result {
        for (key, value) in &self.0.entries {
            let key = *key;
            match value {
                serde_json::Value::Null => serializer.emit_unit(key)?,
                serde_json::Value::Bool(b) => serializer.emit_bool(key, *b)?,
                serde_json::Value::String(s) => serializer.emit_str(key, s)?,
                serde_json::Value::Number(n) => {
                    if let Some(u) = n.as_u64() {
                        serializer.emit_u64(key, u)?
                    } else if let Some(i) = n.as_i64() {
                        serializer.emit_i64(key, i)?
                    } else {
                        serializer.emit_f64(key, n.as_f64().unwrap_or(f64::NAN))?
                    }
                }
                nested => {
                    slog::Value::serialize(&slog::Serde(nested.clone()), record, key, serializer)?
                }
            }
        }
        Ok(())
    }
}

/// Collects every key-value pair of a record as its JSON encoding.
#[derive(Default)]
struct ArgsCollector {
    args: BTreeMap<&'static str, String>,
}

impl ArgsCollector {
    fn put(&mut self, key: Key, encoded: serde_json::Result<String>) -> slog::Result {
        if RESERVED_KEYS.contains(&key) {
            return Ok(());
        }
        let encoded = encoded.map_err(|_| slog::Error::Other)?;
        self.args.insert(key, encoded);
        Ok(())
    }
}

macro_rules! emit_as_json {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, key: Key, val: $ty) -> slog::Result {
                self.put(key, serde_json::to_string(&val))
            }
        )*
    };
}

impl Serializer for ArgsCollector {
    fn emit_arguments(&mut self, key: Key, val: &fmt::Arguments) -> slog::Result {
        self.put(key, serde_json::to_string(&val.to_string()))
    }

    fn emit_str(&mut self, key: Key, val: &str) -> slog::Result {
        self.put(key, serde_json::to_string(val))
    }

    fn emit_unit(&mut self, key: Key) -> slog::Result {
        self.put(key, Ok("null".to_string()))
    }

    fn emit_none(&mut self, key: Key) -> slog::Result {
        self.put(key, Ok("null".to_string()))
    }

    emit_as_json!(
        emit_bool: bool,
        emit_char: char,
        emit_usize: usize,
        emit_isize: isize,
        emit_u8: u8,
        emit_i8: i8,
        emit_u16: u16,
        emit_i16: i16,
        emit_u32: u32,
        emit_i32: i32,
        emit_u64: u64,
        emit_i64: i64,
        emit_f32: f32,
        emit_f64: f64,
    );

    fn emit_serde(&mut self, key: Key, value: &dyn slog::SerdeValue) -> slog::Result {
        self.put(key, serde_json::to_string(value.as_serde()))
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    args: BTreeMap<&'static str, String>,
    level: &'a str,
    out: String,
    time: String,
}

/// Writes each record as a single JSON object followed by a newline.
pub struct ArgsJsonDrain<W: Write> {
    out: Mutex<W>,
}

impl<W: Write> ArgsJsonDrain<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn encode(record: &Record, values: &OwnedKVList) -> Result<Vec<u8>, slog::Error> {
        let mut collector = ArgsCollector::default();
        values.serialize(record, &mut collector)?;
        record.kv().serialize(record, &mut collector)?;

        let line = JsonLine {
            args: collector.args,
            level: level_name(record.level()),
            out: record.msg().to_string(),
            time: Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        let mut bytes = serde_json::to_vec(&line).map_err(|_| slog::Error::Other)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl<W: Write> Drain for ArgsJsonDrain<W> {
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        let line = Self::encode(record, values)
            .map_err(|e| io::Error::other(format!("failed to marshal fields to JSON, {}", e)))?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?;
        out.write_all(&line)?;
        out.flush()
    }
}

/// Logger handed to the rest of the program.
pub struct Log {
    logger: Logger,
    guard: Mutex<Option<slog_async::AsyncGuard>>,
}

impl Log {
    /// Logs to standard error.
    pub fn new(format: LogFormat, level: LogLevel) -> Self {
        match format {
            LogFormat::Text => {
                let decorator = slog_term::TermDecorator::new().stderr().build();
                let drain = slog_term::FullFormat::new(decorator).build().fuse();
                Self::assemble(drain, level)
            }
            LogFormat::Json => Self::assemble(ArgsJsonDrain::new(io::stderr()).fuse(), level),
        }
    }

    pub fn with_writer<W>(format: LogFormat, level: LogLevel, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        match format {
            LogFormat::Text => {
                let decorator = slog_term::PlainDecorator::new(writer);
                let drain = slog_term::FullFormat::new(decorator).build().fuse();
                Self::assemble(drain, level)
            }
            LogFormat::Json => Self::assemble(ArgsJsonDrain::new(writer).fuse(), level),
        }
    }

    fn assemble<D>(drain: D, level: LogLevel) -> Self
    where
        D: Drain<Ok = (), Err = slog::Never> + Send + 'static,
    {
        let (drain, guard) = slog_async::Async::new(drain)
            .overflow_strategy(slog_async::OverflowStrategy::Block)
            .build_with_guard();
        let drain = drain
            .ignore_res()
            .filter(move |record: &Record| level.permits(record.level()))
            .fuse();

        Self {
            logger: Logger::root(drain, o!()),
            guard: Mutex::new(Some(guard)),
        }
    }

    fn emit(&self, level: slog::Level, msg: &dyn fmt::Display, fields: &Fields) {
        let kv = FieldsKv(fields);
        match level {
            slog::Level::Critical => slog::crit!(self.logger, "{}", msg; kv),
            slog::Level::Error => slog::error!(self.logger, "{}", msg; kv),
            slog::Level::Warning => slog::warn!(self.logger, "{}", msg; kv),
            slog::Level::Info => slog::info!(self.logger, "{}", msg; kv),
            slog::Level::Debug => slog::debug!(self.logger, "{}", msg; kv),
            slog::Level::Trace => slog::trace!(self.logger, "{}", msg; kv),
        }
    }

    pub fn trace(&self, msg: impl fmt::Display) {
        self.emit(slog::Level::Trace, &msg, &Fields::new());
    }

    pub fn debug(&self, msg: impl fmt::Display) {
        self.emit(slog::Level::Debug, &msg, &Fields::new());
    }

    pub fn info(&self, msg: impl fmt::Display) {
        self.emit(slog::Level::Info, &msg, &Fields::new());
    }

    pub fn info_with_values(&self, msg: impl fmt::Display, fields: &Fields) {
        self.emit(slog::Level::Info, &msg, fields);
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        self.emit(slog::Level::Warning, &msg, &Fields::new());
    }

    pub fn error(&self, msg: impl fmt::Display) {
        self.emit(slog::Level::Error, &msg, &Fields::new());
    }

    pub fn error_with_values(&self, msg: impl fmt::Display, fields: &Fields) {
        self.emit(slog::Level::Error, &msg, fields);
    }

    /// Logs, flushes and exits with status 1.
    pub fn fatal(&self, msg: impl fmt::Display) -> ! {
        self.emit(slog::Level::Critical, &msg, &Fields::new());
        self.flush();
        std::process::exit(1)
    }

    /// Blocks until every pending record has been written. Nothing logged
    /// afterwards is written.
    pub fn flush(&self) {
        let guard = match self.guard.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(guard);
    }
}
