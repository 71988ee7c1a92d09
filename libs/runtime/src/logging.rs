//! Tracing setup driven by the `logging` config sections.
//!
//! Each section is keyed by a target prefix (`users`, `sea_orm`, ...) and the
//! `default` section covers every target no other section claims. Console output
//! is human-readable text; file output is JSON lines, rotated by size.

use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use tracing::{level_filters::LevelFilter, Metadata};
use tracing_subscriber::{filter::FilterFn, fmt, prelude::*, Registry};

use crate::config::{LoggingConfig, Section};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

/// `off`/`none` silence a sink; unknown names read as `info`.
fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// `users` claims `users` and `users::api`, but not `users_server`.
fn claims(prefix: &str, target: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Console,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Levels {
    console: LevelFilter,
    file: LevelFilter,
}

impl Levels {
    fn of(section: &Section) -> Self {
        let file = if section.file.trim().is_empty() {
            LevelFilter::OFF
        } else {
            parse_level(&section.file_level)
        };
        Self {
            console: parse_level(&section.console_level),
            file,
        }
    }

    fn get(&self, sink: Sink) -> LevelFilter {
        match sink {
            Sink::Console => self.console,
            Sink::File => self.file,
        }
    }
}

/// Per-target verbosity. The longest matching prefix wins; `default` is the fallback.
#[derive(Debug, Clone, Default)]
struct LevelTable {
    default: Option<Levels>,
    by_target: Vec<(String, Levels)>,
}

impl LevelTable {
    fn from_config(cfg: &LoggingConfig) -> Self {
        let mut table = Self::default();
        for (name, section) in cfg {
            if name == DEFAULT_SECTION {
                table.default = Some(Levels::of(section));
            } else {
                table.by_target.push((name.clone(), Levels::of(section)));
            }
        }
        table
    }

    fn lookup(&self, target: &str) -> Option<Levels> {
        self.by_target
            .iter()
            .filter(|(prefix, _)| claims(prefix, target))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, levels)| *levels)
            .or(self.default)
    }

    fn allows(&self, meta: &Metadata<'_>, sink: Sink) -> bool {
        self.lookup(meta.target())
            .is_some_and(|levels| *meta.level() <= levels.get(sink))
    }
}

// -------- rotating files --------

type SharedFile = Arc<Mutex<FileRotate<AppendCount>>>;

fn open_rotating(path: &Path, section: &Section) -> std::io::Result<SharedFile> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let rot = FileRotate::new(
        path,
        AppendCount::new(section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Arc::new(Mutex::new(rot)))
}

/// Relative paths hang off `base_dir` (normally `server.home_dir`).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Open log files, one handle per distinct path, routed by target prefix.
#[derive(Clone, Default)]
struct LogFiles {
    default: Option<SharedFile>,
    by_target: Vec<(String, SharedFile)>,
}

impl LogFiles {
    fn open(cfg: &LoggingConfig, base_dir: &Path) -> Self {
        let mut opened: HashMap<PathBuf, SharedFile> = HashMap::new();
        let mut files = Self::default();

        for (name, section) in cfg {
            if section.file.trim().is_empty() {
                continue;
            }
            let path = resolve_log_path(section.file.trim(), base_dir);
            let handle = match opened.get(&path) {
                Some(existing) => existing.clone(),
                None => match open_rotating(&path, section) {
                    Ok(handle) => {
                        opened.insert(path.clone(), handle.clone());
                        handle
                    }
                    Err(e) => {
                        // the subscriber is not installed yet
                        eprintln!("log file '{}' for '{name}' disabled: {e}", path.display());
                        continue;
                    }
                },
            };

            if name == DEFAULT_SECTION {
                files.default = Some(handle);
            } else {
                files.by_target.push((name.clone(), handle));
            }
        }
        files
    }

    fn route(&self, target: &str) -> Option<SharedFile> {
        self.by_target
            .iter()
            .filter(|(prefix, _)| claims(prefix, target))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, file)| file.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_target.is_empty()
    }
}

/// Writer for one record; `None` swallows the bytes.
struct FileSink(Option<SharedFile>);

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(file) => file
                .lock()
                .map_err(|_| std::io::Error::other("log file lock poisoned"))?
                .write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(file) => file
                .lock()
                .map_err(|_| std::io::Error::other("log file lock poisoned"))?
                .flush(),
            None => Ok(()),
        }
    }
}

impl<'a> fmt::MakeWriter<'a> for LogFiles {
    type Writer = FileSink;

    fn make_writer(&'a self) -> Self::Writer {
        FileSink(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        FileSink(self.route(meta.target()))
    }
}

// -------- public init --------

/// Install the global subscriber described by `cfg`.
/// `base_dir` anchors relative log file paths. Calling it twice keeps the first subscriber.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // `log` records (sqlx, hyper internals) go through tracing as well
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = fmt()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let table = Arc::new(LevelTable::from_config(cfg));
    let files = LogFiles::open(cfg, base_dir);

    let console_table = table.clone();
    let console = fmt::layer()
        .with_ansi(atty::is(atty::Stream::Stdout))
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(FilterFn::new(move |meta: &Metadata<'_>| {
            console_table.allows(meta, Sink::Console)
        }));

    let file = (!files.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(files)
            .with_filter(FilterFn::new(move |meta: &Metadata<'_>| {
                table.allows(meta, Sink::File)
            }))
    });

    let _ = Registry::default().with(console).with(file).try_init();
}
