use core::fmt::{self, Display};

use kernel_sync::SyncOnceCell;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::qemu_trace;

static LOGGER: SyncOnceCell<QemuLogger> = SyncOnceCell::new();

/// `log` backend on the QEMU debug console.
#[derive(Debug)]
pub struct QemuLogger {
    max_level: LevelFilter,
}

impl QemuLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Install as the global logger. Call once during early boot.
    ///
    /// # Errors
    /// If a logger, this one or another, is already installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_logger(LOGGER.get_or_init(|| self))?;
        log::set_max_level(max_level);
        Ok(())
    }

}

/// One console line, without the newline.
struct Line<'a>(&'a Record<'a>);

impl Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        write!(f, "[{}] {}: {}", record.level(), record.target(), record.args())
    }
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            qemu_trace!("{}\n", Line(record));
        }
    }

    fn flush(&self) {}
}
