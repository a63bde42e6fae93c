//! Daily rolling log files
//!
//! The active file keeps its plain name (`demo.log`). When the UTC day
//! changes, or when a file left over from an earlier day is opened, it is
//! renamed to a dated archive and only the newest `retention` archives are
//! kept.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use tracing_subscriber::fmt::MakeWriter;

/// Where the date goes in an archive's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveNaming {
    /// `20240131.demo.log`
    #[default]
    DatePrefix,
    /// `demo.log.20240131`
    DateSuffix,
}

impl ArchiveNaming {
    pub fn archive_name(self, base: &str, day: NaiveDate) -> String {
        let stamp = day.format("%Y%m%d");
        match self {
            ArchiveNaming::DatePrefix => format!("{}.{}", stamp, base),
            ArchiveNaming::DateSuffix => format!("{}.{}", base, stamp),
        }
    }

    /// Day encoded in `file_name` if it is an archive of `base`.
    fn archive_day(self, base: &str, file_name: &str) -> Option<NaiveDate> {
        let stamp = match self {
            ArchiveNaming::DatePrefix => file_name.strip_suffix(base)?.strip_suffix('.')?,
            ArchiveNaming::DateSuffix => file_name.strip_prefix(base)?.strip_prefix('.')?,
        };
        if stamp.len() != 8 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(stamp, "%Y%m%d").ok()
    }
}

/// Append-only log file that rolls over at UTC midnight.
#[derive(Debug)]
pub struct RollingFile {
    path: PathBuf,
    naming: ArchiveNaming,
    retention: usize,
    state: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    file: File,
    day: NaiveDate,
}

impl RollingFile {
    /// Open `path` for appending. A non-empty file last written on an
    /// earlier day is archived first. `retention` of 0 keeps every archive.
    pub fn open(
        path: impl Into<PathBuf>,
        naming: ArchiveNaming,
        retention: usize,
    ) -> io::Result<Self> {
        let path = path.into();
        let today = Utc::now().date_naive();

        if let Some(day) = last_written_day(&path)? {
            if day < today {
                archive(&path, naming, day)?;
                prune(&path, naming, retention)?;
            }
        }

        let file = open_append(&path)?;
        Ok(Self {
            path,
            naming,
            retention,
            state: Mutex::new(FileState { file, day: today }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive the current file now, whatever the date, and start a new one.
    /// Returns the archive path, or `None` when there was nothing to archive.
    pub fn rollover(&self) -> io::Result<Option<PathBuf>> {
        let mut state = self.lock()?;
        state.file.flush()?;
        if fs::metadata(&self.path)?.len() == 0 {
            return Ok(None);
        }

        let archived = archive(&self.path, self.naming, state.day)?;
        prune(&self.path, self.naming, self.retention)?;
        state.file = open_append(&self.path)?;
        Ok(Some(archived))
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, FileState>> {
        self.state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))
    }

    fn roll_if_new_day(&self, state: &mut FileState) -> io::Result<()> {
        let today = Utc::now().date_naive();
        if today <= state.day {
            return Ok(());
        }

        state.file.flush()?;
        archive(&self.path, self.naming, state.day)?;
        prune(&self.path, self.naming, self.retention)?;
        state.file = open_append(&self.path)?;
        state.day = today;
        Ok(())
    }
}

/// Writer handed out per event by [`RollingFile`].
pub struct RollingWriter<'a>(&'a RollingFile);

impl Write for RollingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.0.lock()?;
        self.0.roll_if_new_day(&mut state)?;
        state.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock()?.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingFile {
    type Writer = RollingWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RollingWriter(self)
    }
}

/// Archive a closed log file if it holds anything, using its modification day.
pub fn rollover(
    path: &Path,
    naming: ArchiveNaming,
    retention: usize,
) -> io::Result<Option<PathBuf>> {
    match last_written_day(path)? {
        Some(day) => {
            let archived = archive(path, naming, day)?;
            prune(path, naming, retention)?;
            Ok(Some(archived))
        }
        None => Ok(None),
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// UTC day of the last write, `None` for a missing or empty file.
fn last_written_day(path: &Path) -> io::Result<Option<NaiveDate>> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if metadata.len() == 0 {
        return Ok(None);
    }
    let modified: DateTime<Utc> = metadata.modified()?.into();
    Ok(Some(modified.date_naive()))
}

fn base_name(path: &Path) -> io::Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))
}

/// Move `path` to its archive name for `day`. An archive that already exists
/// for that day is appended to.
fn archive(path: &Path, naming: ArchiveNaming, day: NaiveDate) -> io::Result<PathBuf> {
    let target = path.with_file_name(naming.archive_name(base_name(path)?, day));

    if target.exists() {
        let mut existing = OpenOptions::new().append(true).open(&target)?;
        let mut current = File::open(path)?;
        io::copy(&mut current, &mut existing)?;
        fs::remove_file(path)?;
    } else {
        fs::rename(path, &target)?;
    }
    Ok(target)
}

fn prune(path: &Path, naming: ArchiveNaming, retention: usize) -> io::Result<()> {
    if retention == 0 {
        return Ok(());
    }
    let base = base_name(path)?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut archives = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(day) = name.to_str().and_then(|n| naming.archive_day(base, n)) {
            archives.push((day, entry.path()));
        }
    }

    archives.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, stale) in archives.into_iter().skip(retention) {
        fs::remove_file(stale)?;
    }
    Ok(())
}
