//! Where a rendered report goes.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::render::OutputFormat;

/// Output location. `-` means standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    /// `<dir>/changelog-<date>.<ext>`, or stdout for `-`.
    pub fn resolve(output: &str, date: NaiveDate, format: OutputFormat) -> Self {
        if output == "-" {
            return Destination::Stdout;
        }
        let file = format!("changelog-{}.{}", date.format("%Y-%m-%d"), format.extension());
        Destination::File(Path::new(output).join(file))
    }

    /// Writes `content`, creating the output directory when it does not exist.
    pub fn write(&self, content: &str) -> io::Result<()> {
        match self {
            Destination::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                stdout.flush()
            }
            Destination::File(path) => {
                if let Some(dir) = path.parent() {
                    if !dir.as_os_str().is_empty() {
                        fs::create_dir_all(dir)?;
                    }
                }
                fs::write(path, content)
            }
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Stdout => f.write_str("stdout"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}
