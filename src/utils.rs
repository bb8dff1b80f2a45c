use crate::error;
use crate::records;

/// Configures a custom Rayon thread pool with specified size.
///
/// Used when `--threads` is given so the capacity sweep runs on exactly
/// that many workers instead of the global pool.
///
/// # Arguments
/// * `num_threads` - Desired number of threads for the pool.
///
/// # Returns
/// * `Result<ThreadPool>` - Created thread pool or an error if creation fails.
pub fn configure_thread_pool(num_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
}

/// Text contents of an input file, backed by a read-only memory map.
///
/// Empty files are not mapped (a zero-length mapping is rejected by some
/// platforms) and read back as an empty string.
pub struct MappedText {
    mmap: Option<memmap2::Mmap>,
}

impl MappedText {
    pub fn as_str(&self) -> &str {
        match &self.mmap {
            // validated as UTF-8 in `map_text_file`
            Some(m) => std::str::from_utf8(m).unwrap_or_default(),
            None => "",
        }
    }
}

/// Memory-maps `path` and checks that it holds UTF-8 text.
///
/// # Arguments
/// * `path` - Input file to map.
///
/// # Returns
/// * `error::Result<MappedText>` - The mapped text, or `Io` / `InvalidEncoding`.
pub fn map_text_file<P: AsRef<std::path::Path>>(path: P) -> error::Result<MappedText> {
    let path = path.as_ref();
    let io_err = |source| error::PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::open(path).map_err(io_err)?;
    if file.metadata().map_err(io_err)?.len() == 0 {
        return Ok(MappedText { mmap: None });
    }
    let mmap = unsafe { memmap2::Mmap::map(&file).map_err(io_err)? };
    if std::str::from_utf8(&mmap).is_err() {
        return Err(error::PipelineError::InvalidEncoding {
            path: path.to_path_buf(),
        });
    }
    Ok(MappedText { mmap: Some(mmap) })
}

/// Yields `(line_number, line)` for every non-blank line, 1-based, with any
/// trailing `\r` removed.
pub fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Formats an hourly timestamp as `YYYYMMDD HHMMSS`, matching console output
/// of the report module.
pub fn format_timestamp(ts: &records::TimePoint) -> String {
    ts.format("%Y%m%d %H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn data_lines_skips_blanks_and_strips_cr() {
        let lines: Vec<_> = data_lines("a\r\n\n  \nb\n").collect();
        assert_eq!(lines, vec![(1, "a"), (4, "b")]);
    }

    #[test]
    fn empty_file_maps_to_empty_text() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mapped = map_text_file(file.path()).unwrap();
        assert_eq!(mapped.as_str(), "");
    }

    #[test]
    fn non_utf8_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00]).unwrap();
        let err = map_text_file(file.path()).err().unwrap();
        assert!(matches!(err, error::PipelineError::InvalidEncoding { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = map_text_file("/nonexistent/dst.txt").err().unwrap();
        assert!(matches!(err, error::PipelineError::Io { .. }));
    }

    #[test]
    fn timestamp_format() {
        let t = chrono::NaiveDate::from_ymd_opt(2024, 6, 13)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();
        assert_eq!(format_timestamp(&t), "20240613 100000");
    }
}
