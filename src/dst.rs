//! Decoder for the WDC hourly DST index format.
//!
//! Each line is one calendar day laid out at fixed character offsets:
//!
//! ```text
//! [3,5)    year within century       [14,16)  century
//! [5,7)    month                      [16,20)  base value
//! [8,10)   day                        [20,116) 24 hourly values, width 4
//!                                     [116,120) daily mean
//! ```

use crate::error;
use crate::records;
use crate::utils;

const COMPONENT: &str = "dst decoder";
const MIN_LINE_LEN: usize = 120;
const HOURLY_START: usize = 20;
const HOURLY_END: usize = 116;
const HOURLY_WIDTH: usize = 4;

/// Reads a DST file and expands every day line into 24 hourly records.
///
/// # Arguments
/// * `path` - Path to the fixed-width DST file.
///
/// # Returns
/// * `error::Result<Vec<DisturbanceRecord>>` - Records in file order, or the first decode failure.
pub fn decode_file<P: AsRef<std::path::Path>>(path: P) -> error::Result<Vec<records::DisturbanceRecord>> {
    let mapped = utils::map_text_file(path.as_ref())?;
    let records = decode_str(mapped.as_str(), &path.as_ref().display().to_string())?;
    tracing::info!(path = %path.as_ref().display(), records = records.len(), "decoded DST file");
    Ok(records)
}

/// Decodes DST text already in memory. `source_name` only labels errors.
pub fn decode_str(text: &str, source_name: &str) -> error::Result<Vec<records::DisturbanceRecord>> {
    let mut records = Vec::new();
    for (line_no, line) in utils::data_lines(text) {
        decode_line(line, line_no, source_name, &mut records)?;
    }
    Ok(records)
}

fn decode_line(
    line: &str,
    line_no: usize,
    source_name: &str,
    out: &mut Vec<records::DisturbanceRecord>,
) -> error::Result<()> {
    let malformed = |field: &str, reason: String| error::PipelineError::MalformedRecord {
        component: COMPONENT,
        source_name: source_name.to_string(),
        line: line_no,
        field: field.to_string(),
        reason,
    };

    if line.len() < MIN_LINE_LEN {
        return Err(malformed(
            "line",
            format!("expected at least {} characters, got {}", MIN_LINE_LEN, line.len()),
        ));
    }

    let slice = |field: &str, start: usize, end: usize| {
        line.get(start..end)
            .ok_or_else(|| malformed(field, format!("columns {}..{} are not plain text", start, end)))
    };
    let int_field = |field: &str, start: usize, end: usize| -> error::Result<i32> {
        let raw = slice(field, start, end)?;
        raw.trim()
            .parse::<i32>()
            .map_err(|e| malformed(field, format!("{:?} is not an integer: {}", raw, e)))
    };

    // century digits come after the year-within-century in the line
    let year_text = format!("{}{}", slice("year", 14, 16)?, slice("year", 3, 5)?);
    let year = year_text
        .trim()
        .parse::<i32>()
        .map_err(|e| malformed("year", format!("{:?} is not an integer: {}", year_text, e)))?;
    let month = int_field("month", 5, 7)?;
    let day = int_field("day", 8, 10)?;
    let base_value = int_field("base_value", 16, 20)?;
    let daily_mean = int_field("daily_mean", 116, 120)?;

    let date = u32::try_from(month)
        .ok()
        .zip(u32::try_from(day).ok())
        .and_then(|(m, d)| chrono::NaiveDate::from_ymd_opt(year, m, d))
        .ok_or_else(|| malformed("date", format!("{}-{}-{} is not a calendar date", year, month, day)))?;

    for offset in (HOURLY_START..HOURLY_END).step_by(HOURLY_WIDTH) {
        let hour = ((offset - HOURLY_START) / HOURLY_WIDTH) as u32;
        let field = format!("hour {}", hour);
        let index_value = int_field(field.as_str(), offset, offset + HOURLY_WIDTH)?;
        let time = date
            .and_hms_opt(hour, 0, 0)
            .ok_or_else(|| malformed(field.as_str(), format!("hour {} out of range", hour)))?;
        out.push(records::DisturbanceRecord {
            time,
            index_value,
            base_value,
            daily_mean,
        });
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a WDC-style day line for `year-month-day` with the given hourly values.
    pub(crate) fn day_line(year: i32, month: u32, day: u32, base: i32, hourly: &[i32; 24], mean: i32) -> String {
        let mut line = format!(
            "DST{:02}{:02}*{:02}RRX0{:02}{:4}",
            year % 100,
            month,
            day,
            year / 100,
            base
        );
        assert_eq!(line.len(), 20);
        for v in hourly {
            line.push_str(&format!("{:4}", v));
        }
        line.push_str(&format!("{:4}", mean));
        line
    }

    #[test]
    fn one_line_yields_24_ordered_hours() {
        let hourly: [i32; 24] = std::array::from_fn(|h| h as i32 - 12);
        let text = day_line(2015, 3, 17, 0, &hourly, -1);
        let records = decode_str(&text, "mem").unwrap();

        assert_eq!(records.len(), 24);
        for (h, r) in records.iter().enumerate() {
            assert_eq!(r.time, chrono::NaiveDate::from_ymd_opt(2015, 3, 17).unwrap().and_hms_opt(h as u32, 0, 0).unwrap());
            assert_eq!(r.index_value, h as i32 - 12);
            assert_eq!(r.base_value, 0);
            assert_eq!(r.daily_mean, -1);
        }
    }

    #[test]
    fn year_is_century_then_year_within_century() {
        let text = day_line(1999, 12, 31, 5, &[0; 24], 0);
        let records = decode_str(&text, "mem").unwrap();
        assert_eq!(records[0].time.date(), chrono::NaiveDate::from_ymd_opt(1999, 12, 31).unwrap());
        assert!(records.iter().all(|r| r.base_value == 5));
    }

    #[test]
    fn two_lines_and_blank_tail() {
        let text = format!(
            "{}\n{}\n\n",
            day_line(2015, 1, 31, 0, &[1; 24], 1),
            day_line(2015, 2, 1, 0, &[2; 24], 2)
        );
        let records = decode_str(&text, "mem").unwrap();
        assert_eq!(records.len(), 48);
        assert!(records.windows(2).all(|w| w[0].time < w[1].time));
        assert_eq!(records[24].daily_mean, 2);
    }

    #[test]
    fn short_line_fails_loudly() {
        let mut text = day_line(2015, 1, 1, 0, &[0; 24], 0);
        text.truncate(118);
        let err = decode_str(&text, "mem").unwrap_err();
        match err {
            error::PipelineError::MalformedRecord { line, field, .. } => {
                assert_eq!(line, 1);
                assert_eq!(field, "line");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_integer_hour_names_the_field() {
        let good = day_line(2015, 1, 1, 0, &[0; 24], 0);
        let mut bad = day_line(2015, 1, 2, 0, &[0; 24], 0);
        bad.replace_range(24..28, " x1 ");
        let text = format!("{}\n{}", good, bad);
        match decode_str(&text, "dst.txt").unwrap_err() {
            error::PipelineError::MalformedRecord { line, field, source_name, .. } => {
                assert_eq!(line, 2);
                assert_eq!(field, "hour 1");
                assert_eq!(source_name, "dst.txt");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn impossible_date_is_rejected() {
        let text = day_line(2015, 2, 30, 0, &[0; 24], 0);
        match decode_str(&text, "mem").unwrap_err() {
            error::PipelineError::MalformedRecord { field, .. } => assert_eq!(field, "date"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decodes_from_disk() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), day_line(2016, 2, 29, 0, &[-30; 24], -30)).unwrap();
        let records = decode_file(file.path()).unwrap();
        assert_eq!(records.len(), 24);
        assert_eq!(records[23].index_value, -30);
    }
}
