//! Decoder for hourly-averaged OMNI2 solar-wind data.
//!
//! Rows are whitespace-delimited with no header. Only the columns below are
//! read; everything else on the row is ignored.

use crate::error;
use crate::records;
use crate::utils;

const COMPONENT: &str = "omni decoder";

const COL_YEAR: usize = 0;
const COL_DAY_OF_YEAR: usize = 1;
const COL_HOUR: usize = 2;
const COL_BX: usize = 12; // GSE/GSM share Bx
const COL_BY_GSM: usize = 15;
const COL_BZ_GSM: usize = 16;
const COL_PROTON_TEMPERATURE: usize = 22;
const COL_PROTON_DENSITY: usize = 23;
const COL_FLOW_SPEED: usize = 24;
const MIN_COLUMNS: usize = COL_FLOW_SPEED + 1;

/// Reads an OMNI2 hourly file into solar-wind records.
///
/// Rows must already be in increasing hourly order; they are neither sorted
/// nor deduplicated.
///
/// # Arguments
/// * `path` - Path to the whitespace-delimited OMNI file.
///
/// # Returns
/// * `error::Result<Vec<SolarWindRecord>>` - One record per row, or the first decode failure.
pub fn decode_file<P: AsRef<std::path::Path>>(path: P) -> error::Result<Vec<records::SolarWindRecord>> {
    let mapped = utils::map_text_file(path.as_ref())?;
    let records = decode_str(mapped.as_str(), &path.as_ref().display().to_string())?;
    tracing::info!(path = %path.as_ref().display(), records = records.len(), "decoded OMNI file");
    Ok(records)
}

/// Decodes OMNI text already in memory. `source_name` only labels errors.
pub fn decode_str(text: &str, source_name: &str) -> error::Result<Vec<records::SolarWindRecord>> {
    utils::data_lines(text)
        .map(|(line_no, line)| decode_row(line, line_no, source_name))
        .collect()
}

/// Rebuilds the row timestamp as Jan 1 of `year` at `hour`, plus `day_of_year - 1` days.
pub fn timestamp_from_day_of_year(year: i32, day_of_year: i64, hour: u32) -> Option<records::TimePoint> {
    let new_year = chrono::NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(hour, 0, 0)?;
    new_year.checked_add_signed(chrono::Duration::try_days(day_of_year - 1)?)
}

fn decode_row(line: &str, line_no: usize, source_name: &str) -> error::Result<records::SolarWindRecord> {
    let malformed = |field: String, reason: String| error::PipelineError::MalformedRecord {
        component: COMPONENT,
        source_name: source_name.to_string(),
        line: line_no,
        field,
        reason,
    };

    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() < MIN_COLUMNS {
        return Err(malformed(
            format!("column {}", columns.len()),
            format!("expected at least {} columns, got {}", MIN_COLUMNS, columns.len()),
        ));
    }

    // `f64::from_str` also accepts NaN and inf spellings, which are not measurements
    let parse = |col: usize, name: &str| -> error::Result<f64> {
        let field = || format!("column {} ({})", col, name);
        let value = columns[col]
            .parse::<f64>()
            .map_err(|e| malformed(field(), format!("{:?}: {}", columns[col], e)))?;
        if !value.is_finite() {
            return Err(malformed(field(), format!("{:?} is not a finite number", columns[col])));
        }
        Ok(value)
    };
    let parse_int = |col: usize, name: &str| -> error::Result<i64> {
        columns[col]
            .parse::<i64>()
            .map_err(|e| malformed(format!("column {} ({})", col, name), format!("{:?}: {}", columns[col], e)))
    };

    let year = parse_int(COL_YEAR, "year")?;
    let day_of_year = parse_int(COL_DAY_OF_YEAR, "day_of_year")?;
    let hour = parse_int(COL_HOUR, "hour")?;

    let time = i32::try_from(year)
        .ok()
        .zip(u32::try_from(hour).ok())
        .and_then(|(y, h)| timestamp_from_day_of_year(y, day_of_year, h))
        .ok_or_else(|| {
            malformed(
                format!("columns {}..={}", COL_YEAR, COL_HOUR),
                format!("year {} day {} hour {} is not a valid time", year, day_of_year, hour),
            )
        })?;

    Ok(records::SolarWindRecord {
        time,
        bx: parse(COL_BX, "bx")?,
        by: parse(COL_BY_GSM, "by")?,
        bz: parse(COL_BZ_GSM, "bz")?,
        plasma_flow_speed: parse(COL_FLOW_SPEED, "plasma_flow_speed")?,
        proton_density: parse(COL_PROTON_DENSITY, "proton_density")?,
        proton_temperature: parse(COL_PROTON_TEMPERATURE, "proton_temperature")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> records::TimePoint {
        chrono::NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    /// Builds a 28-column OMNI2-style row with distinct values in the used columns.
    pub(crate) fn omni_row(year: i32, day_of_year: u32, hour: u32, bz: f64) -> String {
        let mut cols: Vec<String> = (0..28).map(|c| format!("{}", 900 + c)).collect();
        cols[COL_YEAR] = year.to_string();
        cols[COL_DAY_OF_YEAR] = day_of_year.to_string();
        cols[COL_HOUR] = hour.to_string();
        cols[COL_BX] = "1.5".to_string();
        cols[COL_BY_GSM] = "-2.5".to_string();
        cols[COL_BZ_GSM] = format!("{:.1}", bz);
        cols[COL_PROTON_TEMPERATURE] = "120000.".to_string();
        cols[COL_PROTON_DENSITY] = "4.2".to_string();
        cols[COL_FLOW_SPEED] = "410.".to_string();
        cols.join("   ")
    }

    #[test]
    fn day_of_year_one_is_new_year() {
        assert_eq!(timestamp_from_day_of_year(2015, 1, 7), Some(at(2015, 1, 1, 7)));
    }

    #[test]
    fn day_of_year_rolls_over_months() {
        assert_eq!(timestamp_from_day_of_year(2015, 32, 0), Some(at(2015, 2, 1, 0)));
        assert_eq!(timestamp_from_day_of_year(2015, 60, 23), Some(at(2015, 3, 1, 23)));
        assert_eq!(timestamp_from_day_of_year(2016, 60, 23), Some(at(2016, 2, 29, 23)));
        assert_eq!(timestamp_from_day_of_year(2016, 366, 5), Some(at(2016, 12, 31, 5)));
    }

    #[test]
    fn row_columns_map_to_fields() {
        let records = decode_str(&omni_row(2015, 32, 4, -7.3), "mem").unwrap();
        let r = &records[0];
        assert_eq!(r.time, at(2015, 2, 1, 4));
        assert_eq!(r.bx, 1.5);
        assert_eq!(r.by, -2.5);
        assert_eq!(r.bz, -7.3);
        assert_eq!(r.proton_temperature, 120000.0);
        assert_eq!(r.proton_density, 4.2);
        assert_eq!(r.plasma_flow_speed, 410.0);
    }

    #[test]
    fn short_row_is_malformed() {
        let text = format!("{}\n2015 1 1 0.0", omni_row(2015, 1, 0, 0.0));
        match decode_str(&text, "omni.dat").unwrap_err() {
            error::PipelineError::MalformedRecord { line, component, .. } => {
                assert_eq!(line, 2);
                assert_eq!(component, COMPONENT);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_value_names_the_column() {
        let row = omni_row(2015, 1, 0, 0.0).replace("410.", "fast");
        match decode_str(&row, "mem").unwrap_err() {
            error::PipelineError::MalformedRecord { field, .. } => {
                assert_eq!(field, "column 24 (plasma_flow_speed)")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_values_are_malformed() {
        for (token, col, name) in [
            ("NaN", COL_BY_GSM, "by"),
            ("inf", COL_FLOW_SPEED, "plasma_flow_speed"),
            ("-infinity", COL_BZ_GSM, "bz"),
        ] {
            let mut cols: Vec<String> = omni_row(2015, 1, 0, 0.0).split_whitespace().map(String::from).collect();
            cols[col] = token.to_string();
            let text = format!("{}\n{}", omni_row(2014, 365, 23, 0.0), cols.join(" "));
            match decode_str(&text, "omni.dat").unwrap_err() {
                error::PipelineError::MalformedRecord { line, field, .. } => {
                    assert_eq!(line, 2);
                    assert_eq!(field, format!("column {} ({})", col, name));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn hour_out_of_range_is_malformed() {
        let row = omni_row(2015, 1, 24, 0.0);
        assert!(matches!(
            decode_str(&row, "mem").unwrap_err(),
            error::PipelineError::MalformedRecord { .. }
        ));
    }

    #[test]
    fn rows_keep_file_order() {
        let text = [omni_row(2015, 1, 2, 0.0), omni_row(2015, 1, 1, 0.0)].join("\n");
        let records = decode_str(&text, "mem").unwrap();
        assert_eq!(records[0].time, at(2015, 1, 1, 2));
        assert_eq!(records[1].time, at(2015, 1, 1, 1));
    }
}
