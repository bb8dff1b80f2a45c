use crate::error;
use crate::records;

/// Pairs the two decoded series after checking they share one timeline.
///
/// Timestamps are compared index by index, so a shift anywhere is caught even
/// if it would cancel out in aggregate. When every shared index matches but
/// one series is longer, the divergence is reported at the shorter length.
///
/// # Arguments
/// * `dst` - Decoded disturbance records.
/// * `imf` - Decoded solar-wind records.
///
/// # Returns
/// * `error::Result<AlignedSeries>` - The zipped series, or `Alignment` at the first divergent index.
pub fn align(
    dst: Vec<records::DisturbanceRecord>,
    imf: Vec<records::SolarWindRecord>,
) -> error::Result<records::AlignedSeries> {
    if let Some(index) = first_divergence(&dst, &imf) {
        return Err(error::PipelineError::Alignment {
            index,
            dst_time: dst.get(index).map(|r| r.time),
            imf_time: imf.get(index).map(|r| r.time),
        });
    }
    tracing::info!(hours = dst.len(), "series aligned");
    Ok(records::AlignedSeries::new_unchecked(dst, imf))
}

fn first_divergence(dst: &[records::DisturbanceRecord], imf: &[records::SolarWindRecord]) -> Option<usize> {
    dst.iter()
        .zip(imf)
        .position(|(d, i)| d.time != i.time)
        .or_else(|| (dst.len() != imf.len()).then(|| dst.len().min(imf.len())))
}
