/// How a feature column is rescaled before it reaches the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureTransform {
    pub scale: f64,
    /// Move the scaled column by its own minimum so it starts at zero.
    pub shift_to_min: bool,
}

impl Default for FeatureTransform {
    fn default() -> Self {
        FeatureTransform {
            scale: 1.0,
            shift_to_min: false,
        }
    }
}

impl FeatureTransform {
    /// Applies the transform, preserving order and length.
    ///
    /// With `shift_to_min`, `output[i] = input[i] * scale - min(input * scale)`,
    /// which brings a signed field component into a nonnegative range.
    pub fn apply(&self, column: &[f64]) -> Vec<f64> {
        let scaled = column.iter().map(|v| v * self.scale);
        if !self.shift_to_min {
            return scaled.collect();
        }
        // subtract the minimum (not add it) so a negative minimum lands on zero
        let min = scaled.clone().fold(f64::INFINITY, f64::min);
        scaled.map(|v| v - min).collect()
    }
}
