/// Hourly timestamp shared by both series (minutes and seconds are always zero).
pub type TimePoint = chrono::NaiveDateTime;

/// One hour of the geomagnetic disturbance (DST) index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisturbanceRecord {
    pub time: TimePoint,
    pub index_value: i32, // nT
    pub base_value: i32,
    pub daily_mean: i32,
}

/// One hourly-averaged row of interplanetary magnetic field and plasma data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarWindRecord {
    pub time: TimePoint,
    /// GSM frame, nT.
    pub bx: f64,
    pub by: f64,
    pub bz: f64,
    pub plasma_flow_speed: f64,  // km/s
    pub proton_density: f64,     // N/cm^3
    pub proton_temperature: f64, // K
}

/// Solar-wind column that can be fed to the regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Bx,
    By,
    Bz,
    PlasmaFlowSpeed,
    ProtonDensity,
    ProtonTemperature,
}

impl Feature {
    pub fn label(self) -> &'static str {
        match self {
            Feature::Bx => "bx",
            Feature::By => "by",
            Feature::Bz => "bz",
            Feature::PlasmaFlowSpeed => "plasma_flow_speed",
            Feature::ProtonDensity => "proton_density",
            Feature::ProtonTemperature => "proton_temperature",
        }
    }

    pub fn value(self, record: &SolarWindRecord) -> f64 {
        match self {
            Feature::Bx => record.bx,
            Feature::By => record.by,
            Feature::Bz => record.bz,
            Feature::PlasmaFlowSpeed => record.plasma_flow_speed,
            Feature::ProtonDensity => record.proton_density,
            Feature::ProtonTemperature => record.proton_temperature,
        }
    }
}

impl std::str::FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bx" => Ok(Feature::Bx),
            "by" => Ok(Feature::By),
            "bz" => Ok(Feature::Bz),
            "speed" => Ok(Feature::PlasmaFlowSpeed),
            "density" => Ok(Feature::ProtonDensity),
            "temperature" => Ok(Feature::ProtonTemperature),
            other => Err(format!("unknown feature: {}", other)),
        }
    }
}

/// Disturbance and solar-wind series proven to share one hourly timeline.
///
/// Only `alignment::align` constructs this, so `dst[i].time == imf[i].time`
/// holds for every index.
#[derive(Debug, Clone)]
pub struct AlignedSeries {
    dst: Vec<DisturbanceRecord>,
    imf: Vec<SolarWindRecord>,
}

impl AlignedSeries {
    pub(crate) fn new_unchecked(dst: Vec<DisturbanceRecord>, imf: Vec<SolarWindRecord>) -> Self {
        AlignedSeries { dst, imf }
    }

    pub fn len(&self) -> usize {
        self.dst.len()
    }

    pub fn times(&self) -> Vec<TimePoint> {
        self.dst.iter().map(|r| r.time).collect()
    }

    /// DST index as regression labels.
    pub fn labels(&self) -> Vec<f64> {
        self.dst.iter().map(|r| r.index_value as f64).collect()
    }

    pub fn base_values(&self) -> Vec<f64> {
        self.dst.iter().map(|r| r.base_value as f64).collect()
    }

    pub fn daily_means(&self) -> Vec<f64> {
        self.dst.iter().map(|r| r.daily_mean as f64).collect()
    }

    pub fn feature(&self, feature: Feature) -> Vec<f64> {
        self.imf.iter().map(|r| feature.value(r)).collect()
    }
}
