use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointType {
    Electricity,
    Gas,
}

impl PointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electricity => "electricity",
            Self::Gas => "gas",
        }
    }

    /// URL path segment for this supply type, e.g. `electricity-meter-points`.
    pub fn path_segment(&self) -> String {
        format!("{}-meter-points", self.as_str())
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured meter: supply point identifier (MPAN or MPRN) plus the
/// serial number of the physical meter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterPoint {
    pub point_type: PointType,
    pub point: String,
    pub meter: String,
}

impl MeterPoint {
    pub fn electricity(mpan: impl Into<String>, meter: impl Into<String>) -> Self {
        Self {
            point_type: PointType::Electricity,
            point: mpan.into(),
            meter: meter.into(),
        }
    }

    pub fn gas(mprn: impl Into<String>, meter: impl Into<String>) -> Self {
        Self {
            point_type: PointType::Gas,
            point: mprn.into(),
            meter: meter.into(),
        }
    }
}
