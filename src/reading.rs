use std::fmt;

/// The energy commodity a reading was taken for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Commodity {
    Gas,
    Electricity,
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Commodity::Gas => write!(f, "gas"),
            Commodity::Electricity => write!(f, "electricity"),
        }
    }
}

/// Whether a reading is instantaneous power (watts) or a cumulative meter total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadingType {
    Live,
    Meter,
}

impl fmt::Display for ReadingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingType::Live => write!(f, "live"),
            ReadingType::Meter => write!(f, "meter"),
        }
    }
}

/// A single normalized reading, produced fresh on every poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub commodity: Commodity,
    pub reading_type: ReadingType,
    pub value: f64,
}

impl Reading {
    pub fn new(commodity: Commodity, reading_type: ReadingType, value: f64) -> Self {
        Self {
            commodity,
            reading_type,
            value,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {:.0}",
            self.commodity, self.reading_type, self.value
        )
    }
}
