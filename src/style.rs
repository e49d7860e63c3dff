/// Counts at or above this value get the largest marker.
pub const SATURATION_COUNT: u64 = 30;

pub const FILL_OPACITY: f64 = 0.85;

const GREEN: &str = "#22c55e";
const AMBER: &str = "#eab308";
const ORANGE: &str = "#f97316";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    Compact,
    #[default]
    Full,
}

impl DeviceClass {
    fn radius_bounds(self) -> (f64, f64) {
        match self {
            DeviceClass::Compact => (8.0, 13.0),
            DeviceClass::Full => (7.0, 12.0),
        }
    }

    fn stroke_weight(self) -> f64 {
        match self {
            DeviceClass::Compact => 2.0,
            DeviceClass::Full => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn from_count(n: u64) -> Self {
        match n {
            0..=4 => Intensity::Low,
            5..=14 => Intensity::Medium,
            _ => Intensity::High,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Intensity::Low => GREEN,
            Intensity::Medium => AMBER,
            Intensity::High => ORANGE,
        }
    }
}

/// Visual encoding of one country's event volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub radius: f64,
    pub intensity: Intensity,
    pub fill_opacity: f64,
    pub weight: f64,
}

impl MarkerStyle {
    pub fn color(&self) -> &'static str {
        self.intensity.color()
    }

    /// Radius of the invisible click target around the dot.
    pub fn hit_radius(&self) -> f64 {
        self.radius * 2.5
    }

    pub fn hover_radius(&self) -> f64 {
        self.radius * 1.15
    }
}

pub fn style_for(event_count: u64, device: DeviceClass) -> MarkerStyle {
    let n = event_count.max(1);
    let ratio = (n as f64 / SATURATION_COUNT as f64).min(1.0);
    let (min_radius, max_radius) = device.radius_bounds();

    MarkerStyle {
        radius: min_radius + (max_radius - min_radius) * ratio,
        intensity: Intensity::from_count(n),
        fill_opacity: FILL_OPACITY,
        weight: device.stroke_weight(),
    }
}
