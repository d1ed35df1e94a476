#![forbid(unsafe_code)]

//! Published engineering limits the suggestion and outcome engines test against.

/// Maximum earth fault loop impedance (ohms) per protective device, BS 7671 Table 41.3
/// (0.4 s disconnection, Cmin 0.95).
static ZS_MAX_OHMS: &[(&str, f64)] = &[
    ("B6", 7.28),
    ("B10", 4.37),
    ("B16", 2.73),
    ("B20", 2.19),
    ("B25", 1.75),
    ("B32", 1.37),
    ("B40", 1.09),
    ("B50", 0.87),
    ("B63", 0.69),
    ("C6", 3.64),
    ("C10", 2.19),
    ("C16", 1.37),
    ("C20", 1.09),
    ("C25", 0.87),
    ("C32", 0.68),
    ("C40", 0.55),
    ("C50", 0.44),
    ("C63", 0.35),
    ("D6", 1.82),
    ("D10", 1.09),
    ("D16", 0.68),
    ("D20", 0.55),
    ("D25", 0.44),
    ("D32", 0.34),
    ("D40", 0.27),
    ("D50", 0.22),
    ("D63", 0.17),
];

/// Multiple of the tabulated Zs maximum above which a suggestion escalates to C1.
pub const ZS_DANGER_FACTOR: f64 = 1.5;

pub const ZS_REGULATION: &str = "BS 7671 Reg 411.4.4, Table 41.3";

/// Looks up the tabulated maximum for a device such as `B16`, `b 16` or `C32`.
pub fn zs_max_for_device(device_type: &str) -> Option<f64> {
    let normalized: String = device_type
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    ZS_MAX_OHMS
        .iter()
        .find(|(device, _)| *device == normalized)
        .map(|(_, max)| *max)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsulationResistanceLimits {
    pub critical_min_mohm: f64,
    pub advisory_min_mohm: f64,
    pub regulation: &'static str,
}

pub const ELECTRICAL_IR: InsulationResistanceLimits = InsulationResistanceLimits {
    critical_min_mohm: 0.5,
    advisory_min_mohm: 1.0,
    regulation: "BS 7671 Reg 643.3, Table 64",
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RcdTripLimits {
    /// Maximum trip time at 1x rated residual current.
    pub max_ms_at_1x: f64,
    /// Maximum trip time at 5x rated residual current.
    pub max_ms_at_5x: f64,
    pub regulation: &'static str,
}

pub const RCD_TRIP: RcdTripLimits = RcdTripLimits {
    max_ms_at_1x: 300.0,
    max_ms_at_5x: 40.0,
    regulation: "BS 7671 Reg 643.7.3, Reg 411.3.2",
};

pub const BONDING_REGULATION: &str = "BS 7671 Reg 411.3.1.2";
pub const LABELS_REGULATION: &str = "BS 7671 Reg 514";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireAlarmLimits {
    pub sounder_min_db: f64,
    pub sounder_min_db_bedroom: f64,
    pub battery_standby_min_hours: f64,
    pub sounder_regulation: &'static str,
    pub battery_regulation: &'static str,
}

pub const FIRE_ALARM: FireAlarmLimits = FireAlarmLimits {
    sounder_min_db: 65.0,
    sounder_min_db_bedroom: 75.0,
    battery_standby_min_hours: 24.0,
    sounder_regulation: "BS 5839-1 Clause 16.2",
    battery_regulation: "BS 5839-1 Clause 25.4",
};

impl FireAlarmLimits {
    pub fn sounder_min_for_location(&self, location: Option<&str>) -> f64 {
        match location {
            Some(l) if l.trim().eq_ignore_ascii_case("bedroom") => self.sounder_min_db_bedroom,
            _ => self.sounder_min_db,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmergencyLightingLimits {
    pub duration_min_hours: f64,
    pub lux_min: f64,
    pub duration_regulation: &'static str,
    pub lux_regulation: &'static str,
}

pub const EMERGENCY_LIGHTING: EmergencyLightingLimits = EmergencyLightingLimits {
    duration_min_hours: 3.0,
    lux_min: 1.0,
    duration_regulation: "BS 5266-1 Clause 5.3",
    lux_regulation: "BS EN 1838 Clause 4.2",
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPvLimits {
    pub ir_min_mohm: f64,
    pub earth_continuity_max_ohm: f64,
    pub voc_deviation_max_percent: f64,
    pub ir_regulation: &'static str,
    pub earth_continuity_regulation: &'static str,
    pub voc_regulation: &'static str,
}

pub const SOLAR_PV: SolarPvLimits = SolarPvLimits {
    ir_min_mohm: 1.0,
    earth_continuity_max_ohm: 1.0,
    voc_deviation_max_percent: 10.0,
    ir_regulation: "IEC 62446-1 Clause 6.4",
    earth_continuity_regulation: "IEC 62446-1 Clause 6.1",
    voc_regulation: "IEC 62446-1 Clause 6.3",
};

/// Percentage deviation of a measured open-circuit voltage from its expected value.
pub fn voc_deviation_percent(measured: f64, expected: f64) -> Option<f64> {
    if expected == 0.0 || !expected.is_finite() || !measured.is_finite() {
        return None;
    }
    Some(((measured - expected) / expected).abs() * 100.0)
}
