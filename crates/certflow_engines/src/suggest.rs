#![forbid(unsafe_code)]

use certflow_kernel_contracts::cert_type::{get_type_category, CertCategory};
use certflow_kernel_contracts::certificate::ObservationCode;
use certflow_kernel_contracts::suggestion::{Measurement, ObservationSuggestion};

use crate::thresholds::{
    zs_max_for_device, BONDING_REGULATION, ELECTRICAL_IR, EMERGENCY_LIGHTING, FIRE_ALARM,
    LABELS_REGULATION, RCD_TRIP, SOLAR_PV, ZS_DANGER_FACTOR, ZS_REGULATION,
};

/// Suggests a defect code for a reading that breaches its threshold.
///
/// `None` means the reading is acceptable or cannot be assessed (unknown
/// certificate type, unknown field, unknown protective device, non-finite value).
pub fn suggest_observation_code(
    cert_type: &str,
    measurement: &Measurement,
) -> Option<ObservationSuggestion> {
    if !measurement.value.is_finite() {
        return None;
    }
    match get_type_category(cert_type)? {
        CertCategory::Electrical => suggest_electrical(measurement),
        CertCategory::Fire => suggest_fire(measurement),
        CertCategory::EmergencyLighting => suggest_emergency_lighting(measurement),
        CertCategory::SolarPv => suggest_solar(measurement),
    }
}

fn suggestion(
    code: ObservationCode,
    reason: String,
    regulation: &str,
    fix_guidance: &str,
) -> Option<ObservationSuggestion> {
    Some(ObservationSuggestion {
        code,
        reason,
        regulation: regulation.to_string(),
        fix_guidance: fix_guidance.to_string(),
    })
}

fn suggest_electrical(m: &Measurement) -> Option<ObservationSuggestion> {
    let v = m.value;
    match m.field.as_str() {
        "zs" => {
            let device = m.device_type()?;
            let max = zs_max_for_device(device)?;
            if v > max * ZS_DANGER_FACTOR {
                suggestion(
                    ObservationCode::C1,
                    format!(
                        "Measured Zs {v:.2} Ω significantly exceeds the {max:.2} Ω maximum for {device}; disconnection time likely exceeded"
                    ),
                    ZS_REGULATION,
                    "Isolate the circuit, investigate the earth fault path and remedy before re-energising",
                )
            } else if v > max {
                suggestion(
                    ObservationCode::C2,
                    format!("Measured Zs {v:.2} Ω exceeds the {max:.2} Ω maximum for {device}"),
                    ZS_REGULATION,
                    "Investigate the earth fault loop path; improve earthing or change the protective device",
                )
            } else {
                None
            }
        }
        "ir" => {
            if v < ELECTRICAL_IR.critical_min_mohm {
                suggestion(
                    ObservationCode::C1,
                    format!(
                        "Insulation resistance {v} MΩ is below the {} MΩ minimum",
                        ELECTRICAL_IR.critical_min_mohm
                    ),
                    ELECTRICAL_IR.regulation,
                    "Isolate the circuit and locate the insulation fault before re-energising",
                )
            } else if v < ELECTRICAL_IR.advisory_min_mohm {
                suggestion(
                    ObservationCode::C2,
                    format!(
                        "Insulation resistance {v} MΩ is below the {} MΩ recommended minimum",
                        ELECTRICAL_IR.advisory_min_mohm
                    ),
                    ELECTRICAL_IR.regulation,
                    "Investigate deteriorating insulation; check for moisture ingress or damaged cables",
                )
            } else {
                None
            }
        }
        "rcd" => {
            if v > RCD_TRIP.max_ms_at_1x {
                suggestion(
                    ObservationCode::C1,
                    format!(
                        "RCD trip time {v} ms exceeds the {} ms limit",
                        RCD_TRIP.max_ms_at_1x
                    ),
                    RCD_TRIP.regulation,
                    "Replace the RCD and retest",
                )
            } else if v > RCD_TRIP.max_ms_at_5x {
                suggestion(
                    ObservationCode::C2,
                    format!(
                        "RCD trip time {v} ms exceeds the {} ms limit for additional protection",
                        RCD_TRIP.max_ms_at_5x
                    ),
                    RCD_TRIP.regulation,
                    "Test the RCD at 5×IΔn and replace if it does not meet 40 ms",
                )
            } else {
                None
            }
        }
        "bonding" if v == 0.0 => suggestion(
            ObservationCode::C2,
            "Main protective bonding absent or inadequate".to_string(),
            BONDING_REGULATION,
            "Install main protective bonding conductors to incoming services",
        ),
        "labels" if v == 0.0 => suggestion(
            ObservationCode::C3,
            "Required warning and identification labels missing".to_string(),
            LABELS_REGULATION,
            "Fit the required labels at the origin and consumer unit",
        ),
        _ => None,
    }
}

fn suggest_fire(m: &Measurement) -> Option<ObservationSuggestion> {
    let v = m.value;
    match m.field.as_str() {
        "sounder_level" => {
            let min = FIRE_ALARM.sounder_min_for_location(m.location());
            if v < min {
                suggestion(
                    ObservationCode::Critical,
                    format!("Sounder level {v} dB(A) is below the {min} dB(A) minimum"),
                    FIRE_ALARM.sounder_regulation,
                    "Add or relocate sounders to achieve the required sound pressure level",
                )
            } else {
                None
            }
        }
        "battery_standby" if v < FIRE_ALARM.battery_standby_min_hours => suggestion(
            ObservationCode::Critical,
            format!(
                "Battery standby {v} h is below the {} h minimum",
                FIRE_ALARM.battery_standby_min_hours
            ),
            FIRE_ALARM.battery_regulation,
            "Replace standby batteries and confirm the battery capacity calculation",
        ),
        _ => None,
    }
}

fn suggest_emergency_lighting(m: &Measurement) -> Option<ObservationSuggestion> {
    let v = m.value;
    match m.field.as_str() {
        "duration" if v < EMERGENCY_LIGHTING.duration_min_hours => suggestion(
            ObservationCode::Critical,
            format!(
                "Emergency duration {v} h is below the {} h rated minimum",
                EMERGENCY_LIGHTING.duration_min_hours
            ),
            EMERGENCY_LIGHTING.duration_regulation,
            "Replace the luminaire battery and repeat the full duration test",
        ),
        "lux" if v < EMERGENCY_LIGHTING.lux_min => suggestion(
            ObservationCode::Critical,
            format!(
                "Escape route illuminance {v} lx is below the {} lx minimum",
                EMERGENCY_LIGHTING.lux_min
            ),
            EMERGENCY_LIGHTING.lux_regulation,
            "Add or reposition emergency luminaires along the escape route",
        ),
        _ => None,
    }
}

fn suggest_solar(m: &Measurement) -> Option<ObservationSuggestion> {
    let v = m.value;
    match m.field.as_str() {
        "ir" if v < SOLAR_PV.ir_min_mohm => suggestion(
            ObservationCode::Critical,
            format!(
                "Array insulation resistance {v} MΩ is below the {} MΩ minimum",
                SOLAR_PV.ir_min_mohm
            ),
            SOLAR_PV.ir_regulation,
            "Isolate the string and locate the insulation fault",
        ),
        "earth_continuity" if v > SOLAR_PV.earth_continuity_max_ohm => suggestion(
            ObservationCode::Critical,
            format!(
                "Protective earth continuity {v} Ω exceeds the {} Ω maximum",
                SOLAR_PV.earth_continuity_max_ohm
            ),
            SOLAR_PV.earth_continuity_regulation,
            "Check array frame earthing connections and bonding conductors",
        ),
        "voc_deviation" if v > SOLAR_PV.voc_deviation_max_percent => suggestion(
            ObservationCode::Major,
            format!(
                "String Voc deviates {v}% from expected, above the {}% tolerance",
                SOLAR_PV.voc_deviation_max_percent
            ),
            SOLAR_PV.voc_regulation,
            "Check string configuration, module count and connector integrity",
        ),
        _ => None,
    }
}
