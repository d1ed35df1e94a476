#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertCategory {
    Electrical,
    Fire,
    EmergencyLighting,
    SolarPv,
}

impl CertCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            CertCategory::Electrical => "electrical",
            CertCategory::Fire => "fire",
            CertCategory::EmergencyLighting => "emergency_lighting",
            CertCategory::SolarPv => "solar_pv",
        }
    }

    /// Categories whose observations use the C1/C2/C3/FI (or mapped Critical/Major/Minor/Info)
    /// severity vocabulary in outcome computation.
    pub fn uses_observation_codes(self) -> bool {
        matches!(self, CertCategory::Electrical | CertCategory::Fire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CertType {
    #[serde(rename = "EIC")]
    Eic,
    #[serde(rename = "EICR")]
    Eicr,
    #[serde(rename = "MWC")]
    Mwc,
    #[serde(rename = "FIRE_DESIGN")]
    FireDesign,
    #[serde(rename = "FIRE_INSTALLATION")]
    FireInstallation,
    #[serde(rename = "FIRE_COMMISSIONING")]
    FireCommissioning,
    #[serde(rename = "FIRE_ACCEPTANCE")]
    FireAcceptance,
    #[serde(rename = "FIRE_INSPECTION_SERVICING")]
    FireInspectionServicing,
    #[serde(rename = "EL_COMPLETION")]
    ElCompletion,
    #[serde(rename = "EL_PERIODIC")]
    ElPeriodic,
    #[serde(rename = "SOLAR_INSTALLATION")]
    SolarInstallation,
    #[serde(rename = "SOLAR_PERIODIC")]
    SolarPeriodic,
}

impl CertType {
    pub const ALL: [CertType; 12] = [
        CertType::Eic,
        CertType::Eicr,
        CertType::Mwc,
        CertType::FireDesign,
        CertType::FireInstallation,
        CertType::FireCommissioning,
        CertType::FireAcceptance,
        CertType::FireInspectionServicing,
        CertType::ElCompletion,
        CertType::ElPeriodic,
        CertType::SolarInstallation,
        CertType::SolarPeriodic,
    ];

    pub fn as_str(self) -> &'static str {
        self.metadata().code
    }

    pub fn parse(code: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|m| m.code == code)
            .map(|m| m.cert_type)
    }

    pub fn metadata(self) -> &'static CertTypeMetadata {
        // REGISTRY is indexed in ALL order.
        &REGISTRY[self as usize]
    }

    pub fn category(self) -> CertCategory {
        self.metadata().category
    }
}

impl std::fmt::Display for CertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureRole {
    Engineer,
    Customer,
    Designer,
}

impl SignatureRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureRole::Engineer => "engineer",
            SignatureRole::Customer => "customer",
            SignatureRole::Designer => "designer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertTypeMetadata {
    pub cert_type: CertType,
    pub code: &'static str,
    pub label: &'static str,
    pub category: CertCategory,
    pub standard: &'static str,
    pub required_signature_roles: &'static [SignatureRole],
    pub checklist_sections: &'static [&'static str],
}

const ELECTRICAL_FULL_SECTIONS: &[&str] = &[
    "visual_inspection",
    "protection",
    "earthing_bonding",
    "wiring_systems",
    "consumer_units",
];
const FIRE_SYSTEM_SECTIONS: &[&str] = &[
    "detection_coverage",
    "sounders_alarms",
    "control_equipment",
    "power_supplies",
];

const ENGINEER_CUSTOMER: &[SignatureRole] = &[SignatureRole::Engineer, SignatureRole::Customer];

static REGISTRY: [CertTypeMetadata; 12] = [
    CertTypeMetadata {
        cert_type: CertType::Eic,
        code: "EIC",
        label: "Electrical Installation Certificate",
        category: CertCategory::Electrical,
        standard: "BS 7671",
        required_signature_roles: &[
            SignatureRole::Engineer,
            SignatureRole::Designer,
            SignatureRole::Customer,
        ],
        checklist_sections: ELECTRICAL_FULL_SECTIONS,
    },
    CertTypeMetadata {
        cert_type: CertType::Eicr,
        code: "EICR",
        label: "Electrical Installation Condition Report",
        category: CertCategory::Electrical,
        standard: "BS 7671",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: ELECTRICAL_FULL_SECTIONS,
    },
    CertTypeMetadata {
        cert_type: CertType::Mwc,
        code: "MWC",
        label: "Minor Electrical Installation Works Certificate",
        category: CertCategory::Electrical,
        standard: "BS 7671",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: &["visual_inspection", "protection", "earthing_bonding"],
    },
    CertTypeMetadata {
        cert_type: CertType::FireDesign,
        code: "FIRE_DESIGN",
        label: "Fire Detection and Alarm System Design Certificate",
        category: CertCategory::Fire,
        standard: "BS 5839-1",
        required_signature_roles: &[SignatureRole::Designer, SignatureRole::Customer],
        checklist_sections: &["system_design", "detection_coverage"],
    },
    CertTypeMetadata {
        cert_type: CertType::FireInstallation,
        code: "FIRE_INSTALLATION",
        label: "Fire Detection and Alarm System Installation Certificate",
        category: CertCategory::Fire,
        standard: "BS 5839-1",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: FIRE_SYSTEM_SECTIONS,
    },
    CertTypeMetadata {
        cert_type: CertType::FireCommissioning,
        code: "FIRE_COMMISSIONING",
        label: "Fire Detection and Alarm System Commissioning Certificate",
        category: CertCategory::Fire,
        standard: "BS 5839-1",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: FIRE_SYSTEM_SECTIONS,
    },
    CertTypeMetadata {
        cert_type: CertType::FireAcceptance,
        code: "FIRE_ACCEPTANCE",
        label: "Fire Detection and Alarm System Acceptance Certificate",
        category: CertCategory::Fire,
        standard: "BS 5839-1",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: &["detection_coverage", "logbook"],
    },
    CertTypeMetadata {
        cert_type: CertType::FireInspectionServicing,
        code: "FIRE_INSPECTION_SERVICING",
        label: "Fire Detection and Alarm System Inspection and Servicing Certificate",
        category: CertCategory::Fire,
        standard: "BS 5839-1",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: &[
            "detection_coverage",
            "sounders_alarms",
            "control_equipment",
            "power_supplies",
            "logbook",
        ],
    },
    CertTypeMetadata {
        cert_type: CertType::ElCompletion,
        code: "EL_COMPLETION",
        label: "Emergency Lighting Completion Certificate",
        category: CertCategory::EmergencyLighting,
        standard: "BS 5266-1",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: &["luminaires", "duration_test", "signage", "logbook"],
    },
    CertTypeMetadata {
        cert_type: CertType::ElPeriodic,
        code: "EL_PERIODIC",
        label: "Emergency Lighting Periodic Inspection and Test Certificate",
        category: CertCategory::EmergencyLighting,
        standard: "BS 5266-1",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: &["luminaires", "duration_test", "logbook"],
    },
    CertTypeMetadata {
        cert_type: CertType::SolarInstallation,
        code: "SOLAR_INSTALLATION",
        label: "Solar PV Installation and Commissioning Certificate",
        category: CertCategory::SolarPv,
        standard: "IEC 62446-1",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: &[
            "array_inspection",
            "inverter",
            "dc_isolation",
            "ac_connection",
            "labelling",
        ],
    },
    CertTypeMetadata {
        cert_type: CertType::SolarPeriodic,
        code: "SOLAR_PERIODIC",
        label: "Solar PV Periodic Verification Report",
        category: CertCategory::SolarPv,
        standard: "IEC 62446-1",
        required_signature_roles: ENGINEER_CUSTOMER,
        checklist_sections: &["array_inspection", "inverter", "dc_isolation", "labelling"],
    },
];

pub fn get_type_category(code: &str) -> Option<CertCategory> {
    CertType::parse(code).map(CertType::category)
}

pub fn is_valid_cert_type(code: &str) -> bool {
    CertType::parse(code).is_some()
}

pub fn get_cert_type_metadata(code: &str) -> Option<&'static CertTypeMetadata> {
    CertType::parse(code).map(CertType::metadata)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecklistTemplateItem {
    pub section: &'static str,
    pub question: &'static str,
}

fn section_questions(section: &str) -> &'static [&'static str] {
    match section {
        "visual_inspection" => &[
            "Condition of accessories and enclosures acceptable",
            "No signs of thermal damage or overheating",
        ],
        "protection" => &[
            "Protective devices correctly rated for circuit conductors",
            "RCD protection provided where required",
        ],
        "earthing_bonding" => &[
            "Main earthing conductor present and adequately sized",
            "Main protective bonding to incoming services present",
        ],
        "wiring_systems" => &[
            "Cables adequately supported and protected",
            "Cables concealed in walls installed in safe zones or protected",
        ],
        "consumer_units" => &[
            "Consumer unit enclosure of non-combustible construction",
            "Circuit chart present and legible",
        ],
        "system_design" => &[
            "System category agreed with the purchaser and documented",
            "Variations from the standard identified and agreed",
        ],
        "detection_coverage" => &[
            "Detector siting provides coverage for the system category",
            "No obstructions within the detector clearance zone",
        ],
        "sounders_alarms" => &[
            "Alarm audible throughout the protected premises",
            "Visual alarm devices fitted where required",
        ],
        "control_equipment" => &[
            "Control panel displays no fault conditions",
            "Zone chart displayed adjacent to the panel",
        ],
        "power_supplies" => &[
            "Mains supply via dedicated, labelled isolator",
            "Standby batteries in date and correctly charged",
        ],
        "logbook" => &["Logbook present and entries up to date"],
        "luminaires" => &[
            "All luminaires present, clean and undamaged",
            "Charging indicators illuminated",
        ],
        "duration_test" => &["Full rated duration test completed"],
        "signage" => &["Exit and directional signage visible and correct"],
        "array_inspection" => &[
            "Array mounting secure and free from damage",
            "DC cabling protected from UV and mechanical damage",
        ],
        "inverter" => &["Inverter operational with no fault codes"],
        "dc_isolation" => &["DC isolator fitted, accessible and correctly rated"],
        "ac_connection" => &["AC isolation and protective device correctly rated"],
        "labelling" => &["Dual-supply and DC warning labels fitted"],
        _ => &[],
    }
}

/// Default checklist a new certificate of `cert_type` is populated from.
pub fn default_checklist(cert_type: CertType) -> Vec<ChecklistTemplateItem> {
    cert_type
        .metadata()
        .checklist_sections
        .iter()
        .flat_map(|&section| {
            section_questions(section)
                .iter()
                .map(move |&question| ChecklistTemplateItem { section, question })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_registry_01_registry_is_indexed_in_declaration_order() {
        for t in CertType::ALL {
            assert_eq!(t.metadata().cert_type, t);
        }
    }

    #[test]
    fn at_registry_02_lookup_by_wire_code() {
        assert_eq!(get_type_category("EICR"), Some(CertCategory::Electrical));
        assert_eq!(
            get_type_category("EL_PERIODIC"),
            Some(CertCategory::EmergencyLighting)
        );
        assert_eq!(
            get_type_category("SOLAR_INSTALLATION"),
            Some(CertCategory::SolarPv)
        );
        assert!(is_valid_cert_type("FIRE_DESIGN"));
        assert!(!is_valid_cert_type("eicr"));
        assert!(get_cert_type_metadata("GAS_SAFETY").is_none());
    }

    #[test]
    fn at_registry_03_eic_requires_designer_signature() {
        let meta = get_cert_type_metadata("EIC").unwrap();
        assert!(meta
            .required_signature_roles
            .contains(&SignatureRole::Designer));
        let eicr = get_cert_type_metadata("EICR").unwrap();
        assert!(!eicr
            .required_signature_roles
            .contains(&SignatureRole::Designer));
    }

    #[test]
    fn at_registry_04_default_checklist_covers_every_section() {
        for t in CertType::ALL {
            let items = default_checklist(t);
            for section in t.metadata().checklist_sections {
                assert!(
                    items.iter().any(|i| i.section == *section),
                    "{} missing questions for {}",
                    t,
                    section
                );
            }
        }
    }

    #[test]
    fn at_registry_05_serde_uses_wire_codes() {
        let s = serde_json::to_string(&CertType::FireInspectionServicing).unwrap();
        assert_eq!(s, "\"FIRE_INSPECTION_SERVICING\"");
        let back: CertType = serde_json::from_str("\"MWC\"").unwrap();
        assert_eq!(back, CertType::Mwc);
    }
}
