//! Risk tier classification and clinical recommendation texts

use serde::{Deserialize, Serialize};
use crate::thresholds::Thresholds;

/// Bilirubin below the exchange threshold by less than this is "Very High"
pub const EXCHANGE_MARGIN: f64 = 3.0;
/// Bilirubin below the phototherapy threshold by less than this is "Moderate"
pub const PHOTOTHERAPY_MARGIN: f64 = 2.0;
/// Bilirubin this far above the phototherapy threshold needs intensive phototherapy
pub const INTENSIVE_MARGIN: f64 = 2.0;
/// Phototherapy can stop this far below the threshold
pub const DISCONTINUATION_OFFSET: f64 = 4.0;
pub const DISCONTINUATION_FLOOR: f64 = 8.0;

/// Ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "Threshold View")]
    ThresholdView,
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
    Critical,
}

impl RiskTier {
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::ThresholdView => "Threshold View",
            RiskTier::Low => "Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High",
            RiskTier::VeryHigh => "Very High",
            RiskTier::Critical => "Critical",
        }
    }

    /// Background colour of the risk assessment panel
    pub fn panel_rgb(self) -> (u8, u8, u8) {
        match self {
            RiskTier::ThresholdView | RiskTier::Low => (0xf0, 0xf9, 0xff),
            RiskTier::Moderate => (0xfe, 0xf3, 0xc7),
            RiskTier::High => (0xfe, 0xd7, 0xaa),
            RiskTier::VeryHigh | RiskTier::Critical => (0xfe, 0xca, 0xca),
        }
    }

    /// Text colour of the tier heading
    pub fn text_rgb(self) -> (u8, u8, u8) {
        match self {
            RiskTier::ThresholdView | RiskTier::Low => (0x1e, 0x40, 0xaf),
            RiskTier::Moderate => (0x92, 0x40, 0x0e),
            RiskTier::High => (0x9a, 0x34, 0x12),
            RiskTier::VeryHigh | RiskTier::Critical => (0x99, 0x1b, 0x1b),
        }
    }
}

/// Pick the tier for a bilirubin value; `None` means no measurement was entered
pub fn classify(bilirubin: Option<f64>, thresholds: &Thresholds) -> RiskTier {
    let Some(bili) = bilirubin else {
        return RiskTier::ThresholdView;
    };

    if bili >= thresholds.exchange {
        RiskTier::Critical
    } else if bili >= thresholds.exchange - EXCHANGE_MARGIN {
        RiskTier::VeryHigh
    } else if bili >= thresholds.phototherapy {
        RiskTier::High
    } else if bili >= thresholds.phototherapy - PHOTOTHERAPY_MARGIN {
        RiskTier::Moderate
    } else {
        RiskTier::Low
    }
}

/// Level below which phototherapy may be discontinued
pub fn discontinuation_level(thresholds: &Thresholds) -> f64 {
    (thresholds.phototherapy - DISCONTINUATION_OFFSET).max(DISCONTINUATION_FLOOR)
}

/// Recommendation texts for one classified measurement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Assessment {
    pub recommendation: String,
    pub phototherapy: String,
    pub escalation: String,
    pub exchange: String,
    pub confirmatory: String,
    pub intensive_phototherapy: bool,
    pub discontinuation: String,
}

/// Build the recommendation texts for a tier
pub fn assess(tier: RiskTier, bilirubin: Option<f64>, thresholds: &Thresholds) -> Assessment {
    let bili = match bilirubin {
        Some(b) if tier != RiskTier::ThresholdView => b,
        _ => {
            return Assessment {
                recommendation: "Thresholds displayed - enter bilirubin level for specific recommendations".to_string(),
                ..Default::default()
            };
        }
    };

    let discontinuation = format!(
        "If initiating phototherapy for this measurement, consider discontinuation when bilirubin less than {:.1} mg/dL",
        discontinuation_level(thresholds)
    );

    let mut a = match tier {
        RiskTier::Critical => Assessment {
            recommendation: "URGENT: Exchange transfusion indicated".to_string(),
            exchange: "IMMEDIATE exchange transfusion required".to_string(),
            escalation: "Emergency neonatology consultation - do not delay".to_string(),
            confirmatory: "Confirm immediately with serum bilirubin".to_string(),
            phototherapy: "Intensive phototherapy while preparing for exchange".to_string(),
            intensive_phototherapy: true,
            ..Default::default()
        },
        RiskTier::VeryHigh => Assessment {
            recommendation: "Intensive phototherapy + prepare for exchange".to_string(),
            phototherapy: "INTENSIVE phototherapy immediately".to_string(),
            escalation: "Prepare for possible exchange transfusion".to_string(),
            confirmatory: "Confirm with serum bilirubin immediately".to_string(),
            intensive_phototherapy: true,
            ..Default::default()
        },
        RiskTier::High => {
            let intensive = bili >= thresholds.phototherapy + INTENSIVE_MARGIN;
            Assessment {
                recommendation: "Phototherapy indicated".to_string(),
                phototherapy: if intensive {
                    "INTENSIVE phototherapy immediately".to_string()
                } else {
                    "Start phototherapy immediately".to_string()
                },
                escalation: "Monitor bilirubin every 4-6 hours".to_string(),
                confirmatory: "Confirm with serum bilirubin if TcB used".to_string(),
                intensive_phototherapy: intensive,
                ..Default::default()
            }
        }
        RiskTier::Moderate => Assessment {
            recommendation: "Close monitoring - approaching phototherapy threshold".to_string(),
            phototherapy: "Phototherapy may be needed soon".to_string(),
            escalation: "Repeat bilirubin in 2-4 hours".to_string(),
            confirmatory: "Confirm with serum bilirubin".to_string(),
            ..Default::default()
        },
        RiskTier::Low | RiskTier::ThresholdView => Assessment {
            recommendation: "Continue routine monitoring".to_string(),
            phototherapy: "No phototherapy needed at this time".to_string(),
            escalation: "Routine follow-up".to_string(),
            confirmatory: "Current level acceptable".to_string(),
            ..Default::default()
        },
    };
    a.discontinuation = discontinuation;
    a
}

/// Follow-up actions listed under "Clinical Recommendations"
pub fn follow_up_actions(tier: RiskTier) -> &'static [&'static str] {
    match tier {
        RiskTier::ThresholdView => &[
            "Obtain bilirubin measurement for specific recommendations",
            "Use transcutaneous or serum bilirubin measurement",
            "Consider timing of measurement based on clinical assessment",
        ],
        RiskTier::Critical => &[
            "URGENT: Immediate exchange transfusion preparation",
            "Intensive phototherapy while preparing for exchange",
            "Neonatal intensive care unit consultation",
        ],
        RiskTier::VeryHigh => &[
            "Start intensive phototherapy immediately",
            "Prepare for possible exchange transfusion",
            "Neonatal intensive care unit consultation",
        ],
        RiskTier::High | RiskTier::Moderate => &[
            "Initiate or intensify phototherapy immediately",
            "Monitor bilirubin levels every 4-6 hours",
            "Ensure adequate hydration and feeding",
        ],
        RiskTier::Low => &[
            "Continue routine monitoring",
            "Follow standard discharge planning",
            "Educate parents on jaundice monitoring",
        ],
    }
}

/// Notes shown under every result
pub fn clinical_notes(has_risk_factors: bool) -> Vec<&'static str> {
    let mut notes = vec![
        "These thresholds are based on AAP 2022 guidelines",
        "Clinical judgment should always guide patient care decisions",
        "Consider individual patient factors and institutional protocols",
    ];
    if has_risk_factors {
        notes.push("Risk factors present: Lower thresholds applied");
    }
    notes
}
