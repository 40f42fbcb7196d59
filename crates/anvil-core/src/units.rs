//! Scene unit settings and the import scale factor

use serde::{Deserialize, Serialize};

/// Length of one inch in meters. XModel files are authored in inches.
pub const INCH_IN_METERS: f32 = 0.0254;

/// Unit system of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    None,
    Metric,
    Imperial,
}

/// Unit settings stored on a scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitSettings {
    pub system: UnitSystem,
    /// Scene units per meter
    pub scale_length: f32,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            system: UnitSystem::None,
            scale_length: 1.0,
        }
    }
}

/// Factor converting scene units to inches.
///
/// Without `apply_unit_scale` one scene unit is taken to be one inch.
pub fn unit_scale_factor(settings: &UnitSettings, apply_unit_scale: bool) -> f32 {
    if !apply_unit_scale {
        return 1.0;
    }
    settings.scale_length / INCH_IN_METERS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_is_identity_unless_applied() {
        let settings = UnitSettings {
            system: UnitSystem::Metric,
            scale_length: 2.0,
        };
        assert_eq!(unit_scale_factor(&settings, false), 1.0);
    }

    #[test]
    fn applied_factor_converts_to_inches() {
        let settings = UnitSettings::default();
        let factor = unit_scale_factor(&settings, true);
        assert!((factor - 39.370_08).abs() < 1e-3);
    }
}
