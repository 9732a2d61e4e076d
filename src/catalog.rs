//! Truck category catalog and pricing rules.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{BookingError, Result};

/// Vehicle class a load can require.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruckCategory {
    #[default]
    GeneralCargo,
    Flatbed,
    Reefer,
    ArticulatedTrailer,
    Tanker,
    DumpTruck,
}

impl TruckCategory {
    /// All categories in catalog order.
    pub const ALL: [TruckCategory; 6] = [
        TruckCategory::GeneralCargo,
        TruckCategory::Flatbed,
        TruckCategory::Reefer,
        TruckCategory::ArticulatedTrailer,
        TruckCategory::Tanker,
        TruckCategory::DumpTruck,
    ];

    /// Wire id, e.g. `general_cargo`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TruckCategory::GeneralCargo => "general_cargo",
            TruckCategory::Flatbed => "flatbed",
            TruckCategory::Reefer => "reefer",
            TruckCategory::ArticulatedTrailer => "articulated_trailer",
            TruckCategory::Tanker => "tanker",
            TruckCategory::DumpTruck => "dump_truck",
        }
    }
}

impl fmt::Display for TruckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TruckCategory {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        TruckCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| BookingError::InvalidCategory(wanted.to_string()))
    }
}

/// Capability tag of a category. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialFlag {
    TempControl,
    Hazmat,
    FoodGrade,
}

/// Per-category pricing in PKR.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingMultipliers {
    /// Flat fee per trip.
    pub base: f64,
    /// Charge per kilometre.
    pub per_km: f64,
    /// Charge per waiting hour.
    pub wait_rate: f64,
    /// Refrigeration factor (>= 1), only for categories that can run cold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reefer_multiplier: Option<f64>,
}

/// Static description of one vehicle class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruckCategoryDetails {
    pub id: TruckCategory,
    pub name: String,
    pub description: String,
    /// Advisory payload bounds; not enforced against load weight.
    pub min_payload_tons: f64,
    pub max_payload_tons: f64,
    pub special_flags: Vec<SpecialFlag>,
    pub pricing_multipliers: PricingMultipliers,
}

impl TruckCategoryDetails {
    /// Whether `weight_tons` lies inside the advisory payload range.
    pub fn fits_payload(&self, weight_tons: f64) -> bool {
        weight_tons >= self.min_payload_tons && weight_tons <= self.max_payload_tons
    }
}

/// Ordered, immutable list of categories keyed by id.
#[derive(Clone, Debug)]
pub struct CategoryCatalog {
    entries: Vec<TruckCategoryDetails>,
}

impl CategoryCatalog {
    /// Build a catalog; ids must be unique.
    pub fn new(entries: Vec<TruckCategoryDetails>) -> Result<Self> {
        for (i, e) in entries.iter().enumerate() {
            if entries[..i].iter().any(|prev| prev.id == e.id) {
                return Err(BookingError::InvalidCategory(format!(
                    "duplicate catalog entry {}",
                    e.id
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The six built-in categories with their standard PKR rates.
    pub fn standard() -> Self {
        let entry = |id: TruckCategory,
                     name: &str,
                     description: &str,
                     payload: (f64, f64),
                     special_flags: Vec<SpecialFlag>,
                     rates: (f64, f64, f64, Option<f64>)| {
            TruckCategoryDetails {
                id,
                name: name.into(),
                description: description.into(),
                min_payload_tons: payload.0,
                max_payload_tons: payload.1,
                special_flags,
                pricing_multipliers: PricingMultipliers {
                    base: rates.0,
                    per_km: rates.1,
                    wait_rate: rates.2,
                    reefer_multiplier: rates.3,
                },
            }
        };

        Self {
            entries: vec![
                entry(
                    TruckCategory::GeneralCargo,
                    "General Cargo / Box Truck",
                    "For palletized goods and general items.",
                    (1.0, 25.0),
                    vec![],
                    (5000.0, 100.0, 500.0, None),
                ),
                entry(
                    TruckCategory::Flatbed,
                    "Flatbed",
                    "Ideal for steel, lumber, and machinery.",
                    (5.0, 40.0),
                    vec![],
                    (8000.0, 120.0, 600.0, None),
                ),
                entry(
                    TruckCategory::Reefer,
                    "Reefer (Refrigerated)",
                    "For temperature-sensitive goods.",
                    (3.0, 22.0),
                    vec![SpecialFlag::TempControl, SpecialFlag::FoodGrade],
                    (12000.0, 150.0, 800.0, Some(1.4)),
                ),
                entry(
                    TruckCategory::ArticulatedTrailer,
                    "Articulated / Trailer (40ft/20ft)",
                    "For containers and heavy machinery.",
                    (20.0, 60.0),
                    vec![],
                    (15000.0, 180.0, 1000.0, None),
                ),
                entry(
                    TruckCategory::Tanker,
                    "Tanker",
                    "For liquids (food-grade or chemical).",
                    (10.0, 35.0),
                    vec![SpecialFlag::Hazmat, SpecialFlag::FoodGrade],
                    (10000.0, 140.0, 700.0, None),
                ),
                entry(
                    TruckCategory::DumpTruck,
                    "Dump Truck",
                    "For sand, gravel, and construction debris.",
                    (10.0, 30.0),
                    vec![],
                    (7000.0, 130.0, 650.0, None),
                ),
            ],
        }
    }

    /// Look up a category by id.
    pub fn find(&self, id: TruckCategory) -> Result<&TruckCategoryDetails> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| BookingError::InvalidCategory(id.to_string()))
    }

    /// Parse a free-text id and look it up.
    pub fn resolve(&self, raw: &str) -> Result<&TruckCategoryDetails> {
        self.find(raw.parse()?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TruckCategoryDetails> {
        self.entries.iter()
    }

    /// Ids in catalog order.
    pub fn ids(&self) -> Vec<TruckCategory> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Display name for an id, or `N/A` when it is not in the catalog.
    pub fn name_of(&self, id: TruckCategory) -> &str {
        self.find(id).map(|d| d.name.as_str()).unwrap_or("N/A")
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_order_and_rates() {
        let catalog = CategoryCatalog::standard();
        assert_eq!(catalog.ids(), TruckCategory::ALL.to_vec());

        let general = catalog.find(TruckCategory::GeneralCargo).unwrap();
        assert_eq!(general.pricing_multipliers.base, 5000.0);
        assert_eq!(general.pricing_multipliers.per_km, 100.0);
        assert_eq!(general.pricing_multipliers.wait_rate, 500.0);
        assert!(general.pricing_multipliers.reefer_multiplier.is_none());

        let reefer = catalog.find(TruckCategory::Reefer).unwrap();
        assert_eq!(reefer.pricing_multipliers.reefer_multiplier, Some(1.4));
        assert!(reefer.special_flags.contains(&SpecialFlag::TempControl));
    }

    #[test]
    fn test_only_reefer_has_multiplier() {
        let catalog = CategoryCatalog::standard();
        let with_multiplier: Vec<_> = catalog
            .iter()
            .filter(|c| c.pricing_multipliers.reefer_multiplier.is_some())
            .map(|c| c.id)
            .collect();
        assert_eq!(with_multiplier, vec![TruckCategory::Reefer]);
    }

    #[test]
    fn test_resolve_parses_wire_ids() {
        let catalog = CategoryCatalog::standard();
        assert_eq!(
            catalog.resolve("dump_truck").unwrap().id,
            TruckCategory::DumpTruck
        );
        assert_eq!(
            catalog.resolve(" Flatbed ").unwrap().id,
            TruckCategory::Flatbed
        );
        assert_eq!(
            catalog.resolve("hovercraft"),
            Err(BookingError::InvalidCategory("hovercraft".into()))
        );
    }

    #[test]
    fn test_find_missing_entry() {
        let standard = CategoryCatalog::standard();
        let only_flatbed = CategoryCatalog::new(vec![
            standard.find(TruckCategory::Flatbed).unwrap().clone(),
        ])
        .unwrap();
        assert!(matches!(
            only_flatbed.find(TruckCategory::Tanker),
            Err(BookingError::InvalidCategory(_))
        ));
        assert_eq!(only_flatbed.name_of(TruckCategory::Tanker), "N/A");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let standard = CategoryCatalog::standard();
        let flatbed = standard.find(TruckCategory::Flatbed).unwrap().clone();
        assert!(CategoryCatalog::new(vec![flatbed.clone(), flatbed]).is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&TruckCategory::ArticulatedTrailer).unwrap();
        assert_eq!(json, "\"articulated_trailer\"");
        let back: TruckCategory = serde_json::from_str("\"dump_truck\"").unwrap();
        assert_eq!(back, TruckCategory::DumpTruck);
    }

    #[test]
    fn test_payload_bounds_are_inclusive() {
        let catalog = CategoryCatalog::standard();
        let general = catalog.find(TruckCategory::GeneralCargo).unwrap();
        assert!(general.fits_payload(1.0));
        assert!(general.fits_payload(25.0));
        assert!(!general.fits_payload(25.5));
    }
}
