//! Rule-based fare calculation.

use serde::{Deserialize, Serialize};

use crate::{
    catalog::TruckCategoryDetails,
    error::{BookingError, Result},
};

/// Commission the platform adds on top of the pre-fee subtotal.
pub const PLATFORM_COMMISSION_RATE: f64 = 0.15;
/// Night surcharge, applied to base fee plus distance charge.
pub const NIGHT_SURCHARGE_RATE: f64 = 0.15;

/// Inputs for one fare calculation.
#[derive(Clone, Debug)]
pub struct TripParameters<'a> {
    /// Category whose pricing rules apply.
    pub category: &'a TruckCategoryDetails,
    /// Trip distance in kilometres.
    pub km: f64,
    /// Expected waiting time in hours.
    pub wait_h: f64,
    /// Night trip flag.
    pub night: bool,
    /// Refrigeration requested. Ignored when the category has no reefer multiplier.
    pub reefer: bool,
    /// Road tolls in PKR.
    pub tolls: f64,
}

impl<'a> TripParameters<'a> {
    /// Daytime, dry, toll-free trip.
    pub fn new(category: &'a TruckCategoryDetails, km: f64, wait_h: f64) -> Self {
        Self {
            category,
            km,
            wait_h,
            night: false,
            reefer: false,
            tolls: 0.0,
        }
    }

    pub fn night(mut self, night: bool) -> Self {
        self.night = night;
        self
    }

    pub fn reefer(mut self, reefer: bool) -> Self {
        self.reefer = reefer;
        self
    }

    pub fn tolls(mut self, tolls: f64) -> Self {
        self.tolls = tolls;
        self
    }

    /// Reject negative or non-finite quantities. `calculate_fare` itself
    /// accepts anything; callers run this first.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("km", self.km), ("wait_h", self.wait_h), ("tolls", self.tolls)] {
            if !value.is_finite() || value < 0.0 {
                return Err(BookingError::InvalidTrip(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Itemized fare in whole PKR.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub base_fee: i64,
    pub distance_charge: i64,
    pub waiting_charge: i64,
    pub night_surcharge: i64,
    pub reefer_surcharge: i64,
    pub tolls: i64,
    pub platform_fee: i64,
    pub total_fare: i64,
    pub driver_payout: i64,
}

impl FareBreakdown {
    /// Sum of the pre-fee components as rounded.
    pub fn subtotal(&self) -> i64 {
        self.base_fee
            + self.distance_charge
            + self.waiting_charge
            + self.night_surcharge
            + self.reefer_surcharge
            + self.tolls
    }

    /// Label/amount pairs for display. Zero surcharges are left out.
    pub fn line_items(&self) -> Vec<(&'static str, i64)> {
        let mut items = vec![
            ("Base Fare", self.base_fee),
            ("Distance Charge", self.distance_charge),
            ("Waiting Charge", self.waiting_charge),
        ];
        if self.night_surcharge > 0 {
            items.push(("Night Surcharge", self.night_surcharge));
        }
        if self.reefer_surcharge > 0 {
            items.push(("Reefer Surcharge", self.reefer_surcharge));
        }
        if self.tolls > 0 {
            items.push(("Tolls", self.tolls));
        }
        items.push(("Platform Fee", self.platform_fee));
        items
    }
}

/// Compute the fare for a trip.
///
/// Every component is computed in floating point and rounded on its own
/// (half-up). The driver payout is taken from the rounded total and fee so
/// that `driver_payout + platform_fee == total_fare` always holds.
pub fn calculate_fare(params: &TripParameters<'_>) -> FareBreakdown {
    let m = &params.category.pricing_multipliers;

    let base = m.base;
    let distance = m.per_km * params.km;
    let waiting = m.wait_rate * params.wait_h;

    let night = if params.night {
        (base + distance) * NIGHT_SURCHARGE_RATE
    } else {
        0.0
    };
    let reefer = match m.reefer_multiplier {
        Some(multiplier) if params.reefer => (base + distance) * (multiplier - 1.0),
        _ => 0.0,
    };

    let subtotal = base + distance + waiting + night + reefer + params.tolls;
    let platform_fee = subtotal * PLATFORM_COMMISSION_RATE;
    let total_fare = subtotal + platform_fee;

    let platform_fee = round_half_up(platform_fee);
    let total_fare = round_half_up(total_fare);

    FareBreakdown {
        base_fee: round_half_up(base),
        distance_charge: round_half_up(distance),
        waiting_charge: round_half_up(waiting),
        night_surcharge: round_half_up(night),
        reefer_surcharge: round_half_up(reefer),
        tolls: round_half_up(params.tolls),
        platform_fee,
        total_fare,
        driver_payout: total_fare - platform_fee,
    }
}

/// Round to the nearest integer, ties toward positive infinity.
fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CategoryCatalog, TruckCategory};
    use proptest::prelude::*;

    fn catalog() -> CategoryCatalog {
        CategoryCatalog::standard()
    }

    #[test]
    fn test_general_cargo_scenario() {
        let catalog = catalog();
        let general = catalog.find(TruckCategory::GeneralCargo).unwrap();
        let fare = calculate_fare(&TripParameters::new(general, 1200.0, 2.0).tolls(3500.0));

        assert_eq!(fare.base_fee, 5000);
        assert_eq!(fare.distance_charge, 120_000);
        assert_eq!(fare.waiting_charge, 1000);
        assert_eq!(fare.night_surcharge, 0);
        assert_eq!(fare.reefer_surcharge, 0);
        assert_eq!(fare.tolls, 3500);
        assert_eq!(fare.subtotal(), 129_500);
        assert_eq!(fare.platform_fee, 19_425);
        assert_eq!(fare.total_fare, 148_925);
        assert_eq!(fare.driver_payout, 129_500);
    }

    #[test]
    fn test_general_cargo_night_scenario() {
        let catalog = catalog();
        let general = catalog.find(TruckCategory::GeneralCargo).unwrap();
        let fare = calculate_fare(
            &TripParameters::new(general, 1200.0, 2.0)
                .night(true)
                .tolls(3500.0),
        );

        assert_eq!(fare.night_surcharge, 18_750);
        assert_eq!(fare.subtotal(), 148_250);
        assert!((22_237..=22_238).contains(&fare.platform_fee));
        assert!((170_487..=170_488).contains(&fare.total_fare));
        assert_eq!(fare.driver_payout + fare.platform_fee, fare.total_fare);
        assert!((fare.driver_payout - 148_250).abs() <= 1);
    }

    #[test]
    fn test_reefer_surcharge_for_reefer_category() {
        let catalog = catalog();
        let reefer = catalog.find(TruckCategory::Reefer).unwrap();
        let fare = calculate_fare(&TripParameters::new(reefer, 100.0, 0.0).reefer(true));
        // (12000 + 15000) * 0.4
        assert_eq!(fare.reefer_surcharge, 10_800);
    }

    #[test]
    fn test_reefer_flag_ignored_without_multiplier() {
        let catalog = catalog();
        for category in catalog.iter().filter(|c| c.id != TruckCategory::Reefer) {
            let fare =
                calculate_fare(&TripParameters::new(category, 500.0, 1.0).reefer(true));
            assert_eq!(fare.reefer_surcharge, 0, "{}", category.id);
        }
    }

    #[test]
    fn test_night_surcharge_excludes_waiting_and_tolls() {
        let catalog = catalog();
        let flatbed = catalog.find(TruckCategory::Flatbed).unwrap();
        let quiet = calculate_fare(&TripParameters::new(flatbed, 100.0, 0.0).night(true));
        let busy = calculate_fare(
            &TripParameters::new(flatbed, 100.0, 10.0)
                .night(true)
                .tolls(9000.0),
        );
        assert_eq!(quiet.night_surcharge, busy.night_surcharge);
    }

    fn trip(
        category: &TruckCategoryDetails,
        km: f64,
        wait_h: f64,
        night: bool,
        reefer: bool,
        tolls: f64,
    ) -> FareBreakdown {
        calculate_fare(
            &TripParameters::new(category, km, wait_h)
                .night(night)
                .reefer(reefer)
                .tolls(tolls),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        #[test]
        fn test_payout_plus_fee_equals_total(
            idx in 0usize..TruckCategory::ALL.len(),
            km in 0.0f64..3000.0,
            wait_h in 0.0f64..48.0,
            night in any::<bool>(),
            reefer in any::<bool>(),
            tolls in 0.0f64..20_000.0,
        ) {
            let catalog = catalog();
            let category = catalog.find(TruckCategory::ALL[idx]).unwrap();
            let fare = trip(category, km, wait_h, night, reefer, tolls);

            prop_assert_eq!(fare.driver_payout + fare.platform_fee, fare.total_fare);
            // Each of the seven rounded parts is off by at most half a rupee.
            let parts = fare.subtotal() + fare.platform_fee;
            prop_assert!((parts - fare.total_fare).abs() <= 4);
        }

        #[test]
        fn test_night_surcharge_follows_flag(
            idx in 0usize..TruckCategory::ALL.len(),
            km in 0.0f64..3000.0,
            wait_h in 0.0f64..48.0,
            night in any::<bool>(),
            tolls in 0.0f64..20_000.0,
        ) {
            let catalog = catalog();
            let category = catalog.find(TruckCategory::ALL[idx]).unwrap();
            let fare = trip(category, km, wait_h, night, false, tolls);
            if night {
                prop_assert!(fare.night_surcharge > 0);
            } else {
                prop_assert_eq!(fare.night_surcharge, 0);
            }
        }

        #[test]
        fn test_reefer_surcharge_needs_multiplier_and_flag(
            idx in 0usize..TruckCategory::ALL.len(),
            km in 0.0f64..3000.0,
            night in any::<bool>(),
            reefer in any::<bool>(),
        ) {
            let catalog = catalog();
            let category = catalog.find(TruckCategory::ALL[idx]).unwrap();
            let fare = trip(category, km, 1.0, night, reefer, 0.0);
            let applies = reefer && category.pricing_multipliers.reefer_multiplier.is_some();
            if applies {
                prop_assert!(fare.reefer_surcharge > 0);
            } else {
                prop_assert_eq!(fare.reefer_surcharge, 0);
            }
        }

        #[test]
        fn test_plain_trip_is_scaled_subtotal(
            idx in 0usize..TruckCategory::ALL.len(),
            km in 0.0f64..3000.0,
            wait_h in 0.0f64..48.0,
        ) {
            let catalog = catalog();
            let category = catalog.find(TruckCategory::ALL[idx]).unwrap();
            let m = &category.pricing_multipliers;
            let fare = trip(category, km, wait_h, false, false, 0.0);

            let scale = 1.0 + PLATFORM_COMMISSION_RATE;
            let expected =
                (m.base * scale + m.per_km * km * scale + m.wait_rate * wait_h * scale).round();
            prop_assert!((fare.total_fare - expected as i64).abs() <= 1);
            // Rounded parts stay within their own slack of the total.
            prop_assert!((fare.subtotal() + fare.platform_fee - fare.total_fare).abs() <= 3);
        }
    }

    #[test]
    fn test_rounding_is_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.4999), 2);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(0.0), 0);
    }

    #[test]
    fn test_validate_rejects_negative_and_nan() {
        let catalog = catalog();
        let general = catalog.find(TruckCategory::GeneralCargo).unwrap();
        assert!(TripParameters::new(general, 10.0, 0.0).validate().is_ok());
        assert!(matches!(
            TripParameters::new(general, -1.0, 0.0).validate(),
            Err(BookingError::InvalidTrip(_))
        ));
        assert!(TripParameters::new(general, 1.0, f64::NAN).validate().is_err());
        assert!(TripParameters::new(general, 1.0, 0.0).tolls(-5.0).validate().is_err());
    }

    #[test]
    fn test_line_items_skip_zero_surcharges() {
        let catalog = catalog();
        let general = catalog.find(TruckCategory::GeneralCargo).unwrap();
        let fare = calculate_fare(&TripParameters::new(general, 10.0, 0.0));
        let labels: Vec<_> = fare.line_items().into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            labels,
            vec!["Base Fare", "Distance Charge", "Waiting Charge", "Platform Fee"]
        );
    }
}
