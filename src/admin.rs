//! Admin console: platform figures and user/load search.

use chrono::{TimeZone, Utc};

use crate::{
    catalog::TruckCategory,
    driver::demo_load,
    fare::PLATFORM_COMMISSION_RATE,
    load::{LatLng, Load, LoadStatus},
    users::User,
};

/// Headline numbers for the admin overview.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlatformStats {
    pub total_users: usize,
    /// Loads currently in transit.
    pub active_loads: usize,
    pub completed_trips: usize,
    /// Platform commission earned on delivered loads, in PKR.
    pub total_revenue: i64,
}

pub fn platform_stats(users: &[User], loads: &[Load]) -> PlatformStats {
    let delivered = || loads.iter().filter(|l| l.status == LoadStatus::Delivered);
    let revenue: f64 = delivered()
        .map(|l| l.payout as f64 * PLATFORM_COMMISSION_RATE)
        .sum();
    PlatformStats {
        total_users: users.len(),
        active_loads: loads
            .iter()
            .filter(|l| l.status == LoadStatus::InTransit)
            .count(),
        completed_trips: delivered().count(),
        total_revenue: revenue.round() as i64,
    }
}

/// Case-insensitive substring match on phone or status. Blank matches all.
pub fn search_users<'a>(users: &'a [User], query: &str) -> Vec<&'a User> {
    let query = query.trim().to_lowercase();
    users
        .iter()
        .filter(|u| {
            query.is_empty()
                || u.phone.to_lowercase().contains(&query)
                || u.status.to_string().contains(&query)
        })
        .collect()
}

/// Case-insensitive substring match on id, shipper or status. Blank matches all.
pub fn search_loads<'a>(loads: &'a [Load], query: &str) -> Vec<&'a Load> {
    let query = query.trim().to_lowercase();
    loads
        .iter()
        .filter(|l| {
            query.is_empty()
                || l.id.to_lowercase().contains(&query)
                || l.shipper_id.to_lowercase().contains(&query)
                || l.status.to_string().contains(&query)
        })
        .collect()
}

/// Insert or replace by id; new loads go first.
pub fn upsert_load(loads: &mut Vec<Load>, load: Load) {
    match loads.iter_mut().find(|l| l.id == load.id) {
        Some(existing) => *existing = load,
        None => loads.insert(0, load),
    }
}

/// Platform-wide load ledger the admin console starts with.
pub fn sample_loads() -> Vec<Load> {
    let at = |lat, lng| LatLng { lat, lng };
    let listed = |load: Load, shipper: &str, status: LoadStatus| {
        let completed_at = (status == LoadStatus::Delivered)
            .then(|| Utc.with_ymd_and_hms(2023, 10, 24, 14, 0, 0).single())
            .flatten();
        Load {
            shipper_id: shipper.into(),
            status,
            completed_at,
            ..load
        }
    };
    vec![
        listed(
            demo_load(
                "LD58291",
                ("Karachi Port", at(24.8400, 66.9800)),
                ("Lahore Dry Port", at(31.5204, 74.3587)),
                TruckCategory::ArticulatedTrailer,
                "Imported Machinery",
                28.0,
                85_000,
            ),
            "user_shipper_1",
            LoadStatus::InTransit,
        ),
        listed(
            demo_load(
                "LD93742",
                ("Faisalabad", at(31.4504, 73.1350)),
                ("Multan", at(30.1575, 71.5249)),
                TruckCategory::GeneralCargo,
                "Fertilizer Bags",
                20.0,
                45_000,
            ),
            "user_shipper_2",
            LoadStatus::Delivered,
        ),
        listed(
            demo_load(
                "LD10934",
                ("Sialkot", at(32.4945, 74.5229)),
                ("Rawalpindi", at(33.5651, 73.0169)),
                TruckCategory::GeneralCargo,
                "Surgical Instruments",
                12.0,
                32_000,
            ),
            "user_shipper_1",
            LoadStatus::Pending,
        ),
        listed(
            demo_load(
                "LD38475",
                ("Gwadar", at(25.1216, 62.3254)),
                ("Quetta", at(30.1798, 66.9750)),
                TruckCategory::Flatbed,
                "Building Materials",
                30.0,
                110_000,
            ),
            "user_shipper_1",
            LoadStatus::Delivered,
        ),
        listed(
            demo_load(
                "LD69201",
                ("Hyderabad", at(25.3960, 68.3578)),
                ("Sukkur", at(27.7052, 68.8574)),
                TruckCategory::GeneralCargo,
                "Rice Sacks",
                15.0,
                25_000,
            ),
            "user_shipper_1",
            LoadStatus::Cancelled,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{InMemoryUserStore, UserStatus, UserStore};

    fn users() -> Vec<User> {
        InMemoryUserStore::seeded().list()
    }

    #[test]
    fn test_stats_over_sample_ledger() {
        let stats = platform_stats(&users(), &sample_loads());
        assert_eq!(stats.total_users, 6);
        assert_eq!(stats.active_loads, 1);
        assert_eq!(stats.completed_trips, 2);
        // (45,000 + 110,000) * 15%
        assert_eq!(stats.total_revenue, 23_250);
    }

    #[test]
    fn test_stats_empty() {
        assert_eq!(platform_stats(&[], &[]), PlatformStats::default());
    }

    #[test]
    fn test_user_search_by_phone_or_status() {
        let users = users();
        assert_eq!(search_users(&users, "").len(), users.len());
        assert_eq!(search_users(&users, "  ").len(), users.len());

        let suspended = search_users(&users, "SUSPENDED");
        assert_eq!(suspended.len(), 1);
        assert_eq!(suspended[0].status, UserStatus::Suspended);

        let by_phone = search_users(&users, "3339876");
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].id, "user_driver_1");
    }

    #[test]
    fn test_load_search_by_id_shipper_or_status() {
        let loads = sample_loads();
        assert_eq!(search_loads(&loads, "ld582").len(), 1);
        assert_eq!(search_loads(&loads, "user_shipper_2").len(), 1);
        assert_eq!(search_loads(&loads, "delivered").len(), 2);
        assert!(search_loads(&loads, "nothing like this").is_empty());
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut loads = sample_loads();
        let mut moved = loads[2].clone();
        moved.status = LoadStatus::InTransit;
        upsert_load(&mut loads, moved);
        assert_eq!(loads.len(), 5);
        assert_eq!(platform_stats(&[], &loads).active_loads, 2);

        let fresh = demo_load(
            "LD00001",
            ("A", LatLng::KARACHI),
            ("B", LatLng::KARACHI),
            TruckCategory::Reefer,
            "Vaccines",
            3.0,
            9_000,
        );
        upsert_load(&mut loads, fresh);
        assert_eq!(loads[0].id, "LD00001");
    }
}
