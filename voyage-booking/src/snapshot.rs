use chrono::NaiveDate;
use std::collections::BTreeSet;
use uuid::Uuid;
use voyage_catalog::pricing::price_passengers;
use voyage_catalog::schedule;
use voyage_catalog::{
    Booking, CapacityLedger, CatalogWarning, Package, PackageOption, PriceBreakdown,
    RawPackageOption, SlotTime, Trip,
};
use crate::draft::BookingDraft;

/// Catalog and inventory of one package, read once and queried without
/// further store access.
#[derive(Debug, Clone)]
pub struct PackageSnapshot {
    pub package: Package,
    pub options: Vec<PackageOption>,
    pub trips: Vec<Trip>,
    pub ledger: CapacityLedger,
    pub warnings: Vec<CatalogWarning>,
}

impl PackageSnapshot {
    /// Validates the stored options and builds a fresh capacity ledger.
    /// Trips belonging to other packages are discarded.
    pub fn new(
        package: Package,
        raw_options: Vec<RawPackageOption>,
        trips: Vec<Trip>,
        bookings: &[Booking],
    ) -> Self {
        let mut options = Vec::with_capacity(raw_options.len());
        let mut warnings = Vec::new();
        for raw in raw_options {
            let (option, option_warnings) = PackageOption::from_raw(package.id, raw);
            for warning in &option_warnings {
                tracing::warn!(package_id = %package.id, "{}", warning);
            }
            warnings.extend(option_warnings);
            options.push(option);
        }

        let trips: Vec<Trip> = trips
            .into_iter()
            .filter(|trip| trip.package_id == package.id)
            .collect();
        let ledger = CapacityLedger::from_snapshot(&trips, bookings);

        Self {
            package,
            options,
            trips,
            ledger,
            warnings,
        }
    }

    pub fn option(&self, option_id: &Uuid) -> Option<&PackageOption> {
        self.options.iter().find(|o| o.id == *option_id)
    }

    pub fn trip(&self, trip_id: &Uuid) -> Option<&Trip> {
        self.trips.iter().find(|t| t.id == *trip_id)
    }

    pub fn selected_option(&self, draft: &BookingDraft) -> Option<&PackageOption> {
        draft.selected_option_id.and_then(|id| self.option(&id))
    }

    /// Options with at least one scheduled time on `date`.
    pub fn visible_options(&self, date: NaiveDate) -> Vec<&PackageOption> {
        self.options
            .iter()
            .filter(|option| schedule::is_visible_on(option, date, &self.trips))
            .collect()
    }

    /// Candidate times for an option, or `None` if the option is unknown.
    pub fn candidate_times(&self, option_id: &Uuid, date: Option<NaiveDate>) -> Option<Vec<SlotTime>> {
        self.option(option_id)
            .map(|option| schedule::candidate_times(option, date, &self.trips))
    }

    /// Distinct times of the package's trips on `date`, for packages sold
    /// without options.
    pub fn package_times(&self, date: NaiveDate) -> Vec<SlotTime> {
        self.trips
            .iter()
            .filter(|trip| trip.date == date)
            .map(|trip| trip.time)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn remaining(&self, trip_id: &Uuid) -> u32 {
        self.ledger.remaining(trip_id)
    }

    /// Seats a draft needs: adults and children for join tours, adults only
    /// for private groups.
    pub fn requested_seats(&self, draft: &BookingDraft) -> u32 {
        draft.passengers().billable_pax(self.selected_option(draft))
    }

    pub fn price_draft(&self, draft: &BookingDraft) -> PriceBreakdown {
        price_passengers(
            self.selected_option(draft),
            &draft.passengers(),
            self.package.base_price,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voyage_catalog::{BookingStatus, RawPricingTier, RawSlotRule};

    // 2025-03-10 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn t(h: u32, m: u32) -> SlotTime {
        SlotTime::new(h, m).unwrap()
    }

    fn snapshot() -> (PackageSnapshot, Uuid, Uuid) {
        let package = Package {
            id: Uuid::new_v4(),
            name: "Phi Phi day trip".to_string(),
            base_price: 3000,
        };
        let morning = Uuid::new_v4();
        let evening = Uuid::new_v4();
        let raw = vec![
            RawPackageOption {
                id: morning,
                name: "Morning join".to_string(),
                times: vec!["07:00".to_string()],
                slot_rules: vec![RawSlotRule { day: json!("mon"), time: json!("09:00") }],
                pricing_tiers: vec![
                    RawPricingTier { min_pax: Some(1), max_pax: Some(4), price_per_person: Some(2790) },
                    RawPricingTier { min_pax: Some(3), max_pax: Some(6), price_per_person: Some(2000) },
                ],
                ..Default::default()
            },
            RawPackageOption {
                id: evening,
                name: "Evening private".to_string(),
                group_type: Some("private".to_string()),
                is_flat_rate: true,
                flat_rate_price: Some(26900),
                slot_rules: vec![RawSlotRule { day: json!("tue"), time: json!("17:00") }],
                ..Default::default()
            },
        ];
        let trip = Trip {
            id: Uuid::new_v4(),
            package_id: package.id,
            date: monday(),
            time: t(9, 0),
            max_participants: 10,
        };
        let foreign = Trip {
            package_id: Uuid::new_v4(),
            ..trip.clone()
        };
        let bookings = vec![Booking::new(trip.id, 4, BookingStatus::Confirmed)];

        let snapshot = PackageSnapshot::new(package, raw, vec![trip, foreign], &bookings);
        (snapshot, morning, evening)
    }

    #[test]
    fn test_snapshot_ingestion() {
        let (snapshot, _, _) = snapshot();
        assert_eq!(snapshot.options.len(), 2);
        assert_eq!(snapshot.trips.len(), 1);
        assert_eq!(snapshot.warnings.len(), 1);
        assert_eq!(snapshot.remaining(&snapshot.trips[0].id), 6);
    }

    #[test]
    fn test_visible_options_follow_trips() {
        let (snapshot, morning, evening) = snapshot();
        let visible: Vec<Uuid> = snapshot.visible_options(monday()).iter().map(|o| o.id).collect();
        assert_eq!(visible, vec![morning]);

        let tuesday = monday().succ_opt().unwrap();
        assert!(snapshot.visible_options(tuesday).is_empty());
        assert_eq!(snapshot.candidate_times(&evening, None), Some(vec![t(17, 0)]));
        assert_eq!(snapshot.candidate_times(&evening, Some(tuesday)), Some(vec![]));
        assert_eq!(snapshot.candidate_times(&Uuid::new_v4(), None), None);
    }

    #[test]
    fn test_price_draft_by_option() {
        let (snapshot, morning, evening) = snapshot();

        let draft = BookingDraft {
            selected_option_id: Some(morning),
            adult_count: 2,
            child_count: 1,
            ..BookingDraft::new()
        };
        let price = snapshot.price_draft(&draft);
        assert_eq!(price.adult_unit, 2790);
        assert_eq!(price.total, 3 * 2790);
        assert_eq!(snapshot.requested_seats(&draft), 3);

        let draft = BookingDraft {
            selected_option_id: Some(evening),
            adult_count: 5,
            ..BookingDraft::new()
        };
        assert_eq!(snapshot.price_draft(&draft).total, 26900);

        let draft = BookingDraft {
            adult_count: 2,
            ..BookingDraft::new()
        };
        assert_eq!(snapshot.price_draft(&draft).total, 6000);
    }
}
