// src/domain/recon.rs
use crate::domain::record::{parse_int_loose, SourceRecord};
use crate::provider::models::{value_text, Listing};
use std::fmt;

/// Advertised prices within this many currency units of the source price are
/// treated as equal (rounding and fee differences).
const PRICE_TOLERANCE: i64 = 100;

/// Per-(record, provider) match classification, rendered verbatim into the
/// status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Found,
    Mismatched,
    NotFound,
    Sold,
    OnOffer,
    ApiError,
    NotSearched,
    Error,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Found => "Found",
            MatchStatus::Mismatched => "Mismatched",
            MatchStatus::NotFound => "Not Found",
            MatchStatus::Sold => "Sold",
            MatchStatus::OnOffer => "On Offer",
            MatchStatus::ApiError => "API Error",
            MatchStatus::NotSearched => "Not Searched",
            MatchStatus::Error => "Error",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub status: MatchStatus,
    pub mismatches: Vec<String>,
}

impl MatchOutcome {
    fn status_only(status: MatchStatus) -> Self {
        MatchOutcome {
            status,
            mismatches: Vec::new(),
        }
    }

    /// Mismatch list flattened for the notes column.
    pub fn notes(&self) -> String {
        self.mismatches.join("; ")
    }
}

/// Classify a (record, listing) pair. Pure: same inputs, same outcome, no
/// I/O. Inputs are never mutated.
///
/// A "Sold" or "On Offer" listing status short-circuits before any field
/// comparison; other non-live statuses still get their fields compared.
pub fn reconcile(record: &SourceRecord, listing: Option<&Listing>) -> MatchOutcome {
    let listing = match listing {
        Some(listing) => listing,
        None => return MatchOutcome::status_only(MatchStatus::NotFound),
    };

    if let Some(status) = listing.status.as_deref() {
        if !status.eq_ignore_ascii_case("live") {
            if status.eq_ignore_ascii_case("sold") {
                return MatchOutcome::status_only(MatchStatus::Sold);
            }
            if status.eq_ignore_ascii_case("on offer") {
                return MatchOutcome::status_only(MatchStatus::OnOffer);
            }
        }
    }

    let specs = listing.specs.as_ref();
    let mut mismatches = Vec::new();

    let string_checks: [(&str, Option<&str>, Option<String>); 5] = [
        (
            "Fuel",
            record.fuel.as_deref(),
            specs.and_then(|s| s.fuel_type.clone()),
        ),
        ("Model", record.model.as_deref(), listing.model.clone()),
        (
            "Seats",
            record.seats.as_deref(),
            specs.and_then(|s| s.seats.as_ref()).map(value_text),
        ),
        (
            "Doors",
            record.doors.as_deref(),
            specs.and_then(|s| s.doors.as_ref()).map(value_text),
        ),
        (
            "Transmission",
            record.transmission.as_deref(),
            specs.and_then(|s| s.transmission_type.clone()),
        ),
    ];

    for (field, source, api) in string_checks {
        let source = match source.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s,
            None => continue,
        };
        let api = match api {
            Some(a) => a,
            None => continue,
        };
        let api = api.trim();

        if !source.eq_ignore_ascii_case(api) {
            mismatches.push(format!("{field}: CSV={source}, API={api}"));
        }
    }

    if let Some(source_price) = record.price.as_deref().filter(|s| !s.trim().is_empty()) {
        let api_price = listing
            .price
            .as_ref()
            .and_then(|p| p.advertised_price.as_ref());

        if let Some(api_price) = api_price {
            let api_text = value_text(api_price);
            match (parse_int_loose(source_price), parse_int_loose(&api_text)) {
                (Some(csv_price), Some(api_price)) => {
                    if (csv_price - api_price).abs() > PRICE_TOLERANCE {
                        mismatches.push(format!("Price: CSV={csv_price}, API={api_price}"));
                    }
                }
                _ => mismatches.push("Price: Couldn't compare".to_string()),
            }
        }
    }

    if mismatches.is_empty() {
        MatchOutcome::status_only(MatchStatus::Found)
    } else {
        MatchOutcome {
            status: MatchStatus::Mismatched,
            mismatches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_json(body: &str) -> Listing {
        serde_json::from_str(body).unwrap()
    }

    fn record() -> SourceRecord {
        SourceRecord {
            make: Some("Toyota".to_string()),
            model: Some("Corolla".to_string()),
            year: Some("2021".to_string()),
            stock_no: Some("AB123".to_string()),
            price: Some("20000".to_string()),
            km: Some("45,123".to_string()),
            transmission: Some("Automatic".to_string()),
            fuel: Some("Petrol".to_string()),
            seats: Some("5".to_string()),
            doors: Some("4".to_string()),
        }
    }

    fn live_listing() -> Listing {
        listing_json(
            r#"{
                "status": "Live",
                "model": "Corolla",
                "vehicle": {
                    "transmission_type": "automatic",
                    "fuel_type": "PETROL",
                    "seats": 5,
                    "doors": 4
                },
                "price": { "advertised_price": 20000 }
            }"#,
        )
    }

    #[test]
    fn no_listing_is_not_found() {
        let outcome = reconcile(&record(), None);
        assert_eq!(outcome.status, MatchStatus::NotFound);
        assert!(outcome.mismatches.is_empty());
    }

    #[test]
    fn matching_listing_is_found_case_insensitively() {
        let outcome = reconcile(&record(), Some(&live_listing()));
        assert_eq!(outcome.status, MatchStatus::Found);
        assert_eq!(outcome.notes(), "");
    }

    #[test]
    fn sold_short_circuits_even_with_mismatched_fields() {
        let listing = listing_json(
            r#"{
                "status": "Sold",
                "model": "Completely Different",
                "price": { "advertised_price": 99999 }
            }"#,
        );
        let outcome = reconcile(&record(), Some(&listing));
        assert_eq!(outcome.status, MatchStatus::Sold);
        assert!(outcome.mismatches.is_empty());
    }

    #[test]
    fn on_offer_short_circuits() {
        let listing = listing_json(r#"{"status": "On Offer"}"#);
        let outcome = reconcile(&record(), Some(&listing));
        assert_eq!(outcome.status, MatchStatus::OnOffer);
    }

    #[test]
    fn unknown_non_live_status_still_compares_fields() {
        let listing = listing_json(
            r#"{
                "status": "Withdrawn",
                "model": "Camry"
            }"#,
        );
        let outcome = reconcile(&record(), Some(&listing));
        assert_eq!(outcome.status, MatchStatus::Mismatched);
        assert_eq!(outcome.mismatches, vec!["Model: CSV=Corolla, API=Camry"]);
    }

    #[test]
    fn price_within_tolerance_is_not_a_mismatch() {
        let mut source = record();
        source.price = Some("20000".to_string());
        let listing = listing_json(
            r#"{"status": "Live", "price": { "advertised_price": 20050 }}"#,
        );
        let outcome = reconcile(&source, Some(&listing));
        assert_eq!(outcome.status, MatchStatus::Found);
    }

    #[test]
    fn price_beyond_tolerance_reports_both_values() {
        let mut source = record();
        source.price = Some("20000".to_string());
        let listing = listing_json(
            r#"{"status": "Live", "price": { "advertised_price": 20200 }}"#,
        );
        let outcome = reconcile(&source, Some(&listing));
        assert_eq!(outcome.status, MatchStatus::Mismatched);
        assert_eq!(outcome.mismatches, vec!["Price: CSV=20000, API=20200"]);
    }

    #[test]
    fn price_accepts_thousands_separators_on_both_sides() {
        let mut source = record();
        source.price = Some("20,500".to_string());
        let listing = listing_json(
            r#"{"status": "Live", "price": { "advertised_price": "20,500" }}"#,
        );
        let outcome = reconcile(&source, Some(&listing));
        assert_eq!(outcome.status, MatchStatus::Found);
    }

    #[test]
    fn unparsable_price_is_reported_not_fatal() {
        let mut source = record();
        source.price = Some("POA".to_string());
        let listing = listing_json(
            r#"{"status": "Live", "price": { "advertised_price": 20000 }}"#,
        );
        let outcome = reconcile(&source, Some(&listing));
        assert_eq!(outcome.status, MatchStatus::Mismatched);
        assert_eq!(outcome.mismatches, vec!["Price: Couldn't compare"]);
    }

    #[test]
    fn absent_source_fields_are_skipped() {
        let source = SourceRecord {
            make: None,
            model: None,
            year: Some("2021".to_string()),
            stock_no: Some("AB123".to_string()),
            price: None,
            km: None,
            transmission: None,
            fuel: None,
            seats: None,
            doors: None,
        };
        let listing = listing_json(
            r#"{
                "status": "Live",
                "model": "Camry",
                "vehicle": { "fuel_type": "Diesel" },
                "price": { "advertised_price": 1 }
            }"#,
        );
        let outcome = reconcile(&source, Some(&listing));
        assert_eq!(outcome.status, MatchStatus::Found);
    }

    #[test]
    fn absent_listing_paths_are_skipped() {
        // Record has values but the listing carries no specs/price at all.
        let listing = listing_json(r#"{"status": "Live", "model": "Corolla"}"#);
        let outcome = reconcile(&record(), Some(&listing));
        assert_eq!(outcome.status, MatchStatus::Found);
    }

    #[test]
    fn mismatches_accumulate_in_field_map_order() {
        let listing = listing_json(
            r#"{
                "status": "Live",
                "model": "Camry",
                "vehicle": {
                    "transmission_type": "Manual",
                    "fuel_type": "Diesel",
                    "seats": 7,
                    "doors": 4
                },
                "price": { "advertised_price": 25000 }
            }"#,
        );
        let outcome = reconcile(&record(), Some(&listing));
        assert_eq!(outcome.status, MatchStatus::Mismatched);
        assert_eq!(
            outcome.mismatches,
            vec![
                "Fuel: CSV=Petrol, API=Diesel",
                "Model: CSV=Corolla, API=Camry",
                "Seats: CSV=5, API=7",
                "Transmission: CSV=Automatic, API=Manual",
                "Price: CSV=20000, API=25000",
            ]
        );
        assert_eq!(
            outcome.notes(),
            "Fuel: CSV=Petrol, API=Diesel; Model: CSV=Corolla, API=Camry; \
             Seats: CSV=5, API=7; Transmission: CSV=Automatic, API=Manual; \
             Price: CSV=20000, API=25000"
        );
    }

    #[test]
    fn reconcile_is_deterministic() {
        let source = record();
        let listing = live_listing();
        let first = reconcile(&source, Some(&listing));
        let second = reconcile(&source, Some(&listing));
        assert_eq!(first, second);
    }
}
