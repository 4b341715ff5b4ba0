// Search query parameter builders. Built once per lookup, never mutated;
// ordered vectors keep request URLs deterministic.

use crate::domain::record::SourceRecord;

pub type QueryParams = Vec<(&'static str, String)>;

/// The listing backend is a shared search index; these knobs pin down the
/// result shaping both marketplace frontends use.
const SHAPING_PARAMS: [(&str, &str); 3] = [
    ("ipLookup", "1"),
    ("sorting_variation", "smart_sort_3"),
    ("paginate", "26"),
];

fn push_shaping(params: &mut QueryParams) {
    for (key, value) in SHAPING_PARAMS {
        params.push((key, value.to_string()));
    }
}

/// Primary keyed query: exact stock number + dealer.
///
/// A provider with a `source` discriminator (Carsguide) also sends the
/// shaping params and, when known, the make; the shared backend needs both
/// to disambiguate.
pub fn primary_params(
    stock_no: &str,
    dealer_id: &str,
    source: Option<&str>,
    make: Option<&str>,
) -> QueryParams {
    let mut params: QueryParams = vec![
        ("stock_no", stock_no.to_string()),
        ("dealer_id", dealer_id.to_string()),
    ];

    if let Some(source) = source {
        params.push(("source", source.to_string()));
        push_shaping(&mut params);
        if let Some(make) = make {
            params.push(("make", make.to_string()));
        }
    }

    params
}

/// Fallback fuzzy query built from the source record: make/model/year exact,
/// price and odometer as ±100 ranges. Range fields whose source value does
/// not parse as an integer are skipped with a warning rather than sent
/// malformed.
pub fn fallback_params(
    record: &SourceRecord,
    dealer_id: &str,
    source: Option<&str>,
) -> QueryParams {
    let mut params: QueryParams = vec![("dealer_id", dealer_id.to_string())];
    push_shaping(&mut params);

    if let Some(source) = source {
        params.push(("source", source.to_string()));
    }

    if let Some(make) = &record.make {
        params.push(("make", make.clone()));
    }
    if let Some(model) = &record.model {
        params.push(("model", model.clone()));
    }
    if let Some(year) = &record.year {
        params.push(("manu_year", year.clone()));
    }

    match (record.price_value(), &record.price) {
        (Some(price), _) => {
            params.push(("priceFrom", (price - 100).to_string()));
            params.push(("priceTo", (price + 100).to_string()));
        }
        (None, Some(raw)) => eprintln!("warning: could not parse price: {raw}"),
        (None, None) => {}
    }

    match (record.km_value(), &record.km) {
        (Some(km), _) => {
            params.push(("odometerFrom", (km - 100).to_string()));
            params.push(("odometerTo", (km + 100).to_string()));
        }
        (None, Some(raw)) => eprintln!("warning: could not parse odometer: {raw}"),
        (None, None) => {}
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SourceRecord {
        SourceRecord {
            make: Some("Toyota".to_string()),
            model: Some("Corolla".to_string()),
            year: Some("2021".to_string()),
            stock_no: Some("AB123".to_string()),
            price: Some("20,000".to_string()),
            km: Some("45123".to_string()),
            transmission: None,
            fuel: None,
            seats: None,
            doors: None,
        }
    }

    fn value_of<'a>(params: &'a QueryParams, key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn primary_without_source_is_minimal() {
        let params = primary_params("2021AB123", "12751", None, Some("Toyota"));
        assert_eq!(
            params,
            vec![
                ("stock_no", "2021AB123".to_string()),
                ("dealer_id", "12751".to_string()),
            ]
        );
    }

    #[test]
    fn primary_with_source_adds_discriminator_shaping_and_make() {
        let params = primary_params("2021AB123", "12751", Some("CG"), Some("Toyota"));
        assert_eq!(value_of(&params, "source"), Some("CG"));
        assert_eq!(value_of(&params, "ipLookup"), Some("1"));
        assert_eq!(value_of(&params, "sorting_variation"), Some("smart_sort_3"));
        assert_eq!(value_of(&params, "paginate"), Some("26"));
        assert_eq!(value_of(&params, "make"), Some("Toyota"));
    }

    #[test]
    fn fallback_ranges_are_plus_minus_one_hundred() {
        let params = fallback_params(&sample_record(), "12751", None);
        assert_eq!(value_of(&params, "make"), Some("Toyota"));
        assert_eq!(value_of(&params, "model"), Some("Corolla"));
        assert_eq!(value_of(&params, "manu_year"), Some("2021"));
        assert_eq!(value_of(&params, "priceFrom"), Some("19900"));
        assert_eq!(value_of(&params, "priceTo"), Some("20100"));
        assert_eq!(value_of(&params, "odometerFrom"), Some("45023"));
        assert_eq!(value_of(&params, "odometerTo"), Some("45223"));
        assert_eq!(value_of(&params, "stock_no"), None);
    }

    #[test]
    fn fallback_skips_unparsable_range_fields() {
        let mut record = sample_record();
        record.price = Some("POA".to_string());
        record.km = None;

        let params = fallback_params(&record, "12751", Some("CG"));
        assert_eq!(value_of(&params, "source"), Some("CG"));
        assert_eq!(value_of(&params, "priceFrom"), None);
        assert_eq!(value_of(&params, "odometerFrom"), None);
    }

    #[test]
    fn builders_are_deterministic() {
        let record = sample_record();
        assert_eq!(
            fallback_params(&record, "12751", Some("CG")),
            fallback_params(&record, "12751", Some("CG")),
        );
    }
}
