// src/domain/record.rs

/// One inventory row, flattened from loosely typed tabular input into
/// explicit optional fields. Acts as an anti-corruption layer between the
/// CSV and everything downstream: values arrive trimmed, blanks become
/// `None`, and nothing here is ever mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub stock_no: Option<String>,
    pub price: Option<String>,
    pub km: Option<String>,
    pub transmission: Option<String>,
    pub fuel: Option<String>,
    pub seats: Option<String>,
    pub doors: Option<String>,
}

impl SourceRecord {
    /// Build a record from a column accessor. `get` must return the trimmed
    /// cell for a header name, or `None` when the column is absent or blank.
    ///
    /// "Tansmission" is a historical misspelling that shipped in real input
    /// files; it is accepted as an alias for "Transmission", correct
    /// spelling winning when both are populated.
    pub fn from_fields<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        SourceRecord {
            make: get("Make"),
            model: get("Model"),
            year: get("Year"),
            stock_no: get("StockNo"),
            price: get("Price"),
            km: get("KM"),
            transmission: get("Transmission").or_else(|| get("Tansmission")),
            fuel: get("Fuel"),
            seats: get("Seats"),
            doors: get("Doors"),
        }
    }

    /// The search key both providers index on: Year concatenated with
    /// StockNo. `None` when either half is missing; such records are
    /// skipped by the batch with a "Not Searched" status.
    pub fn identity_key(&self) -> Option<String> {
        match (&self.year, &self.stock_no) {
            (Some(year), Some(stock_no)) => Some(format!("{year}{stock_no}")),
            _ => None,
        }
    }

    pub fn price_value(&self) -> Option<i64> {
        self.price.as_deref().and_then(parse_int_loose)
    }

    pub fn km_value(&self) -> Option<i64> {
        self.km.as_deref().and_then(parse_int_loose)
    }
}

/// Parse an integer the way it appears in spreadsheets: surrounding
/// whitespace and thousands separators tolerated.
pub fn parse_int_loose(s: &str) -> Option<i64> {
    s.trim().replace(',', "").parse::<i64>().ok()
}
