use serde::Deserialize;
use serde_json::Value;

// response
//  └── data []
//       └── _source
//            ├── status            ("Live" | "Sold" | "On Offer" | ...)
//            ├── make / model / variant / manu_year
//            ├── colour_body / odometer / rego / vin
//            ├── location_city / location_state
//            ├── url / url_cg / stock_no / description
//            ├── vehicle
//            │    ├── body_type / transmission_type / fuel_type
//            │    ├── engine_size / cylinders / drive_type
//            │    └── seats / doors
//            └── price
//                 └── advertised_price

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_source")]
    pub source: Listing,
}

/// One marketplace search-result entry. Every field is optional: the backend
/// omits what it doesn't know, and numeric leaves arrive as either numbers
/// or strings depending on the indexing path, so those stay `Value` and are
/// stringified through [`value_text`] for comparison and display.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub status: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub variant: Option<String>,
    pub manu_year: Option<Value>,
    pub colour_body: Option<String>,
    pub odometer: Option<Value>,
    pub rego: Option<String>,
    pub vin: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub url: Option<String>,
    pub url_cg: Option<String>,
    pub stock_no: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "vehicle")]
    pub specs: Option<VehicleSpecs>,
    pub price: Option<PriceInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleSpecs {
    pub body_type: Option<String>,
    pub transmission_type: Option<String>,
    pub fuel_type: Option<String>,
    pub engine_size: Option<Value>,
    pub cylinders: Option<Value>,
    pub drive_type: Option<String>,
    pub seats: Option<Value>,
    pub doors: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceInfo {
    pub advertised_price: Option<Value>,
}

impl Listing {
    /// Relative listing path: `url` wins, `url_cg` is the fallback key.
    /// Empty string when the listing carries neither.
    pub fn url_path(&self) -> &str {
        self.url
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.url_cg.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("")
    }
}

/// Render a loosely typed JSON leaf as text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// What a successful provider lookup hands back: the untouched response body
/// (for optional raw persistence) plus the parsed listing entries. An empty
/// `listings` is how "Not Found" travels; the caller decides the status.
#[derive(Debug)]
pub struct SearchOutcome {
    pub raw: Value,
    pub listings: Vec<Listing>,
}

impl SearchOutcome {
    pub fn first(&self) -> Option<&Listing> {
        self.listings.first()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
