// src/snapshot.rs
use serde_json::Value;

/// `YYYYmmdd_HHMMSS`, local time, for snapshot filenames.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Persist a raw API response as indented JSON. Returns whether the write
/// succeeded; failure is logged and never fatal. A missing snapshot must
/// not cost the batch a record.
pub fn save_json(data: &Value, filename: Option<&str>) -> bool {
    let name = match filename {
        Some(name) => name.to_string(),
        None => format!("data_{}.json", timestamp()),
    };

    let pretty = match serde_json::to_string_pretty(data) {
        Ok(pretty) => pretty,
        Err(e) => {
            eprintln!("warning: could not serialize data for {name}: {e}");
            return false;
        }
    };

    match std::fs::write(&name, pretty) {
        Ok(()) => {
            eprintln!("raw response saved to {name}");
            true
        }
        Err(e) => {
            eprintln!("warning: could not save {name}: {e}");
            false
        }
    }
}
