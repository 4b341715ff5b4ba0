// src/report.rs
use crate::batch::RecordResult;
use crate::domain::MatchStatus;
use crate::provider::models::{value_text, Listing};
use serde_json::Value;

const LINE_WIDTH: usize = 60;
const MAX_DESCRIPTION_CHARS: usize = 500;

fn center(text: &str) -> String {
    format!("{:^1$}", text, LINE_WIDTH)
}

fn text(field: &Option<String>) -> &str {
    field.as_deref().filter(|s| !s.is_empty()).unwrap_or("N/A")
}

fn loose(field: Option<&Value>) -> String {
    field
        .map(value_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "N/A".to_string())
}

/// The banner block printed for single lookups.
pub fn vehicle_details(listing: &Listing) -> String {
    let mut lines = Vec::new();

    lines.push(String::new());
    lines.push("=".repeat(LINE_WIDTH));
    lines.push(center(&format!(
        "VEHICLE DETAILS - Stock #{}",
        text(&listing.stock_no),
    )));
    lines.push("=".repeat(LINE_WIDTH));
    lines.push(format!("Make:           {}", text(&listing.make)));
    lines.push(format!("Model:          {}", text(&listing.model)));
    lines.push(format!("Variant:        {}", text(&listing.variant)));
    lines.push(format!("Year:           {}", loose(listing.manu_year.as_ref())));
    lines.push(format!(
        "Price:          ${}",
        loose(
            listing
                .price
                .as_ref()
                .and_then(|p| p.advertised_price.as_ref()),
        ),
    ));
    lines.push(format!("Color:          {}", text(&listing.colour_body)));
    lines.push(format!(
        "Odometer:       {} km",
        loose(listing.odometer.as_ref()),
    ));
    lines.push(format!("Registration:   {}", text(&listing.rego)));
    lines.push(format!("VIN:            {}", text(&listing.vin)));
    lines.push(format!(
        "Location:       {}, {}",
        text(&listing.location_city),
        text(&listing.location_state),
    ));

    if let Some(specs) = &listing.specs {
        lines.push(String::new());
        lines.push("-".repeat(LINE_WIDTH));
        lines.push(center("SPECIFICATIONS"));
        lines.push("-".repeat(LINE_WIDTH));
        lines.push(format!("Body Type:      {}", text(&specs.body_type)));
        lines.push(format!(
            "Transmission:   {}",
            text(&specs.transmission_type),
        ));
        lines.push(format!("Fuel Type:      {}", text(&specs.fuel_type)));
        lines.push(format!(
            "Engine Size:    {} L",
            loose(specs.engine_size.as_ref()),
        ));
        lines.push(format!("Cylinders:      {}", loose(specs.cylinders.as_ref())));
        lines.push(format!("Drive Type:     {}", text(&specs.drive_type)));
        lines.push(format!("Seats:          {}", loose(specs.seats.as_ref())));
        lines.push(format!("Doors:          {}", loose(specs.doors.as_ref())));
    }

    if let Some(description) = listing.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(String::new());
        lines.push("-".repeat(LINE_WIDTH));
        lines.push(center("DESCRIPTION"));
        lines.push("-".repeat(LINE_WIDTH));

        let normalized = description.replace("\\r\\n", "\n").replace("\r\n", "\n");
        if normalized.chars().count() > MAX_DESCRIPTION_CHARS {
            let truncated: String = normalized.chars().take(MAX_DESCRIPTION_CHARS).collect();
            lines.push(format!("{truncated}... [Description truncated]"));
        } else {
            lines.push(normalized);
        }
    }

    lines.push(String::new());
    lines.push("=".repeat(LINE_WIDTH));

    lines.join("\n")
}

/// End-of-batch status tally, one section per provider.
pub fn batch_summary(results: &[RecordResult]) -> String {
    let mut lines = Vec::new();

    lines.push(String::new());
    lines.push("=".repeat(LINE_WIDTH));
    lines.push(center("PROCESSING SUMMARY"));
    lines.push("=".repeat(LINE_WIDTH));
    lines.push(format!("Total vehicles processed: {}", results.len()));

    lines.push(String::new());
    lines.push("AutoTrader Results:".to_string());
    for (status, count) in status_counts(results.iter().map(|r| r.autotrader.status)) {
        lines.push(format!("  {status}: {count}"));
    }

    lines.push(String::new());
    lines.push("Carsguide Results:".to_string());
    for (status, count) in status_counts(results.iter().map(|r| r.carsguide.status)) {
        lines.push(format!("  {status}: {count}"));
    }

    lines.push("=".repeat(LINE_WIDTH));
    lines.join("\n")
}

/// Tally statuses in first-seen order.
fn status_counts(statuses: impl Iterator<Item = MatchStatus>) -> Vec<(MatchStatus, usize)> {
    let mut counts: Vec<(MatchStatus, usize)> = Vec::new();
    for status in statuses {
        match counts.iter_mut().find(|(seen, _)| *seen == status) {
            Some((_, count)) => *count += 1,
            None => counts.push((status, 1)),
        }
    }
    counts
}
