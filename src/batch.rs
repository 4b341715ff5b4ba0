// src/batch.rs
use crate::domain::{reconcile, MatchStatus, SourceRecord};
use crate::provider::{ClientConfig, Pacing, ProviderClient, ProviderError, ProviderSpec};
use crate::snapshot;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// The three cells one provider contributes to an output row.
#[derive(Debug, Clone)]
pub struct RowOutcome {
    pub status: MatchStatus,
    pub notes: String,
    pub url: String,
}

impl RowOutcome {
    pub fn not_searched() -> Self {
        RowOutcome {
            status: MatchStatus::NotSearched,
            notes: "Missing Year or StockNo".to_string(),
            url: String::new(),
        }
    }
}

/// Both providers' outcomes for one record. Every record gets exactly one
/// of these; there is no partial row.
#[derive(Debug, Clone)]
pub struct RecordResult {
    pub autotrader: RowOutcome,
    pub carsguide: RowOutcome,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub dealer_id: String,
    pub save_raw: bool,
    pub verbose: bool,
}

/// Runs the full inventory through both providers, strictly sequentially.
/// One in-flight request at a time is the point, not a limitation: the
/// pacing is what keeps the anti-bot layer quiet.
pub struct BatchRunner {
    autotrader: ProviderClient,
    carsguide: ProviderClient,
    between_calls: Pacing,
    options: BatchOptions,
}

impl BatchRunner {
    pub fn new(options: BatchOptions) -> Result<Self, ProviderError> {
        let config = ClientConfig {
            verbose: options.verbose,
            ..ClientConfig::default()
        };
        Ok(BatchRunner {
            autotrader: ProviderClient::new(ProviderSpec::autotrader(), config.clone())?,
            carsguide: ProviderClient::new(ProviderSpec::carsguide(), config)?,
            between_calls: Pacing::new(1_000, 2_000),
            options,
        })
    }

    #[cfg(test)]
    pub fn with_clients(
        autotrader: ProviderClient,
        carsguide: ProviderClient,
        options: BatchOptions,
    ) -> Self {
        BatchRunner {
            autotrader,
            carsguide,
            between_calls: Pacing::none(),
            options,
        }
    }

    /// Process every record in input order. One `RecordResult` per record,
    /// always. A record that blows up is reported as "Error" on both
    /// providers and the batch moves on.
    pub fn run(&self, records: &[SourceRecord]) -> Vec<RecordResult> {
        let total = records.len();
        records
            .iter()
            .enumerate()
            .map(|(index, record)| self.process_record(index, total, record))
            .collect()
    }

    fn process_record(&self, index: usize, total: usize, record: &SourceRecord) -> RecordResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.check_record(index, record)));

        match outcome {
            Ok(result) => {
                if record.identity_key().is_some() {
                    println!(
                        "Processed {}/{} - {} {} (Stock: {}): AT={}, CG={}",
                        index + 1,
                        total,
                        record.make.as_deref().unwrap_or(""),
                        record.model.as_deref().unwrap_or(""),
                        record.identity_key().unwrap_or_default(),
                        result.autotrader.status,
                        result.carsguide.status,
                    );
                }
                result
            }
            Err(payload) => {
                let message = panic_message(payload);
                eprintln!("error processing row {}: {message}", index + 1);
                let failed = RowOutcome {
                    status: MatchStatus::Error,
                    notes: format!("Error processing: {message}"),
                    url: String::new(),
                };
                RecordResult {
                    autotrader: failed.clone(),
                    carsguide: failed,
                }
            }
        }
    }

    fn check_record(&self, index: usize, record: &SourceRecord) -> RecordResult {
        let stock_no = match record.identity_key() {
            Some(stock_no) => stock_no,
            None => {
                eprintln!("warning: row {}: missing Year or StockNo, skipping", index + 1);
                return RecordResult {
                    autotrader: RowOutcome::not_searched(),
                    carsguide: RowOutcome::not_searched(),
                };
            }
        };

        let autotrader = self.run_provider(&self.autotrader, &stock_no, None, record);
        self.between_calls.wait("next provider", self.options.verbose);
        let carsguide =
            self.run_provider(&self.carsguide, &stock_no, record.make.as_deref(), record);
        self.between_calls.wait("next record", self.options.verbose);

        RecordResult {
            autotrader,
            carsguide,
        }
    }

    fn run_provider(
        &self,
        client: &ProviderClient,
        stock_no: &str,
        make: Option<&str>,
        record: &SourceRecord,
    ) -> RowOutcome {
        let name = client.spec().name;

        let outcome = match client.lookup(stock_no, &self.options.dealer_id, make, Some(record)) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("warning: {name} lookup for {stock_no} failed: {e}");
                return RowOutcome {
                    status: MatchStatus::ApiError,
                    notes: format!("Failed to retrieve data from {name} API"),
                    url: String::new(),
                };
            }
        };

        if outcome.is_empty() {
            return RowOutcome {
                status: MatchStatus::NotFound,
                notes: format!("Vehicle not found in {name} API"),
                url: String::new(),
            };
        }

        if self.options.save_raw {
            let filename = format!(
                "{}_{}_{}.json",
                name.to_lowercase(),
                stock_no,
                snapshot::timestamp(),
            );
            snapshot::save_json(&outcome.raw, Some(&filename));
        }

        let listing = outcome.first();
        let reconciled = reconcile(record, listing);
        let url = listing
            .map(|listing| client.spec().listing_url(listing))
            .unwrap_or_default();

        RowOutcome {
            status: reconciled.status,
            notes: reconciled.notes(),
            url,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown error".to_string()
    }
}
