// src/provider/client.rs
use crate::domain::record::SourceRecord;
use crate::provider::error::ProviderError;
use crate::provider::models::{Listing, SearchOutcome, SearchResponse};
use crate::provider::query::{self, QueryParams};
use crate::transport::{self, RetryPolicy, Transport};
use rand::Rng;
use reqwest::blocking::Response;
use reqwest::header::{HeaderMap, HeaderValue};
use std::thread;
use std::time::Duration;

const SEARCH_URL: &str = "https://listings.platform.autotrader.com.au/api/v3/search";

/// Alternate identity presented on the one-shot retry after a 403.
const AUTOTRADER_ROTATION_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36 Edg/139.0.0.0";
const CARSGUIDE_ROTATION_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

/// Everything that distinguishes the two marketplaces: where to bootstrap a
/// session, how to identify the caller, and how the shared search backend
/// tells their traffic apart.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub name: &'static str,
    /// Landing page visited for session cookies; also the domain prefix for
    /// derived listing URLs. Always ends with '/'.
    pub site_url: String,
    pub search_url: String,
    /// Header name carrying the referer. Carsguide traffic historically
    /// sends the "referrer" spelling and the backend expects it.
    pub referer_header: &'static str,
    pub referer_value: String,
    /// Carsguide calls the shared backend from the other site's origin.
    pub cross_site: bool,
    /// Query discriminator for the shared backend ("CG"), None for
    /// AutoTrader.
    pub source: Option<&'static str>,
    pub rotation_user_agent: &'static str,
}

impl ProviderSpec {
    pub fn autotrader() -> Self {
        ProviderSpec {
            name: "AutoTrader",
            site_url: "https://www.autotrader.com.au/".to_string(),
            search_url: SEARCH_URL.to_string(),
            referer_header: "referer",
            referer_value: "https://www.autotrader.com.au/cars/search".to_string(),
            cross_site: false,
            source: None,
            rotation_user_agent: AUTOTRADER_ROTATION_UA,
        }
    }

    pub fn carsguide() -> Self {
        ProviderSpec {
            name: "Carsguide",
            site_url: "https://www.carsguide.com.au/".to_string(),
            search_url: SEARCH_URL.to_string(),
            referer_header: "referrer",
            referer_value: "https://www.carsguide.com.au/".to_string(),
            cross_site: true,
            source: Some("CG"),
            rotation_user_agent: CARSGUIDE_ROTATION_UA,
        }
    }

    /// Full listing URL: the provider domain prefixed to the listing's
    /// relative path. A listing without a path yields an empty URL.
    pub fn listing_url(&self, listing: &Listing) -> String {
        let path = listing.url_path();
        if path.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.site_url, path)
        }
    }
}

/// A randomized blocking wait. Zero-width ranges are skipped entirely so
/// tests run without sleeping.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Pacing {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Pacing { min_ms, max_ms }
    }

    pub fn none() -> Self {
        Pacing {
            min_ms: 0,
            max_ms: 0,
        }
    }

    fn wait(&self, label: &str, verbose: bool) {
        if self.max_ms == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        if verbose {
            eprintln!("waiting {:.2}s before {label}...", ms as f64 / 1000.0);
        }
        thread::sleep(Duration::from_millis(ms));
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Human-like pause before each search call.
    pub pace: Pacing,
    /// Shorter pause before reissuing as a fallback query.
    pub fallback_pause: Pacing,
    /// Cool-off after a 403 before rotating identity and retrying.
    pub blocked_wait: Pacing,
    pub retry: RetryPolicy,
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            pace: Pacing::new(1_000, 3_000),
            fallback_pause: Pacing::new(1_000, 2_000),
            blocked_wait: Pacing::new(5_000, 8_000),
            retry: RetryPolicy::default(),
            verbose: false,
        }
    }
}

impl ClientConfig {
    #[cfg(test)]
    pub fn without_pacing() -> Self {
        ClientConfig {
            pace: Pacing::none(),
            fallback_pause: Pacing::none(),
            blocked_wait: Pacing::none(),
            retry: RetryPolicy {
                max_retries: 0,
                backoff_start: Duration::from_millis(1),
            },
            verbose: false,
        }
    }
}

/// Lookup progress. One cycle through these states per
/// `ProviderClient::lookup` call; `recovered` in the driver loop ensures
/// `Recover` is entered at most once.
enum LookupStep {
    Bootstrap,
    Primary,
    Fallback {
        primary: SearchOutcome,
        params: QueryParams,
    },
    Recover,
}

/// One marketplace client. Owns its cookie session (via the transport) for
/// the lifetime of a run; lookups are strictly sequential.
pub struct ProviderClient {
    spec: ProviderSpec,
    transport: Transport,
    config: ClientConfig,
}

impl ProviderClient {
    pub fn new(spec: ProviderSpec, config: ClientConfig) -> Result<Self, ProviderError> {
        let transport = Transport::new(config.retry.clone())?;
        Ok(ProviderClient {
            spec,
            transport,
            config,
        })
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    /// Find the listing(s) for a stock number.
    ///
    /// `record` supplies the fallback-query context; without it (single
    /// lookups) an empty primary result is final. An empty outcome means the
    /// vehicle was not found; an `Err` means this provider could not be
    /// asked, and the caller records "API Error".
    pub fn lookup(
        &self,
        stock_no: &str,
        dealer_id: &str,
        make: Option<&str>,
        record: Option<&SourceRecord>,
    ) -> Result<SearchOutcome, ProviderError> {
        let primary_params =
            query::primary_params(stock_no, dealer_id, self.spec.source, make);
        let mut user_agent = transport::DEFAULT_USER_AGENT;
        let mut recovered = false;
        let mut step = LookupStep::Bootstrap;

        loop {
            step = match step {
                LookupStep::Bootstrap => {
                    self.bootstrap(user_agent)?;
                    LookupStep::Primary
                }

                LookupStep::Primary => {
                    self.config.pace.wait("search", self.config.verbose);
                    if self.config.verbose {
                        eprintln!(
                            "{} primary search: {:?}",
                            self.spec.name, primary_params,
                        );
                    }
                    let resp = self.transport.get(
                        &self.spec.search_url,
                        &primary_params,
                        self.search_headers(user_agent),
                    )?;

                    match resp.status().as_u16() {
                        200 => {
                            let outcome = self.parse_response(resp)?;
                            if !outcome.is_empty() || recovered {
                                return Ok(outcome);
                            }
                            match record {
                                Some(record) => {
                                    if self.config.verbose {
                                        eprintln!(
                                            "{}: no result for stock number, trying fallback search",
                                            self.spec.name,
                                        );
                                    }
                                    let params = query::fallback_params(
                                        record,
                                        dealer_id,
                                        self.spec.source,
                                    );
                                    LookupStep::Fallback {
                                        primary: outcome,
                                        params,
                                    }
                                }
                                None => return Ok(outcome),
                            }
                        }
                        403 if !recovered => {
                            eprintln!(
                                "warning: {} bot protection detected (403), rotating identity",
                                self.spec.name,
                            );
                            recovered = true;
                            LookupStep::Recover
                        }
                        403 => {
                            return Err(ProviderError::Blocked(
                                "still blocked after identity rotation".to_string(),
                            ))
                        }
                        code => return Err(ProviderError::Status(code)),
                    }
                }

                LookupStep::Fallback { primary, params } => {
                    self.config
                        .fallback_pause
                        .wait("fallback search", self.config.verbose);
                    if self.config.verbose {
                        eprintln!("{} fallback search: {:?}", self.spec.name, params);
                    }
                    let resp = self.transport.get(
                        &self.spec.search_url,
                        &params,
                        self.search_headers(user_agent),
                    )?;

                    if resp.status().as_u16() == 200 {
                        let outcome = self.parse_response(resp)?;
                        if !outcome.is_empty() {
                            return Ok(outcome);
                        }
                    } else {
                        eprintln!(
                            "warning: {} fallback search failed with status {}",
                            self.spec.name,
                            resp.status().as_u16(),
                        );
                    }
                    // The primary answer stands: nothing found.
                    return Ok(primary);
                }

                LookupStep::Recover => {
                    self.config
                        .blocked_wait
                        .wait("retrying blocked search", self.config.verbose);
                    user_agent = self.spec.rotation_user_agent;
                    // Best effort: a failed cookie refresh still gets the
                    // one retry.
                    if let Err(e) = self.bootstrap(user_agent) {
                        eprintln!("warning: {} re-bootstrap failed: {e}", self.spec.name);
                    }
                    LookupStep::Primary
                }
            };
        }
    }

    /// Visit the provider landing page so the session cookie jar is
    /// populated before the search call.
    fn bootstrap(&self, user_agent: &str) -> Result<(), ProviderError> {
        if self.config.verbose {
            eprintln!("getting initial cookies from {}...", self.spec.name);
        }
        let resp = self
            .transport
            .get(
                &self.spec.site_url,
                &[],
                transport::browser_headers(user_agent),
            )
            .map_err(ProviderError::from)?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Bootstrap(format!(
                "{} returned status {}",
                self.spec.name,
                resp.status().as_u16(),
            )))
        }
    }

    fn search_headers(&self, user_agent: &str) -> HeaderMap {
        let mut headers = transport::browser_headers(user_agent);
        if let Some(name) = transport::header_name(self.spec.referer_header) {
            if let Ok(value) = HeaderValue::from_str(&self.spec.referer_value) {
                headers.insert(name, value);
            }
        }
        if self.spec.cross_site {
            headers.insert("sec-fetch-site", HeaderValue::from_static("cross-site"));
        }
        headers
    }

    fn parse_response(&self, resp: Response) -> Result<SearchOutcome, ProviderError> {
        let raw: serde_json::Value =
            resp.json().map_err(|e| ProviderError::Json(e.to_string()))?;
        let parsed: SearchResponse = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::Json(e.to_string()))?;

        Ok(SearchOutcome {
            raw,
            listings: parsed.data.into_iter().map(|hit| hit.source).collect(),
        })
    }
}
