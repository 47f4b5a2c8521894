//! Free road-routing provider backed by an OSRM instance.
//!
//! Single pairs go through the Route service, matrices through the Table
//! service with `duration,distance` annotations. Transient transport
//! failures (timeouts, connection errors, 5xx) are retried with bounded
//! exponential backoff; semantic failures such as `NoRoute` are not.

mod response;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;

use fieldroute_core::{
    BatchLimits, ConnectionStatus, Coordinate, DistanceError, DistanceMatrix, DistanceOptions,
    DistanceProvider, DistanceResult, MatrixCell, ProviderId, TravelMode,
};

use crate::retry::RetryPolicy;
use crate::validated;
use response::{RouteResponse, TableResponse, is_no_route_code};

/// Default user agent for OSRM requests.
pub const DEFAULT_USER_AGENT: &str = "fieldroute-engine/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`OsrmProvider`].
#[derive(Debug, Clone)]
pub struct OsrmConfig {
    /// Base URL for the OSRM service (e.g., `"http://localhost:5000"`).
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Backoff schedule for transient failures.
    pub retry: RetryPolicy,
    /// Matrix caps advertised to the orchestrator.
    pub batch_limits: BatchLimits,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: RetryPolicy::default(),
            batch_limits: BatchLimits::new(100, 100),
        }
    }
}

impl OsrmConfig {
    /// Configuration pointing at the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry schedule.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the matrix caps.
    #[must_use]
    pub const fn with_batch_limits(mut self, limits: BatchLimits) -> Self {
        self.batch_limits = limits;
        self
    }
}

/// Free road-routing adapter over OSRM's HTTP API.
///
/// Costs nothing per request and carries no traffic awareness. Retries are
/// contained within this adapter; a final failure is handed to the
/// fallback manager unchanged.
#[derive(Debug)]
pub struct OsrmProvider {
    client: Client,
    config: OsrmConfig,
}

impl OsrmProvider {
    /// Create a provider with default configuration for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::Network`] if the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DistanceError> {
        Self::with_config(OsrmConfig::new(base_url))
    }

    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::Network`] if the HTTP client fails to build.
    pub fn with_config(config: OsrmConfig) -> Result<Self, DistanceError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|err| DistanceError::Network {
                provider: ProviderId::OsrmRouting,
                message: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self { client, config })
    }

    fn profile(mode: TravelMode) -> &'static str {
        match mode {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "cycling",
        }
    }

    fn coordinate_path(coordinates: &[Coordinate]) -> String {
        coordinates
            .iter()
            .map(|c| format!("{},{}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn route_url(&self, origin: Coordinate, destination: Coordinate, mode: TravelMode) -> String {
        format!(
            "{}/route/v1/{}/{}?overview=false",
            self.config.base_url.trim_end_matches('/'),
            Self::profile(mode),
            Self::coordinate_path(&[origin, destination]),
        )
    }

    fn table_url(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        mode: TravelMode,
    ) -> String {
        let mut coordinates = Vec::with_capacity(origins.len() + destinations.len());
        coordinates.extend_from_slice(origins);
        coordinates.extend_from_slice(destinations);
        let sources: Vec<String> = (0..origins.len()).map(|i| i.to_string()).collect();
        let targets: Vec<String> = (origins.len()..coordinates.len())
            .map(|i| i.to_string())
            .collect();
        format!(
            "{}/table/v1/{}/{}?sources={}&destinations={}&annotations=duration,distance",
            self.config.base_url.trim_end_matches('/'),
            Self::profile(mode),
            Self::coordinate_path(&coordinates),
            sources.join(";"),
            targets.join(";"),
        )
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> DistanceError {
        if error.is_timeout() {
            return DistanceError::Timeout {
                provider: ProviderId::OsrmRouting,
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        DistanceError::Network {
            provider: ProviderId::OsrmRouting,
            message: error.to_string(),
        }
    }

    /// Issue one GET and decode the body as `T`.
    ///
    /// 5xx responses map to transient network errors so the retry loop
    /// covers them; everything else is decoded (OSRM reports semantic
    /// failures as JSON with a `code` field, even on HTTP 400).
    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, DistanceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(DistanceError::Network {
                provider: ProviderId::OsrmRouting,
                message: format!("server error {status} from {url}"),
            });
        }

        response.json().await.map_err(|err| DistanceError::Parse {
            provider: ProviderId::OsrmRouting,
            message: err.to_string(),
        })
    }

    /// Run `fetch_json` under the retry policy.
    async fn fetch_with_retry<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, DistanceError> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match self.fetch_json::<T>(url).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && self.config.retry.allows(attempt) => {
                    let delay = self
                        .config
                        .retry
                        .delay_before(attempt)
                        .unwrap_or(self.config.retry.base_delay);
                    warn!(
                        "osrm attempt {attempt} failed ({err}); retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn code_error(
        code: &str,
        message: Option<String>,
        origin: Coordinate,
        destination: Coordinate,
    ) -> DistanceError {
        if is_no_route_code(code) {
            DistanceError::NoRoute {
                from: origin,
                to: destination,
            }
        } else {
            DistanceError::InvalidInput(format!(
                "osrm rejected request: {code}: {}",
                message.unwrap_or_default()
            ))
        }
    }

    fn cell_from_table(
        distance: Option<f64>,
        duration: Option<f64>,
    ) -> MatrixCell {
        match (distance, duration) {
            (Some(meters), Some(seconds)) if meters.is_finite() && seconds.is_finite() => {
                MatrixCell::Ok(DistanceResult::new(
                    meters,
                    seconds,
                    ProviderId::OsrmRouting,
                    0,
                ))
            }
            _ => MatrixCell::Unreachable,
        }
    }
}

#[async_trait]
impl DistanceProvider for OsrmProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OsrmRouting
    }

    fn cost_per_request(&self) -> u32 {
        0
    }

    fn batch_limits(&self) -> BatchLimits {
        self.config.batch_limits
    }

    async fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
    ) -> Result<DistanceResult, DistanceError> {
        let origin = validated(origin)?;
        let destination = validated(destination)?;
        let url = self.route_url(origin, destination, options.mode);
        debug!("osrm route request: {url}");

        let response: RouteResponse = self.fetch_with_retry(&url).await?;
        if !response.is_ok() {
            return Err(Self::code_error(
                &response.code,
                response.message,
                origin,
                destination,
            ));
        }
        let route = response.routes.into_iter().next().ok_or(DistanceError::NoRoute {
            from: origin,
            to: destination,
        })?;
        Ok(DistanceResult::new(
            route.distance,
            route.duration,
            ProviderId::OsrmRouting,
            0,
        ))
    }

    async fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &DistanceOptions,
    ) -> Result<DistanceMatrix, DistanceError> {
        if origins.is_empty() || destinations.is_empty() {
            return Err(DistanceError::InvalidInput(
                "matrix request needs at least one origin and one destination".to_owned(),
            ));
        }
        if !self.config.batch_limits.admits(origins.len(), destinations.len()) {
            return Err(DistanceError::InvalidInput(format!(
                "matrix {}x{} exceeds osrm caps {}x{}",
                origins.len(),
                destinations.len(),
                self.config.batch_limits.max_origins,
                self.config.batch_limits.max_destinations
            )));
        }
        for coordinate in origins.iter().chain(destinations) {
            validated(*coordinate)?;
        }

        let url = self.table_url(origins, destinations, options.mode);
        debug!(
            "osrm table request: {} origins x {} destinations",
            origins.len(),
            destinations.len()
        );

        let response: TableResponse = self.fetch_with_retry(&url).await?;
        if !response.is_ok() {
            // A table-level failure applies to the whole sub-grid; report
            // it against the first pair for the error message.
            let from = origins.first().copied().unwrap_or(Coordinate { lat: 0.0, lng: 0.0 });
            let to = destinations
                .first()
                .copied()
                .unwrap_or(Coordinate { lat: 0.0, lng: 0.0 });
            return Err(Self::code_error(&response.code, response.message, from, to));
        }

        let durations = response.durations.ok_or_else(|| DistanceError::Parse {
            provider: ProviderId::OsrmRouting,
            message: "table response missing durations".to_owned(),
        })?;
        let distances = response.distances.ok_or_else(|| DistanceError::Parse {
            provider: ProviderId::OsrmRouting,
            message: "table response missing distances".to_owned(),
        })?;

        let mut matrix = DistanceMatrix::empty(origins.to_vec(), destinations.to_vec());
        for (row, duration_row) in durations.iter().enumerate() {
            for (column, duration) in duration_row.iter().enumerate() {
                let distance = distances
                    .get(row)
                    .and_then(|cells| cells.get(column))
                    .copied()
                    .flatten();
                matrix.set_cell(row, column, Self::cell_from_table(distance, *duration));
            }
        }
        Ok(matrix)
    }

    async fn test_connection(&self) -> ConnectionStatus {
        // Short hop in central Berlin; any routable OSRM extract of the
        // service's region answers, and a wrong region still proves the
        // HTTP service is alive via its JSON error.
        let probe_url = format!(
            "{}/route/v1/driving/13.388860,52.517037;13.397634,52.529407?overview=false",
            self.config.base_url.trim_end_matches('/')
        );
        let started = Instant::now();
        match self.fetch_json::<RouteResponse>(&probe_url).await {
            Ok(_) => ConnectionStatus::Ok {
                latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            },
            Err(err) => ConnectionStatus::Failed {
                reason: err.to_string(),
            },
        }
    }
}
