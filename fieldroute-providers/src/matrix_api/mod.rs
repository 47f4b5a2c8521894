//! Commercial traffic-aware distance-matrix provider.
//!
//! Paid per element, optionally traffic-aware, and bound by hard batch
//! caps. Oversized requests are rejected at this layer rather than
//! silently truncated, and quota or credential failures are never retried;
//! both fall straight through to the fallback manager.

mod response;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use fieldroute_core::{
    BatchLimits, ConnectionStatus, Coordinate, DistanceError, DistanceMatrix, DistanceOptions,
    DistanceProvider, DistanceResult, MatrixCell, ProviderId, TrafficModel, TravelMode,
};

use crate::validated;
use response::{MatrixElement, MatrixResponse, is_quota_status};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`MatrixApiProvider`].
#[derive(Debug, Clone)]
pub struct MatrixApiConfig {
    /// Base URL of the distance-matrix endpoint.
    pub base_url: String,
    /// API credential sent with every request.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Hard per-call caps; requests beyond them are rejected.
    pub batch_limits: BatchLimits,
    /// Billing units charged per resolved element.
    pub cost_per_element: u32,
}

impl MatrixApiConfig {
    /// Configuration for the given endpoint and credential.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            batch_limits: BatchLimits::new(25, 25),
            cost_per_element: 1,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the batch caps.
    #[must_use]
    pub const fn with_batch_limits(mut self, limits: BatchLimits) -> Self {
        self.batch_limits = limits;
        self
    }
}

/// Commercial distance-matrix adapter.
#[derive(Debug)]
pub struct MatrixApiProvider {
    client: Client,
    config: MatrixApiConfig,
}

impl MatrixApiProvider {
    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::Network`] if the HTTP client fails to build.
    pub fn with_config(config: MatrixApiConfig) -> Result<Self, DistanceError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|err| DistanceError::Network {
                provider: ProviderId::MatrixApi,
                message: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self { client, config })
    }

    fn mode_param(mode: TravelMode) -> &'static str {
        mode.as_str()
    }

    fn coordinate_list(coordinates: &[Coordinate]) -> String {
        coordinates
            .iter()
            .map(|c| format!("{},{}", c.lat, c.lng))
            .collect::<Vec<_>>()
            .join("|")
    }

    fn request_url(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &DistanceOptions,
    ) -> String {
        let mut url = format!(
            "{}?origins={}&destinations={}&mode={}&key={}",
            self.config.base_url.trim_end_matches('/'),
            Self::coordinate_list(origins),
            Self::coordinate_list(destinations),
            Self::mode_param(options.mode),
            self.config.api_key,
        );
        if options.traffic.is_traffic_aware() {
            url.push_str("&departure_time=now&traffic_model=");
            url.push_str(match options.traffic {
                TrafficModel::Pessimistic => "pessimistic",
                TrafficModel::Optimistic => "optimistic",
                TrafficModel::None | TrafficModel::BestGuess => "best_guess",
            });
        }
        url
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> DistanceError {
        if error.is_timeout() {
            return DistanceError::Timeout {
                provider: ProviderId::MatrixApi,
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        DistanceError::Network {
            provider: ProviderId::MatrixApi,
            message: error.to_string(),
        }
    }

    async fn fetch(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &DistanceOptions,
    ) -> Result<MatrixResponse, DistanceError> {
        let url = self.request_url(origins, destinations, options);
        debug!(
            "matrix-api request: {} origins x {} destinations, traffic {}",
            origins.len(),
            destinations.len(),
            options.traffic.as_str()
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(DistanceError::Network {
                provider: ProviderId::MatrixApi,
                message: format!("server error {status}"),
            });
        }

        let payload: MatrixResponse =
            response.json().await.map_err(|err| DistanceError::Parse {
                provider: ProviderId::MatrixApi,
                message: err.to_string(),
            })?;

        if payload.is_ok() {
            return Ok(payload);
        }
        if is_quota_status(&payload.status) {
            return Err(DistanceError::QuotaExceeded {
                provider: ProviderId::MatrixApi,
            });
        }
        Err(DistanceError::InvalidInput(format!(
            "matrix api rejected request: {}: {}",
            payload.status,
            payload.error_message.unwrap_or_default()
        )))
    }

    fn element_cell(&self, element: &MatrixElement) -> MatrixCell {
        if !element.is_ok() {
            return MatrixCell::Unreachable;
        }
        match (&element.distance, &element.duration) {
            (Some(distance), Some(duration)) => {
                let mut result = DistanceResult::new(
                    distance.value,
                    duration.value,
                    ProviderId::MatrixApi,
                    self.config.cost_per_element,
                );
                if let Some(traffic) = &element.duration_in_traffic {
                    result = result.with_traffic_duration(traffic.value);
                }
                MatrixCell::Ok(result)
            }
            _ => MatrixCell::Unreachable,
        }
    }

    fn check_caps(&self, origins: usize, destinations: usize) -> Result<(), DistanceError> {
        if self.config.batch_limits.admits(origins, destinations) {
            Ok(())
        } else {
            Err(DistanceError::InvalidInput(format!(
                "matrix {origins}x{destinations} exceeds provider caps {}x{}",
                self.config.batch_limits.max_origins, self.config.batch_limits.max_destinations
            )))
        }
    }
}

#[async_trait]
impl DistanceProvider for MatrixApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::MatrixApi
    }

    fn cost_per_request(&self) -> u32 {
        self.config.cost_per_element
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
        let payload = self.fetch(&[origin], &[destination], options).await?;
        let element = payload
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .ok_or_else(|| DistanceError::Parse {
                provider: ProviderId::MatrixApi,
                message: "response missing element".to_owned(),
            })?;
        match self.element_cell(element) {
            MatrixCell::Ok(result) => Ok(result),
            MatrixCell::Unreachable | MatrixCell::Failed(_) => Err(DistanceError::NoRoute {
                from: origin,
                to: destination,
            }),
        }
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
        self.check_caps(origins.len(), destinations.len())?;
        for coordinate in origins.iter().chain(destinations) {
            validated(*coordinate)?;
        }

        let payload = self.fetch(origins, destinations, options).await?;
        let mut matrix = DistanceMatrix::empty(origins.to_vec(), destinations.to_vec());
        for (row_index, row) in payload.rows.iter().enumerate() {
            for (column_index, element) in row.elements.iter().enumerate() {
                matrix.set_cell(row_index, column_index, self.element_cell(element));
            }
        }
        Ok(matrix)
    }

    async fn test_connection(&self) -> ConnectionStatus {
        // A 1x1 probe between two fixed city-centre points; costs at most
        // one element of quota.
        let origin = Coordinate {
            lat: 52.229_7,
            lng: 21.012_2,
        };
        let destination = Coordinate {
            lat: 52.237_0,
            lng: 21.017_5,
        };
        let started = Instant::now();
        match self
            .fetch(&[origin], &[destination], &DistanceOptions::default())
            .await
        {
            Ok(_) => ConnectionStatus::Ok {
                latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            },
            Err(err) => ConnectionStatus::Failed {
                reason: err.to_string(),
            },
        }
    }
}
