use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use chrono::DateTime;
use log::debug;
use reqwest::{Client, Method, Request};
use serde::Deserialize;
use std::time::{Duration, SystemTime};
use url::Url;

use crate::lib::error::{MetricsError, Result};
use crate::lib::inventory::UtilizationSample;

/// Query step for utilization series, one sample per hour
const QUERY_STEP: Duration = Duration::from_secs(3600);

/// Narrow read interface over the utilization metrics collaborator.
///
/// Implementations may return an empty series (a resource with no
/// telemetry) and may fail transiently; callers own the retry/skip policy.
pub trait MetricsSource {
    fn get_utilization(
        &self,
        resource_id: &str,
        window: Duration,
    ) -> impl Future<Output = Result<Vec<UtilizationSample>>> + Send;
}

/// Metrics client querying a Prometheus-compatible workspace with AWS
/// SigV4 authentication (e.g. Amazon Managed Prometheus fed by the
/// CloudWatch exporter).
pub struct MetricsClient {
    client: Client,
    endpoint: Url,
    region: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
pub struct MetricsResponse {
    pub status: String,
    pub data: MetricsData,
}

#[derive(Debug, Deserialize)]
pub struct MetricsData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: Vec<MetricsResult>,
}

#[derive(Debug, Deserialize)]
pub struct MetricsResult {
    pub metric: std::collections::HashMap<String, String>,
    pub values: Option<Vec<(f64, String)>>,
}

impl MetricsClient {
    /// Create a new metrics client with AWS credentials from the environment
    pub async fn new(endpoint: Url, region: String) -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let credentials = config
            .credentials_provider()
            .ok_or(MetricsError::AuthenticationFailed)?
            .provide_credentials()
            .await
            .map_err(|_| MetricsError::AuthenticationFailed)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MetricsError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            region,
            credentials,
        })
    }

    /// Execute a PromQL range query over the lookback window
    async fn query_range(
        &self,
        query: &str,
        start: SystemTime,
        end: SystemTime,
    ) -> Result<MetricsResponse> {
        let mut url = self.endpoint.clone();
        url.set_path(&format!(
            "{}/api/v1/query_range",
            url.path().trim_end_matches('/')
        ));

        let start_secs = start
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|e| MetricsError::InvalidResponse(e.to_string()))?
            .as_secs();
        let end_secs = end
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|e| MetricsError::InvalidResponse(e.to_string()))?
            .as_secs();

        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("start", &start_secs.to_string())
            .append_pair("end", &end_secs.to_string())
            .append_pair("step", &format!("{}s", QUERY_STEP.as_secs()));

        self.execute_request(Method::GET, url).await
    }

    /// Execute a SigV4-signed HTTP request
    async fn execute_request(&self, method: Method, url: Url) -> Result<MetricsResponse> {
        let mut request = Request::new(method, url.clone());

        let signable_request = SignableRequest::new(
            request.method().as_str(),
            url.as_str(),
            std::iter::empty(),
            SignableBody::Bytes(&[]),
        )
        .map_err(|e| MetricsError::ConnectionFailed(e.to_string()))?;

        let signing_settings = SigningSettings::default();
        let identity: Identity = self.credentials.clone().into();
        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name("aps")
            .time(SystemTime::now())
            .settings(signing_settings)
            .build()
            .map_err(|e| MetricsError::ConnectionFailed(e.to_string()))?
            .into();

        let (signing_instructions, _) =
            aws_sigv4::http_request::sign(signable_request, &signing_params)
                .map_err(|e| MetricsError::ConnectionFailed(e.to_string()))?
                .into_parts();

        for (name, value) in signing_instructions.headers() {
            let header_name: reqwest::header::HeaderName = name
                .parse()
                .map_err(|_| MetricsError::InvalidResponse(format!("bad header name: {name}")))?;
            let header_value: reqwest::header::HeaderValue = value
                .parse()
                .map_err(|_| MetricsError::InvalidResponse(format!("bad header value for {name}")))?;
            request.headers_mut().insert(header_name, header_value);
        }

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| MetricsError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MetricsError::QueryFailed(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ))
            .into());
        }

        let metrics_response: MetricsResponse = response
            .json()
            .await
            .map_err(|e| MetricsError::InvalidResponse(e.to_string()))?;

        if metrics_response.status != "success" {
            return Err(MetricsError::QueryFailed(format!(
                "metrics endpoint returned status: {}",
                metrics_response.status
            ))
            .into());
        }

        Ok(metrics_response)
    }
}

impl MetricsSource for MetricsClient {
    async fn get_utilization(
        &self,
        resource_id: &str,
        window: Duration,
    ) -> Result<Vec<UtilizationSample>> {
        let end = SystemTime::now();
        let start = end - window;

        let query = format!(r#"aws_ec2_cpuutilization_average{{instance_id="{resource_id}"}}"#);
        let response = self.query_range(&query, start, end).await?;
        let samples = samples_from_response(response);

        debug!(
            "Collected {} utilization samples for {resource_id}",
            samples.len()
        );
        Ok(samples)
    }
}

/// Flatten a range-query response into an ordered utilization series.
///
/// Non-finite and negative values are dropped; the series is ordered by
/// timestamp across all returned result sets.
fn samples_from_response(response: MetricsResponse) -> Vec<UtilizationSample> {
    let mut samples = Vec::new();
    for result in response.data.result {
        if let Some(values) = result.values {
            for (epoch, value_str) in values {
                if let Ok(percent) = value_str.parse::<f64>() {
                    if !percent.is_finite() || percent < 0.0 {
                        continue;
                    }
                    if let Some(timestamp) = DateTime::from_timestamp(epoch as i64, 0) {
                        samples.push(UtilizationSample { timestamp, percent });
                    }
                }
            }
        }
    }
    samples.sort_by_key(|s| s.timestamp);
    samples
}
