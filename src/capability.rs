use std::io::Cursor;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use image::{GrayImage, ImageFormat};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DetectionError;
use crate::planner::DetectionRequest;

/// Default address of the stenosis analysis service.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";
/// Environment variable overriding the service address.
pub const SERVICE_URL_ENV: &str = "STENOSCOPE_SERVICE_URL";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
// Remote analysis takes minutes, not seconds.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Request/response boundary to the external analysis service.
///
/// Implementations own the transport. Errors distinguish a capability
/// that cannot be reached from one that answered and declined; both
/// are reported once, with no retry.
pub trait DetectionCapability {
    /// True when the capability can accept analysis work right now.
    fn is_ready(&self) -> bool;
    /// Submits a planned request and returns the raw response.
    fn detect(&self, request: &DetectionRequest) -> Result<StenosisResult, DetectionError>;
    /// Segments a single rendered slice.
    fn process_single(&self, image: &GrayImage) -> Result<SingleImageResult, DetectionError>;
}

/// Connection settings for [`StenosisServiceClient`].
#[derive(Debug, Clone)]
pub struct StenosisServiceConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for StenosisServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl StenosisServiceConfig {
    /// Default configuration, with the base URL taken from
    /// `STENOSCOPE_SERVICE_URL` when that variable is set and
    /// non-empty.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        config
    }
}

/// Health payload reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub version: String,
}

/// Full detection response. Percentages are per carotid side; masks
/// are base64 PNG overlays in slice order.
#[derive(Debug, Clone, Deserialize)]
pub struct StenosisResult {
    pub success: bool,
    #[serde(default)]
    pub stenosis_left_percent: f64,
    #[serde(default)]
    pub stenosis_right_percent: f64,
    #[serde(default)]
    pub processed_images: usize,
    #[serde(default)]
    pub areas_left: Vec<f64>,
    #[serde(default)]
    pub areas_right: Vec<f64>,
    #[serde(default)]
    pub masks: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response to a single-image segmentation request.
#[derive(Debug, Clone, Deserialize)]
pub struct SingleImageResult {
    pub success: bool,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub area_left: f64,
    #[serde(default)]
    pub area_right: f64,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize)]
struct BulkRequestBody {
    images: Vec<String>,
}

#[derive(Serialize)]
struct CenterRequestBody {
    dicom_folder: String,
    center_slice: usize,
}

#[derive(Serialize)]
struct SingleRequestBody {
    image: String,
}

/// Blocking HTTP client for the stenosis analysis service.
pub struct StenosisServiceClient {
    client: Client,
    base_url: String,
}

impl StenosisServiceClient {
    pub fn new(config: StenosisServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .context("Could not initialize HTTP client for the stenosis service")?;
        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
        })
    }

    /// Fetches and parses the health endpoint.
    pub fn check_health(&self) -> Result<HealthStatus> {
        let url = format!("{}/api/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("HTTP request failed for {url}"))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .unwrap_or_else(|_| String::from("unable to read error body"));
            bail!("HTTP {status} for {url}: {detail}");
        }
        response
            .json::<HealthStatus>()
            .with_context(|| format!("Could not parse health payload from {url}"))
    }

    fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, DetectionError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{endpoint}", self.base_url);
        let response = self.client.post(&url).json(body).send().map_err(|err| {
            DetectionError::CapabilityUnavailable(format!("HTTP request failed for {url}: {err}"))
        })?;
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .unwrap_or_else(|_| String::from("unable to read error body"));
            return Err(DetectionError::CapabilityUnavailable(format!(
                "HTTP {status} for {url}: {detail}"
            )));
        }
        response.json::<R>().map_err(|err| {
            DetectionError::CapabilityUnavailable(format!(
                "Could not parse response from {url}: {err}"
            ))
        })
    }
}

impl DetectionCapability for StenosisServiceClient {
    fn is_ready(&self) -> bool {
        match self.check_health() {
            Ok(health) => {
                log::debug!(
                    "stenosis service health: status {:?}, model loaded {}, version {:?}",
                    health.status,
                    health.model_loaded,
                    health.version
                );
                health.model_loaded
            }
            Err(err) => {
                log::debug!("stenosis service health check failed: {err:#}");
                false
            }
        }
    }

    fn detect(&self, request: &DetectionRequest) -> Result<StenosisResult, DetectionError> {
        match request {
            DetectionRequest::CenterBased {
                source_path,
                center_slice,
            } => {
                let body = CenterRequestBody {
                    dicom_folder: source_path.to_string_lossy().into_owned(),
                    center_slice: *center_slice,
                };
                self.post_json("/api/detect-stenosis-center", &body)
            }
            DetectionRequest::BulkPayload { images } => {
                let images = encode_images(images).map_err(|err| {
                    DetectionError::CapabilityUnavailable(format!(
                        "Could not encode slice payload: {err:#}"
                    ))
                })?;
                self.post_json("/api/detect-stenosis", &BulkRequestBody { images })
            }
        }
    }

    fn process_single(&self, image: &GrayImage) -> Result<SingleImageResult, DetectionError> {
        let image = encode_png_base64(image).map_err(|err| {
            DetectionError::CapabilityUnavailable(format!(
                "Could not encode slice payload: {err:#}"
            ))
        })?;
        self.post_json("/api/process-single", &SingleRequestBody { image })
    }
}

/// Encodes a rendered slice as base64 PNG for the JSON payloads.
pub fn encode_png_base64(image: &GrayImage) -> Result<String> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("PNG encoding failed")?;
    Ok(BASE64_STANDARD.encode(&bytes))
}

fn encode_images(images: &[GrayImage]) -> Result<Vec<String>> {
    images.iter().map(encode_png_base64).collect()
}

/// Decodes a base64 PNG mask returned by the service.
pub fn decode_png_base64(data: &str) -> Result<GrayImage> {
    let bytes = BASE64_STANDARD
        .decode(data.trim())
        .context("Mask payload is not valid base64")?;
    let decoded =
        image::load_from_memory(&bytes).context("Mask payload is not a decodable image")?;
    Ok(decoded.to_luma8())
}

fn normalize_base_url(base_url: &str) -> String {
    strip_query_and_fragment(base_url.trim())
        .trim()
        .trim_end_matches('/')
        .to_string()
}

fn strip_query_and_fragment(value: &str) -> &str {
    let query_index = value.find('?').unwrap_or(value.len());
    let fragment_index = value.find('#').unwrap_or(value.len());
    &value[..query_index.min(fragment_index)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:5000/"),
            "http://localhost:5000"
        );
    }

    #[test]
    fn normalize_base_url_strips_query_and_fragment() {
        assert_eq!(
            normalize_base_url("http://analysis.example.com:5000/?token=abc#frag"),
            "http://analysis.example.com:5000"
        );
    }

    #[test]
    fn normalize_base_url_trims_whitespace() {
        assert_eq!(
            normalize_base_url("  http://localhost:5000  "),
            "http://localhost:5000"
        );
    }

    #[test]
    fn detection_response_parses_the_service_shape() {
        let payload = r#"{
            "success": true,
            "stenosis_left_percent": 45.2,
            "stenosis_right_percent": 12.0,
            "processed_images": 61,
            "areas_left": [10.5, 11.0],
            "areas_right": [9.8, 10.1],
            "masks": [],
            "error": null
        }"#;
        let result: StenosisResult = serde_json::from_str(payload).unwrap();
        assert!(result.success);
        assert_eq!(result.stenosis_left_percent, 45.2);
        assert_eq!(result.processed_images, 61);
        assert_eq!(result.areas_left.len(), 2);
        assert!(result.error.is_none());
    }

    #[test]
    fn failure_response_parses_without_measurements() {
        let payload = r#"{"success": false, "error": "model not loaded"}"#;
        let result: StenosisResult = serde_json::from_str(payload).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("model not loaded"));
        assert_eq!(result.stenosis_left_percent, 0.0);
    }

    #[test]
    fn health_payload_tolerates_missing_fields() {
        let health: HealthStatus = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert_eq!(health.status, "ok");
        assert!(!health.model_loaded);
    }

    #[test]
    fn center_request_body_uses_the_service_field_names() {
        let body = CenterRequestBody {
            dicom_folder: "/data/series".to_string(),
            center_slice: 42,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["dicom_folder"], "/data/series");
        assert_eq!(value["center_slice"], 42);
    }

    #[test]
    fn encoded_payload_is_valid_base64_png() {
        let image = GrayImage::from_pixel(8, 8, image::Luma([200]));
        let encoded = encode_png_base64(&image).unwrap();
        let bytes = BASE64_STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn mask_decoding_rejects_garbage() {
        assert!(decode_png_base64("not base64 at all!").is_err());
        let not_png = BASE64_STANDARD.encode(b"plain text");
        assert!(decode_png_base64(&not_png).is_err());
    }
}
