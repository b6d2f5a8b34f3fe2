// API client module: a small blocking HTTP client for the NVCF asset
// service and the Florence-2 inference endpoint. Every call is made exactly
// once; a failure status is returned to the caller as an error.

use crate::config::Config;
use crate::error::{FlorenceError, Result, Stage};
use crate::image::CONTENT_TYPE;
use reqwest::blocking::{Client, Response};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const ASSET_DESCRIPTION_HEADER: &str = "x-amz-meta-nvcf-asset-description";
const INPUT_ASSET_REFERENCES_HEADER: &str = "nvcf-input-asset-references";
const FUNCTION_ASSET_IDS_HEADER: &str = "nvcf-function-asset-ids";

/// Client holding a reqwest blocking client, the endpoints and the
/// pre-built Authorization header.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    assets_url: String,
    inference_url: String,
    authorization: HeaderValue,
    register_timeout: Duration,
    upload_timeout: Duration,
}

/// Upload intent sent to the asset-registration endpoint.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssetRequest<'a> {
    pub content_type: &'a str,
    pub description: &'a str,
}

/// Registration answer: where to PUT the bytes and the id to refer to them by.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    pub upload_url: String,
    pub asset_id: String,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Message<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct InferenceRequest<'a> {
    pub messages: Vec<Message<'a>>,
}

impl<'a> InferenceRequest<'a> {
    pub fn user(content: &'a str) -> Self {
        Self {
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }
}

/// An image stored on the asset service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub content_type: &'static str,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.inference_timeout)
            .build()
            .map_err(|source| FlorenceError::Transport {
                stage: Stage::ClientSetup,
                source,
            })?;
        let mut authorization = HeaderValue::from_str(&config.bearer()).map_err(|_| {
            FlorenceError::MalformedCredential {
                var: config.api_key_var,
            }
        })?;
        authorization.set_sensitive(true);
        Ok(ApiClient {
            client,
            assets_url: config.assets_url.clone(),
            inference_url: config.inference_url.clone(),
            authorization,
            register_timeout: config.register_timeout,
            upload_timeout: config.upload_timeout,
        })
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, self.authorization.clone());
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Register the upload, then PUT the bytes to the pre-signed URL.
    pub fn upload_asset(&self, bytes: &[u8], description: &str) -> Result<Asset> {
        let registration = self.register_asset(description)?;
        debug!(asset_id = %registration.asset_id, "asset registered");

        let res = self
            .client
            .put(&registration.upload_url)
            .header(ASSET_DESCRIPTION_HEADER, description)
            .header(header::CONTENT_TYPE, CONTENT_TYPE)
            .body(bytes.to_vec())
            .timeout(self.upload_timeout)
            .send()
            .map_err(|source| FlorenceError::Transport {
                stage: Stage::Upload,
                source,
            })?;
        ensure_success(Stage::Upload, res)?;

        info!(asset_id = %registration.asset_id, bytes = bytes.len(), "asset uploaded");
        Ok(Asset {
            id: registration.asset_id,
            content_type: CONTENT_TYPE,
        })
    }

    fn register_asset(&self, description: &str) -> Result<AssetResponse> {
        let transport = |source: reqwest::Error| FlorenceError::Transport {
            stage: Stage::Register,
            source,
        };
        let res = self
            .client
            .post(&self.assets_url)
            .headers(self.auth_headers())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&AssetRequest {
                content_type: CONTENT_TYPE,
                description,
            })
            .timeout(self.register_timeout)
            .send()
            .map_err(transport)?;
        let res = ensure_success(Stage::Register, res)?;
        res.json::<AssetResponse>().map_err(transport)
    }

    /// Send the composed content and return the raw response body. Asset
    /// headers are only attached when the image was uploaded.
    pub fn infer(&self, content: &str, asset_id: Option<&str>) -> Result<Vec<u8>> {
        let transport = |source: reqwest::Error| FlorenceError::Transport {
            stage: Stage::Inference,
            source,
        };
        let mut req = self
            .client
            .post(&self.inference_url)
            .headers(self.auth_headers())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&InferenceRequest::user(content));
        if let Some(id) = asset_id {
            req = req
                .header(INPUT_ASSET_REFERENCES_HEADER, id)
                .header(FUNCTION_ASSET_IDS_HEADER, id);
        }

        let res = req.send().map_err(transport)?;
        let res = ensure_success(Stage::Inference, res)?;
        let body = res.bytes().map_err(transport)?;
        info!(bytes = body.len(), "inference response received");
        Ok(body.to_vec())
    }
}

fn ensure_success(stage: Stage, res: Response) -> Result<Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let body = res.text().unwrap_or_default();
    Err(FlorenceError::HttpStatus { stage, status, body })
}
