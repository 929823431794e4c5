//! Blocking client for the aptamer design service.
//!
//! Three calls are made: generate candidates for a reference, mutate one
//! aptamer, and plot a secondary structure. Each runs on a worker thread owned
//! by the controller and reports back as a [`Completion`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::forms::MutationKind;
use crate::model::Record;

/// Default request timeout. Generation can be slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// File the service-rendered structure image is written to.
pub const STRUCTURE_SVG: &str = "rna_structure.svg";

/// Errors returned by service calls.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("no service URL configured (use --api-url or APTUI_API_URL)")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("could not save response: {0}")]
    Io(#[from] std::io::Error),
}

/// Body of a generate call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub fasta_sequence: String,
    pub num_aptamers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_gc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_gc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_tm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tm: Option<f64>,
}

/// A validated mutation request. The wire body depends on the kind.
#[derive(Debug, Clone, PartialEq)]
pub struct MutateRequest {
    pub aptamer: String,
    pub count: usize,
    pub kind: MutationKind,
}

impl MutateRequest {
    fn endpoint(&self) -> &'static str {
        match self.kind {
            MutationKind::Point => "point-mutate-aptamer",
            MutationKind::Random => "mutate-aptamer",
        }
    }

    fn body(&self) -> Value {
        match self.kind {
            MutationKind::Point => json!({
                "aptamer": self.aptamer,
                "num_point_mutations": self.count,
            }),
            MutationKind::Random => json!({
                "aptamer": self.aptamer,
                "num_mutations": self.count,
            }),
        }
    }
}

/// Any request the view can submit.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequest {
    Generate(GenerateRequest),
    Mutate(MutateRequest),
    Plot { sequence: String, structure: String },
}

/// Identifies the view state a request was submitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub plot_epoch: u64,
}

/// The result of one request.
#[derive(Debug)]
pub enum Outcome {
    Generated(Result<Vec<Record>, ServiceError>),
    Mutated {
        requested: usize,
        result: Result<Vec<Record>, ServiceError>,
    },
    Plotted(Result<PathBuf, ServiceError>),
}

impl Outcome {
    /// Short name of the action, for logs.
    pub fn action(&self) -> &'static str {
        match self {
            Outcome::Generated(_) => "generate",
            Outcome::Mutated { .. } => "mutate",
            Outcome::Plotted(_) => "plot",
        }
    }
}

/// A finished request, sent from a worker thread back to the event loop.
#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub outcome: Outcome,
}

/// HTTP client bound to one service base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Option<String>,
    http: reqwest::blocking::Client,
}

impl ApiClient {
    /// Builds a client. A missing base URL is only reported when a call is made.
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn endpoint(&self, path: &str) -> Result<String, ServiceError> {
        let base = self.base_url.as_deref().ok_or(ServiceError::NotConfigured)?;
        Ok(format!("{}/{}", base, path))
    }

    /// Posts a JSON body and returns the response text of a successful call.
    fn post<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<String, ServiceError> {
        let endpoint = self.endpoint(path)?;
        log::debug!("POST {}", endpoint);
        let response = self.http.post(&endpoint).json(payload).send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            log::warn!("{} returned {}", endpoint, status);
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(body)
    }

    pub fn generate(&self, request: &GenerateRequest) -> Result<Vec<Record>, ServiceError> {
        let body = self.post("generate-aptamers", request)?;
        decode_records(&body, "aptamers")
    }

    pub fn mutate(&self, request: &MutateRequest) -> Result<Vec<Record>, ServiceError> {
        let body = self.post(request.endpoint(), &request.body())?;
        decode_records(&body, "mutations")
    }

    /// Returns the SVG markup of a structure plot.
    pub fn plot_structure(&self, sequence: &str, structure: &str) -> Result<String, ServiceError> {
        self.post(
            "plot-structure",
            &json!({ "sequence": sequence, "structure": structure }),
        )
    }

    /// Runs one request to completion. Plots are saved to `svg_path`.
    pub fn execute(&self, request: ServiceRequest, svg_path: &Path) -> Outcome {
        match request {
            ServiceRequest::Generate(request) => Outcome::Generated(self.generate(&request)),
            ServiceRequest::Mutate(request) => Outcome::Mutated {
                requested: request.count,
                result: self.mutate(&request),
            },
            ServiceRequest::Plot {
                sequence,
                structure,
            } => Outcome::Plotted(
                self.plot_structure(&sequence, &structure)
                    .and_then(|svg| {
                        fs::write(svg_path, svg)?;
                        Ok(svg_path.to_path_buf())
                    }),
            ),
        }
    }
}

/// Extracts the record array stored under `key`.
///
/// A missing array is an empty collection. Entries that do not decode or
/// carry no sequence are skipped.
pub fn decode_records(body: &str, key: &str) -> Result<Vec<Record>, ServiceError> {
    let value: Value = serde_json::from_str(body)?;
    let Some(items) = value.get(key).and_then(Value::as_array) else {
        log::warn!("response has no '{}' array", key);
        return Ok(Vec::new());
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match serde_json::from_value::<Record>(item.clone()) {
            Ok(record) if !record.sequence.trim().is_empty() => records.push(record),
            Ok(_) => log::warn!("skipping {} entry {}: empty sequence", key, i),
            Err(e) => log::warn!("skipping {} entry {}: {}", key, i, e),
        }
    }
    Ok(records)
}
