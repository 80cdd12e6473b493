use std::fs::File;
use std::io;
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::PdbId;
use crate::error::IngestError;

pub const CATALOG_URL: &str = "https://www.dsimb.inserm.fr/ATLAS/api/parsable";

pub fn trajectory_url(id: &PdbId) -> String {
    format!(
        "https://www.dsimb.inserm.fr/ATLAS/api/ATLAS/total/{}",
        id.as_str()
    )
}

/// Remote ATLAS archive service. Both endpoints return a ZIP body; callers
/// only see success/failure and the bytes persisted at `destination`.
pub trait AtlasClient: Send + Sync {
    fn download_catalog(&self, destination: &Utf8Path) -> Result<(), IngestError>;
    fn download_trajectory(&self, id: &PdbId, destination: &Utf8Path) -> Result<(), IngestError>;
}

#[derive(Clone)]
pub struct AtlasHttpClient {
    client: Client,
}

impl AtlasHttpClient {
    pub fn new() -> Result<Self, IngestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("mdrepo-ingest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| IngestError::AtlasHttp(err.to_string()))?,
        );
        // Connect timeout only: trajectory archives run to gigabytes, so an
        // overall request deadline would abort healthy transfers.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| IngestError::AtlasHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, IngestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "ATLAS request failed".to_string());
        Err(IngestError::AtlasStatus { status, message })
    }

    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), IngestError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| IngestError::AtlasHttp(err.to_string()))?;
        let mut response = Self::handle_status(response)?;
        let mut file = File::create(destination.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        io::copy(&mut response, &mut file)
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl AtlasClient for AtlasHttpClient {
    fn download_catalog(&self, destination: &Utf8Path) -> Result<(), IngestError> {
        self.download(CATALOG_URL, destination)
    }

    fn download_trajectory(&self, id: &PdbId, destination: &Utf8Path) -> Result<(), IngestError> {
        self.download(&trajectory_url(id), destination)
    }
}
