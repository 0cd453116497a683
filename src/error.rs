use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL cannot be empty")]
    Empty,
    #[error("Invalid URL format: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Error fetching sitemap: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Error parsing XML: {0}")]
    Xml(String),
    #[error("Error parsing XML: no root element found")]
    NoRoot,
}

/// Per-page failure reason. The display text is what gets recorded on the
/// extraction result, so keep these strings stable.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Could not extract YAML content")]
    NoYamlBlock,
    #[error("Failed to parse YAML")]
    InvalidYaml,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Cannot specify both --json-only and --yaml-only")]
    ConflictingFlags,
    #[error("Error saving {format} file {path}: {source}")]
    Write {
        format: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error serializing {format}: {message}")]
    Serialize {
        format: &'static str,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("No URLs found or error occurred.")]
    NoUrls,
    #[error("No OpenAPI content found to generate specification.")]
    NoFragments,
    #[error("{failed} output file(s) could not be written")]
    WriteFailed { failed: usize },
}
