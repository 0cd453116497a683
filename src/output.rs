use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::assembler::OpenApiDocument;
use crate::error::OutputError;
use crate::validate::SitemapUrl;

/// Which files to write. Both by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormats {
    pub json: bool,
    pub yaml: bool,
}

impl OutputFormats {
    pub fn from_flags(json_only: bool, yaml_only: bool) -> Result<Self, OutputError> {
        match (json_only, yaml_only) {
            (true, true) => Err(OutputError::ConflictingFlags),
            (true, false) => Ok(OutputFormats { json: true, yaml: false }),
            (false, true) => Ok(OutputFormats { json: false, yaml: true }),
            (false, false) => Ok(OutputFormats { json: true, yaml: true }),
        }
    }
}

/// Files written and failures hit, in attempt order.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub saved: Vec<PathBuf>,
    pub failures: Vec<OutputError>,
}

/// Explicit override, or `<host>_api` with `docs.`/`www.` dropped and
/// separators turned into underscores.
pub fn output_stem(explicit: Option<&str>, sitemap: &SitemapUrl) -> String {
    match explicit {
        Some(stem) => stem.to_string(),
        None => format!("{}_api", sitemap.bare_netloc().replace(['.', ':'], "_")),
    }
}

/// Write the document into `dir` under `stem`. Creates `dir` if missing but
/// not any parent directories implied by `stem`. Each file is attempted even
/// if an earlier one failed.
pub fn write_outputs(
    document: &OpenApiDocument,
    dir: &Path,
    stem: &str,
    formats: OutputFormats,
) -> WriteReport {
    let mut report = WriteReport::default();

    if let Err(e) = fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), "could not create results directory: {}", e);
    }

    if formats.json {
        let path = dir.join(format!("{}.json", stem));
        record(&mut report, write_json(document, &path).map(|()| path));
    }
    if formats.yaml {
        let path = dir.join(format!("{}.yaml", stem));
        record(&mut report, write_yaml(document, &path).map(|()| path));
    }
    report
}

fn record(report: &mut WriteReport, result: Result<PathBuf, OutputError>) {
    match result {
        Ok(path) => {
            info!(path = %path.display(), "saved");
            report.saved.push(path);
        }
        Err(e) => {
            warn!("{}", e);
            report.failures.push(e);
        }
    }
}

/// Pretty-printed with 2-space indentation.
pub fn write_json(document: &OpenApiDocument, path: &Path) -> Result<(), OutputError> {
    let text = serde_json::to_string_pretty(document).map_err(|e| OutputError::Serialize {
        format: "JSON",
        message: e.to_string(),
    })?;
    write_file("JSON", path, text)
}

/// Block style YAML.
pub fn write_yaml(document: &OpenApiDocument, path: &Path) -> Result<(), OutputError> {
    let text = serde_yaml::to_string(document).map_err(|e| OutputError::Serialize {
        format: "YAML",
        message: e.to_string(),
    })?;
    write_file("YAML", path, text)
}

fn write_file(format: &'static str, path: &Path, text: String) -> Result<(), OutputError> {
    fs::write(path, text).map_err(|source| OutputError::Write {
        format,
        path: path.to_path_buf(),
        source,
    })
}
