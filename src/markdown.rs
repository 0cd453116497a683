use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::HttpClient;
use crate::error::PageError;

/// Fenced yaml block whose info string or body carries a `METHOD /path` line.
static METHOD_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```+yaml[^`]*?(?:GET|POST|PUT|DELETE|PATCH) /.*?\n(.*?)```+").unwrap()
});
/// Fenced yaml block directly under a `## OpenAPI` heading.
static HEADING_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)## OpenAPI\s*```+yaml[^`]*?\n(.*?)```+").unwrap());

const MARKER: &str = "openapi";

/// Outcome of inspecting one documentation page.
#[derive(Debug)]
pub struct ExtractionResult {
    pub source_url: String,
    pub markdown_url: String,
    pub has_openapi_marker: bool,
    pub parsed_fragment: Option<Value>,
    pub error: Option<PageError>,
}

/// Fetch `<url>.md` and pull the embedded OpenAPI fragment out of it.
/// Never fails; every problem is recorded on the result.
pub async fn process_page(client: &HttpClient, url: &str) -> ExtractionResult {
    let markdown_url = format!("{}.md", url);
    let mut result = ExtractionResult {
        source_url: url.to_string(),
        markdown_url,
        has_openapi_marker: false,
        parsed_fragment: None,
        error: None,
    };

    let content = match client.fetch_page(&result.markdown_url).await {
        Ok(content) => content,
        Err(e) => {
            warn!(url = %result.markdown_url, "page fetch failed: {}", e);
            result.error = Some(PageError::Request(e));
            return result;
        }
    };

    match extract_fragment(&content) {
        Ok(None) => {}
        Ok(Some(fragment)) => {
            result.has_openapi_marker = true;
            result.parsed_fragment = Some(fragment);
        }
        Err(e) => {
            warn!(url = %result.markdown_url, "{}", e);
            result.has_openapi_marker = true;
            result.error = Some(e);
        }
    }
    result
}

/// `Ok(None)` when the page never mentions OpenAPI.
pub fn extract_fragment(content: &str) -> Result<Option<Value>, PageError> {
    if !content.to_lowercase().contains(MARKER) {
        return Ok(None);
    }
    let block = extract_yaml_block(content).ok_or(PageError::NoYamlBlock)?;
    parse_fragment(block).map(Some)
}

/// First embedded yaml block, without its fences and surrounding whitespace.
pub fn extract_yaml_block(content: &str) -> Option<&str> {
    METHOD_BLOCK_RE
        .captures(content)
        .or_else(|| HEADING_BLOCK_RE.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Parse a yaml (or json) block. Merge keys (`<<: *anchor`) are resolved.
/// Empty documents and duplicate mapping keys count as failures.
pub fn parse_fragment(block: &str) -> Result<Value, PageError> {
    let mut yaml: serde_yaml::Value = serde_yaml::from_str(block).map_err(|e| {
        debug!("yaml error: {}", e);
        PageError::InvalidYaml
    })?;
    yaml.apply_merge().map_err(|e| {
        debug!("yaml merge error: {}", e);
        PageError::InvalidYaml
    })?;
    let value = yaml_to_json(yaml);
    if is_blank(&value) {
        return Err(PageError::InvalidYaml);
    }
    Ok(value)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Convert into the JSON data model. Non-string scalar keys such as an
/// unquoted `200:` become their string form.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (key_string(k), yaml_to_json(v)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn key_string(key: serde_yaml::Value) -> String {
    match yaml_to_json(key) {
        Value::String(s) => s,
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
