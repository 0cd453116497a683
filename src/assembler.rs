//! Folds per-page fragments into a single OpenAPI 3.0 document.
//!
//! Two fragment shapes are understood, and a fragment may carry both:
//!
//! - the documentation site's custom `paths` block, holding a single
//!   `path`/`method` with `request`/`response` substructures;
//! - a `components.schemas` mapping.
//!
//! Fragments are applied in order. On a `(path, method)` or schema-name
//! collision the later fragment replaces the earlier entry outright.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::validate::SitemapUrl;

pub const OPENAPI_VERSION: &str = "3.0.0";
pub const API_KEY_SCHEME: &str = "APIKeyHeader";
const JSON_CONTENT: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    pub servers: Vec<Server>,
    pub paths: IndexMap<String, IndexMap<String, Operation>>,
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub description: String,
    pub version: String,
    pub contact: Contact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub schemas: IndexMap<String, Value>,
    #[serde(rename = "securitySchemes")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "in")]
    pub location: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId")]
    pub operation_id: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<IndexMap<String, Vec<String>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(
        rename = "requestBody",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<IndexMap<String, Response>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    pub schema: ParameterSchema,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Value>,
}

impl OpenApiDocument {
    /// Empty document with the inferred production server and the fixed
    /// API-key security scheme.
    pub fn skeleton(sitemap: &SitemapUrl) -> Self {
        let mut security_schemes = IndexMap::new();
        security_schemes.insert(
            API_KEY_SCHEME.to_string(),
            SecurityScheme {
                kind: "apiKey".to_string(),
                location: "header".to_string(),
                name: "x-api-key".to_string(),
                description: "API Key for authentication".to_string(),
            },
        );

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: "API Documentation".to_string(),
                description: format!("API documentation extracted from {}", sitemap),
                version: "1.0.0".to_string(),
                contact: Contact {
                    url: sitemap.as_str().replace("sitemap.xml", ""),
                },
            },
            servers: vec![Server {
                url: infer_server_url(sitemap),
                description: "Production server".to_string(),
            }],
            paths: IndexMap::new(),
            components: Components {
                schemas: IndexMap::new(),
                security_schemes,
            },
        }
    }

    pub fn operation_count(&self) -> usize {
        self.paths.values().map(IndexMap::len).sum()
    }
}

/// `scheme://api.<host>` with leading `docs.`/`www.` labels dropped. The host
/// is a guess and is never checked.
pub fn infer_server_url(sitemap: &SitemapUrl) -> String {
    format!("{}://api.{}", sitemap.scheme(), sitemap.bare_netloc())
}

/// Accumulates fragments into one document.
pub struct SpecAssembler {
    document: OpenApiDocument,
}

impl SpecAssembler {
    pub fn new(sitemap: &SitemapUrl) -> Self {
        SpecAssembler {
            document: OpenApiDocument::skeleton(sitemap),
        }
    }

    /// Apply one fragment. Shapes that are not recognised contribute nothing.
    pub fn fold(&mut self, fragment: &Value) {
        if let Some((path, method, operation)) = translate_path_block(fragment) {
            let previous = self
                .document
                .paths
                .entry(path.clone())
                .or_default()
                .insert(method.clone(), operation);
            if previous.is_some() {
                debug!(%path, %method, "operation overwritten by later fragment");
            }
        }

        if let Some(schemas) = fragment
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_object)
        {
            for (name, schema) in schemas {
                if self
                    .document
                    .components
                    .schemas
                    .insert(name.clone(), schema.clone())
                    .is_some()
                {
                    debug!(schema = %name, "schema overwritten by later fragment");
                }
            }
        }
    }

    pub fn finish(self) -> OpenApiDocument {
        self.document
    }
}

/// Fold `fragments` in order into a fresh document.
pub fn assemble<'a, I>(fragments: I, sitemap: &SitemapUrl) -> OpenApiDocument
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut assembler = SpecAssembler::new(sitemap);
    for fragment in fragments {
        assembler.fold(fragment);
    }
    assembler.finish()
}

/// `"{method}_{path}"` with `/` and `-` turned into `_` and outer `_` trimmed.
pub fn operation_id(method: &str, path: &str) -> String {
    let sanitized = path.replace(['/', '-'], "_");
    format!("{}_{}", method, sanitized.trim_matches('_'))
}

/// Third `/`-separated segment of the path, so `/v1/items` tags as `items`.
pub fn operation_tag(path: &str) -> String {
    path.split('/').nth(2).unwrap_or("default").to_string()
}

/// Translate the custom `paths` block into `(path, method, Operation)`.
/// Standard OpenAPI `paths` mappings have no `path` key and are ignored.
fn translate_path_block(fragment: &Value) -> Option<(String, String, Operation)> {
    let block = fragment.get("paths")?.as_object()?;
    let path = block.get("path")?.as_str()?.to_string();
    let method = block
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("get")
        .to_lowercase();

    let request = block.get("request").and_then(Value::as_object);

    let security = request
        .filter(|r| r.contains_key("security"))
        .map(|_| {
            let mut requirement = IndexMap::new();
            requirement.insert(API_KEY_SCHEME.to_string(), Vec::new());
            vec![requirement]
        });

    let parameters = request
        .and_then(|r| r.get("parameters"))
        .map(translate_parameters);

    let request_body = request
        .and_then(|r| r.get("body"))
        .and_then(Value::as_object)
        .and_then(translate_body);

    let responses = block
        .get("response")
        .map(|r| translate_responses(r.as_object().unwrap_or(&Map::new())));

    let operation = Operation {
        operation_id: operation_id(&method, &path),
        tags: vec![operation_tag(&path)],
        summary: string_field(block, "summary"),
        description: string_field(block, "description"),
        deprecated: block.get("deprecated").and_then(Value::as_bool),
        security,
        parameters,
        request_body,
        responses,
    };
    Some((path, method, operation))
}

fn translate_parameters(params: &Value) -> Vec<Parameter> {
    let mut out = Vec::new();

    for (name, info) in entries(params.get("query")) {
        out.push(parameter(name, info, ParameterLocation::Query, None));
    }
    for (name, info) in entries(params.get("path")) {
        out.push(parameter(name, info, ParameterLocation::Path, Some(true)));
    }
    for (name, info) in entries(params.get("header")) {
        // API keys are covered by the security scheme.
        let is_key = name.to_lowercase().contains("api")
            || info.get("type").and_then(Value::as_str) == Some("apiKey");
        if !is_key {
            out.push(parameter(name, info, ParameterLocation::Header, None));
        }
    }
    out
}

fn parameter(
    name: &str,
    info: &Value,
    location: ParameterLocation,
    required: Option<bool>,
) -> Parameter {
    Parameter {
        name: name.to_string(),
        location,
        required,
        schema: ParameterSchema {
            kind: info
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("string")
                .to_string(),
        },
        description: info
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn translate_body(body: &Map<String, Value>) -> Option<RequestBody> {
    let content: IndexMap<String, MediaType> = body
        .iter()
        .filter_map(|(content_type, def)| {
            let schema = first_schema(def)?;
            Some((
                content_type.clone(),
                MediaType {
                    schema,
                    examples: def.get("examples").cloned(),
                },
            ))
        })
        .collect();

    if content.is_empty() {
        None
    } else {
        Some(RequestBody { content })
    }
}

fn translate_responses(response: &Map<String, Value>) -> IndexMap<String, Response> {
    response
        .iter()
        .map(|(status, info)| {
            let description = info
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("Success")
                .to_string();

            let content = info.get(JSON_CONTENT).map(|json| {
                let mut content = IndexMap::new();
                content.insert(
                    JSON_CONTENT.to_string(),
                    MediaType {
                        schema: first_schema(json).unwrap_or_else(|| Value::Object(Map::new())),
                        examples: json.get("examples").cloned(),
                    },
                );
                content
            });

            (status.clone(), Response { description, content })
        })
        .collect()
}

fn first_schema(def: &Value) -> Option<Value> {
    def.get("schemaArray")?.as_array()?.first().cloned()
}

fn string_field(block: &Map<String, Value>, key: &str) -> Option<String> {
    block.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Key/value pairs of an optional mapping; anything else is empty.
fn entries(value: Option<&Value>) -> impl Iterator<Item = (&str, &Value)> {
    value
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
}
