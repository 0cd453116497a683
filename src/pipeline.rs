use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{debug, info};

use crate::assembler::{assemble, OpenApiDocument};
use crate::client::HttpClient;
use crate::config::Settings;
use crate::error::PipelineError;
use crate::markdown::{self, ExtractionResult};
use crate::output::{self, OutputFormats};
use crate::sitemap;
use crate::validate::SitemapUrl;

const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sitemap: SitemapUrl,
    pub output: Option<String>,
    pub formats: OutputFormats,
    pub verbose: bool,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub total_urls: usize,
    pub valid_urls: usize,
    pub failed_urls: usize,
    pub document: OpenApiDocument,
    pub saved: Vec<PathBuf>,
}

/// How one page ended up, for progress output.
enum PageOutcome {
    Extracted,
    Failed(String),
    NoOpenApi,
}

impl PageOutcome {
    fn of(result: &ExtractionResult) -> Self {
        match (&result.error, &result.parsed_fragment) {
            (Some(e), _) => PageOutcome::Failed(e.to_string()),
            (None, Some(_)) => PageOutcome::Extracted,
            (None, None) => PageOutcome::NoOpenApi,
        }
    }

    fn print(&self) {
        match self {
            PageOutcome::Extracted => println!("  ✅ OpenAPI content extracted"),
            PageOutcome::Failed(message) => println!("  ❌ Error: {}", message),
            PageOutcome::NoOpenApi => {}
        }
    }
}

/// Sitemap → pages → fragments → document → files.
///
/// The client lives for the duration of this call only.
pub async fn run(opts: &RunOptions, settings: &Settings) -> Result<RunSummary, PipelineError> {
    let client = HttpClient::new(settings)?;

    println!("{}", "=".repeat(RULE_WIDTH));
    println!("OpenAPI Documentation Extractor");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("Sitemap URL: {}", opts.sitemap);

    let urls = sitemap::fetch_page_urls(&client, &opts.sitemap).await;
    if urls.is_empty() {
        return Err(PipelineError::NoUrls);
    }

    println!("Found {} URLs. Processing each for OpenAPI content...", urls.len());
    println!("{}", "-".repeat(RULE_WIDTH));

    let (fragments, failed_urls) = extract_all(&client, &urls, opts.verbose).await;
    drop(client);

    println!();
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("SUMMARY");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("Total URLs processed: {}", urls.len());
    println!("URLs with valid OpenAPI JSON: {}", fragments.len());
    if failed_urls > 0 {
        println!("URLs with errors: {}", failed_urls);
    }

    if fragments.is_empty() {
        return Err(PipelineError::NoFragments);
    }

    let document = assemble(
        fragments.iter().filter_map(|r| r.parsed_fragment.as_ref()),
        &opts.sitemap,
    );
    println!("Generated OpenAPI spec with {} paths", document.paths.len());
    println!("Components schemas: {}", document.components.schemas.len());

    let stem = output::output_stem(opts.output.as_deref(), &opts.sitemap);
    let report = output::write_outputs(&document, &settings.results_dir, &stem, opts.formats);
    for path in &report.saved {
        println!("✅ OpenAPI saved to: {}", path.display());
    }
    for failure in &report.failures {
        println!("❌ {}", failure);
    }

    if !report.saved.is_empty() {
        let names: Vec<String> = report.saved.iter().map(|p| p.display().to_string()).collect();
        println!("\nSuccessfully generated OpenAPI documentation!");
        println!("Files saved: {}", names.join(", "));
        if opts.verbose {
            print_preview(&document);
        }
    }

    if !report.failures.is_empty() {
        return Err(PipelineError::WriteFailed {
            failed: report.failures.len(),
        });
    }

    Ok(RunSummary {
        total_urls: urls.len(),
        valid_urls: fragments.len(),
        failed_urls,
        document,
        saved: report.saved,
    })
}

/// Run the extractor over every URL, one request at a time. Returns the
/// results that produced a fragment, in sitemap order, and the error count.
async fn extract_all(
    client: &HttpClient,
    urls: &[String],
    verbose: bool,
) -> (Vec<ExtractionResult>, usize) {
    let total = urls.len();
    let pb = if verbose {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template("Processing {pos}/{len}...")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    };

    let mut fragments = Vec::new();
    let mut failed = 0usize;

    for (i, url) in urls.iter().enumerate() {
        if verbose {
            println!("Processing {}/{}: {}", i + 1, total, url);
        }

        let result = markdown::process_page(client, url).await;
        let outcome = PageOutcome::of(&result);
        debug!(
            url = %result.source_url,
            markdown = %result.markdown_url,
            marker = result.has_openapi_marker,
            "page processed"
        );
        if verbose {
            outcome.print();
        }

        match outcome {
            PageOutcome::Failed(_) => failed += 1,
            PageOutcome::Extracted => fragments.push(result),
            PageOutcome::NoOpenApi => {}
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Extracted {} fragments from {} pages ({} errors)", fragments.len(), total, failed);
    (fragments, failed)
}

fn print_preview(document: &OpenApiDocument) {
    let preview = json!({
        "openapi": document.openapi,
        "info": document.info,
        "servers": document.servers,
        "paths": document.paths.keys().collect::<Vec<_>>(),
        "schemas": document.components.schemas.keys().collect::<Vec<_>>(),
    });
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("OPENAPI SPEC PREVIEW");
    println!("{}", "=".repeat(RULE_WIDTH));
    match serde_json::to_string_pretty(&preview) {
        Ok(text) => println!("{}", text),
        Err(e) => println!("(preview unavailable: {})", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.md", name)).unwrap()
    }

    async fn mount(server: &MockServer, route: &str, status: u16, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    fn options(server: &MockServer, formats: OutputFormats) -> RunOptions {
        RunOptions {
            sitemap: SitemapUrl::parse(&format!("{}/sitemap.xml", server.uri())).unwrap(),
            output: Some("test_api".to_string()),
            formats,
            verbose: false,
        }
    }

    fn settings(tmp: &TempDir) -> Settings {
        Settings {
            results_dir: tmp.path().join("results"),
            ..Settings::default()
        }
    }

    fn urlset(locs: &[String]) -> String {
        let body: String = locs
            .iter()
            .map(|loc| format!("<url><loc>{}</loc></url>", loc))
            .collect();
        format!(
            r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
            body
        )
    }

    #[tokio::test]
    async fn end_to_end_one_api_page_one_guide() {
        let server = MockServer::start().await;
        let api = format!("{}/api-reference/items/list", server.uri());
        let guide = format!("{}/guides/quickstart", server.uri());
        mount(&server, "/sitemap.xml", 200, urlset(&[api, guide])).await;
        mount(&server, "/api-reference/items/list.md", 200, fixture("list_items")).await;
        mount(&server, "/guides/quickstart.md", 200, fixture("quickstart")).await;

        let tmp = TempDir::new().unwrap();
        let settings = settings(&tmp);
        let both = OutputFormats::from_flags(false, false).unwrap();
        let summary = run(&options(&server, both), &settings).await.unwrap();

        assert_eq!(summary.total_urls, 2);
        assert_eq!(summary.valid_urls, 1);
        assert_eq!(summary.failed_urls, 0);

        let doc = &summary.document;
        assert_eq!(doc.paths.keys().collect::<Vec<_>>(), vec!["/v1/items"]);
        let op = &doc.paths["/v1/items"]["get"];
        assert_eq!(op.operation_id, "get_v1_items");
        assert_eq!(op.tags, vec!["items"]);
        assert!(op.security.is_some());
        assert!(doc.components.schemas.contains_key("Item"));

        let dir = tmp.path().join("results");
        assert_eq!(summary.saved, vec![dir.join("test_api.json"), dir.join("test_api.yaml")]);
        let written: OpenApiDocument =
            serde_json::from_str(&std::fs::read_to_string(dir.join("test_api.json")).unwrap())
                .unwrap();
        assert_eq!(&written, doc);
    }

    #[tokio::test]
    async fn existing_results_dir_is_reused() {
        let server = MockServer::start().await;
        let api = format!("{}/api-reference/items/list", server.uri());
        mount(&server, "/sitemap.xml", 200, urlset(&[api])).await;
        mount(&server, "/api-reference/items/list.md", 200, fixture("list_items")).await;

        let tmp = TempDir::new().unwrap();
        let settings = settings(&tmp);
        std::fs::create_dir(&settings.results_dir).unwrap();

        let json_only = OutputFormats::from_flags(true, false).unwrap();
        let summary = run(&options(&server, json_only), &settings).await.unwrap();
        assert_eq!(summary.saved, vec![settings.results_dir.join("test_api.json")]);
        assert!(!settings.results_dir.join("test_api.yaml").exists());
    }

    #[tokio::test]
    async fn empty_sitemap_aborts() {
        let server = MockServer::start().await;
        mount(&server, "/sitemap.xml", 404, String::new()).await;

        let tmp = TempDir::new().unwrap();
        let both = OutputFormats::from_flags(false, false).unwrap();
        let err = run(&options(&server, both), &settings(&tmp)).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoUrls));
        assert!(!tmp.path().join("results").exists());
    }

    #[tokio::test]
    async fn no_fragments_aborts() {
        let server = MockServer::start().await;
        let guide = format!("{}/guides/quickstart", server.uri());
        let missing = format!("{}/gone", server.uri());
        mount(&server, "/sitemap.xml", 200, urlset(&[guide, missing])).await;
        mount(&server, "/guides/quickstart.md", 200, fixture("quickstart")).await;

        let tmp = TempDir::new().unwrap();
        let both = OutputFormats::from_flags(false, false).unwrap();
        let err = run(&options(&server, both), &settings(&tmp)).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoFragments));
        assert!(!tmp.path().join("results").exists());
    }

    #[tokio::test]
    async fn slow_page_does_not_abort_the_run() {
        let server = MockServer::start().await;
        let slow = format!("{}/slow", server.uri());
        let api = format!("{}/api-reference/items/list", server.uri());
        mount(&server, "/sitemap.xml", 200, urlset(&[slow, api])).await;
        Mock::given(method("GET"))
            .and(path("/slow.md"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(fixture("list_items"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        mount(&server, "/api-reference/items/list.md", 200, fixture("list_items")).await;

        let tmp = TempDir::new().unwrap();
        let settings = Settings {
            page_timeout_secs: 1,
            ..settings(&tmp)
        };
        let json_only = OutputFormats::from_flags(true, false).unwrap();
        let summary = run(&options(&server, json_only), &settings).await.unwrap();
        assert_eq!(summary.total_urls, 2);
        assert_eq!(summary.valid_urls, 1);
        assert_eq!(summary.failed_urls, 1);
        assert!(summary.document.paths.contains_key("/v1/items"));
    }

    #[tokio::test]
    async fn later_page_wins_on_collision() {
        let server = MockServer::start().await;
        let first = format!("{}/a", server.uri());
        let second = format!("{}/b", server.uri());
        mount(&server, "/sitemap.xml", 200, urlset(&[first, second])).await;
        let page = |summary: &str| {
            format!(
                "## OpenAPI\n```yaml GET /v1/items\npaths:\n  path: /v1/items\n  method: get\n  summary: {}\n```\n",
                summary
            )
        };
        mount(&server, "/a.md", 200, page("first")).await;
        mount(&server, "/b.md", 200, page("second")).await;

        let tmp = TempDir::new().unwrap();
        let json_only = OutputFormats::from_flags(true, false).unwrap();
        let summary = run(&options(&server, json_only), &settings(&tmp)).await.unwrap();
        assert_eq!(summary.valid_urls, 2);
        assert_eq!(summary.document.operation_count(), 1);
        assert_eq!(
            summary.document.paths["/v1/items"]["get"].summary.as_deref(),
            Some("second")
        );
    }
}
