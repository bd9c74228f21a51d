//! `scrivener refine` — run the pipeline over a file.

use scrivener_config::ResultFormat;
use scrivener_core::{Document, DocumentOutput, PipelineError};
use scrivener_pipeline::{BatchItemResult, Pipeline};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct RefineArgs<'a> {
    pub config_path: Option<&'a Path>,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<ResultFormat>,
    pub memory_key: Option<String>,
    pub verbose: bool,
}

pub async fn run(args: RefineArgs<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(args.config_path)
        .map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(key) = args.memory_key {
        config.memory_key = key;
    }
    if args.verbose {
        config.verbose = true;
    }
    let format = args.format.unwrap_or(config.output_format);

    // Validate everything before any work is done.
    let settings = config.pipeline_settings()?;
    let provider = scrivener_providers::build_from_config(&config.provider)?;
    let store = scrivener_memory::open_store(config.memory_mode, &config.memory).await?;

    let content = std::fs::read_to_string(&args.input)
        .map_err(|e| format!("Failed to read {}: {e}", args.input.display()))?;
    let is_json = args
        .input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let documents = parse_documents(&content, is_json, &config.input_field)?;

    info!(
        documents = documents.len(),
        stages = settings.stages.len(),
        provider = provider.name(),
        store = store.name(),
        "Refining"
    );

    let pipeline = Pipeline::new(provider, store, settings);
    let results = pipeline.process_batch(&documents).await;

    for result in &results {
        if let BatchItemResult::Failed { index, error } = result {
            eprintln!("  ❌ Document {index} failed: {error}");
        }
    }

    let outputs: Vec<&DocumentOutput> = results.iter().filter_map(BatchItemResult::output).collect();
    let rendered = render(&outputs, format)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            println!("📝 Wrote {} document(s) to {}", outputs.len(), path.display());
        }
        None => println!("{rendered}"),
    }

    if !results.is_empty() && outputs.is_empty() {
        return Err("Every document failed".into());
    }

    Ok(())
}

/// Turn file content into documents.
///
/// JSON input may be one item or an array of items; each item is a string
/// or an object carrying `input_field`. Anything else is one plain-text
/// document.
pub fn parse_documents(
    content: &str,
    is_json: bool,
    input_field: &str,
) -> Result<Vec<Document>, Box<dyn std::error::Error>> {
    if !is_json {
        return Ok(vec![Document::new(content)]);
    }

    let value: serde_json::Value = serde_json::from_str(content)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            Document::from_json(item, input_field).map_err(
                |e: PipelineError| -> Box<dyn std::error::Error> {
                    format!("Input item {i}: {e}").into()
                },
            )
        })
        .collect()
}

/// Render successful outputs: final texts separated by a blank line, or the
/// output records as a JSON array.
pub fn render(
    outputs: &[&DocumentOutput],
    format: ResultFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ResultFormat::Txt => Ok(outputs
            .iter()
            .map(|o| o.final_text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")),
        ResultFormat::Json => serde_json::to_string_pretty(outputs),
    }
}
