//! mask-overlay - annotate an image or video with a segmentation mask
//!
//! Prints exactly one JSON object on stdout and always exits 0:
//! `{"success": true, "output": "<path>"}` or
//! `{"success": false, "error": "<message>"}`.
//! Logs and progress go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use mask_overlay::{
    list_models, load_model, DisplayMode, ProcessRequest, Processor, ProcessorConfig, Report, Ui,
    DEFAULT_CONFIDENCE,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input image or video path.
    #[arg(long, required_unless_present = "list_models")]
    input: Option<PathBuf>,
    /// Output path. Unsupported image extensions are rewritten to .jpg.
    #[arg(long, required_unless_present = "list_models")]
    output: Option<PathBuf>,
    /// Model identifier, resolved to <models dir>/<model>.<ext>.
    #[arg(long, default_value = "daytime")]
    model: String,
    /// Detection confidence threshold.
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,
    /// Display mode (draw|highlight|outline|none)
    #[arg(long, default_value = "draw")]
    display_mode: String,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
    /// List models available in the models directory and exit.
    #[arg(long)]
    list_models: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_models {
        println!("{}", models_json());
        return;
    }

    let result = run(&args);
    if let Err(e) = &result {
        log::error!("processing failed: {:#}", e);
    }
    println!("{}", Report::from_result(&result).to_json());
}

fn run(args: &Args) -> Result<PathBuf> {
    let input = args.input.clone().context("--input is required")?;
    let output = args.output.clone().context("--output is required")?;
    let config = ProcessorConfig::load()?;
    let ui = Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let backend = {
        let _stage = ui.stage("load model");
        load_model(&config.models, &args.model)?
    };

    let request = ProcessRequest {
        input,
        output,
        confidence: args.confidence,
        display_mode: DisplayMode::parse(&args.display_mode),
    };
    Processor::new(config, backend, ui).process(&request)
}

fn models_json() -> String {
    let listed = ProcessorConfig::load().and_then(|config| list_models(&config.models));
    let value = match listed {
        Ok(models) => serde_json::json!({ "success": true, "models": models }),
        Err(e) => serde_json::json!({ "success": false, "error": format!("{:#}", e) }),
    };
    value.to_string()
}
