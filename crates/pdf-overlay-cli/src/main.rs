//! PDF Overlay CLI - Translate a PDF as an overlay and fill its form fields.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_overlay_core::policy::settle_or;
use pdf_overlay_core::{
    AppConfig, FillData, Lang, OverlayPosition, Pipeline, Stage, TextColor, TranslationBackend,
    load_fill_data,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorOption {
    DarkRed,
    Blue,
    DarkGreen,
    Purple,
}

impl From<ColorOption> for TextColor {
    fn from(opt: ColorOption) -> Self {
        match opt {
            ColorOption::DarkRed => Self::dark_red(),
            ColorOption::Blue => Self::blue(),
            ColorOption::DarkGreen => Self::dark_green(),
            ColorOption::Purple => Self::purple(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pdf-overlay")]
#[command(author, version, about = "Translate PDF pages as an overlay and fill form fields", long_about = None)]
#[command(after_help = r#"Fill-data file (--fill-data) is a flat JSON object of field names to values:

  {
    "Name": "Max Mustermann",
    "Email": "max@example.com",
    "person.city": "Berlin"
  }"#)]
struct Args {
    /// Input PDF file
    input: PathBuf,

    /// Output PDF file (default: <input>-<lang>.pdf)
    output: Option<PathBuf>,

    /// Target language code
    #[arg(short, long)]
    lang: Option<String>,

    /// Source language code ("auto" to detect)
    #[arg(short, long)]
    source_lang: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_key: Option<String>,

    /// JSON file with form field values
    #[arg(short, long)]
    fill_data: Option<PathBuf>,

    /// Where the translation is placed on each page: right, bottom or top
    #[arg(short, long)]
    position: Option<String>,

    /// Translation text color (default: blue)
    #[arg(long, value_enum)]
    color: Option<ColorOption>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable caching
    #[arg(long)]
    no_cache: bool,

    /// Clear the translation cache before processing
    #[arg(long)]
    clear_cache: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Override config with CLI arguments
    if let Some(lang) = &args.lang {
        config.target_lang = Lang::new(lang);
    }
    if let Some(source) = &args.source_lang {
        config.source_lang = Lang::new(source);
    }
    if let Some(position) = &args.position {
        config.position = position.parse().unwrap_or_else(|e| {
            warn!("{e}, placing the translation at the top");
            OverlayPosition::Top
        });
    }
    if let Some(color) = args.color {
        config.text_color = color.into();
    }
    if let Some(key) = &args.gemini_key {
        config.llm.api_key = Some(key.clone());
    }
    if args.no_cache {
        config.cache.memory_enabled = false;
        config.cache.disk_enabled = false;
    }

    Ok(config)
}

/// Fill data from `--fill-data`; an unreadable or malformed file means no fill.
fn read_fill_data(path: Option<&Path>) -> FillData {
    let Some(path) = path else {
        return FillData::new();
    };
    settle_or(Stage::FillDataLoad, path.display(), load_fill_data(path), FillData::new)
        .unwrap_or_default()
}

fn default_output(input: &Path, lang: &Lang) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}-{lang}.pdf"))
}

// CLI output is intentional
#[allow(clippy::print_stdout)]
#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    if std::env::args_os().len() <= 1 {
        println!("{}", Args::command().render_long_help());
        return Ok(ExitCode::SUCCESS);
    }

    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    let target = config.target_lang.clone();
    let position = config.position;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input, &target));
    let fill_data = read_fill_data(args.fill_data.as_deref());

    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    let progress = pb.clone();

    let translator =
        TranslationBackend::from_config(&config).context("Failed to initialize translation")?;
    if args.clear_cache {
        if translator.clear_cache() {
            info!("Cleared translation cache");
        } else {
            warn!("Translation cache is disabled, nothing to clear");
        }
    }

    let pipeline = Pipeline::builder(config)
        .with_translator(translator)
        .with_progress(Box::new(move |done, total| {
            progress.set_length(u64::try_from(total).unwrap_or(u64::MAX));
            progress.set_position(u64::try_from(done).unwrap_or(u64::MAX));
        }))
        .build()
        .context("Failed to initialize pipeline")?;

    info!("Processing {} -> {}", args.input.display(), output.display());
    let fill = (!fill_data.is_empty()).then_some(&fill_data);
    let succeeded = pipeline
        .run(&args.input, &output, &target, fill, position)
        .await;
    pb.finish_and_clear();

    if succeeded {
        println!("Processed PDF saved to: {}", output.display());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Failed to process {}", args.input.display());
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_color_flag() {
        let args =
            Args::try_parse_from(["pdf-overlay", "in.pdf", "--color", "dark-green"]).unwrap();
        assert_eq!(args.color, Some(ColorOption::DarkGreen));
        assert_eq!(TextColor::from(ColorOption::DarkGreen), TextColor::dark_green());
        assert_eq!(TextColor::from(ColorOption::Purple), TextColor::purple());

        assert!(Args::try_parse_from(["pdf-overlay", "in.pdf", "--color", "black"]).is_err());
    }

    #[test]
    fn test_clear_cache_flag() {
        let args = Args::try_parse_from(["pdf-overlay", "in.pdf", "--clear-cache"]).unwrap();
        assert!(args.clear_cache);
        assert_eq!(args.color, None);
    }
}
