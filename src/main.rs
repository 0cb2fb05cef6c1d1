use clap::{Args, Parser, Subcommand};
use quacktool::batch;
use quacktool::config::{self, LoggingConfig};
use quacktool::options::RawOptions;
use quacktool::output;
use quacktool::process::{AssetRequest, Processor};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when configuration cannot be loaded.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "quacktool")]
#[command(about = "Process media assets: optimize, transform, analyze, generate")]
#[command(long_about = "\
Process media assets: optimize, transform, analyze, generate

Asset types are inferred from the file extension:

  image     jpg jpeg png gif bmp webp svg tiff tif
  video     mp4 avi mov wmv flv mkv webm
  audio     mp3 wav ogg aac flac m4a
  document  pdf doc docx txt md html xml

Modes:
  optimize   re-encode at --quality (images), copy otherwise
  transform  resize to --width/--height and convert --format
  analyze    write a JSON report next to the output
  generate   thumbnails for images, summaries for text documents

Configuration is read from ./quacktool.toml (or --config) and from
QUACKTOOL_<SECTION>__<KEY> environment variables.

Run 'quacktool gen-config' to generate a documented quacktool.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./quacktool.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by `process` and `batch`. Values are validated by the
/// library so errors read the same as from the plugin interface.
#[derive(Args, Clone, Default)]
struct OptionArgs {
    /// optimize | transform | analyze | generate
    #[arg(short, long)]
    mode: Option<String>,

    /// Lossy encoding quality, 1-100
    #[arg(long, allow_negative_numbers = true)]
    quality: Option<i64>,

    /// Output format as a file extension (webp, png, ...)
    #[arg(short, long)]
    format: Option<String>,
}

impl OptionArgs {
    fn into_raw(self, width: Option<i64>, height: Option<i64>) -> RawOptions {
        RawOptions {
            mode: self.mode,
            quality: self.quality,
            format: self.format,
            width,
            height,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Process a single file
    Process {
        input_file: PathBuf,

        /// Output path (default: <output_dir>/<name>.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,

        /// Target width in pixels
        #[arg(long, allow_negative_numbers = true)]
        width: Option<i64>,

        /// Target height in pixels
        #[arg(long, allow_negative_numbers = true)]
        height: Option<i64>,

        /// Asset type, when the extension is not enough
        #[arg(long = "type")]
        asset_type: Option<String>,
    },
    /// Process several files or directories, one at a time
    Batch {
        #[arg(required = true)]
        input_files: Vec<PathBuf>,

        /// Directory for outputs (default: paths.output_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,
    },
    /// Print a stock quacktool.toml with all options documented
    GenConfig,
    /// Print the effective configuration after all layers are merged
    ShowConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return ExitCode::SUCCESS;
    }

    let tool_config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    init_logging(&tool_config.logging, cli.verbose, cli.quiet);

    let succeeded = match cli.command {
        Command::Process {
            input_file,
            output,
            options,
            width,
            height,
            asset_type,
        } => {
            let processor = Processor::new(&tool_config);
            let raw = options.into_raw(width, height);
            let request = AssetRequest {
                output: output.as_deref(),
                asset_type: asset_type.as_deref(),
                ..AssetRequest::new(&input_file, &raw)
            };
            let result = processor.process_request(&request, processor.output_dir());
            output::print_process_result(&input_file, &result, cli.quiet);
            result.is_success()
        }
        Command::Batch {
            input_files,
            output_dir,
            options,
        } => {
            let processor = Processor::new(&tool_config);
            let output_dir = output_dir.unwrap_or_else(|| processor.output_dir().to_path_buf());
            let report = batch::run(
                &processor,
                &input_files,
                &output_dir,
                &options.into_raw(None, None),
            );
            output::print_batch_report(&report, cli.quiet);
            report.all_succeeded()
        }
        Command::ShowConfig => match toml::to_string_pretty(&tool_config) {
            Ok(text) => {
                print!("{text}");
                true
            }
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(EXIT_CONFIG);
            }
        },
        Command::GenConfig => true,
    };

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Initialize `tracing` on stderr. `RUST_LOG` wins over the flags, which
/// win over `logging.log_level`.
fn init_logging(logging: &LoggingConfig, verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug".to_string()
    } else if quiet {
        "error".to_string()
    } else {
        logging.log_level.to_ascii_lowercase()
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| format!("quacktool={level}"));

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();
}
