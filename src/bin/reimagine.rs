//! CLI for Reimagine - describe a reference image, then synthesize a new one.

use clap::{Args, Parser, Subcommand, ValueEnum};
use reimagine::session::{Notice, SessionObserver, View};
use reimagine::{AspectChoice, Config, OpenAiClient, Session, SourceImage};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reimagine")]
#[command(about = "Generate a derivative image from a reference image and a prompt")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// API root (defaults to REIMAGINE_BASE_URL or the OpenAI API)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Vision model used to describe the image
    #[arg(long, global = true)]
    description_model: Option<String>,

    /// Image model used to synthesize the result
    #[arg(long, global = true)]
    image_model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload, generate and download in one go
    Run(RunArgs),

    /// Interactive session (default)
    Interactive(InteractiveArgs),

    /// Show configuration and whether an API key is available
    Check,
}

#[derive(Args)]
struct RunArgs {
    /// Reference image file
    #[arg(short, long)]
    input: PathBuf,

    /// How to transform the image
    #[arg(short, long)]
    prompt: String,

    /// Aspect ratio of the result
    #[arg(short, long, value_enum, default_value = "square")]
    aspect: AspectArg,

    /// Directory the generated image is saved into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Args, Default)]
struct InteractiveArgs {
    /// Default directory for `download`
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectArg {
    #[value(alias = "1:1")]
    Square,
    #[value(alias = "3:2")]
    Landscape,
    #[value(alias = "2:3")]
    Portrait,
    Auto,
}

impl From<AspectArg> for AspectChoice {
    fn from(arg: AspectArg) -> Self {
        match arg {
            AspectArg::Square => AspectChoice::Square,
            AspectArg::Landscape => AspectChoice::Landscape,
            AspectArg::Portrait => AspectChoice::Portrait,
            AspectArg::Auto => AspectChoice::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "reimagine=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli);

    match cli.command {
        Some(Commands::Run(args)) => run_once(args, config, cli.json).await?,
        Some(Commands::Interactive(args)) => run_interactive(args, config).await?,
        Some(Commands::Check) => check(&config, cli.json)?,
        None => run_interactive(InteractiveArgs::default(), config).await?,
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::from_env();
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url);
    }
    if let Some(model) = &cli.description_model {
        config = config.with_description_model(model);
    }
    if let Some(model) = &cli.image_model {
        config = config.with_image_model(model);
    }
    config
}

fn build_session(config: Config, observer: Arc<dyn SessionObserver>) -> anyhow::Result<Session> {
    let client = OpenAiClient::builder().config(config).build();
    Ok(Session::builder().openai(client).observer(observer).build()?)
}

/// Prints progress on status changes and notices on stderr.
struct TerminalObserver {
    last_status: Mutex<Option<String>>,
    show_notices: bool,
}

impl TerminalObserver {
    fn new(show_notices: bool) -> Self {
        Self {
            last_status: Mutex::new(None),
            show_notices,
        }
    }
}

impl SessionObserver for TerminalObserver {
    fn render(&self, view: &View) {
        let mut last = self
            .last_status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if last.as_deref() != Some(view.status.as_str()) {
            if view.busy || last.is_some() {
                eprintln!("[{}]", view.status);
            }
            *last = Some(view.status.clone());
        }
    }

    fn notify(&self, notice: &Notice) {
        if self.show_notices {
            eprintln!("\n!! {notice}\n");
        }
    }
}

async fn run_once(args: RunArgs, config: Config, json_output: bool) -> anyhow::Result<()> {
    let session = build_session(config, Arc::new(TerminalObserver::new(false)))?;

    session.upload(Some(SourceImage::from_path(&args.input).await?));
    session.set_prompt(&args.prompt);
    session.set_aspect(args.aspect.into());

    session.generate().await?;

    let path = session
        .download(&args.output_dir)
        .await?
        .ok_or_else(|| anyhow::anyhow!("generation finished without an image"))?;
    let image = session
        .generated()
        .ok_or_else(|| anyhow::anyhow!("generation finished without an image"))?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": path.display().to_string(),
            "size_bytes": image.size(),
            "format": image.format.extension(),
            "aspect": AspectChoice::from(args.aspect).size(),
            "model": image.metadata.model,
            "description": image.metadata.description,
            "duration_ms": image.metadata.duration_ms,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated image: {} ({} bytes)",
            path.display(),
            image.size()
        );
        if let Some(duration) = image.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
    }

    Ok(())
}

const HELP: &str = "\
commands:
  upload <path>      select the reference image
  prompt <text>      set the transformation prompt
  aspect <choice>    square | landscape | portrait | auto
  generate           start a generation (runs in the background)
  download [dir]     save the generated image
  status             show the current state
  help               show this help
  quit               exit";

async fn run_interactive(args: InteractiveArgs, config: Config) -> anyhow::Result<()> {
    let session = build_session(config, Arc::new(TerminalObserver::new(true)))?;

    println!("reimagine interactive session. Type `help` for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "upload" => {
                if rest.is_empty() {
                    // nothing selected
                    continue;
                }
                match SourceImage::from_path(rest).await {
                    Ok(image) => {
                        session.upload(Some(image));
                        print_view(&session.view());
                    }
                    Err(e) => eprintln!("cannot use {rest}: {e}"),
                }
            }
            "prompt" => session.set_prompt(rest),
            "aspect" => match rest.parse::<AspectChoice>() {
                Ok(aspect) => session.set_aspect(aspect),
                Err(e) => eprintln!("{e}"),
            },
            "generate" => {
                let session = session.clone();
                tokio::spawn(async move {
                    if session.generate().await.is_ok() {
                        print_view(&session.view());
                    }
                });
            }
            "download" => {
                let dir = if rest.is_empty() {
                    args.output_dir.clone()
                } else {
                    PathBuf::from(rest)
                };
                match session.download(&dir).await {
                    Ok(Some(path)) => println!("saved {}", path.display()),
                    Ok(None) => println!("nothing to download yet"),
                    Err(e) => eprintln!("download failed: {e}"),
                }
            }
            "status" => print_view(&session.view()),
            "help" => println!("{HELP}"),
            "quit" | "exit" => break,
            other => eprintln!("unknown command `{other}`; type `help`"),
        }
    }

    if session.is_busy() {
        eprintln!("exiting with a generation still in flight");
    }
    Ok(())
}

fn print_view(view: &View) {
    println!(
        "image:    {}",
        view.source_label.as_deref().unwrap_or("(none)")
    );
    println!(
        "prompt:   {}",
        if view.prompt.is_empty() {
            "(empty)"
        } else {
            view.prompt.as_str()
        }
    );
    println!("aspect:   {} -> {}", view.aspect, view.aspect.size());
    println!(
        "submit:   {}{}",
        view.submit_label,
        if view.submit_enabled { "" } else { " (disabled)" }
    );
    println!("status:   {}", view.status);
    if view.download_visible {
        println!(
            "result:   {} (type `download` to save)",
            view.generated_label.as_deref().unwrap_or("ready")
        );
    }
}

fn check(config: &Config, json_output: bool) -> anyhow::Result<()> {
    let configured = config.credentials.is_configured();

    if json_output {
        let result = serde_json::json!({
            "api_key_configured": configured,
            "base_url": config.base_url,
            "description_model": config.description_model,
            "image_model": config.image_model,
            "aspects": AspectChoice::ALL
                .iter()
                .map(|a| serde_json::json!({ "name": a.label(), "size": a.size() }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let status = if configured { "✓" } else { "✗" };
        println!("{} API key ({})", status, reimagine::config::API_KEY_ENV_VARS.join(" or "));
        println!("  endpoint:          {}", config.base_url);
        println!("  description model: {}", config.description_model);
        println!("  image model:       {}", config.image_model);
        println!("\nAspect ratios:");
        for aspect in AspectChoice::ALL {
            println!("  {} -> {}", aspect.label(), aspect.size());
        }
    }

    Ok(())
}
