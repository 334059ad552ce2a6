//! netscope: replay a captured event stream through the activity model

use anyhow::Context;
use clap::Parser;
use netscope::activity::ActivityModel;
use netscope::config::{self, InspectorConfig};
use netscope::events;
use netscope::{logging, session};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "netscope", version, about = "Network activity inspector")]
struct Cli {
    /// Log at trace level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Feed a JSON-lines event capture through the model and print the tree
    Replay {
        /// Capture file, one event per line
        capture: PathBuf,

        /// Only show requests whose URL contains this text
        #[arg(long)]
        filter: Option<String>,

        #[arg(long)]
        hide_successful: bool,

        #[arg(long)]
        hide_timeouts: bool,

        /// Also write the retained requests as a HAR file
        #[arg(long)]
        har: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<InspectorConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config::default_config_path()?,
    };
    config::load_config(&path).with_context(|| format!("Failed to load {}", path.display()))
}

fn print_tree(model: &ActivityModel, out: &mut impl Write) -> io::Result<()> {
    let tree = model.tree();
    for row in model.filter().flatten_all(tree) {
        let style = tree.style(row.node);
        let marker = if style.strike_out { "~" } else { " " };
        writeln!(
            out,
            "{}{}{}",
            marker,
            "  ".repeat(row.depth),
            tree.text(row.node)
        )?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let log_dir = config.log_dir.clone();
    logging::init(cli.verbose || config.verbose_logging, log_dir.as_deref())?;
    if let Some(dir) = log_dir {
        logging::setup_panic_hook(dir);
    }

    match cli.command {
        Command::Replay {
            capture,
            filter,
            hide_successful,
            hide_timeouts,
            har,
        } => {
            let file = File::open(&capture)
                .with_context(|| format!("Failed to open {}", capture.display()))?;
            let captured = events::read_capture(BufReader::new(file))?;

            let mut model = ActivityModel::from_config(&config);
            if let Some(filter) = filter {
                model.set_filter_substring(&filter);
            }
            if hide_successful {
                model.set_show_successful(false);
            }
            if hide_timeouts {
                model.set_show_timeouts(false);
            }

            let (tx, rx) = events::channel();
            for event in captured {
                tx.send(event);
            }
            let summary = model.pump(&rx);
            log::info!(
                "[Replay] {} applied, {} ignored, {} rejected",
                summary.applied,
                summary.ignored,
                summary.rejected
            );

            let stdout = io::stdout();
            let mut out = stdout.lock();
            print_tree(&model, &mut out)?;

            if let Some(path) = har {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let mut writer = BufWriter::new(file);
                session::export_har(&mut writer, model.tree())?;
                writer.flush()?;
            }
        }
    }

    Ok(())
}
