use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand};

use war_story::config::StoryConfig;
use war_story::data::queries::{cumulative_series, data_stats, deadliest, sankey_data};
use war_story::data::{format_number, format_year_range, DataSource, Dataset};
use war_story::export::export_frame_png;
use war_story::logging::{init_file_logging, init_logging};
use war_story::narrative::{NarrativeController, NarrativeStep};
use war_story::tui::{run_explore, run_story};

/// Clock advance per step when playing the story headlessly, in ms.
const HEADLESS_STEP_MILLIS: f64 = 5000.0;

#[derive(Parser, Debug)]
#[command(name = "war_story")]
#[command(about = "Scroll through the human cost of war, or explore the conflict data")]
struct Args {
    /// Conflict dataset, a file path or an http(s) URL
    #[arg(short, long)]
    data: Option<String>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed for the narrative
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log level when WAR_STORY_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log file used by the terminal modes
    #[arg(long, default_value = "war_story.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scroll through the narrative
    Story,
    /// Linked charts with filters
    Explore,
    /// Print dataset statistics
    Stats,
    /// Render one narrative step to a PNG without a terminal
    Frame {
        /// Step to play up to (0-11)
        #[arg(long)]
        step: usize,

        /// Output PNG path
        #[arg(short, long, default_value = "frame.png")]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match StoryConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => StoryConfig::default(),
    };
    if let Some(data) = &args.data {
        config.data_source = data.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let interactive = matches!(args.command, Command::Story | Command::Explore);
    if interactive {
        if let Err(e) = init_file_logging(&args.log_level, &args.log_file) {
            eprintln!("Could not open log file {}: {}", args.log_file.display(), e);
        }
    } else {
        init_logging(&args.log_level);
    }

    let source = config.data_source();
    let dataset = match Dataset::load(&source) {
        Ok(dataset) => Rc::new(dataset),
        Err(e) => {
            tracing::error!(source = %source, error = %e, "data load failed");
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Command::Story => run_story(&config, dataset),
        Command::Explore => run_explore(&config, dataset),
        Command::Stats => {
            print_stats(&dataset, &source);
            Ok(())
        }
        Command::Frame { step, out } => render_step(&config, dataset, step, &out),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_stats(dataset: &Dataset, source: &DataSource) {
    let records = dataset.records();
    let stats = data_stats(records);

    println!("Dataset: {}", source);
    println!("Conflicts: {}", stats.total_conflicts);
    if let Some((first, last)) = stats.date_range {
        println!("Years: {}", format_year_range(first, last));
    }
    println!(
        "Deaths: {} ({} military, {} civilian)",
        format_number(stats.total_deaths as f64),
        format_number(stats.total_military_deaths as f64),
        format_number(stats.total_civilian_deaths as f64),
    );
    let types: Vec<&str> = stats.conflict_types.iter().map(|t| t.name()).collect();
    println!("Types: {}", types.join(", "));
    println!("Regions: {}", stats.regions.join(", "));

    println!("\nDeadliest conflicts:");
    for (i, record) in deadliest(records, 10).iter().enumerate() {
        println!(
            "  {:>2}. {:<32} {:>10}  {:>5.1}% civilian",
            i + 1,
            record.name,
            format_number(record.total_deaths as f64),
            record.civilian_pct * 100.0,
        );
    }

    let sankey = sankey_data(records);
    println!("\nDeaths by type:");
    for link in &sankey.links {
        println!(
            "  {:<12} -> {:<16} {}",
            sankey.nodes[link.source].name,
            sankey.nodes[link.target].name,
            format_number(link.value as f64),
        );
    }

    if let Some(last) = cumulative_series(records).last() {
        println!("\nCumulative deaths by {}:", last.year);
        for (conflict_type, value) in &last.by_type {
            println!("  {:<12} {}", conflict_type.name(), format_number(*value));
        }
        println!("  {:<12} {}", "Total", format_number(last.total));
    }
}

/// Play the story up to `step` on a virtual clock and save the frame.
fn render_step(
    config: &StoryConfig,
    dataset: Rc<Dataset>,
    step: usize,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = NarrativeStep::from_index(step)
        .ok_or_else(|| format!("step must be between 0 and {}", NarrativeStep::all().len() - 1))?;

    let mut controller = NarrativeController::new(config);
    controller.start(dataset);
    let mut now = 0.0;
    for s in NarrativeStep::all().iter().filter(|s| **s <= target) {
        controller.transition_to(*s);
        now += HEADLESS_STEP_MILLIS;
        controller.advance(now);
    }

    let (w, h) = controller.canvas_size();
    export_frame_png(controller.scene(), (w, h), out, w as u32, h as u32)?;
    tracing::info!(step, path = %out.display(), "frame written");
    println!("Wrote step {} ({}) to {}", step, target.name(), out.display());
    Ok(())
}
