use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use intel_control::{ActionSource, AutoAnalyst};
use intel_core::{
    compute_metrics, MemoryStore, MetricsFileWriter, PlayerStore, Session, TimeSpeed,
};
use intel_world::{load_catalog, JsonFileStore};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "intel_cli", about = "Intelligence operation simulator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless session driven by the scripted analyst.
    Run(RunArgs),
    /// Print the assembled world for a timestamp as JSON.
    Snapshot {
        /// RFC 3339 wall time; defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 1, value_parser = parse_speed)]
        speed: u32,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Wall-clock seconds to simulate, one analyst pass per second.
    #[arg(long)]
    seconds: u64,
    /// RFC 3339 wall time the session starts at; defaults to now.
    #[arg(long)]
    start: Option<DateTime<Utc>>,
    #[arg(long, default_value_t = 1, value_parser = parse_speed)]
    speed: u32,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Persist player state in this directory. Without it the run keeps
    /// state in memory.
    #[arg(long)]
    state_dir: Option<String>,
    #[arg(long, default_value_t = 60)]
    print_every: u64,
    /// Sample metrics every N seconds (default 10).
    #[arg(long, default_value_t = 10)]
    metrics_every: u64,
    /// Disable automatic metrics collection to runs/ directory.
    #[arg(long)]
    no_metrics: bool,
}

fn parse_speed(raw: &str) -> Result<u32, String> {
    let value: u32 = raw.parse().map_err(|err| format!("{err}"))?;
    TimeSpeed::try_from(value)
        .map(u32::from)
        .map_err(|err| err.to_string())
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn generate_run_id(start: DateTime<Utc>, speed: u32) -> String {
    format!(
        "{}_x{speed}_at{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        start.timestamp()
    )
}

fn create_run_dir(run_id: &str) -> Result<std::path::PathBuf> {
    let dir = std::path::PathBuf::from("runs").join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

fn write_run_info(
    dir: &std::path::Path,
    run_id: &str,
    args: &RunArgs,
    start: DateTime<Utc>,
    content_version: &str,
) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "start": start.to_rfc3339(),
        "content_version": content_version,
        "metrics_every": args.metrics_every,
        "runner": "intel_cli",
        "args": {
            "seconds": args.seconds,
            "speed": args.speed,
            "print_every": args.print_every,
        }
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let catalog = load_catalog(&args.content_dir)?;
    let speed = TimeSpeed::try_from(args.speed).context("validating --speed")?;
    let start = args.start.unwrap_or_else(Utc::now);
    let start_ms = start.timestamp_millis();

    let mut store: Box<dyn PlayerStore> = match &args.state_dir {
        Some(dir) => Box::new(JsonFileStore::new(dir)),
        None => Box::new(MemoryStore::default()),
    };

    // Set up per-run metrics directory.
    let mut metrics_writer: Option<MetricsFileWriter> = None;
    if !args.no_metrics {
        let run_id = generate_run_id(start, args.speed);
        let run_dir = create_run_dir(&run_id)?;
        write_run_info(&run_dir, &run_id, args, start, &catalog.content_version)?;
        let writer = MetricsFileWriter::new(run_dir.clone())
            .with_context(|| format!("opening metrics CSV in {}", run_dir.display()))?;
        metrics_writer = Some(writer);
        println!("Run directory: {}", run_dir.display());
    }

    let content_version = catalog.content_version.clone();
    let mut session = Session::resume(catalog, start_ms, speed, store.as_ref());
    let mut analyst = AutoAnalyst::default();

    println!(
        "Starting session: seconds={} speed={}x entities={} content_version={content_version}",
        args.seconds,
        args.speed,
        session.state().entities.len(),
    );
    println!("{}", "-".repeat(80));

    let mut now = start_ms;
    for second in 1..=args.seconds {
        let commands = analyst.generate_actions(session.state(), session.dismissed_alerts());
        for command in &commands {
            if let Err(rejection) = session.apply(command, now) {
                if rejection.is_cost() {
                    println!("    rejected {command:?}: {rejection}");
                }
            }
        }

        now += 1_000;
        let report = session.advance(now);

        // Print notable progress regardless of print_every.
        for id in &report.achievements_unlocked {
            println!("*** ACHIEVEMENT UNLOCKED: {id} at second={second:05} ***");
        }
        for id in &report.objectives.completed {
            println!("*** OBJECTIVE COMPLETED: {id} at second={second:05} ***");
        }
        if report.save_due {
            session.save(store.as_mut(), now);
        }

        if second % args.print_every == 0 {
            print_status(&session);
        }

        if let Some(ref mut writer) = metrics_writer {
            if second % args.metrics_every == 0 {
                let snapshot = compute_metrics(session.state());
                writer.write_row(&snapshot).context("writing metrics row")?;
            }
        }
    }

    session.save(store.as_mut(), now);
    println!("{}", "-".repeat(80));
    println!("Done. Final state after {} seconds:", args.seconds);
    print_status(&session);

    if let Some(ref mut writer) = metrics_writer {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }

    Ok(())
}

fn print_status(session: &Session) {
    let state = session.state();
    let elapsed = state.elapsed;
    let counts = state.objective_counts();
    let resources = &state.resources;
    let critical = state
        .entities
        .iter()
        .filter(|e| e.threat == intel_core::ThreatLevel::Critical)
        .count();

    println!(
        "[day={day}  {hour:02}:{minute:02}  phase={phase}]  \
         entities={entities:2} critical={critical:2}  \
         budget={budget:5} agents={agents:2} credits={credits:2}  \
         objectives={done}/{total}  score={score}",
        day = elapsed.days,
        hour = elapsed.hours % 24,
        minute = elapsed.minutes % 60,
        phase = state.phase.name,
        entities = state.entities.len(),
        budget = resources.budget,
        agents = resources.agents,
        credits = resources.data_credits,
        done = counts.completed,
        total = counts.total,
        score = state.score,
    );
}

fn snapshot(at: Option<DateTime<Utc>>, speed: u32, content_dir: &str, pretty: bool) -> Result<()> {
    let catalog = load_catalog(content_dir)?;
    let speed = TimeSpeed::try_from(speed).context("validating --speed")?;
    let now_ms = at.unwrap_or_else(Utc::now).timestamp_millis();
    let state = intel_core::assemble(&catalog, now_ms, speed);
    let json = if pretty {
        serde_json::to_string_pretty(&state)
    } else {
        serde_json::to_string(&state)
    }
    .context("encoding snapshot")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(&args)?,
        Commands::Snapshot {
            at,
            speed,
            content_dir,
            pretty,
        } => snapshot(at, speed, &content_dir, pretty)?,
    }
    Ok(())
}
