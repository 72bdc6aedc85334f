use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use petri_core::colony::{Colony, ParamChange};
use petri_core::config::ColonyConfig;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "petri")]
#[command(about = "Bacterial colony growth on a diffusing nutrient field")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a colony headless and report the outcome
    Run {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for summary.json and snapshot.json (optional)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of simulation steps to run
        #[arg(long, default_value_t = 10000)]
        steps: usize,

        /// Collect metrics every N steps
        #[arg(long, default_value_t = 100)]
        sample_every: usize,

        /// Override a parameter, e.g. `--set r_max=0.06` (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<ParamChange>,
    },
    /// Print the dimensionless groups of a configuration
    Describe {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn load_config(path: Option<&Path>) -> Result<ColonyConfig> {
    let Some(path) = path else {
        return Ok(ColonyConfig::default());
    };
    let file = File::open(path)
        .with_context(|| format!("failed to open config file {}", path.display()))?;
    let config: ColonyConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn run(
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    steps: usize,
    sample_every: usize,
    overrides: &[ParamChange],
) -> Result<()> {
    let mut config = load_config(config.as_deref())?;
    for change in overrides {
        change
            .apply_to(&mut config)
            .with_context(|| format!("failed to apply override {}", change.key))?;
        info!(key = %change.key, "applied override");
    }
    config.validate().context("config validation error")?;

    let mut colony = Colony::new(config).context("failed to initialize colony")?;
    info!(
        steps,
        grid_size = colony.config().grid_size,
        agents = colony.agent_count(),
        "simulating"
    );
    let summary = colony
        .run_experiment(steps, sample_every)
        .context("run aborted")?;

    if let Some(out_dir) = out {
        std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
        write_json(&out_dir.join("summary.json"), &summary)?;
        write_json(&out_dir.join("snapshot.json"), &colony.snapshot())?;
        println!("Run complete. Results saved to {}", out_dir.display());
    } else {
        println!(
            "Run complete. Iteration {}, {} agents, {} divisions",
            summary.final_iteration, summary.final_agent_count, summary.total_divisions
        );
    }
    Ok(())
}

fn describe(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    config.validate().context("config validation error")?;
    let kinetics = &config.kinetics;
    let groups = kinetics.dimensionless_groups(config.c_max, config.d_c);
    let r_min = kinetics.radius_for_mass(kinetics.m_min);

    println!("grid:        {0} x {0}, dt * D_c = {1}", config.grid_size, config.diffusion_number());
    println!("r_min:       {r_min:.6}");
    println!("v_max:       {:.6}", kinetics.velocity_for_radius(r_min));
    println!("A = K_m / C_max:                 {:.6}", groups.a);
    println!("B = r_max r_min / (C_max v_max): {:.6}", groups.b);
    println!("C = r_min p r_max / (v_max rho): {:.6}", groups.c);
    println!("D = D_c / (r_min v_max):         {:.6}", groups.d);
    println!("E = F_d r_min / (m_min dH):      {:.6}", groups.e);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = ColonyConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Describe { config } => describe(config)?,
        Commands::Run {
            config,
            out,
            steps,
            sample_every,
            overrides,
        } => run(config, out, steps, sample_every, &overrides)?,
    }
    Ok(())
}
