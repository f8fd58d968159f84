use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use census_core::{
    config::resolve_bed_catalog,
    constants::{DEFAULT_DATA_DIR, DEFAULT_NAMESPACE},
    record::{parse_date_key, DischargeStatus},
    CensusAction, CensusConfig, CensusEditor, CensusService, Commit, DemoPeriod,
    JsonFileRepository, NurseRosterStore, StorageNamespace,
};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "census")]
#[command(about = "Ward bed census CLI")]
struct Cli {
    /// Work on the isolated demo records instead of production
    #[arg(long, global = true)]
    demo: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored dates
    Dates {
        /// Only days with at least one patient in this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
    },
    /// Show a day's record and occupancy statistics
    Show {
        /// Day (YYYY-MM-DD)
        date: String,
    },
    /// Initialise a day
    Init {
        /// Day (YYYY-MM-DD)
        date: String,
        /// Copy patients from the nearest earlier record
        #[arg(long)]
        copy_previous: bool,
    },
    /// Apply a census action given as JSON
    Apply {
        /// Day (YYYY-MM-DD)
        date: String,
        /// Action JSON, e.g. {"action":"clearPatient","bedId":"R1"}
        action: String,
    },
    /// Discharge the patient in a bed
    Discharge {
        /// Day (YYYY-MM-DD)
        date: String,
        /// Bed id
        bed_id: String,
        #[arg(long, value_enum, default_value_t = Outcome::Alive)]
        status: Outcome,
        /// Discharge the clinical crib patient too, with this status
        #[arg(long, value_enum)]
        crib_status: Option<Outcome>,
    },
    /// Block or unblock a bed
    Block {
        /// Day (YYYY-MM-DD)
        date: String,
        /// Bed id
        bed_id: String,
        /// Reason shown on the census
        #[arg(long)]
        reason: Option<String>,
    },
    /// Export a day's census as CSV
    ExportCsv {
        /// Day (YYYY-MM-DD)
        date: String,
        /// Output directory (default: current directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Export every stored record as a JSON backup
    ExportJson {
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import a JSON backup
    Import {
        /// Backup file
        file: PathBuf,
    },
    /// Generate demo records (always into the demo namespace)
    Demo {
        #[command(subcommand)]
        period: DemoCommand,
        /// Seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show or replace the nurse roster
    Nurses {
        /// New roster; omit to show the current one
        names: Vec<String>,
    },
    /// Delete every record of the selected namespace
    Wipe {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DemoCommand {
    /// One day
    Day { date: String },
    /// Seven consecutive days
    Week { start: String },
    /// A whole month
    Month { year: i32, month: u32 },
}

#[derive(Clone, Copy, ValueEnum)]
enum Outcome {
    Alive,
    Deceased,
}

impl From<Outcome> for DischargeStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Alive => DischargeStatus::Alive,
            Outcome::Deceased => DischargeStatus::Deceased,
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn parse_date(raw: &str) -> CliResult<NaiveDate> {
    parse_date_key(raw).ok_or_else(|| format!("invalid date '{raw}' (expected YYYY-MM-DD)").into())
}

fn parse_month(raw: &str) -> CliResult<(i32, u32)> {
    let first = parse_date(&format!("{raw}-01"))?;
    Ok((chrono::Datelike::year(&first), chrono::Datelike::month(&first)))
}

fn load_config() -> CliResult<CensusConfig> {
    let data_dir = std::env::var("CENSUS_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let data_dir = PathBuf::from(data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let namespace = std::env::var("CENSUS_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.into());
    Ok(CensusConfig::new(data_dir, namespace)?)
}

fn build_service(cfg: &CensusConfig, demo: bool) -> CliResult<CensusService> {
    let catalog_override = std::env::var("CENSUS_BED_CATALOG").ok().map(PathBuf::from);
    let catalog = resolve_bed_catalog(catalog_override)?;
    let ns = if demo {
        StorageNamespace::Demo
    } else {
        StorageNamespace::Production
    };
    Ok(CensusService::new(
        Arc::new(JsonFileRepository::new(cfg, ns)),
        CensusEditor::with_system_clock(Arc::new(catalog)),
    )
    .with_config(cfg))
}

fn report(commit: &Commit) {
    println!("Saved {} ({:?})", commit.record.date, commit.sync);
    if let Some(note) = &commit.notification {
        println!("{}: {}", note.title, note.message);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config()?;

    let Some(command) = cli.command else {
        println!("Use 'census --help' for commands");
        return Ok(());
    };

    // Demo generation always targets the demo namespace.
    let demo = cli.demo || matches!(command, Commands::Demo { .. });
    let service = build_service(&cfg, demo)?;

    match command {
        Commands::Dates { month } => {
            let dates = match month {
                Some(month) => {
                    let (year, month) = parse_month(&month)?;
                    service.days_with_patients(year, month)?
                }
                None => service.dates()?,
            };
            if dates.is_empty() {
                println!("No records found.");
            }
            for date in dates {
                println!("{date}");
            }
        }
        Commands::Show { date } => {
            let record = service.require(parse_date(&date)?)?;
            let stats = service.statistics(&record);
            println!("{}", serde_json::to_string_pretty(&record)?);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Init {
            date,
            copy_previous,
        } => {
            let commit = service.initialise_day(parse_date(&date)?, copy_previous)?;
            report(&commit);
        }
        Commands::Apply { date, action } => {
            let action: CensusAction = serde_json::from_str(&action)?;
            let commit = service.mutate(parse_date(&date)?, &action)?;
            report(&commit);
        }
        Commands::Discharge {
            date,
            bed_id,
            status,
            crib_status,
        } => {
            let action = CensusAction::AddDischarge {
                bed_id,
                status: status.into(),
                crib_status: crib_status.map(Into::into),
            };
            let commit = service.mutate(parse_date(&date)?, &action)?;
            report(&commit);
        }
        Commands::Block {
            date,
            bed_id,
            reason,
        } => {
            let action = CensusAction::ToggleBlockBed { bed_id, reason };
            let commit = service.mutate(parse_date(&date)?, &action)?;
            report(&commit);
        }
        Commands::ExportCsv { date, out_dir } => {
            let date = parse_date(&date)?;
            let record = service.require(date)?;
            let csv = service.export_csv(date)?;
            let path = out_dir
                .unwrap_or_default()
                .join(census_core::export::csv_file_name(&record));
            std::fs::write(&path, csv)?;
            println!("Wrote {}", path.display());
        }
        Commands::ExportJson { out } => {
            let json = service.export_json()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let imported = service.import_json(&raw)?;
            println!("Imported {imported} records from {}", file.display());
        }
        Commands::Demo { period, seed } => {
            let period = match period {
                DemoCommand::Day { date } => DemoPeriod::Day {
                    date: parse_date(&date)?,
                },
                DemoCommand::Week { start } => DemoPeriod::Week {
                    start: parse_date(&start)?,
                },
                DemoCommand::Month { year, month } => DemoPeriod::Month { year, month },
            };
            let rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let dates = service.generate_demo(period, rng)?;
            println!("Generated {} demo records", dates.len());
        }
        Commands::Nurses { names } => {
            let roster = NurseRosterStore::new(&cfg);
            if !names.is_empty() {
                roster.save(&names)?;
            }
            for name in roster.load()? {
                println!("{name}");
            }
        }
        Commands::Wipe { yes } => {
            if !yes {
                return Err("refusing to wipe without --yes".into());
            }
            service.wipe()?;
            println!("Deleted every record in the {:?} namespace", service.namespace());
        }
    }

    Ok(())
}
