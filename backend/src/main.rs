//! Directory CLI - search the employee directory from the terminal
//!
//! # Main Commands
//!
//! ```bash
//! directory serve                         # Start HTTP server (port 3000)
//! directory search --region East          # Filter employees
//! directory export --studio NYC -o out.csv
//! ```
//!
//! # Listings
//!
//! ```bash
//! directory projects --employee 42        # Projects of one employee
//! directory projects --practice-area health
//! directory practice-areas
//! directory sub-practice-areas
//! ```
//!
//! Data locations come from the environment (`DATA_DIR`, `ONEDRIVE_*_URL`,
//! `OPENASSET_BASE_URL`); the global flags below override them.

use clap::{Args, Parser, Subcommand};
use directory::{
    export_filename, project_for_export, sort_by_name, write_csv, ConfiguredSource,
    DirectoryCache, DirectoryConfig, DirectorySnapshot, EmployeeFilter, EmployeeView, Project,
    ProjectFilter, ProjectView, SearchParams,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "directory")]
#[command(about = "Search and export the employee directory", long_about = None)]
struct Cli {
    /// Folder with employees.csv, projects.csv and project_employees.csv
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL for project links missing from the CSV
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: $PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Search employees
    Search {
        #[command(flatten)]
        filters: FilterArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List projects, or the projects of one employee
    Projects {
        /// Employee id
        #[arg(short, long)]
        employee: Option<i64>,

        #[arg(long)]
        practice_area: Option<String>,

        #[arg(long)]
        sub_practice_area: Option<String>,

        #[arg(long)]
        region: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List distinct practice areas
    PracticeAreas,

    /// List distinct sub-practice areas
    SubPracticeAreas,

    /// Export filtered employees as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output file (default: employee_directory_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Employee filters. List values are comma-separated.
#[derive(Args, Default)]
struct FilterArgs {
    /// Case-insensitive substring of first, last or full name
    #[arg(short, long)]
    name: Option<String>,

    /// Studios / offices (exact)
    #[arg(long)]
    studio: Option<String>,

    /// Titles such as "Principal" (exact)
    #[arg(long)]
    role: Option<String>,

    /// Job titles (exact)
    #[arg(long)]
    job_title: Option<String>,

    /// Statuses (exact)
    #[arg(long)]
    status: Option<String>,

    /// Years in industry ranges, e.g. "0-5,20+"
    #[arg(long)]
    years_experience: Option<String>,

    /// Years at the firm ranges
    #[arg(long)]
    years_at_pe: Option<String>,

    /// Practice areas of assigned projects (substring)
    #[arg(long)]
    practice_area: Option<String>,

    /// Sub-practice areas of assigned projects (substring)
    #[arg(long)]
    sub_practice_area: Option<String>,

    /// Regions of assigned projects (substring)
    #[arg(long)]
    region: Option<String>,
}

impl From<FilterArgs> for EmployeeFilter {
    fn from(args: FilterArgs) -> Self {
        SearchParams {
            name_search: args.name,
            studio: args.studio,
            role: args.role,
            job_title: args.job_title,
            status: args.status,
            years_experience: args.years_experience,
            years_at_pe: args.years_at_pe,
            practice_area: args.practice_area,
            sub_practice_area: args.sub_practice_area,
            region: args.region,
        }
        .into()
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match load_config(&cli) {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<DirectoryConfig, Box<dyn std::error::Error>> {
    let mut config = DirectoryConfig::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(url) = &cli.base_url {
        config.openasset_base_url = url.clone();
    }
    Ok(config)
}

async fn run(command: Commands, config: DirectoryConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve { port } => cmd_serve(config, port).await,

        Commands::Search { filters, json } => {
            let snapshot = load(&config).await?;
            cmd_search(&snapshot, filters.into(), json)
        }

        Commands::Projects {
            employee,
            practice_area,
            sub_practice_area,
            region,
            status,
            json,
        } => {
            let snapshot = load(&config).await?;
            let filter = ProjectFilter {
                practice_area,
                sub_practice_area,
                region,
                status,
            };
            cmd_projects(&snapshot, employee, &filter, json)
        }

        Commands::PracticeAreas => {
            let snapshot = load(&config).await?;
            print_list("practice areas", &snapshot.distinct_practice_areas());
            Ok(())
        }

        Commands::SubPracticeAreas => {
            let snapshot = load(&config).await?;
            print_list("sub-practice areas", &snapshot.distinct_sub_practice_areas());
            Ok(())
        }

        Commands::Export { filters, output } => {
            let snapshot = load(&config).await?;
            cmd_export(&snapshot, filters.into(), output.as_deref())
        }
    }
}

async fn cmd_serve(mut config: DirectoryConfig, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port {
        config.port = port;
    }
    directory::server::start_server(config).await
}

/// Build the cache once and load every table.
async fn load(config: &DirectoryConfig) -> Result<Arc<DirectorySnapshot>, Box<dyn std::error::Error>> {
    let source = ConfiguredSource::from_config(config)?;
    let cache = DirectoryCache::new(Arc::new(source), config.openasset_base_url.clone());

    cache.ensure_loaded(None).await?;
    Ok(cache.snapshot())
}

fn cmd_search(
    snapshot: &DirectorySnapshot,
    filter: EmployeeFilter,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let results = snapshot.search(&filter);
    eprintln!(
        "🔍 {} of {} employees match",
        results.len(),
        snapshot.employees.len()
    );

    if json {
        let views: Vec<EmployeeView> = results.iter().map(EmployeeView::from).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    for emp in &results {
        let view = EmployeeView::from(emp);
        println!(
            "  {:>6}  {:<30} {:<24} {:<16} {}",
            view.id,
            format!("{} {}", view.first_name, view.last_name),
            view.title,
            view.office,
            view.status
        );
    }
    Ok(())
}

fn cmd_projects(
    snapshot: &DirectorySnapshot,
    employee: Option<i64>,
    filter: &ProjectFilter,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let projects: Vec<Project> = match employee {
        Some(id) => {
            let mut projects = snapshot.employee_projects(id);
            sort_by_name(&mut projects);
            eprintln!("📁 Employee {}: {} projects", id, projects.len());
            projects
        }
        None => {
            let projects = snapshot.search_projects(filter);
            eprintln!(
                "📁 {} of {} projects match",
                projects.len(),
                snapshot.projects.len()
            );
            projects
        }
    };

    let views: Vec<ProjectView> = projects.iter().map(ProjectView::from).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    for view in &views {
        println!(
            "  {:>6}  {:<40} {:<20} {}",
            view.id, view.name, view.practice_area, view.region
        );
    }
    Ok(())
}

fn cmd_export(
    snapshot: &DirectorySnapshot,
    filter: EmployeeFilter,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if snapshot.employees.is_empty() {
        return Err("No employees found in CSV data".into());
    }

    let rows = project_for_export(&snapshot.search(&filter));
    let bytes = write_csv(&rows)?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(export_filename()));
    fs::write(&path, bytes)?;

    eprintln!("✅ Exported {} employees", rows.len());
    eprintln!("💾 Output written to: {}", path.display());
    Ok(())
}

fn print_list(label: &str, values: &[String]) {
    eprintln!("📋 {} {}", values.len(), label);
    for value in values {
        println!("{}", value);
    }
}
