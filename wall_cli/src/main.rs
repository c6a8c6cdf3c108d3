//! # Wallkit CLI
//!
//! Scripted access to `.wall` project files: create a project, replay
//! column and block drags, list connected walls, export the scene document
//! and print cost estimates.
//!
//! Commands that modify a project take the project's file lock for the
//! duration of the edit and save atomically.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use glam::DVec3;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wall_core::connectivity::{connected_course, connected_wall};
use wall_core::construction::{drag_to, Direction, Growth};
use wall_core::errors::{WallError, WallResult};
use wall_core::estimate::{estimate, CostRates};
use wall_core::file_io::{load_project, load_project_with_lock_check, save_project, FileLock};
use wall_core::graph::BlockId;
use wall_core::project::Project;
use wall_core::session::{PickTarget, Session};
use wall_core::Settings;

#[derive(Parser, Debug)]
#[command(name = "wallkit")]
#[command(version, about = "Build modular column-and-block walls from the command line")]
struct Cli {
    /// Verbosity level (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a project holding a single column at the origin
    New {
        file: PathBuf,
        /// Project name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print element counts and the cost estimate
    Estimate {
        file: PathBuf,
        /// TOML settings file whose [rates] override the project's
        #[arg(long)]
        rates: Option<PathBuf>,
        /// Print the estimate as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drag a column handle: grow a row of columns from a column
    Extend {
        file: PathBuf,
        /// Index of the column in the scene document
        #[arg(long)]
        column: usize,
        /// Handle direction: n, s, e or w
        #[arg(long)]
        direction: Direction,
        /// Drag distance along the handle direction
        #[arg(long, allow_negative_numbers = true)]
        distance: f64,
    },

    /// Drag a block handle: stack blocks on top of a block
    Stack {
        file: PathBuf,
        /// Id of the block to build on
        #[arg(long)]
        block: String,
        /// Upward drag distance
        #[arg(long, allow_negative_numbers = true)]
        rise: f64,
    },

    /// List the blocks of the wall through a block
    Wall {
        file: PathBuf,
        #[arg(long)]
        block: String,
        /// Match on height and orientation only, ignoring the wall plane
        #[arg(long)]
        course: bool,
    },

    /// Print the bare scene document as JSON
    Export { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), "{}", e);
            eprintln!("error [{}]: {}", e.error_code(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "wall_cli=info,wall_core=info",
        1 => "wall_cli=debug,wall_core=debug",
        _ => "wall_cli=trace,wall_core=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> WallResult<()> {
    match command {
        Command::New { file, name, force } => {
            let project = create_project(&file, name, force)?;
            println!("created {} ({})", file.display(), project.meta.name);
        }
        Command::Estimate { file, rates, json } => {
            let (project, lock) = load_project_with_lock_check(&file)?;
            if let Some(lock) = lock {
                info!(holder = %lock.user_id, "project is being edited elsewhere; estimating saved state");
            }
            let rates = match rates {
                Some(path) => Settings::from_toml_file(&path)?.rates,
                None => project.settings.rates,
            };
            print_estimate(&project, &rates, json)?;
        }
        Command::Extend {
            file,
            column,
            direction,
            distance,
        } => {
            let growth = edit_project(&file, |project| extend(project, column, direction, distance))?;
            report_growth(&growth);
        }
        Command::Stack { file, block, rise } => {
            let growth = edit_project(&file, |project| stack(project, &BlockId::from(block), rise))?;
            report_growth(&growth);
        }
        Command::Wall { file, block, course } => {
            for id in wall_blocks(&load_project(&file)?, &BlockId::from(block), course)? {
                println!("{}", id);
            }
        }
        Command::Export { file } => {
            let project = load_project(&file)?;
            let json = serde_json::to_string_pretty(&project.scene).map_err(WallError::serialization)?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn create_project(file: &Path, name: Option<String>, force: bool) -> WallResult<Project> {
    if file.exists() && !force {
        return Err(WallError::file_error(
            "create",
            file.display().to_string(),
            "file already exists (use --force to overwrite)",
        ));
    }
    let name = name.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let project = Project::new(name);
    save_project(&project, file)?;
    Ok(project)
}

/// Lock, load, edit and atomically save a project.
fn edit_project<T>(file: &Path, edit: impl FnOnce(&mut Project) -> WallResult<T>) -> WallResult<T> {
    let _lock = FileLock::acquire(file, current_user())?;
    let mut project = load_project(file)?;
    let result = edit(&mut project)?;
    save_project(&project, file)?;
    Ok(result)
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "wallkit".to_string())
}

/// Replay a column-handle drag of `distance` along `direction`.
fn extend(project: &mut Project, column: usize, direction: Direction, distance: f64) -> WallResult<Growth> {
    let mut graph = project.to_graph()?;
    let origin = graph.column_at(column).ok_or_else(|| {
        WallError::invalid_input(
            "column",
            column.to_string(),
            format!("project has {} columns", graph.column_count()),
        )
    })?;

    let mut session = Session::new();
    session.press(&graph, &PickTarget::ColumnHandle { column: origin, direction }, DVec3::ZERO);
    let offset = direction.unit() * distance;
    let growth = drag_to(
        &mut session,
        &mut graph,
        &project.settings.scene,
        DVec3::new(offset.x, 0.0, offset.y),
    );
    session.release();

    project.update_scene(&graph);
    Ok(growth)
}

/// Replay a block-handle drag rising `rise` above the block.
fn stack(project: &mut Project, block: &BlockId, rise: f64) -> WallResult<Growth> {
    let mut graph = project.to_graph()?;
    if !graph.contains_block(block) {
        return Err(WallError::invalid_input("block", block.to_string(), "no such block"));
    }

    let mut session = Session::new();
    session.press(&graph, &PickTarget::Block(block.clone()), DVec3::ZERO);
    session.press(&graph, &PickTarget::BlockHandle { block: block.clone() }, DVec3::ZERO);
    let growth = drag_to(
        &mut session,
        &mut graph,
        &project.settings.scene,
        DVec3::new(0.0, rise, 0.0),
    );
    session.release();

    project.update_scene(&graph);
    Ok(growth)
}

fn wall_blocks(project: &Project, block: &BlockId, course: bool) -> WallResult<Vec<BlockId>> {
    let graph = project.to_graph()?;
    if !graph.contains_block(block) {
        return Err(WallError::invalid_input("block", block.to_string(), "no such block"));
    }
    Ok(if course {
        connected_course(&graph, block)
    } else {
        connected_wall(&graph, block)
    })
}

fn print_estimate(project: &Project, rates: &CostRates, json: bool) -> WallResult<()> {
    let graph = project.to_graph()?;
    let cost = estimate(&graph, rates);
    if json {
        let text = serde_json::to_string_pretty(&cost).map_err(WallError::serialization)?;
        println!("{}", text);
        return Ok(());
    }
    let labor = cost.labor_breakdown();
    println!("columns:   {}", cost.column_count);
    println!("blocks:    {}", cost.block_count);
    println!("materials: {:.2}", cost.materials_cost);
    println!(
        "labor:     {:.2} ({} months, {} days, {} hours, {} minutes)",
        cost.labor_cost, labor.months, labor.days, labor.hours, labor.minutes
    );
    println!("total:     {:.2}", cost.total_cost);
    Ok(())
}

fn report_growth(growth: &Growth) {
    info!(columns = growth.columns.len(), blocks = growth.blocks.len(), "drag replayed");
    for id in &growth.blocks {
        println!("{}", id);
    }
    if growth.is_empty() {
        println!("nothing to build");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn temp_path(name: &str) -> PathBuf {
        let path = temp_dir().join(format!("wallkit_cli_test_{}.wall", name));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_parse_extend() {
        let cli = Cli::try_parse_from([
            "wallkit", "extend", "a.wall", "--column", "0", "--direction", "e", "--distance", "4.5",
        ])
        .unwrap();
        match cli.command {
            Command::Extend { column, direction, distance, .. } => {
                assert_eq!(column, 0);
                assert_eq!(direction, Direction::East);
                assert_eq!(distance, 4.5);
            }
            other => panic!("Expected Extend, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_direction() {
        let result = Cli::try_parse_from([
            "wallkit", "extend", "a.wall", "--column", "0", "--direction", "up", "--distance", "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_extend_then_stack_then_wall() {
        let path = temp_path("workflow");
        create_project(&path, None, false).unwrap();
        assert!(create_project(&path, None, false).is_err());

        let growth = edit_project(&path, |p| extend(p, 0, Direction::East, 3.1)).unwrap();
        assert_eq!(growth.columns.len(), 2);
        assert_eq!(growth.blocks.len(), 2);

        let first = growth.blocks[0].clone();
        let stacked = edit_project(&path, |p| stack(p, &first, 2.5 * 0.41)).unwrap();
        assert_eq!(stacked.blocks.len(), 2);

        let project = load_project(&path).unwrap();
        assert_eq!(project.meta.name, "wallkit_cli_test_workflow");
        assert_eq!(project.scene.columns.len(), 3);
        assert_eq!(project.scene.blocks.len(), 4);

        let wall = wall_blocks(&project, &first, false).unwrap();
        assert_eq!(wall, growth.blocks);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_extend_unknown_column() {
        let mut project = Project::new("x");
        let err = extend(&mut project, 3, Direction::North, 2.0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_stack_unknown_block() {
        let mut project = Project::new("x");
        assert!(stack(&mut project, &BlockId::from("nope"), 1.0).is_err());
    }
}
