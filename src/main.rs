use std::path::PathBuf;
use std::sync::Arc;

use taskplanner::config::PlannerConfig;
use taskplanner::planner::Planner;

struct Args {
    config: Option<PathBuf>,
    debug: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        debug: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--debug" => args.debug = true,
            "-h" | "--help" => {
                println!("Usage: taskplanner [--config <path>] [--debug]");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;
    let config = PlannerConfig::load(args.config.as_deref())?;

    // Journal (`journalctl --user -t taskplanner -f`) plus server-log.txt
    std::fs::create_dir_all(&config.data_dir)?;
    taskplanner::logging::init(
        "taskplanner",
        Some(&config.log_path()),
        args.debug || config.debug_logging,
    );
    log::info!("Data directory: {}", config.data_dir.display());

    let planner = Arc::new(Planner::new(&config)?);
    taskplanner::server::serve(planner, &config.server).await?;
    Ok(())
}
