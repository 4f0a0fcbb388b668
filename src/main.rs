mod actions;
mod agency;
mod allocation;
mod api;
mod approvals;
mod audit;
mod cases;
mod cli;
mod comments;
mod config;
mod db;
mod documents;
mod error;
mod investigation;
mod regulatory;
mod risk;
mod roles;
mod schema;
mod server;
mod sessions;
mod status;
mod users;

use directories::ProjectDirs;
use flexi_logger::{Duplicate, FileSpec, Logger};
use log::{debug, error};

use crate::cli::Cli;
use crate::config::{Config, CONFIG};

fn main() {
    let Some(project_dirs) = ProjectDirs::from("", "", "tathya") else {
        eprintln!("Could not determine a data directory for this platform");
        std::process::exit(1);
    };

    // Config must be in place before the logger reads its levels
    let config = Config::load_config(&project_dirs);
    let log_spec = config.log_spec();
    let _ = CONFIG.set(config);

    // Log to rotating files under the data directory, echoing warnings and
    // errors to the console. Logging still works if file setup fails.
    let logger = Logger::try_with_str(&log_spec).and_then(|l| {
        l.log_to_file(FileSpec::default().directory(Config::get_logs_dir()))
            .duplicate_to_stderr(Duplicate::Warn)
            .format_for_files(flexi_logger::detailed_format)
            .start()
    });
    let _logger = match logger {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Logger initialization failed: {}", e);
            None
        }
    };

    debug!(
        "Command-line args: {:?}",
        std::env::args_os().collect::<Vec<_>>()
    );

    if let Err(err) = Cli::handle_command_line() {
        error!("{:?}", err);
        eprint!("{}", err);
        std::process::exit(1);
    }
}
