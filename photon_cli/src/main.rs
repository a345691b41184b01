use clap::Parser;
use log::*;
use photon_cli::commands::{exec_props, exec_stop};
use photon_cli::config::{CliCommand, Config, GlobalOptions, Settings};
use photon_cli::error::{drain_exit_code, CliError};
use photon_cli::formatting::{format_outcome, format_properties};

fn main() {
    env_logger::init();
    let config: Config = Config::parse();
    let (global_options, command) = config.to_parts();

    match run(command, &global_options) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("** Error ** \n {err}");
            std::process::exit(err.exit_code());
        }
    }
}

fn run(command: CliCommand, global_options: &GlobalOptions) -> Result<i32, CliError> {
    let settings = Settings::try_load(global_options.config_file.as_ref())?;
    match command {
        CliCommand::Props => {
            let values = exec_props(global_options, &settings)?;
            println!("{}", format_properties(&values, global_options.json)?);
            Ok(0)
        }
        CliCommand::Stop(cmd) => {
            let outcome = exec_stop(&cmd, global_options, &settings)?;
            println!("{}", format_outcome(&outcome, global_options.json)?);
            if !outcome.is_success() {
                warn!("Drain ended without success: {outcome}");
            }
            Ok(drain_exit_code(&outcome))
        }
    }
}
