// src/bin/pri.rs

use colored::Colorize;
use pri::cli::{self, CliError};
use pri::plugins::builtin_catalog;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    };

    let catalog = builtin_catalog();
    if let Err(e) = runtime.block_on(cli::run(std::env::args_os(), &catalog)) {
        let code = cli::exit_code_for(&e);
        match e.downcast_ref::<CliError>() {
            // clap formats its own usage errors.
            Some(CliError::Usage(usage)) => {
                let _ = usage.print();
            }
            // Interrupted: the child already reported, exit quietly.
            _ if code == 130 => {}
            _ => eprintln!("\n{}: {:#}", "Error".red().bold(), e),
        }
        std::process::exit(code);
    }
}
