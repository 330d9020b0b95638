use std::env;
use std::fs;
use std::process::ExitCode;

use varchess::cli::CliHandler;
use varchess::VariantConfig;

fn main() -> ExitCode {
    // Optional argument: a variant configuration file.
    let config = match env::args().nth(1) {
        Some(path) => {
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("error: cannot read {}: {}", path, e);
                    return ExitCode::FAILURE;
                }
            };
            match VariantConfig::from_json(&text) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => VariantConfig::default(),
    };

    match CliHandler::new(config) {
        Ok(mut handler) => {
            handler.run();
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
