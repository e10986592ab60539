use clap::{Arg, Command as ClapCommand, ArgAction};
use std::process;
use log::error;

// Import from your library
use cubecut::utils::logger::Logger;
use cubecut::commands::{CommandFactory, CubecutCommandFactory};

fn main() {
    let matches = ClapCommand::new("cubecut")
        .version("0.1.0")
        .about("Extract cutouts from FITS files by pixel range or sky coordinates")
        .arg(
            Arg::new("input")
                .help("Input FITS file (gzip-compressed files are read transparently)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cutout")
                .short('c')
                .long("cutout")
                .help("Cutout specification: pixel ranges like '[1][100:200,100:200]' \
                       or a shape like 'CIRCLE 150.2 2.43 0.01'; repeatable")
                .value_name("SPEC")
                .action(ArgAction::Append)
                .required(false),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output FITS file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("preview")
                .long("preview")
                .help("Write a PNG preview for each data HDU of the result")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let log_file = "cubecut.log";
    let logger = match Logger::new(log_file) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error initializing logger: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = Logger::init_global_logger("cubecut-global.log") {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let factory = CubecutCommandFactory::new();

    let command_result = factory.create_command(&matches, &logger);
    match command_result {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
