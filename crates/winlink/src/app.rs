use clap::{Arg, ArgAction, Command, value_parser};

pub fn build_cli() -> Command {
    Command::new("winlink")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run and inspect windows that share one registry")
        .long_about("winlink runs window processes that register their position and size in a shared store and keep an up-to-date list of every other live window. Start several `winlink join` processes against the same store directory and watch them see each other.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("store-dir")
                .long("store-dir")
                .help("Shared store directory (overrides config)")
                .value_parser(value_parser!(std::path::PathBuf))
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("join")
                .about("Run a window process until interrupted")
                .arg(coordinate("x", "Window left edge").default_value("0"))
                .arg(coordinate("y", "Window top edge").default_value("0"))
                .arg(coordinate("w", "Window width").default_value("800"))
                .arg(coordinate("h", "Window height").default_value("600"))
                .arg(
                    Arg::new("geometry-file")
                        .long("geometry-file")
                        .help("File holding 'x y w h', re-read every frame (overrides --x/--y/--w/--h)")
                        .value_parser(value_parser!(std::path::PathBuf)),
                )
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .short('k')
                        .help("Window kind, stored as the 'type' metadata entry"),
                )
                .arg(
                    Arg::new("meta")
                        .long("meta")
                        .short('m')
                        .help("Extra metadata entry as key=value (repeatable; JSON values are parsed)")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("session")
                        .long("session")
                        .short('s')
                        .help("Session name; a restart with the same name keeps its window id"),
                )
                .arg(
                    Arg::new("frames")
                        .long("frames")
                        .help("Exit after this many frames instead of waiting for a signal")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("Show the windows currently in the shared store")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("clear").about("Remove everything from the shared store"))
}

fn coordinate(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .allow_negative_numbers(true)
        .value_parser(value_parser!(i32))
}
