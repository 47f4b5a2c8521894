//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    env_logger::init();
    if let Err(err) = fieldroute_cli::run() {
        eprintln!("fieldroute: {err}");
        std::process::exit(1);
    }
}
