//! Binary entry point: wires stdin/stdout to the UCI loop.
//!
//! Command-line plumbing, option files and process supervision are
//! deliberately thin here — they are an external collaborator of the
//! search core, not part of it.

fn main() {
    #[cfg(feature = "logging")]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    corvid::uci::run_uci_loop();
}
