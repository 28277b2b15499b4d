//! `vx` — thin command-line front end for the vx notebook engine.
//!
//! This binary is intentionally minimal: it owns argument parsing, terminal
//! output, and logging setup; everything else is a direct call into
//! [`vx_engine::api::Engine`]. It is a replaceable front end, not the engine
//! itself.

mod cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .init();

    if let Err(e) = cli::run() {
        eprintln!("error: {e}");
        std::process::exit(e.code() as i32);
    }
}
