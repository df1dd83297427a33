mod catalog;
mod config;
mod engine;
mod error;
mod progress;
mod runtime;
mod session;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    runtime::run()
}
