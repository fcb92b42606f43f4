//! Sample player desktop host.
//!
//! Usage: `sample-player [URI]`. A path or `file://` URI given on the command
//! line is loaded at startup. Set `RUST_LOG=debug` for verbose output.

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let initial_uri = std::env::args().nth(1);
    log::info!("sample-player starting up");

    sample_player::app::run(initial_uri)
}
