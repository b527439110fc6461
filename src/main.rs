use std::process::ExitCode;

use scoreline::cli::Options;
use scoreline::config::Config;
use scoreline::player::Player;

fn main() -> ExitCode {
    stderrlog::new()
        .module(module_path!())
        .verbosity(log::Level::Info)
        .init()
        .expect("failed to initialize logging");

    println!("NoCrazyDots (c) 2017-2019 Antonio Bonifati \"Farmboy\" under GNU GPL3");

    let options = Options::parse(std::env::args().skip(1));

    // Falls back to an optional per-user config file before the embedded
    // defaults, the way a desktop tool would look under `dirs::config_dir`
    // rather than demand a `--config` flag for every run.
    let user_config = dirs::config_dir()
        .map(|dir| dir.join("scoreline").join("config.toml"))
        .filter(|path| path.is_file());

    let config = match Config::load(user_config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}: {}", scoreline::common::APP_NAME, e);
            return ExitCode::FAILURE;
        }
    };

    match Player::new(config).run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}: {}", scoreline::common::APP_NAME, e);
            ExitCode::FAILURE
        }
    }
}
