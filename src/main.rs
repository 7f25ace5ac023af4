use secl_agent::{agent, cli};

fn main() {
    // Parse cli and handle clap errors
    let options = cli::parse_from_args();

    secl_agent::init_logger(Some(options.override_log_level().to_level_filter()));
    log::debug!("{} {}", cli::NAME, secl_agent::metadata::VERSION);

    match agent::run(&options) {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            cli::report_error(&e);
            std::process::exit(1);
        }
    }
}
