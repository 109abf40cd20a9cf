use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use equide::{cli_utils, commands, http_utils, logging};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Options {
    #[arrrg(optional, "Base URL of the equide API server")]
    base_url: String,
    #[arrrg(flag, "Print raw JSON instead of text")]
    json: bool,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let (options, free) =
        Options::from_command_line_relaxed("USAGE: equidectl <command> [args...]");
    logging::init_logging(options.verbose);

    if free.is_empty() {
        cli_utils::exit_with_usage_error("No command specified", commands::usage());
    }

    let base_url = if options.base_url.is_empty() {
        "http://localhost:8080".to_string()
    } else {
        options.base_url
    };

    let client = http_utils::EquideClient::new(base_url);
    commands::run_command(&free, &client, options.json).await;
}
