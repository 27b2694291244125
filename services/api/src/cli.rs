use crate::search::{run_search, SearchArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use roomscout::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "RoomScout",
    about = "Search rental listings and serve the discovery API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Filter listings from the command line and print the results
    Search(SearchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Search(args) => run_search(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_flags_parse_into_filters() {
        let cli = Cli::try_parse_from([
            "roomscout-api",
            "search",
            "--min-price",
            "8000",
            "--amenity",
            "WiFi",
            "--amenity",
            "AC",
            "--property-type",
            "pg",
            "--gender",
            "female",
            "--verified-only",
            "--markers",
        ])
        .expect("search arguments parse");

        let Some(Command::Search(args)) = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(args.min_price, Some(8_000));
        assert_eq!(args.amenities, vec!["WiFi".to_string(), "AC".to_string()]);
        assert!(args.verified_only && args.markers);
        assert!(args.property_type.is_some());
    }

    #[test]
    fn unknown_property_type_is_rejected() {
        let result = Cli::try_parse_from(["roomscout-api", "search", "--property-type", "castle"]);
        assert!(result.is_err());
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["roomscout-api"]).expect("no arguments parse");
        assert!(cli.command.is_none());
    }
}
