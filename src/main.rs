use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use lambda_version_gc::{
    Config, CredentialSource, Region, gc_function_versions_with_config, set_up_logger,
};
use log::debug;

#[derive(Debug)]
struct Args {
    verbose: bool,
    config: Config,
}

fn command() -> Command {
    Command::new("lambda-version-gc")
        .version("0.1")
        .author("Jacob Luszcz")
        .about("Removes old versions of Lambda functions.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Verbose mode. Outputs DEBUG and higher log messages."),
        )
        .arg(
            Arg::new("dryrun")
                .short('d')
                .long("dry-run")
                .alias("dryrun")
                .action(ArgAction::SetTrue)
                .help("Keeps all versions, logging the ones that would otherwise be deleted."),
        )
        .arg(
            Arg::new("token-key-id")
                .long("token-key-id")
                .requires("token-secret")
                .help("AWS access key id. Must provide AWS secret access key as well."),
        )
        .arg(
            Arg::new("token-secret")
                .long("token-secret")
                .requires("token-key-id")
                .help("AWS secret access key. Must provide AWS access key id as well."),
        )
        .arg(
            Arg::new("profile")
                .long("profile")
                .env("AWS_PROFILE")
                .help("AWS profile. Ignored when a key id and secret are given."),
        )
        .arg(
            Arg::new("regions")
                .long("regions")
                .num_args(1..)
                .help("AWS regions to clean up. Defaults to every region that offers Lambda."),
        )
        .arg(
            Arg::new("num-to-keep")
                .long("num-to-keep")
                .value_parser(value_parser!(usize))
                .default_value("2")
                .help("Number of newest versions to keep, besides the current one and $LATEST."),
        )
        .arg(
            Arg::new("function-names")
                .long("function-names")
                .num_args(1..)
                .help("Only clean up these functions. Defaults to every function."),
        )
}

fn parse_args(matches: &ArgMatches) -> Args {
    let strings = |id: &str| -> Option<Vec<String>> {
        matches
            .get_many::<String>(id)
            .map(|values| values.cloned().collect())
    };

    let credentials = CredentialSource::resolve(
        matches.get_one::<String>("token-key-id").cloned(),
        matches.get_one::<String>("token-secret").cloned(),
        matches.get_one::<String>("profile").cloned(),
    );

    let config = Config {
        regions: strings("regions").map(|regions| regions.into_iter().map(Region::from).collect()),
        num_to_keep: matches.get_one::<usize>("num-to-keep").copied().unwrap_or(2),
        function_names: strings("function-names"),
        dry_run: matches.get_flag("dryrun"),
        credentials,
    };

    Args {
        verbose: matches.get_flag("verbose"),
        config,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(&command().get_matches());
    set_up_logger(module_path!(), args.verbose)?;
    debug!("{:?}", args);

    gc_function_versions_with_config(&args.config).await?;
    Ok(())
}
