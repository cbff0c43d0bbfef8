use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("clicksweep")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("clicksweep")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes the default sweep configuration to your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Where to write the configuration file")
                        .default_value("~/.config/clicksweep/config.json"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help("Overwrite an existing configuration file without asking")
                        .required(false),
                ),
        )
        .subcommand(
            command!("run")
                .about(
                    "Click every interactive element on a site, recovering after each \
                navigation, and record the outcome of each click in a CSV report.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The start URL to sweep")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of start URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("Configuration file (default: ~/.config/clicksweep/config.json if present)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-r --"report" <PATH>)
                        .required(false)
                        .help("CSV report path, overwritten at the start of the run")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"layout" <LAYOUT>)
                        .required(false)
                        .help("CSV layout: scoped (Scope, Element Text, Status, Clickable) or paged (Home, Page, Element, Status)")
                        .value_parser(["scoped", "paged"]),
                )
                .arg(
                    arg!(--"nav" <SELECTOR>)
                        .required(false)
                        .help("CSS selector of the navigation region, swept as its own scope"),
                )
                .arg(
                    arg!(--"footer" <SELECTOR>)
                        .required(false)
                        .help("CSS selector of the footer region, swept as its own scope"),
                )
                .arg(
                    arg!(--"descend")
                        .required(false)
                        .help("Also sweep each page one click away from the start page")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"recovery" <STRATEGY>)
                        .required(false)
                        .help("How to return after a click navigates away: reset or back")
                        .value_parser(["reset", "back"]),
                )
                .arg(
                    arg!(--"gate" <GATE>)
                        .required(false)
                        .help("What an element must be before it is clicked: visible or visible-enabled")
                        .value_parser(["visible", "visible-enabled"]),
                )
                .arg(
                    arg!(--"volume-scope" <SCOPE>)
                        .required(false)
                        .help("Whether a volume group is exercised once per run or once per scope")
                        .value_parser(["global", "per-scope"]),
                )
                .arg(
                    arg!(--"headful")
                        .required(false)
                        .help("Show the browser window")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"screenshot" <PATH>)
                        .required(false)
                        .help("Save a full-page PNG of the final page before the browser closes")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Run summary format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save the run summary to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-v --"verbose")
                        .required(false)
                        .help("Log every target at debug level")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
