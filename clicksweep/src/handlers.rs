use clap::ArgMatches;
use clicksweep_core::config::{DEFAULT_CONFIG, SweepConfig, expand_path};
use clicksweep_core::crawl::{SweepOptions, execute_sweep};
use clicksweep_core::report::{ReportFormat, ReportLayout, generate_summary, save_report};
use clicksweep_scanner::{InteractabilityGate, RecoveryStrategy, VolumeScope};
use colored::Colorize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use url::Url;

// Helper functions for the run handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| parse_url_line(line.trim()))
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    // Try to parse as-is
    if Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    // Try adding http://
    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("⚠️  Skipping invalid URL '{}'", line);
    None
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub report: Option<PathBuf>,
    pub layout: Option<ReportLayout>,
    pub nav: Option<String>,
    pub footer: Option<String>,
    pub descend: bool,
    pub recovery: Option<RecoveryStrategy>,
    pub gate: Option<InteractabilityGate>,
    pub volume_scope: Option<VolumeScope>,
    pub headful: bool,
}

/// Parse a choice using the same spelling the configuration file uses.
pub fn parse_choice<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("Unrecognised value '{}'", value))
}

fn choice<T: DeserializeOwned>(args: &ArgMatches, name: &str) -> Result<Option<T>, String> {
    args.get_one::<String>(name)
        .map(|value| parse_choice(value))
        .transpose()
}

impl RunOverrides {
    pub fn from_matches(args: &ArgMatches) -> Result<Self, String> {
        Ok(Self {
            report: args.get_one::<PathBuf>("report").cloned(),
            layout: choice(args, "layout")?,
            nav: args.get_one::<String>("nav").cloned(),
            footer: args.get_one::<String>("footer").cloned(),
            descend: args.get_flag("descend"),
            recovery: choice(args, "recovery")?,
            gate: choice(args, "gate")?,
            volume_scope: choice(args, "volume-scope")?,
            headful: args.get_flag("headful"),
        })
    }
}

pub fn apply_overrides(config: &mut SweepConfig, overrides: &RunOverrides) {
    if let Some(ref report) = overrides.report {
        config.report_path = expand_path(&report.to_string_lossy());
    }
    if let Some(layout) = overrides.layout {
        config.report_layout = layout;
    }
    if overrides.nav.is_some() {
        config.nav_selector = overrides.nav.clone();
    }
    if overrides.footer.is_some() {
        config.footer_selector = overrides.footer.clone();
    }
    if overrides.descend {
        config.descend = true;
    }
    if let Some(recovery) = overrides.recovery {
        config.recovery = recovery;
    }
    if let Some(gate) = overrides.gate {
        config.gate = gate;
    }
    if let Some(volume_scope) = overrides.volume_scope {
        config.volume_scope = volume_scope;
    }
    if overrides.headful {
        config.headless = false;
    }
}

/// Write the bundled configuration to `path`. An existing file is only
/// replaced when `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG)?;
    Ok(true)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "✗".red().bold(), msg);
    std::process::exit(1);
}

pub fn handle_init(args: &ArgMatches) {
    print_divider();
    println!("{}", "  CLICKSWEEP INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_path = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or("~/.config/clicksweep/config.json");
    let force = args.get_flag("force");
    let config_path = PathBuf::from(shellexpand::tilde(config_path).as_ref());

    println!(
        "{} Target: {}",
        "→".blue(),
        config_path.display().to_string().bright_white()
    );
    println!();

    let mut overwrite = force;
    if config_path.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A configuration file already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            config_path.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Overwrite it with the defaults? [y/N]:");
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return;
        }
        overwrite = true;
    }

    if let Err(e) = write_default_config(&config_path, overwrite) {
        fail(format!("Failed to write {}: {}", config_path.display(), e));
    }

    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Config: {}",
        "✓".green().bold(),
        config_path.display().to_string().bright_white()
    );
    println!(
        "{} Edit the skip list, volume groups and selectors there, then run {}",
        "ℹ".blue(),
        "clicksweep run --url <URL>".bright_white()
    );
    println!();
}

pub async fn handle_run(sub_matches: &ArgMatches, quiet: bool) {
    let verbose = sub_matches.get_flag("verbose");
    tracing_subscriber::fmt()
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let config_file = sub_matches.get_one::<PathBuf>("config");
    let screenshot = sub_matches.get_one::<PathBuf>("screenshot").cloned();
    let output = sub_matches.get_one::<PathBuf>("output");
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    // Load URLs from source
    let urls = load_urls_from_source(url, hosts_file).unwrap_or_else(|e| fail(e));

    let mut config = SweepConfig::resolve(config_file.map(PathBuf::as_path))
        .unwrap_or_else(|e| fail(format!("{:#}", e)));
    let overrides = RunOverrides::from_matches(sub_matches).unwrap_or_else(|e| fail(e));
    apply_overrides(&mut config, &overrides);

    // Print sweep configuration
    if !quiet {
        println!("\n🧹 Sweeping {} start URL(s)", urls.len());
        println!("Report: {}", config.report_path.display());
        println!(
            "Regions: nav={} footer={}",
            config.nav_selector.as_deref().unwrap_or("-"),
            config.footer_selector.as_deref().unwrap_or("-")
        );
        println!(
            "Descend: {}  Recovery: {:?}  Gate: {:?}  Volume scope: {:?}\n",
            if config.descend { "one level" } else { "off" },
            config.recovery,
            config.gate,
            config.volume_scope
        );
    }

    let report_path = config.report_path.clone();
    let options = SweepOptions {
        urls,
        config,
        screenshot,
        show_progress: !quiet,
    };

    let result = match execute_sweep(options, None).await {
        Ok(result) => result,
        Err(e) => fail(format!("Sweep failed: {:#}", e)),
    };

    let cancelled = result.summaries.iter().any(|s| s.cancelled);
    if result.fatal.is_none() {
        if cancelled {
            println!("\n{} Sweep interrupted; finished attempts were saved", "⚠".yellow().bold());
        } else {
            println!("\n{} Sweep complete!", "✓".green().bold());
        }
    }
    println!(
        "{} Report: {}\n",
        "→".blue(),
        report_path.display().to_string().bright_white()
    );

    let summary = generate_summary(&result.summaries, format)
        .unwrap_or_else(|e| fail(format!("Failed to render summary: {}", e)));
    match output {
        Some(path) => match save_report(&summary, path) {
            Ok(()) => println!("{} Summary saved to {}", "✓".green().bold(), path.display()),
            Err(e) => eprintln!("{} Failed to save summary: {}", "✗".red().bold(), e),
        },
        None => print!("{}", summary),
    }

    if let Some(fatal) = result.fatal {
        fail(format!("Sweep aborted: {}", fatal));
    }
}
