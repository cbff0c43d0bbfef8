pub mod config;
pub mod crawl;
pub mod report;

use colored::Colorize;

pub use config::SweepConfig;
pub use crawl::{SweepOptions, SweepProgressCallback, SweepResult, build_crawler, execute_sweep, sweep_urls};
pub use report::{CsvReportSink, ReportFormat, ReportLayout, RunSummary};

pub fn print_banner() {
    let banner = r#"
      _ _      _                                
  ___| (_) ___| | _____      _____  ___ _ __   
 / __| | |/ __| |/ / __\ \ /\ / / _ \/ _ \ '_ \  
| (__| | | (__|   <\__ \\ V  V /  __/  __/ |_) |
 \___|_|_|\___|_|\_\___/ \_/\_/ \___|\___| .__/ 
                                         |_|    "#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "click everything, see what breaks".dimmed(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_blue()
    );
}
