//! Cosmetic Filter CLI
//!
//! Replays saved pages through the content-script pipeline and inspects
//! filter lists.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};

use cf_engine::loopback::DEFAULT_MAX_TICKS;
use cf_engine::{parse_cosmetic_list, CosmeticEngine};

mod page;
mod simulate;

#[derive(Parser)]
#[command(name = "cf-cli")]
#[command(about = "Cosmetic filter content-script replay tools")]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a saved page through the hide pipeline against a filter list
    Simulate {
        /// HTML page to load
        #[arg(short, long)]
        page: PathBuf,

        /// Filter list file
        #[arg(short, long)]
        rules: PathBuf,

        /// Host the page was served from
        #[arg(long)]
        host: String,

        /// JSON tunables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Public suffix list file
        #[arg(long)]
        psl: Option<PathBuf>,

        /// Seed for the randomized hide class
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Stop after this many pump ticks
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the party verdict for every element matching a selector
    Classify {
        /// HTML page to load
        #[arg(short, long)]
        page: PathBuf,

        /// CSS selector to classify
        #[arg(short, long)]
        selector: String,

        /// Host the page was served from
        #[arg(long)]
        host: String,

        /// JSON tunables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Public suffix list file
        #[arg(long)]
        psl: Option<PathBuf>,
    },

    /// Count the cosmetic rules in a filter list
    Rules {
        /// Filter list file
        #[arg(short, long)]
        input: PathBuf,

        /// Print the counts as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Simulate {
            page,
            rules,
            host,
            config,
            psl,
            seed,
            max_ticks,
            json,
        } => cmd_simulate(&page, &rules, &host, config.as_deref(), psl.as_deref(), seed, max_ticks, json),
        Commands::Classify {
            page,
            selector,
            host,
            config,
            psl,
        } => cmd_classify(&page, &selector, &host, config.as_deref(), psl.as_deref()),
        Commands::Rules { input, json } => cmd_rules(&input, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_simulate(
    page: &Path,
    rules: &Path,
    host: &str,
    config: Option<&Path>,
    psl: Option<&Path>,
    seed: u64,
    max_ticks: usize,
    json: bool,
) -> Result<(), String> {
    let start = Instant::now();
    let config = simulate::load_config(config)?;
    let parser = simulate::domain_parser(psl, &config)?;
    let doc = page::read_page(page)?;
    let engine = CosmeticEngine::from_path(rules, seed).map_err(|e| e.to_string())?;

    let output = simulate::simulate(doc, &engine, host, config, parser, max_ticks)?;

    if json {
        let text = serde_json::to_string_pretty(&output).map_err(|e| format!("Failed to serialize report: {}", e))?;
        println!("{text}");
        return Ok(());
    }

    let report = &output.report;
    let queue = &report.session.queue;
    println!("Page: {} ({})", page.display(), host);
    println!("Hide class: {}", report.session.hide_class.as_deref().unwrap_or("-"));
    println!(
        "Seen: {} ids, {} classes",
        report.session.seen_ids, report.session.seen_classes
    );
    println!(
        "Messages: {} sent, {} received",
        report.outbound, report.inbound
    );
    println!(
        "Selectors: {} registered, {} processed, {} invalid",
        report.session.registered_selectors, queue.selectors_processed, queue.invalid_selectors
    );
    println!(
        "Matches: {} matched, {} classified, {} first-party kept, {} hidden, {} removed",
        queue.matched, queue.classified, queue.first_party_kept, queue.hidden, queue.removed
    );
    println!(
        "Pumps: {} over {} ms virtual time{}",
        queue.pumps,
        report.elapsed_ms,
        if report.truncated { " (truncated)" } else { "" }
    );

    if !output.hidden.is_empty() {
        println!();
        println!("Hidden elements:");
        for node in &output.hidden {
            println!("  {node}");
        }
    }

    eprintln!("Done in {:.2?}", start.elapsed());
    Ok(())
}

fn cmd_classify(
    page: &Path,
    selector: &str,
    host: &str,
    config: Option<&Path>,
    psl: Option<&Path>,
) -> Result<(), String> {
    let config = simulate::load_config(config)?;
    let parser = simulate::domain_parser(psl, &config)?;
    let doc = page::read_page(page)?;

    let nodes = simulate::classify(&doc, selector, host, &config, parser)?;
    if nodes.is_empty() {
        println!("No elements match '{}'", selector);
        return Ok(());
    }

    for node in &nodes {
        let verdict = if node.first_party { "first-party" } else { "third-party" };
        println!(
            "{:<12} {} signals={} visited={}",
            verdict, node.node, node.signals, node.visited
        );
    }
    Ok(())
}

fn cmd_rules(input: &Path, json: bool) -> Result<(), String> {
    let text = std::fs::read_to_string(input).map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;
    let (_, stats) = parse_cosmetic_list(&text);

    if json {
        let text = serde_json::to_string_pretty(&stats).map_err(|e| format!("Failed to serialize stats: {}", e))?;
        println!("{text}");
        return Ok(());
    }

    println!("Filter list: {}", input.display());
    println!("  Lines:              {}", stats.lines);
    println!("  Comments:           {}", stats.comments);
    println!("  Generic hide:       {}", stats.generic_hide);
    println!("  Generic exceptions: {}", stats.generic_exceptions);
    println!("  Domain-specific:    {}", stats.domain_specific);
    println!("  Procedural:         {}", stats.procedural);
    println!("  Network:            {}", stats.network);
    println!("  Generic total:      {}", stats.generic_total());
    Ok(())
}
