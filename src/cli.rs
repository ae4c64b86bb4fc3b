use std::error::Error;
use std::path::PathBuf;

use atty::Stream;
use clap::{Parser, Subcommand};
use glossary_panel::glossary::HIGHLIGHT_CLASS;
use glossary_panel::{
    Disclosure, Document, Glossary, GlossaryConfig, MemoryDocument, NodeId, RenderedItem, Scaffold,
    TermRecord, audit_terms, load_terms, parse_terms,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const SAMPLE_TERMS: &str = include_str!("../data/terms.json");

#[derive(Parser, Debug)]
#[command(
    name = "glossary-panel",
    about = "Run a glossary panel against an in-memory page",
    version
)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Terms file: a JSON array of term/definition records. Defaults to the
    /// bundled sample.
    #[arg(long, global = true)]
    terms: Option<PathBuf>,

    /// JSON file overriding selectors, classes and search settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log controller activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every entry in rendered order.
    List,
    /// Type a query into the panel's search box and show what stays visible.
    Search {
        /// Text to type.
        query: String,
    },
    /// Open the panel on a term, as clicking an inline reference would.
    Find {
        /// Term to look up (case-insensitive).
        term: String,
    },
    /// Report blank or duplicated entries; exits non-zero when any are found.
    Check,
    /// Print the effective configuration.
    Config,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => GlossaryConfig::load(path)?,
        None => GlossaryConfig::default(),
    };
    let terms = match &cli.terms {
        Some(path) => load_terms(path)?,
        None => parse_terms(SAMPLE_TERMS)?,
    };
    debug!(entries = terms.len(), "terms loaded");

    match cli.command {
        Command::List => handle_list(terms, config, cli.json),
        Command::Search { query } => handle_search(terms, config, &query, cli.json),
        Command::Find { term } => handle_find(terms, config, &term, cli.json),
        Command::Check => handle_check(&terms, cli.json),
        Command::Config => handle_config(&config),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(Stream::Stderr))
        .without_time()
        .compact();
    if tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_err()
    {
        debug!("tracing subscriber already installed");
    }
}

struct Page {
    doc: MemoryDocument,
    scaffold: Scaffold,
    glossary: Glossary<MemoryDocument>,
}

/// Builds the panel plus one inline reference per term, then mounts the
/// glossary on it.
fn mount(terms: Vec<TermRecord>, config: GlossaryConfig) -> Result<Page, Box<dyn Error>> {
    let doc = MemoryDocument::new();
    let scaffold = doc.scaffold(&config)?;
    let article = doc.create(&doc.body(), "article", &[]);
    for record in &terms {
        match doc.create_matching(&article, "span", &config.selectors.term) {
            Ok(reference) => {
                doc.set_attribute(&reference, "data-term", &record.term);
                doc.set_text(&reference, &record.term);
            }
            Err(err) => {
                warn!(%err, "inline references skipped");
                break;
            }
        }
    }
    let glossary = Glossary::new(doc.clone(), terms, config)?;
    Ok(Page {
        doc,
        scaffold,
        glossary,
    })
}

fn handle_list(
    terms: Vec<TermRecord>,
    config: GlossaryConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let page = mount(terms, config)?;
    let items = page.glossary.visible_items();
    if as_json {
        let payload = json!({
            "count": items.len(),
            "entries": items.iter().map(item_to_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if items.is_empty() {
        println!("The glossary is empty.");
    } else {
        print_entries(&items);
    }
    Ok(())
}

fn handle_search(
    terms: Vec<TermRecord>,
    config: GlossaryConfig,
    query: &str,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let mode = config.search.mode;
    let page = mount(terms, config)?;
    page.doc.input(&page.scaffold.search, query);
    let items = page.glossary.visible_items();

    if as_json {
        let payload = json!({
            "query": query,
            "mode": mode,
            "results": items.iter().map(item_to_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if items.is_empty() {
        println!("No entries match \"{query}\".");
    } else {
        println!("Entries matching \"{query}\":");
        print_entries(&items);
    }
    Ok(())
}

fn handle_find(
    terms: Vec<TermRecord>,
    config: GlossaryConfig,
    term: &str,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let page = mount(terms, config)?;
    page.glossary.show();
    page.glossary.find_term(term);

    let items = page.glossary.visible_items();
    let highlighted = page
        .doc
        .query_selector_all(&page.doc.body(), &format!(".{HIGHLIGHT_CLASS}"))
        .len();
    let expanded: Vec<bool> = items
        .iter()
        .map(|item| is_expanded(&page.glossary, &item.node))
        .collect();

    if as_json {
        let payload = json!({
            "term": term,
            "open": page.glossary.is_open(),
            "highlighted": highlighted,
            "results": items.iter().zip(&expanded).map(|(item, expanded)| {
                let mut value = item_to_json(item);
                value["expanded"] = json!(expanded);
                value
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if items.is_empty() {
        println!("No entry for \"{term}\".");
    } else {
        println!("{highlighted} inline reference(s) highlighted.");
        for (item, expanded) in items.iter().zip(&expanded) {
            let state = if *expanded { "expanded" } else { "collapsed" };
            println!("\n{} [{state}]", item.values.term);
            render_markdown_block(&item.values.definition);
        }
    }
    Ok(())
}

fn is_expanded(glossary: &Glossary<MemoryDocument>, node: &NodeId) -> bool {
    glossary
        .inspect(|_, accordion| !accordion.is_collapsed(node))
        .unwrap_or(false)
}

fn handle_check(terms: &[TermRecord], as_json: bool) -> Result<(), Box<dyn Error>> {
    let issues = audit_terms(terms);
    if as_json {
        let payload = json!({
            "entries": terms.len(),
            "issues": issues,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if issues.is_empty() {
        println!("{} entries, no issues.", terms.len());
    } else {
        for issue in &issues {
            println!("- {issue}");
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(format!("{} issue(s) found in {} entries", issues.len(), terms.len()).into())
    }
}

fn handle_config(config: &GlossaryConfig) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn item_to_json(item: &RenderedItem<NodeId>) -> serde_json::Value {
    json!({
        "term": item.values.term,
        "definition": item.values.definition,
    })
}

fn print_entries(items: &[RenderedItem<NodeId>]) {
    if !stdout_is_tty() {
        let width = items
            .iter()
            .map(|item| item.values.term.len())
            .max()
            .unwrap_or(4)
            .max("TERM".len());
        println!("{:<width$}  {}", "TERM", "DEFINITION", width = width);
        println!("{:-<width$}  {}", "", "----------", width = width);
        for item in items {
            println!("{:<width$}  {}", item.values.term, item.values.definition, width = width);
        }
        return;
    }
    for item in items {
        println!("\n{}", item.values.term);
        render_markdown_block(&item.values.definition);
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
