use clap::{Parser, Subcommand};
use flatsite::output::{self, PageSummary};
use flatsite::{Page, Site, SortTarget, Visibility, config, logging};
use indexmap::IndexMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flatsite")]
#[command(about = "Flat-file content engine: directories become pages")]
#[command(long_about = "\
Flat-file content engine: directories become pages

Your filesystem is the database. Every directory below the content root is
a page, its text files hold the page's fields, and everything else is a
file attached to the page.

Site structure:

  mysite/
  ├── config.toml                  # Site config (optional)
  └── content/
      ├── site.txt                 # Site-wide fields
      ├── home/                    # Homepage (no number = invisible)
      │   └── home.txt
      ├── error/                   # Error page
      │   └── error.txt
      └── 01-projects/             # Visible page, sorted first
          ├── projects.txt         # Content file; its name picks the template
          └── project-a/
              ├── project.txt      # Title: A  ----  Text: ...
              ├── photo.jpg
              └── photo.jpg.txt    # Fields describing photo.jpg

Content files are sections separated by lines of four or more dashes, each
\"Key: value\". With language support on, each language has its own file:
project.en.txt, project.de.txt.

Run 'flatsite gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Site directory (holds config.toml and the content root)
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Language code to work in (multi-language sites)
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the page tree
    Tree,
    /// Print one page and its fields
    Info { uri: String },
    /// Resolve a request path the way a web request would
    Resolve {
        path: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Resolve a request path and print the rendered HTML
    Render { path: String },
    /// List a page's files
    Files { uri: String },
    /// Create a page
    Create {
        /// Parent uid path plus new slug, e.g. projects/new-project
        uri: String,
        #[arg(long, default_value = "default")]
        template: String,
        /// Field as KEY=VALUE, repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Merge fields into a page's content file
    Update {
        uri: String,
        #[arg(long = "field", value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Move a page to a new uid path, keeping its sort number
    Move { uri: String, to: String },
    /// Delete a page without children
    Delete { uri: String },
    /// Sort a visible page: a position, first, last, up or down
    Sort { uri: String, target: SortTarget },
    /// Make a page visible, last or at a given position
    Show {
        uri: String,
        /// Position among visible siblings (default: last)
        #[arg(long)]
        num: Option<usize>,
    },
    /// Make a page invisible
    Hide { uri: String },
    /// Flip a page's visibility
    Toggle { uri: String },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site = Site::open(&cli.source)?;
    if let Some(lang) = &cli.lang
        && !site.set_language(lang)
    {
        return Err(format!("unknown language: {lang}").into());
    }

    match cli.command {
        Command::Tree => output::print_tree(&site),
        Command::Info { uri } => output::print_page(&require(&site, &uri)?),
        Command::Resolve { path, json } => {
            let page = site.visit(&path);
            let summary = PageSummary::new(&site, &page);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                output::print_resolution(&summary);
            }
        }
        Command::Render { path } => {
            let page = site.visit(&path);
            print!("{}", site.render(&page)?);
        }
        Command::Files { uri } => output::print_files(&require(&site, &uri)?.files()),
        Command::Create {
            uri,
            template,
            fields,
        } => {
            let page = site.create(&uri, &template, &to_map(fields))?;
            output::print_page(&page);
        }
        Command::Update { uri, fields } => {
            let page = require(&site, &uri)?.update(&to_map(fields), cli.lang.as_deref())?;
            output::print_page(&page);
        }
        Command::Move { uri, to } => {
            let page = require(&site, &uri)?.move_to(&to)?;
            println!("{} → {}", uri, page.diruri());
        }
        Command::Delete { uri } => {
            require(&site, &uri)?.delete()?;
            println!("Deleted {uri}");
        }
        Command::Sort { uri, target } => {
            let page = require(&site, &uri)?.sort(target)?;
            println!("{} → {}", uri, page.dirname());
        }
        Command::Show { uri, num } => {
            let page = require(&site, &uri)?.make(Visibility::Visible, num)?;
            println!("{} → {}", uri, page.dirname());
        }
        Command::Hide { uri } => {
            let page = require(&site, &uri)?.make(Visibility::Invisible, None)?;
            println!("{} → {}", uri, page.dirname());
        }
        Command::Toggle { uri } => {
            let page = require(&site, &uri)?.toggle()?;
            println!("{} → {}", uri, page.dirname());
        }
        Command::GenConfig => unreachable!("handled before opening the site"),
    }

    Ok(())
}

fn require(site: &Site, uri: &str) -> Result<Page, String> {
    site.page(uri).ok_or_else(|| format!("no page at {uri:?}"))
}

fn to_map(fields: Vec<(String, String)>) -> IndexMap<String, String> {
    fields.into_iter().collect()
}
