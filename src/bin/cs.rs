use anyhow::{Context, Result};
use clap::Parser;
use codesearch::github::SearchOutcome;
use codesearch::text::sorted_keys;
use codesearch::{Codesearch, Config, Highlight, SearchResult};
use colored::Colorize;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cs",
    version,
    about = "Codesearch wraps the GitHub API to be closer to grep/ag/etc semantics",
    long_about = r#"
Codesearch wraps the GitHub API to be closer to grep/ag/etc semantics

Positional args are merged into a single string and used as the search query.
Refer to GitHub's documentation for qualifiers such as org:, language: or path:
https://docs.github.com/en/search-github/searching-on-github/searching-code

GitHub can be harsh with rate limiting. If the repositories you search have a
consistent default branch, set `default_branch` in ~/.codesearch.toml (or pass
--branch) to skip the branch lookup.

Authentication: GITHUB_TOKEN, or `token_file` in the config file.
"#
)]
struct Args {
    /// Search terms
    #[arg(required = true)]
    terms: Vec<String>,

    /// Print NUM lines of trailing context after each match
    #[arg(short = 'A', long = "after-context", value_name = "NUM")]
    after: Option<usize>,

    /// Print NUM lines of leading context before each match
    #[arg(short = 'B', long = "before-context", value_name = "NUM")]
    before: Option<usize>,

    /// Print NUM lines of context before and after each match
    #[arg(short = 'C', long = "context", value_name = "NUM")]
    context: Option<usize>,

    /// Limit the number of matches queried and displayed (0 for no limit)
    #[arg(long)]
    limit: Option<usize>,

    /// Number of spaces to display tabs as
    #[arg(long = "tabwidth")]
    tab_width: Option<usize>,

    /// Read every repository at this branch instead of looking up default branches
    #[arg(long)]
    branch: Option<String>,

    /// Overrides the location of the config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print debugging messages to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print only a count of matching files
    #[arg(short, long)]
    count: bool,

    /// Print only paths of matching files
    #[arg(short = 'l', long = "files-only")]
    files_only: bool,

    /// Print only names of repositories containing matches
    #[arg(long)]
    repos_only: bool,

    /// Print only fully-qualified names (owner/repo path/to/file)
    #[arg(long)]
    full_names_only: bool,

    /// Prefix each line with a link to it instead of the file name
    #[arg(short = 'u', long)]
    url: bool,

    /// Print only the text of each line
    #[arg(long)]
    content: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Dump the intermediate search structures as JSON
    #[arg(long)]
    dump: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(after) = self.after {
            config.after = after;
        }
        if let Some(before) = self.before {
            config.before = before;
        }
        if let Some(context) = self.context {
            config.context = context;
        }
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(tab_width) = self.tab_width {
            config.tab_width = tab_width;
        }
        if let Some(branch) = &self.branch {
            config.default_branch = Some(branch.clone());
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let directive = if verbose { "codesearch=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;
    if args.no_color {
        colored::control::set_override(false);
    }

    let mut config = Config::load(args.config.as_deref()).context("failed to load config")?;
    args.apply(&mut config);

    let query = args.terms.join(" ");
    tracing::debug!("Query: {}", query);
    let search = Codesearch::query(&query)
        .config(config.clone())
        .highlight(Highlight::Ansi);

    if args.count {
        println!("{}", search.count().await.context("search failed")?);
        return Ok(());
    }

    let result = search.search_result().await.context("search failed")?;

    if args.files_only {
        print_names(&result, |key| key.path.clone());
        return Ok(());
    }
    if args.full_names_only {
        print_names(&result, |key| key.full_name());
        return Ok(());
    }
    if args.repos_only {
        print_names(&result, |key| key.repo_name());
        return Ok(());
    }

    let outcome = search
        .resolve(result)
        .await
        .context("failed to fetch file contents")?;

    if args.dump {
        println!("{}", serde_json::to_string_pretty(&dump(&outcome))?);
        return Ok(());
    }

    let site = config.site_url();
    for m in &outcome.matches {
        if args.content {
            println!("{}", m.text);
        } else if args.url {
            println!("{}:{}", m.url(&site).blue(), m.text);
        } else {
            println!(
                "{}:{}: {}",
                format!("{}/{}", m.repo, m.path).blue(),
                m.line_number.to_string().green(),
                m.text
            );
        }
    }
    Ok(())
}

fn print_names(result: &SearchResult, name: impl Fn(&codesearch::FileKey) -> String) {
    let names: BTreeSet<String> = result.keys().map(name).collect();
    for name in names {
        println!("{}", name);
    }
}

/// Intermediate structures in a shape that's easy to turn into test fixtures
fn dump(outcome: &SearchOutcome) -> serde_json::Value {
    let files: Vec<_> = sorted_keys(&outcome.result)
        .into_iter()
        .map(|key| {
            json!({
                "file": key,
                "fragments": outcome.result[key],
                "branch": outcome.branches.get(&key.repo_name()),
                "text": outcome.full_text.get(key),
                "truncated": outcome.full_text.is_truncated(key),
            })
        })
        .collect();
    json!({ "files": files, "matches": outcome.matches })
}
