//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use docweave_core::{assemble, dry_run};
use docweave_shared::{
    AppConfig, Assembly, AssembleOptions, LineRange, config_file_path, init_config, load_config,
};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Docweave — weave plain-text sources into one document.
#[derive(Parser)]
#[command(
    name = "docweave",
    version,
    about = "Assemble files, directories, globs, and bundles into a single document.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Output format for assembled content.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Assemble sources into a document on stdout.
    Build {
        /// Source tokens: files (with optional `:L` ranges),
        /// directories, glob patterns, or `.bundle.` manifests.
        #[arg(required = true)]
        sources: Vec<String>,

        /// Additional file extensions to treat as text (e.g. `rst`).
        #[arg(long = "txt-ext")]
        txt_ext: Vec<String>,

        /// Include only directory members matching this glob
        /// (repeatable; `**` enables recursive listing).
        #[arg(long)]
        include: Vec<String>,

        /// Skip directory members matching this glob (repeatable;
        /// wins over --include).
        #[arg(long)]
        exclude: Vec<String>,

        /// Suppress per-file header lines.
        #[arg(long)]
        no_header: bool,

        /// Output format: text (default) or json.
        #[arg(long, default_value = "text")]
        output: OutputFormat,
    },

    /// Show what would be assembled, without building the document.
    List {
        /// Source tokens, as for `build`.
        #[arg(required = true)]
        sources: Vec<String>,

        /// Additional file extensions to treat as text.
        #[arg(long = "txt-ext")]
        txt_ext: Vec<String>,

        /// Include only directory members matching this glob.
        #[arg(long)]
        include: Vec<String>,

        /// Skip directory members matching this glob.
        #[arg(long)]
        exclude: Vec<String>,

        /// Output format: text (default) or json.
        #[arg(long, default_value = "text")]
        output: OutputFormat,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docweave=info",
        1 => "docweave=debug",
        _ => "docweave=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            sources,
            txt_ext,
            include,
            exclude,
            no_header,
            output,
        } => cmd_build(&sources, &txt_ext, &include, &exclude, no_header, output),
        Command::List {
            sources,
            txt_ext,
            include,
            exclude,
            output,
        } => cmd_list(&sources, &txt_ext, &include, &exclude, output),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Option merging
// ---------------------------------------------------------------------------

/// Options recognized on bundle manifest lines.
#[derive(Debug, Default)]
struct BundleOptions {
    no_header: bool,
    txt_ext: Vec<String>,
    include: Vec<String>,
    exclude: Vec<String>,
}

/// Parse the option lines collected from traversed manifests. Unknown
/// options are logged and skipped.
fn parse_option_lines(lines: &[String]) -> BundleOptions {
    let mut opts = BundleOptions::default();
    for line in lines {
        let mut parts = line.split_whitespace();
        let Some(flag) = parts.next() else { continue };
        let value = parts.next();
        match (flag, value) {
            ("--no-header", _) => opts.no_header = true,
            ("--txt-ext", Some(v)) => opts.txt_ext.push(v.to_string()),
            ("--include", Some(v)) => opts.include.push(v.to_string()),
            ("--exclude", Some(v)) => opts.exclude.push(v.to_string()),
            _ => warn!(option = line.as_str(), "ignoring unknown bundle option"),
        }
    }
    opts
}

/// Effective assembly options: config defaults, overlaid with bundle
/// options, overlaid with command-line flags. Flags win.
fn effective_options(
    config: &AppConfig,
    txt_ext: &[String],
    include: &[String],
    exclude: &[String],
    bundle: Option<&BundleOptions>,
) -> AssembleOptions {
    let mut opts = AssembleOptions::from(config);
    if let Some(bundle) = bundle {
        opts = opts.with_extensions(&bundle.txt_ext);
        if include.is_empty() {
            opts.include_patterns.extend(bundle.include.iter().cloned());
        }
        if exclude.is_empty() {
            opts.exclude_patterns.extend(bundle.exclude.iter().cloned());
        }
    }
    opts = opts.with_extensions(txt_ext);
    opts.include_patterns.extend(include.iter().cloned());
    opts.exclude_patterns.extend(exclude.iter().cloned());
    opts
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(
    sources: &[String],
    txt_ext: &[String],
    include: &[String],
    exclude: &[String],
    no_header: bool,
    output: OutputFormat,
) -> Result<()> {
    let config = load_config()?;
    let opts = effective_options(&config, txt_ext, include, exclude, None);
    let mut assembly = assemble(sources, &opts)?;

    // Manifests may carry their own options. Resolution-affecting ones
    // force a second pass with the merged set; flags still win.
    let bundle_opts = parse_option_lines(&assembly.option_lines);
    if !bundle_opts.txt_ext.is_empty()
        || !bundle_opts.include.is_empty()
        || !bundle_opts.exclude.is_empty()
    {
        let merged = effective_options(&config, txt_ext, include, exclude, Some(&bundle_opts));
        if merged != opts {
            info!("re-assembling with bundle options");
            assembly = assemble(sources, &merged)?;
        }
    }
    let no_header = no_header || bundle_opts.no_header;

    match output {
        OutputFormat::Text => print!("{}", render_text(&assembly, no_header)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&assembly)?),
    }
    Ok(())
}

fn cmd_list(
    sources: &[String],
    txt_ext: &[String],
    include: &[String],
    exclude: &[String],
    output: OutputFormat,
) -> Result<()> {
    let config = load_config()?;
    let opts = effective_options(&config, txt_ext, include, exclude, None);
    let report = dry_run(sources, &opts)?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            for entry in &report.entries {
                let ranges = format_ranges(&entry.ranges);
                match &entry.provenance {
                    Some(manifest) => println!(
                        "{}  {} ({} lines, via {})",
                        entry.path.display(),
                        ranges,
                        entry.lines,
                        manifest.display()
                    ),
                    None => println!(
                        "{}  {} ({} lines)",
                        entry.path.display(),
                        ranges,
                        entry.lines
                    ),
                }
            }
            if !report.option_lines.is_empty() {
                println!();
                for line in &report.option_lines {
                    println!("option: {line}");
                }
            }
            println!();
            println!(
                "{} file(s), {} line(s) total",
                report.entries.len(),
                report.total_lines
            );
        }
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config written to {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("# {}", config_file_path()?.display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

/// Render the assembly as plain text. Each block gets a header naming
/// its file (and ranges, when not the whole file); consecutive blocks
/// from the same file share one header.
fn render_text(assembly: &Assembly, no_header: bool) -> String {
    let mut out = String::new();
    let mut prev_path = None;

    for block in &assembly.blocks {
        if !no_header && prev_path != Some(&block.path) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!(
                "==> {} {}<==\n",
                block.path.display(),
                header_ranges(&block.ranges)
            ));
        }
        out.push_str(&block.text);
        if !block.text.ends_with('\n') {
            out.push('\n');
        }
        prev_path = Some(&block.path);
    }
    out
}

fn header_ranges(ranges: &[LineRange]) -> String {
    if ranges.len() == 1 && ranges[0].is_full_file() {
        return String::new();
    }
    format!("({}) ", format_ranges(ranges))
}

fn format_ranges(ranges: &[LineRange]) -> String {
    ranges
        .iter()
        .map(|r| {
            if r.is_full_file() {
                "L1-".to_string()
            } else if r.is_open() {
                format!("L{}-", r.start)
            } else if r.start == r.end {
                format!("L{}", r.start)
            } else {
                format!("L{}-{}", r.start, r.end)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_shared::ContentBlock;
    use std::path::PathBuf;

    fn block(path: &str, text: &str) -> ContentBlock {
        ContentBlock {
            path: PathBuf::from(path),
            ranges: vec![LineRange::full()],
            text: text.to_string(),
            provenance: None,
        }
    }

    #[test]
    fn render_with_headers() {
        let assembly = Assembly {
            blocks: vec![block("/d/a.txt", "alpha"), block("/d/b.txt", "beta")],
            option_lines: vec![],
        };
        let out = render_text(&assembly, false);
        assert_eq!(
            out,
            "==> /d/a.txt <==\nalpha\n\n==> /d/b.txt <==\nbeta\n"
        );
    }

    #[test]
    fn render_without_headers() {
        let assembly = Assembly {
            blocks: vec![block("/d/a.txt", "alpha"), block("/d/b.txt", "beta")],
            option_lines: vec![],
        };
        assert_eq!(render_text(&assembly, true), "alpha\nbeta\n");
    }

    #[test]
    fn consecutive_blocks_from_one_file_share_a_header() {
        let mut first = block("/d/a.txt", "one");
        first.ranges = vec![LineRange::new(1, 1).unwrap()];
        let mut second = block("/d/a.txt", "three");
        second.ranges = vec![LineRange::new(3, 3).unwrap()];
        let assembly = Assembly {
            blocks: vec![first, second],
            option_lines: vec![],
        };
        let out = render_text(&assembly, false);
        assert_eq!(out, "==> /d/a.txt (L1) <==\none\nthree\n");
    }

    #[test]
    fn header_shows_ranges_for_partial_blocks() {
        let mut b = block("/d/a.txt", "body");
        b.ranges = vec![LineRange::new(2, 4).unwrap(), LineRange::new(7, 0).unwrap()];
        let assembly = Assembly {
            blocks: vec![b],
            option_lines: vec![],
        };
        let out = render_text(&assembly, false);
        assert!(out.starts_with("==> /d/a.txt (L2-4,L7-) <==\n"));
    }

    #[test]
    fn merge_precedence_flags_over_bundle_over_config() {
        let config: AppConfig =
            toml::from_str("[defaults]\nexclude_patterns = [\"drafts/*\"]\n").unwrap();
        let bundle = BundleOptions {
            no_header: false,
            txt_ext: vec!["rst".into()],
            include: vec!["bundle/*.md".into()],
            exclude: vec![],
        };

        // No competing flags: bundle additions land on top of config.
        let opts = effective_options(&config, &[], &[], &[], Some(&bundle));
        assert!(opts.extensions.contains(&".rst".to_string()));
        assert_eq!(opts.include_patterns, vec!["bundle/*.md"]);
        assert_eq!(opts.exclude_patterns, vec!["drafts/*"]);

        // An explicit --include displaces the bundle's include set.
        let opts = effective_options(
            &config,
            &[],
            &["cli/*.txt".to_string()],
            &[],
            Some(&bundle),
        );
        assert_eq!(opts.include_patterns, vec!["cli/*.txt"]);
    }

    #[test]
    fn option_line_parsing_recognizes_known_flags() {
        let opts = parse_option_lines(&[
            "--no-header".to_string(),
            "--txt-ext rst".to_string(),
            "--include *.md".to_string(),
            "--exclude draft*".to_string(),
            "--frobnicate".to_string(),
        ]);
        assert!(opts.no_header);
        assert_eq!(opts.txt_ext, vec!["rst"]);
        assert_eq!(opts.include, vec!["*.md"]);
        assert_eq!(opts.exclude, vec!["draft*"]);
    }
}
