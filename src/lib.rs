pub mod auth;
pub mod builder;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod filter;
pub mod impact;
pub mod report;
pub mod session;
pub mod store;

pub use builder::{BuilderError, FilterBuilder};
pub use cli::{ColorMode, Commands, OutputFormat, SetCommand, UserCommand, cli_parse};
pub use dataset::{Column, DType, DataSource, Dataset, LoadError, Value};
pub use filter::{
    Condition, FilterDiagnostic, FilterError, FilterKind, FilterOutcome, FilterSpec,
    apply_filters,
};
pub use impact::{ImpactReport, analyze_impact};
pub use session::Session;
pub use store::{FilterSetStore, FilterSets, StoreError};

use crate::auth::{AuthError, UserStore};
use crate::config::AppConfig;
use crate::report::ApplySummary;
use anyhow::{Context, bail};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

/// Settings shared by every command of one invocation
struct Ctx<'a> {
    config: &'a AppConfig,
    format: OutputFormat,
    output: Option<&'a Path>,
    quiet: bool,
}

impl Ctx<'_> {
    /// Print `content`, or write it to `--output` when given.
    fn emit(&self, content: &str) -> anyhow::Result<()> {
        match self.output {
            Some(path) => write_output_file(path, content),
            None => {
                print!("{content}");
                if !content.ends_with('\n') {
                    println!();
                }
                Ok(())
            }
        }
    }

    fn emit_json(&self, value: &serde_json::Value) -> anyhow::Result<()> {
        self.emit(&serde_json::to_string_pretty(value)?)
    }

    fn store(&self) -> FilterSetStore {
        FilterSetStore::new(&self.config.storage.filter_sets)
    }

    fn note(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message.green());
        }
    }
}

fn write_output_file(path: &Path, content: &str) -> anyhow::Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write output file '{}'", path.display()))
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn load_spinner(file: &Path, quiet: bool) -> Option<ProgressBar> {
    if quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Loading {}", file.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

fn open_session(ctx: &Ctx, file: &Path, sheet: Option<&str>) -> anyhow::Result<Session> {
    let spinner = load_spinner(file, ctx.quiet);
    let mut session = Session::new();
    let loaded = session.open_file(file, sheet).map(|_| ());
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    loaded.with_context(|| format!("Failed to load '{}'", file.display()))?;
    Ok(session)
}

/// Filters from a JSON file followed by `--where` terms, in that order
fn collect_filters(
    filters_file: Option<&Path>,
    where_terms: &[String],
) -> anyhow::Result<Vec<FilterSpec>> {
    let mut filters = Vec::new();
    if let Some(path) = filters_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read filter file '{}'", path.display()))?;
        let parsed = filter::parse_filter_list(&raw)
            .with_context(|| format!("Invalid filter file '{}'", path.display()))?;
        filters.extend(parsed);
    }
    filters.extend(filter::parse_where_terms(where_terms).context("Invalid --where term")?);
    Ok(filters)
}

fn require_login(config: &AppConfig, action: &str) -> anyhow::Result<()> {
    if config.session.require_login && auth::current_user(config).is_none() {
        bail!("You must be logged in to {action}; run `user login` first");
    }
    Ok(())
}

fn cmd_sheets(ctx: &Ctx, file: &Path) -> anyhow::Result<()> {
    let source =
        DataSource::open(file).with_context(|| format!("Failed to open '{}'", file.display()))?;

    match ctx.format {
        OutputFormat::Json => ctx.emit_json(&serde_json::json!({
            "file": file.display().to_string(),
            "sheets": source.sheet_names(),
        })),
        OutputFormat::Text if !source.is_workbook() => {
            ctx.emit("Delimited text file: no sheets, the whole file is one table\n")
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for name in source.sheet_names() {
                out.push_str(name);
                out.push('\n');
            }
            ctx.emit(&out)
        }
    }
}

fn cmd_info(ctx: &Ctx, file: &Path, sheet: Option<&str>) -> anyhow::Result<()> {
    let session = open_session(ctx, file, sheet)?;
    let Some(dataset) = session.dataset() else {
        bail!("No data loaded from '{}'", file.display());
    };

    match ctx.format {
        OutputFormat::Text => ctx.emit(&report::format_info_text(dataset)),
        OutputFormat::Json => ctx.emit_json(&report::info_json(dataset)),
    }
}

struct ApplyArgs<'a> {
    file: &'a Path,
    sheet: Option<&'a str>,
    set: Option<&'a str>,
    filters: Option<&'a Path>,
    where_terms: &'a [String],
    limit: Option<usize>,
    show_filters: bool,
}

fn cmd_apply(ctx: &Ctx, args: ApplyArgs) -> anyhow::Result<()> {
    let mut session = open_session(ctx, args.file, args.sheet)?;

    if let Some(name) = args.set {
        session
            .load_named_set(&ctx.store(), name)
            .with_context(|| format!("Failed to load filter set '{name}'"))?;
    }
    let extra = collect_filters(args.filters, args.where_terms)?;
    if let Some(mut builder) = session.builder() {
        for spec in extra {
            builder.push(spec);
        }
    }

    let Some(dataset) = session.dataset() else {
        bail!("No data loaded from '{}'", args.file.display());
    };
    let outcome = session.filtered();
    if !ctx.quiet {
        report::print_diagnostics(&outcome.diagnostics);
    }

    let summary = ApplySummary {
        source: args.file,
        sheet: session.sheet(),
        original_rows: dataset.row_count(),
        filters: session.filters(),
        outcome: &outcome,
    };
    let preview_rows = args.limit.unwrap_or(ctx.config.display.preview_rows);

    match ctx.format {
        OutputFormat::Text => print!("{}", summary.to_text(preview_rows, args.show_filters)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&summary.to_json(preview_rows))?
        ),
    }

    if let Some(path) = ctx.output {
        let exported = match ctx.format {
            OutputFormat::Text => crate::dataset::write_csv_string(&outcome.dataset)?,
            OutputFormat::Json => {
                serde_json::to_string_pretty(&report::dataset_to_json(&outcome.dataset))?
            }
        };
        write_output_file(path, &exported)?;
        ctx.note(&format!(
            "Wrote {} rows to {}",
            outcome.row_count(),
            path.display()
        ));
    }
    Ok(())
}

fn cmd_impact(
    ctx: &Ctx,
    file: &Path,
    sheet: Option<&str>,
    names: &[String],
) -> anyhow::Result<()> {
    let session = open_session(ctx, file, sheet)?;
    let Some(dataset) = session.dataset() else {
        bail!("No data loaded from '{}'", file.display());
    };

    let sets = ctx.store().load_all();
    let impact = analyze_impact(dataset, &sets, names);

    match ctx.format {
        OutputFormat::Text => ctx.emit(&report::format_impact_text(&impact)),
        OutputFormat::Json => ctx.emit_json(&serde_json::to_value(&impact)?),
    }
}

fn cmd_set(ctx: &Ctx, action: &SetCommand) -> anyhow::Result<()> {
    let store = ctx.store();

    match action {
        SetCommand::List => {
            let sets = store.load_all();
            match ctx.format {
                OutputFormat::Json => {
                    let counts: serde_json::Map<String, serde_json::Value> = sets
                        .iter()
                        .map(|(name, filters)| (name.clone(), filters.len().into()))
                        .collect();
                    ctx.emit_json(&serde_json::Value::Object(counts))
                }
                OutputFormat::Text if sets.is_empty() => ctx.emit("No saved filter sets\n"),
                OutputFormat::Text => {
                    let mut out = String::new();
                    for (name, filters) in &sets {
                        out.push_str(&format!("{name} ({} filters)\n", filters.len()));
                    }
                    ctx.emit(&out)
                }
            }
        }
        SetCommand::Show { name } => {
            let filters = store
                .get(name)
                .ok_or_else(|| StoreError::NotFound(name.clone()))?;
            match ctx.format {
                OutputFormat::Text => ctx.emit(&report::format_filter_list(&filters)),
                OutputFormat::Json => ctx.emit_json(&serde_json::to_value(&filters)?),
            }
        }
        SetCommand::Save {
            name,
            filters,
            where_terms,
        } => {
            require_login(ctx.config, "save filter sets")?;
            let filters = collect_filters(filters.as_deref(), where_terms)?;
            store
                .save(name, &filters)
                .with_context(|| format!("Failed to save filter set '{}'", name.trim()))?;
            ctx.note(&format!(
                "Saved filter set '{}' ({} filters)",
                name.trim(),
                filters.len()
            ));
            Ok(())
        }
        SetCommand::Delete { name } => {
            require_login(ctx.config, "delete filter sets")?;
            store
                .delete(name)
                .with_context(|| format!("Failed to delete filter set '{name}'"))?;
            ctx.note(&format!("Deleted filter set '{name}'"));
            Ok(())
        }
    }
}

fn cmd_user(ctx: &Ctx, action: &UserCommand) -> anyhow::Result<()> {
    let config = ctx.config;

    match action {
        UserCommand::Register {
            username,
            password,
            confirm,
        } => {
            if confirm.as_ref().is_some_and(|c| c != password) {
                return Err(AuthError::PasswordMismatch.into());
            }
            UserStore::new(&config.storage.users).register(username, password)?;
            ctx.note(&format!("User '{}' registered", username.trim()));
            Ok(())
        }
        UserCommand::Login { username, password } => {
            auth::login(config, username, password)?;
            ctx.note(&format!(
                "Logged in as '{}' for {} days",
                username.trim(),
                config.session.expiry_days
            ));
            Ok(())
        }
        UserCommand::Logout => {
            auth::logout(config)?;
            ctx.note("Logged out");
            Ok(())
        }
        UserCommand::Whoami => {
            let user = auth::current_user(config);
            match ctx.format {
                OutputFormat::Json => ctx.emit_json(&serde_json::json!({ "user": user })),
                OutputFormat::Text => match user {
                    Some(user) => ctx.emit(&format!("{user}\n")),
                    None => ctx.emit("Not logged in\n"),
                },
            }
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let cli = cli_parse();
    init_logging(cli.verbose, cli.quiet);
    if let Some(force) = cli.color.forced() {
        colored::control::set_override(force);
    }

    let config =
        config::load_config(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(path) = &cli.config {
        log::info!("using config file {}", path.display());
    }

    let ctx = Ctx {
        config: &config,
        format: cli.format,
        output: cli.output.as_deref(),
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Sheets { file } => cmd_sheets(&ctx, file),
        Commands::Info { file, sheet } => cmd_info(&ctx, file, sheet.as_deref()),
        Commands::Apply {
            file,
            sheet,
            set,
            filters,
            where_terms,
            limit,
            show_filters,
        } => cmd_apply(
            &ctx,
            ApplyArgs {
                file,
                sheet: sheet.as_deref(),
                set: set.as_deref(),
                filters: filters.as_deref(),
                where_terms,
                limit: *limit,
                show_filters: *show_filters,
            },
        ),
        Commands::Impact { file, sheet, names } => {
            cmd_impact(&ctx, file, sheet.as_deref(), names)
        }
        Commands::Set { action } => cmd_set(&ctx, action),
        Commands::User { action } => cmd_user(&ctx, action),
    }
}

