//! FILENAME: app/src/cli.rs
//! `pivot` command line: argument parsing and command dispatch.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{error::ErrorKind, ArgAction, Args, Parser, Subcommand, ValueEnum};
use ingest::LoadOptions;
use pivot_engine::{calculate_pivot, AggregationType, PivotDefinition, SourceData, ValueSpec};

use crate::{logging, render, AppError};

/// Printed instead of a table when the selection cannot produce one.
pub const NOT_RENDERABLE_MESSAGE: &str =
    "Nothing to show: select at least one row or column field and at least one value field.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "pivot")]
#[command(about = "Cross-tabulate CSV, TSV and XLSX files")]
#[command(version)]
struct CliArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Mirror log lines to this file.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the fields of a source file with their classification.
    Fields(FieldsArgs),

    /// Compute and print a pivot table.
    Table(TableArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Worksheet to read from a workbook (defaults to the first).
    #[arg(long = "sheet", value_name = "NAME")]
    sheet: Option<String>,

    /// Field delimiter for delimited text (a single character, or `tab`).
    #[arg(long = "delimiter", value_name = "CHAR", value_parser = parse_delimiter)]
    delimiter: Option<u8>,
}

#[derive(Args, Debug)]
struct FieldsArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(short = 'f', long = "format", default_value = "text", value_enum, ignore_case = true)]
    format: FormatArg,
}

#[derive(Args, Debug)]
struct TableArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Row fields, outer to inner.
    #[arg(short = 'r', long = "rows", value_name = "FIELD,..", value_delimiter = ',')]
    rows: Vec<String>,

    /// Column fields, outer to inner.
    #[arg(short = 'c', long = "cols", value_name = "FIELD,..", value_delimiter = ',')]
    cols: Vec<String>,

    /// Value field with its aggregations, e.g. `Sales:sum,avg`. Repeatable.
    #[arg(long = "value", value_name = "FIELD[:AGG,..]")]
    values: Vec<String>,

    /// JSON pivot definition; --rows, --cols and --value override its lists.
    #[arg(long = "definition", value_name = "FILE")]
    definition: Option<PathBuf>,

    #[arg(short = 'f', long = "format", default_value = "text", value_enum, ignore_case = true)]
    format: FormatArg,
}

pub fn run() -> Result<(), AppError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let Some(args) = parse_cli_args(std::env::args_os(), &mut out)? else {
        return Ok(());
    };

    logging::init(
        logging::verbosity_level(args.verbose),
        args.log_file.as_deref(),
    )?;
    execute(args, &mut out)
}

/// Runs the command line against explicit arguments, writing to `out`.
/// The logger is left untouched.
pub fn run_with_args<I, T>(args: I, out: &mut dyn Write) -> Result<(), AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let Some(args) = parse_cli_args(args, out)? else {
        return Ok(());
    };
    execute(args, out)
}

fn parse_cli_args<I, T>(args: I, out: &mut dyn Write) -> Result<Option<CliArgs>, AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match CliArgs::try_parse_from(args) {
        Ok(args) => Ok(Some(args)),
        Err(error) => {
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) {
                write!(out, "{error}")?;
                return Ok(None);
            }
            Err(AppError::InvalidArgs(error.to_string()))
        }
    }
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!("expected a single ASCII character or `tab`, got '{raw}'")),
        },
    }
}

fn execute(args: CliArgs, out: &mut dyn Write) -> Result<(), AppError> {
    match args.command {
        Command::Fields(fields) => run_fields(&fields, out),
        Command::Table(table) => run_table(&table, out),
    }
}

fn load(source: &SourceArgs) -> Result<SourceData, AppError> {
    let options = LoadOptions {
        sheet: source.sheet.clone(),
        delimiter: source.delimiter,
    };
    let data = ingest::load_source(&source.path, &options)?;
    log::info!(
        "loaded {} records with {} fields from {}",
        data.record_count(),
        data.fields().len(),
        source.path.display()
    );
    Ok(data)
}

fn run_fields(args: &FieldsArgs, out: &mut dyn Write) -> Result<(), AppError> {
    let data = load(&args.source)?;
    let rendered = match args.format {
        FormatArg::Text => render::render_fields(&data),
        FormatArg::Json => render::render_fields_json(&data)?,
    };
    writeln!(out, "{rendered}")?;
    Ok(())
}

fn run_table(args: &TableArgs, out: &mut dyn Write) -> Result<(), AppError> {
    let definition = build_definition(args)?;
    let data = load(&args.source)?;

    if data.is_empty() {
        writeln!(out, "No records in {}.", args.source.path.display())?;
        return Ok(());
    }

    check_selection(&data, &definition);
    if !definition.is_renderable() {
        writeln!(out, "{NOT_RENDERABLE_MESSAGE}")?;
        return Ok(());
    }

    let view = calculate_pivot(&data, &definition);
    let rendered = match args.format {
        FormatArg::Text => render::render_text(&view),
        FormatArg::Json => render::render_json(&view)?,
    };
    writeln!(out, "{rendered}")?;
    Ok(())
}

/// Starts from the definition file (if any) and applies the flag overrides.
fn build_definition(args: &TableArgs) -> Result<PivotDefinition, AppError> {
    let mut definition: PivotDefinition = match &args.definition {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => PivotDefinition::default(),
    };

    if !args.rows.is_empty() {
        definition.row_fields = non_empty(&args.rows);
    }
    if !args.cols.is_empty() {
        definition.column_fields = non_empty(&args.cols);
    }
    if !args.values.is_empty() {
        definition.value_specs = args
            .values
            .iter()
            .map(|raw| raw.parse::<ValueSpec>())
            .collect::<Result<Vec<_>, _>>()?;
    }

    log::debug!("pivot definition: {:?}", definition);
    Ok(definition)
}

fn non_empty(fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Warns about selections the engine accepts but that are probably mistakes.
fn check_selection(data: &SourceData, definition: &PivotDefinition) {
    let grouping = definition
        .row_fields
        .iter()
        .chain(&definition.column_fields);
    for name in grouping {
        if data.field_index(name).is_none() {
            log::warn!("grouping field '{}' is not in the source; all records group as empty", name);
        }
    }

    for name in &definition.row_fields {
        if definition.column_fields.contains(name) {
            log::warn!("field '{}' is used for both rows and columns", name);
        }
    }

    for spec in &definition.value_specs {
        let only_counts = spec
            .aggregations
            .iter()
            .all(|agg| *agg == AggregationType::Count);
        match data.field_index(&spec.field) {
            None => log::warn!("value field '{}' is not in the source", spec.field),
            Some(index) if !only_counts && !data.is_numeric_field(index) => {
                log::warn!("value field '{}' has no numeric values", spec.field)
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_table_flags() {
        let args = CliArgs::parse_from([
            "pivot",
            "-vv",
            "table",
            "sales.csv",
            "--rows",
            "Region,Product",
            "--cols",
            "Quarter",
            "--value",
            "Sales:sum,avg",
            "--value",
            "Quantity",
            "--format",
            "JSON",
        ]);

        assert_eq!(args.verbose, 2);
        let Command::Table(table) = args.command else {
            panic!("expected table command");
        };
        assert_eq!(table.rows, vec!["Region", "Product"]);
        assert_eq!(table.cols, vec!["Quarter"]);
        assert_eq!(table.values, vec!["Sales:sum,avg", "Quantity"]);
        assert_eq!(table.format, FormatArg::Json);

        let definition = build_definition(&table).unwrap();
        assert_eq!(definition.value_specs.len(), 2);
        assert_eq!(
            definition.value_specs[0].aggregations,
            vec![AggregationType::Sum, AggregationType::Average]
        );
    }

    #[test]
    fn rejects_unknown_aggregation() {
        let args = CliArgs::parse_from(["pivot", "table", "a.csv", "--value", "Sales:median"]);
        let Command::Table(table) = args.command else {
            panic!("expected table command");
        };
        assert!(matches!(build_definition(&table), Err(AppError::Pivot(_))));
    }

    #[test]
    fn parses_delimiters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
    }

    #[test]
    fn help_is_not_an_error() {
        let mut out = Vec::new();
        run_with_args(["pivot", "--help"], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Usage"));
    }

    #[test]
    fn missing_subcommand_is_invalid_args() {
        let mut out = Vec::new();
        let result = run_with_args(["pivot"], &mut out);
        assert!(matches!(result, Err(AppError::InvalidArgs(_))));
    }
}
