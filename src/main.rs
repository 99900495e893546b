//! CLI vehpos
//!
//! Поиск ближайших транспортных средств по бинарному дампу положений,
//! статистика k-d индекса и генерация синтетических наборов.

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use vehpos::{
    dump::{generate_records, write_dump},
    locator::{check_queries, compare, Disagreement},
    logging::{init_logging, LoggingHandle},
    BuildStrategy, DecodeError, DistanceUnit, EncodeError, NearestMatch, QueryCoordinate,
    Settings, TreeStats, DEFAULT_QUERIES,
};
use vehpos_error::{ErrorExt, LogLevel, StackError, StatusCode};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VEHPOS_GIT_COMMIT"),
    " ",
    env!("VEHPOS_BUILD_DATE"),
    ")"
);

/// Основная структура CLI аргументов
#[derive(Parser)]
#[command(name = "vehpos")]
#[command(version = VERSION)]
#[command(about = "Nearest-vehicle lookup over binary vehicle position dumps", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Подробнее логирование (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Только ошибки
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// TOML-файл настроек
    #[arg(long, global = true, env = "VEHPOS_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Способ поиска.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Method {
    /// k-d индекс (евклидова метрика в градусах)
    Kdtree,
    /// Полный перебор по расстоянию Гаверсина
    BruteForce,
    /// Оба способа, вывести расхождения
    Compare,
}

/// Формат вывода CLI
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Человекочитаемый формат
    Pretty,
    /// JSON формат
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Найти ближайшее ТС для каждой координаты запроса
    Nearest {
        /// Файл дампа (по умолчанию из настроек)
        #[arg(long)]
        data: Option<PathBuf>,
        /// Координата запроса SEQ:LAT,LON; можно повторять
        #[arg(long = "query", value_parser = parse_query)]
        queries: Vec<QueryCoordinate>,
        #[arg(long, value_enum, default_value = "kdtree")]
        method: Method,
        /// sequential | balanced
        #[arg(long)]
        build: Option<BuildStrategy>,
        /// km | m | mi | nmi
        #[arg(long)]
        unit: Option<DistanceUnit>,
        #[arg(long, value_enum, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Статистика дампа и индекса
    Stats {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        build: Option<BuildStrategy>,
        #[arg(long, value_enum, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Записать синтетический дамп
    Generate {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 10_000)]
        count: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

/// Строка результата для JSON-вывода.
#[derive(Serialize)]
struct MatchRow<'a> {
    sequence_number: u32,
    query_latitude: f64,
    query_longitude: f64,
    vehicle_id: i32,
    label: &'a str,
    latitude: f32,
    longitude: f32,
    recorded_at: u64,
    distance: f64,
    unit: DistanceUnit,
}

#[derive(Serialize)]
struct StatsReport<'a> {
    data: &'a Path,
    strategy: BuildStrategy,
    records: usize,
    #[serde(flatten)]
    tree: TreeStats,
    decode_ms: f64,
    build_ms: f64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: invalid configuration: {e}");
            return exit_code(StatusCode::InvalidConfig);
        }
    };
    apply_verbosity(&mut settings, cli.verbose, cli.quiet);

    let logging = match init_logging(settings.logging.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {e}");
            return exit_code(StatusCode::InvalidConfig);
        }
    };
    debug!(?settings, "Settings loaded");

    let result = handle_command(&cli.command, &settings);
    finish(logging, result)
}

fn finish(
    logging: LoggingHandle,
    result: Result<()>,
) -> ExitCode {
    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let status = status_of(&e);
            report_error(&e, status);
            exit_code(status)
        }
    };
    logging.shutdown();
    code
}

/// Пишет ошибку в лог с уровнем по её статус-коду и печатает её в stderr.
fn report_error(
    err: &anyhow::Error,
    status: StatusCode,
) {
    let message = format!("{err:#}");
    let code = status.code();
    match status.log_level() {
        LogLevel::Error => error!(code, error = %message, "Command failed"),
        LogLevel::Warn => warn!(code, error = %message, "Command failed"),
        LogLevel::Info => info!(code, error = %message, "Command failed"),
        LogLevel::Debug => debug!(code, error = %message, "Command failed"),
    }
    eprintln!("Error: {message}");
}

/// Флаги командной строки имеют приоритет над настройками и окружением.
fn apply_verbosity(
    settings: &mut Settings,
    verbose: u8,
    quiet: bool,
) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => return,
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    settings.logging.level = level.to_string();
}

fn handle_command(
    command: &Commands,
    settings: &Settings,
) -> Result<()> {
    match command {
        Commands::Nearest {
            data,
            queries,
            method,
            build,
            unit,
            output,
        } => {
            let data = data.as_deref().unwrap_or(settings.data_path.as_path());
            let queries: &[QueryCoordinate] = if queries.is_empty() {
                &DEFAULT_QUERIES
            } else {
                queries
            };
            let strategy = build.unwrap_or(settings.build_strategy);
            let unit = unit.unwrap_or(settings.unit);
            run_nearest(data, queries, *method, strategy, unit, *output)
        }
        Commands::Stats {
            data,
            build,
            output,
        } => {
            let data = data.as_deref().unwrap_or(settings.data_path.as_path());
            run_stats(data, build.unwrap_or(settings.build_strategy), *output)
        }
        Commands::Generate { out, count, seed } => run_generate(out, *count, *seed),
    }
}

fn run_nearest(
    data: &Path,
    queries: &[QueryCoordinate],
    method: Method,
    strategy: BuildStrategy,
    unit: DistanceUnit,
    output: OutputFormat,
) -> Result<()> {
    check_queries(queries)?;
    match method {
        Method::Kdtree => {
            let answers = vehpos::locate(data, queries, strategy)?;
            print_matches(queries, &answers, unit, output)
        }
        Method::BruteForce => {
            let records = read_dump(data)?;
            let answers = vehpos::locate_brute_force(&records, queries);
            print_matches(queries, &answers, unit, output)
        }
        Method::Compare => {
            let records = read_dump(data)?;
            let index = strategy.build(records.clone());
            let diffs = compare(&records, &index, queries);
            print_disagreements(queries.len(), &diffs, unit, output)
        }
    }
}

fn run_stats(
    data: &Path,
    strategy: BuildStrategy,
    output: OutputFormat,
) -> Result<()> {
    let started = Instant::now();
    let records = read_dump(data)?;
    let decode_ms = started.elapsed().as_secs_f64() * 1000.0;

    let started = Instant::now();
    let index = strategy.build(records);
    let build_ms = started.elapsed().as_secs_f64() * 1000.0;

    let report = StatsReport {
        data,
        strategy,
        records: index.len(),
        tree: index.stats(),
        decode_ms,
        build_ms,
    };

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Pretty => {
            println!("File:       {}", report.data.display());
            println!("Records:    {}", report.records);
            println!("Strategy:   {}", report.strategy);
            println!("Depth:      {}", report.tree.depth);
            println!("Nodes:      {}", report.tree.node_count);
            println!("Leaves:     {}", report.tree.leaf_count);
            println!("Decode:     {:.3} ms", report.decode_ms);
            println!("Build:      {:.3} ms", report.build_ms);
        }
    }
    Ok(())
}

fn run_generate(
    out: &Path,
    count: usize,
    seed: u64,
) -> Result<()> {
    let records = generate_records(count, seed);
    let bytes = write_dump(out, &records)
        .with_context(|| format!("Failed to write dump to {}", out.display()))?;
    info!(path = %out.display(), count, seed, bytes, "Synthetic dump generated");
    println!("Wrote {count} records ({bytes} bytes) to {}", out.display());
    Ok(())
}

fn read_dump(path: &Path) -> Result<Vec<vehpos::PositionRecord>> {
    vehpos::decode_records(path)
        .with_context(|| format!("Failed to read vehicle positions from {}", path.display()))
}

fn print_matches(
    queries: &[QueryCoordinate],
    answers: &[Option<NearestMatch>],
    unit: DistanceUnit,
    output: OutputFormat,
) -> Result<()> {
    match output {
        OutputFormat::Json => {
            let rows: Vec<MatchRow<'_>> = answers.iter().flatten().map(|m| match_row(m, unit)).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Pretty => {
            for (query, answer) in queries.iter().zip(answers) {
                println!("{}", match_line(query, answer.as_ref(), unit));
            }
        }
    }
    Ok(())
}

fn match_line(
    query: &QueryCoordinate,
    answer: Option<&NearestMatch>,
    unit: DistanceUnit,
) -> String {
    match answer {
        Some(m) => format!(
            "Nearest vehicle to position #{}: vehicle id {}, distance {:.3} {}",
            query.sequence_number,
            m.record.id,
            unit.convert_from_km(m.distance_km),
            unit
        ),
        None => format!(
            "Nearest vehicle to position #{}: no vehicles in dataset",
            query.sequence_number
        ),
    }
}

fn print_disagreements(
    total: usize,
    diffs: &[Disagreement],
    unit: DistanceUnit,
    output: OutputFormat,
) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(diffs)?),
        OutputFormat::Pretty => {
            for d in diffs {
                println!(
                    "Position #{}: index chose vehicle {} ({:.3} {unit}), great-circle scan chose vehicle {} ({:.3} {unit})",
                    d.query.sequence_number,
                    d.indexed.record.id,
                    unit.convert_from_km(d.indexed.distance_km),
                    d.brute_force.record.id,
                    unit.convert_from_km(d.brute_force.distance_km),
                );
            }
            println!("{} of {total} queries disagree", diffs.len());
        }
    }
    Ok(())
}

fn match_row(
    m: &NearestMatch,
    unit: DistanceUnit,
) -> MatchRow<'_> {
    MatchRow {
        sequence_number: m.query.sequence_number,
        query_latitude: m.query.latitude,
        query_longitude: m.query.longitude,
        vehicle_id: m.record.id,
        label: &m.record.label,
        latitude: m.record.latitude,
        longitude: m.record.longitude,
        recorded_at: m.record.recorded_at,
        distance: unit.convert_from_km(m.distance_km),
        unit,
    }
}

/// Разбирает координату запроса вида `SEQ:LAT,LON`.
fn parse_query(s: &str) -> std::result::Result<QueryCoordinate, String> {
    let (seq, coords) = s
        .split_once(':')
        .ok_or_else(|| format!("expected SEQ:LAT,LON, got '{s}'"))?;
    let (lat, lon) = coords
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON after ':', got '{coords}'"))?;

    let seq = seq
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid sequence number '{seq}': {e}"))?;
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let lon = lon
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid longitude '{lon}': {e}"))?;

    Ok(QueryCoordinate::new(seq, lat, lon))
}

/// Статус-код ошибки для выбора кода завершения.
fn status_of(err: &anyhow::Error) -> StatusCode {
    if let Some(e) = err.downcast_ref::<StackError>() {
        e.status_code()
    } else if let Some(e) = err.downcast_ref::<DecodeError>() {
        e.status_code()
    } else if let Some(e) = err.downcast_ref::<EncodeError>() {
        e.status_code()
    } else if err.downcast_ref::<std::io::Error>().is_some() {
        StatusCode::Io
    } else {
        StatusCode::Unknown
    }
}

fn exit_code(status: StatusCode) -> ExitCode {
    ExitCode::from(u8::try_from(status.exit_code()).unwrap_or(1))
}
