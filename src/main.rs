use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use ext_line_sort::{check, ExternalSorterBuilder};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let output: Option<&str> = arg_parser.value_of("output");
    let memory = arg_parser.value_of("memory").expect("value is required");
    let max_line_len: usize = arg_parser.value_of_t_or_exit("max_line_len");
    let max_fan_in: Option<usize> = arg_parser
        .is_present("max_fan_in")
        .then(|| arg_parser.value_of_t_or_exit("max_fan_in"));
    let verify = arg_parser.is_present("check");

    let input = path::Path::new(arg_parser.value_of("input").expect("value is required"));

    let mut sorter_builder = ExternalSorterBuilder::new()
        .with_memory_budget(memory.parse::<ByteSize>().expect("value is pre-validated").as_u64() as usize)
        .with_max_line_len(max_line_len);

    if let Some(max_fan_in) = max_fan_in {
        sorter_builder = sorter_builder.with_max_fan_in(max_fan_in);
    }

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    if let Some(output) = output {
        sorter_builder = sorter_builder.with_output(path::Path::new(output));
    }

    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    let sorted = match sorter.sort(input) {
        Ok(sorted) => sorted,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    };
    log::info!("sorted data saved to {}", sorted.display());

    if verify {
        match check(input, &sorted) {
            Ok(report) if report.is_ok() => log::info!("{}", report),
            Ok(report) => {
                log::error!("sorted data check failed: {}", report);
                process::exit(2);
            }
            Err(err) => {
                log::error!("sorted data check error: {}", err);
                process::exit(1);
            }
        }
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("ext-line-sort")
        .about("external line sorter")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file (default: sorted_<input> next to the input)")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("memory")
                .short('m')
                .long("memory")
                .help("memory budget for line buffers")
                .required(true)
                .takes_value(true)
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Memory budget format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("max_line_len")
                .short('x')
                .long("max-line-len")
                .help("maximum line length in bytes, the line delimiter included")
                .takes_value(true)
                .default_value("4096"),
        )
        .arg(
            clap::Arg::new("max_fan_in")
                .short('k')
                .long("max-fan-in")
                .help("maximum number of runs merged at once (default: 8)")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("check")
                .short('c')
                .long("check")
                .help("verify the result against an in-memory sort of the input"),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
