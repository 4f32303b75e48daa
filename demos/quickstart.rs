use std::path;

use env_logger;
use log;

use ext_line_sort::{check, ExternalSorterBuilder};

fn main() {
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    let input = path::Path::new("input.txt");

    let sorter = ExternalSorterBuilder::new()
        .with_memory_budget(50 * 1024 * 1024)
        .with_max_line_len(1024)
        .with_output(path::Path::new("output.txt"))
        .build()
        .unwrap();

    let sorted = sorter.sort(input).unwrap();

    println!("{}", check(input, &sorted).unwrap());
}
