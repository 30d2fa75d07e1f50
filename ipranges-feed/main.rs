mod amazon;
mod arg;

use clap::Parser;

/// Error type for a feed run
#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("Failed to fetch feed: {0}")]
    Amazon(#[from] amazon::Error),
    #[error("Failed to write group: {0}")]
    Xml(#[from] ipranges::xml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn setup_logger(level: log::LevelFilter) {
    let config = simplelog::ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();
    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("Failed to initialize logger");
}

fn run(args: &arg::IpRangesFeed) -> Result<(), Error> {
    let group = amazon::fetch(&args.url)?.to_group();
    let xml = ipranges::xml::to_string(&group)?;
    if args.dry_run {
        print!("{xml}");
    } else {
        std::fs::create_dir_all(&args.output_dir)?;
        let path = args.output_dir.join(format!("{}.xml", group.name));
        std::fs::write(&path, xml)?;
        log::info!(
            "Wrote {} regions of {} to {}",
            group.regions.len(),
            group.name,
            path.display()
        );
    }
    if !args.addresses.is_empty() {
        let index = group.index();
        log::debug!("Indexed {} ranges", index.len());
        for addr in &args.addresses {
            match index.get(*addr) {
                Some(region) => println!("{addr} -> {region}"),
                None => println!("{addr} -> not found"),
            }
        }
    }
    Ok(())
}

fn main() {
    let args = arg::IpRangesFeed::parse();
    setup_logger(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    if let Err(e) = run(&args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
