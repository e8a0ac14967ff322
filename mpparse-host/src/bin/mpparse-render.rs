use mpparse_host::{HostConfig, Language, NodeCache, PageScope};
use mpparse_markup::MpParseError;
use std::env;
use std::fs;
use std::process;
use std::sync::Arc;

struct Args {
    file: String,
    config: Option<String>,
    language: Option<String>,
}

fn parse_args() -> Option<Args> {
    let mut file = None;
    let mut config = None;
    let mut language = None;

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--markdown" | "--md" => language = Some("markdown".to_string()),
            "--language" => language = Some(iter.next()?),
            "--config" => config = Some(iter.next()?),
            _ if file.is_none() => file = Some(arg),
            _ => return None,
        }
    }

    Some(Args {
        file: file?,
        config,
        language,
    })
}

fn main() {
    let Some(args) = parse_args() else {
        eprintln!("Usage: mpparse-render [--markdown | --language html|md] [--config cfg.yaml] <file>");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  mpparse-render article.html");
        eprintln!("  mpparse-render --markdown --config host.yaml README.md");
        process::exit(1);
    };

    match run(&args) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("✗ {}: {}", args.file, e);
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<String, MpParseError> {
    let config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    let language = match &args.language {
        Some(flag) => flag.parse::<Language>()?,
        None => config.default_language,
    };
    let source = fs::read_to_string(&args.file)?;

    let page = PageScope::new("cli", Arc::new(NodeCache::new()), Arc::new(config));
    let mut instance = page.mount();
    instance.set_source(&source, language);

    let view = instance
        .render()
        .ok_or_else(|| MpParseError::ConfigError("instance was evicted before render".to_string()))?;
    let json = serde_json::to_string_pretty(&view)
        .map_err(|e| MpParseError::ConfigError(e.to_string()))?;
    page.teardown();
    Ok(json)
}
