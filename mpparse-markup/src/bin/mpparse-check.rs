use mpparse_markup::{MpParseError, ParseOptions, Parser, Recovery};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: mpparse-check [--options opts.yaml] <file.html>...");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  mpparse-check article.html");
        eprintln!("  mpparse-check --options emoji.yaml *.html");
        process::exit(1);
    }

    let mut files: Vec<String> = args[1..].to_vec();
    let options = if files.first().map(String::as_str) == Some("--options") {
        if files.len() < 2 {
            eprintln!("✗ --options needs a path");
            process::exit(1);
        }
        let path = files.remove(1);
        files.remove(0);
        match ParseOptions::load(&path) {
            Ok(opts) => opts,
            Err(e) => {
                eprintln!("✗ {}: {}", path, e);
                process::exit(1);
            }
        }
    } else {
        ParseOptions::default()
    };

    let parser = Parser::new(options);
    let mut exit_code = 0;

    for file_path in files {
        match check_file(&parser, &file_path) {
            Ok(()) => {}
            Err(e) => {
                eprintln!("✗ {}: {}", file_path, e);
                exit_code = 1;
            }
        }
    }

    process::exit(exit_code);
}

fn check_file(parser: &Parser, path: &str) -> Result<(), MpParseError> {
    let content = fs::read_to_string(path)?;
    let doc = parser.parse(&content, path);

    println!(
        "✓ {}: {} nodes, {} images, {} recoveries",
        path,
        doc.node_count(),
        doc.image_urls.len(),
        doc.recoveries.len()
    );
    for recovery in &doc.recoveries {
        print_recovery(recovery);
    }
    Ok(())
}

fn print_recovery(recovery: &Recovery) {
    match recovery {
        Recovery::StrayEndTag { tag, offset } => {
            println!("    stray </{}> at byte {} ignored", tag, offset);
        }
        Recovery::UnclosedElement { tag } => {
            println!("    <{}> closed implicitly", tag);
        }
        Recovery::LiteralAngleBracket { offset } => {
            println!("    literal '<' at byte {}", offset);
        }
        Recovery::UnterminatedTag { offset } => {
            println!("    unterminated tag at byte {} kept as text", offset);
        }
    }
}
