//! pdf-outline CLI - hierarchical block outlines from PDF documents

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdf_outline::pipeline::classify::{classify, MIN_DPI};
use pdf_outline::{
    to_json, to_tree_text, ExtractOptions, Extraction, JsonFormat, LopdfBackend, OcrOptions,
    Outliner, PageSelection, PdfBackend, SegmentOptions,
};

#[derive(Parser)]
#[command(name = "pdf-outline")]
#[command(version)]
#[command(about = "Extract a hierarchical block outline from PDF documents", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    ocr: OcrArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct OcrArgs {
    /// Tesseract executable
    #[arg(long, env = "PDF_OUTLINE_TESSERACT", global = true, value_name = "PATH")]
    tesseract: Option<PathBuf>,

    /// OCR language pack(s), e.g. "eng" or "eng+deu"
    #[arg(long, env = "PDF_OUTLINE_OCR_LANG", global = true, value_name = "LANG")]
    ocr_lang: Option<String>,

    /// Per-page OCR time budget in seconds
    #[arg(long, env = "PDF_OUTLINE_OCR_TIMEOUT", global = true, value_name = "SECS")]
    ocr_timeout: Option<u64>,

    /// Tesseract page segmentation mode
    #[arg(long, global = true, value_name = "MODE")]
    ocr_psm: Option<u8>,

    /// Tesseract engine mode
    #[arg(long, global = true, value_name = "MODE")]
    ocr_oem: Option<u8>,
}

impl OcrArgs {
    fn to_options(&self) -> OcrOptions {
        let mut options = OcrOptions::new();
        if let Some(ref binary) = self.tesseract {
            options = options.with_binary(binary);
        }
        if let Some(ref lang) = self.ocr_lang {
            options = options.with_language(lang);
        }
        if let Some(secs) = self.ocr_timeout {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        if let Some(psm) = self.ocr_psm {
            options = options.with_psm(psm);
        }
        if let Some(oem) = self.ocr_oem {
            options = options.with_oem(oem);
        }
        options
    }
}

#[derive(Args)]
struct RunArgs {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Process pages one at a time
    #[arg(long)]
    sequential: bool,

    /// Write a region overlay PNG per page into this directory
    #[arg(long, value_name = "DIR")]
    debug_dir: Option<PathBuf>,

    /// Gray level (0-255 of ink) a pixel must exceed to count as content
    #[arg(long, default_value_t = 0)]
    threshold: u8,

    /// Smallest region side kept, in points
    #[arg(long, default_value_t = 2.0, value_name = "POINTS")]
    min_region_side: f32,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the outline as JSON records
    Outline {
        #[command(flatten)]
        run: RunArgs,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Include classification and page diagnostics
        #[arg(long)]
        report: bool,
    },

    /// Show the outline as an indented tree
    Tree {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Classify pages (protected, scanned, scan resolution)
    Classify {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ocr = cli.ocr.to_options();
    let result = match cli.command {
        Some(Commands::Outline {
            run,
            output,
            compact,
            report,
        }) => cmd_outline(&run, ocr, output.as_deref(), compact, report),
        Some(Commands::Tree { run }) => cmd_tree(&run, ocr),
        Some(Commands::Classify { input, json }) => cmd_classify(&input, json),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: print the outline if input is provided
            if let Some(input) = cli.input {
                let run = RunArgs {
                    input,
                    pages: None,
                    sequential: false,
                    debug_dir: None,
                    threshold: 0,
                    min_region_side: 2.0,
                };
                cmd_outline(&run, ocr, None, false, false)
            } else {
                println!("{}", "Usage: pdf-outline <FILE>".yellow());
                println!("       pdf-outline --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn document_name(input: &Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string())
}

fn extract_options(run: &RunArgs, ocr: OcrOptions) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
    let page_selection = if let Some(ref p) = run.pages {
        PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?
    } else {
        PageSelection::All
    };

    let mut options = ExtractOptions::new()
        .with_parallel(!run.sequential)
        .with_pages(page_selection)
        .with_ocr(ocr)
        .with_segmentation(
            SegmentOptions::new()
                .with_threshold(run.threshold)
                .with_min_region_side(run.min_region_side),
        );
    if let Some(ref dir) = run.debug_dir {
        fs::create_dir_all(dir)?;
        options = options.with_debug_dir(dir);
    }
    Ok(options)
}

fn run_outliner(run: &RunArgs, ocr: OcrOptions) -> Result<Extraction, Box<dyn std::error::Error>> {
    let options = extract_options(run, ocr)?;
    let name = document_name(&run.input);
    log::debug!("{}: {:?}", name, options);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Outlining {}...", name));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = Outliner::with_options(options).run(&run.input, &name);
    pb.finish_and_clear();

    let extraction = result?;
    for diagnostic in &extraction.diagnostics {
        eprintln!("{} {}", "warning:".yellow().bold(), diagnostic);
    }
    Ok(extraction)
}

fn cmd_outline(
    run: &RunArgs,
    ocr: OcrOptions,
    output: Option<&Path>,
    compact: bool,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let extraction = run_outliner(run, ocr)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = if report {
        to_json(&extraction, format)?
    } else {
        to_json(&extraction.entries, format)?
    };

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_tree(run: &RunArgs, ocr: OcrOptions) -> Result<(), Box<dyn std::error::Error>> {
    let extraction = run_outliner(run, ocr)?;
    print!("{}", to_tree_text(&extraction.entries));
    Ok(())
}

fn cmd_classify(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let backend = LopdfBackend::open(input)?;
    let name = document_name(input);
    let classification = classify(&backend, &name);

    if json {
        println!("{}", to_json(&classification, JsonFormat::Pretty)?);
        return Ok(());
    }

    println!("{}", "Page Classification".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), backend.version());
    println!("{}: {}", "Pages".bold(), backend.page_count());
    println!(
        "{}: {}",
        "Scan mode".bold(),
        if classification.scanned { "Scanned" } else { "Digital" }
    );
    println!(
        "{}: {}",
        "Resolution".bold(),
        if classification.dpi.passed {
            "OK".green()
        } else {
            format!("below {} dpi on pages {:?}", MIN_DPI, classification.dpi.faulty_pages).red()
        }
    );

    println!();
    for (page_no, class) in &classification.pages {
        let kind = match (class.drm, class.scanned) {
            (true, _) => "protected".red(),
            (false, true) => "scanned".yellow(),
            (false, false) => "digital".normal(),
        };
        let dpi = if class.dpi_ok { "" } else { " (low resolution)" };
        println!("  {} {:>4}  {}{}", "├─".dimmed(), page_no, kind, dpi);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdf-outline".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Hierarchical outline extraction for PDF documents");
    println!();
    println!("License: MIT");
}
