//! OxiLHA CLI - list, extract and test LHA/LZH archives.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use oxilha_archive::{DirPolicy, FileHeaderRef, LhaReader};
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

#[derive(Parser)]
#[command(name = "oxilha")]
#[command(version, about = "Pure Rust LHA/LZH archive extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of an archive
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,
    },

    /// Extract files from an archive
    #[command(alias = "x")]
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// When directory metadata is applied
        #[arg(long, value_enum, default_value_t = DirPolicyArg::EndOfDir)]
        dir_policy: DirPolicyArg,

        /// Show per-file progress bars
        #[arg(short = 'P', long)]
        progress: bool,

        /// Show each file as it is extracted
        #[arg(short, long)]
        verbose: bool,
    },

    /// Test archive integrity
    #[command(alias = "t")]
    Test {
        /// Archive file to test
        archive: PathBuf,

        /// Show each file as it is checked
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirPolicyArg {
    /// Set directory metadata at creation time
    Plain,
    /// Set directory metadata after each directory's contents
    EndOfDir,
    /// Set all directory metadata at the end of extraction
    EndOfFile,
}

impl From<DirPolicyArg> for DirPolicy {
    fn from(arg: DirPolicyArg) -> Self {
        match arg {
            DirPolicyArg::Plain => DirPolicy::Plain,
            DirPolicyArg::EndOfDir => DirPolicy::EndOfDir,
            DirPolicyArg::EndOfFile => DirPolicy::EndOfFile,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List { archive } => cmd_list(&archive),
        Commands::Extract {
            archive,
            output,
            dir_policy,
            progress,
            verbose,
        } => cmd_extract(&archive, &output, dir_policy.into(), progress, verbose),
        Commands::Test { archive, verbose } => cmd_test(&archive, verbose),
    };

    if let Err(err) = result {
        eprintln!("oxilha: {}", err);
        std::process::exit(1);
    }
}

fn open_reader(archive: &Path) -> Result<LhaReader<BufReader<File>>, Box<dyn std::error::Error>> {
    let file = File::open(archive)?;
    Ok(LhaReader::new(BufReader::new(file)))
}

fn cmd_list(archive: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = open_reader(archive)?;

    println!("{:>10} {:>10} {:>7} {}", "Size", "Packed", "Method", "Name");
    let mut total_size = 0u64;
    let mut count = 0usize;

    while let Some(header) = reader.next_file()? {
        println!(
            "{:>10} {:>10} {:>7} {}",
            header.length,
            header.compressed_length,
            header.compress_method,
            header.full_path()
        );
        total_size += header.length;
        count += 1;
    }

    println!("{:>10} bytes in {} entries", total_size, count);
    Ok(())
}

fn cmd_extract(
    archive: &Path,
    output: &Path,
    policy: DirPolicy,
    progress: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = open_reader(archive)?;
    reader.set_dir_policy(policy);

    let mut failures = 0usize;

    while let Some(header) = reader.next_file()? {
        let Some(relative) = safe_relative_path(&header) else {
            eprintln!("skipping unsafe path: {}", header.full_path());
            continue;
        };
        let target = output.join(&relative);

        // Archives do not always carry entries for intermediate
        // directories.
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if verbose {
            println!("  {}", relative.display());
        }

        let target_str = target.to_string_lossy().into_owned();
        let callback = progress.then(|| progress_callback(relative.display().to_string()));

        if let Err(err) = reader.extract(Some(&target_str), callback) {
            eprintln!("  FAILED: {} - {}", relative.display(), err);
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(format!("{} entries failed to extract", failures).into());
    }
    Ok(())
}

fn cmd_test(archive: &Path, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = open_reader(archive)?;

    println!("Testing {}", archive.display());

    let mut total = 0usize;
    let mut ok_count = 0usize;
    let mut errors: Vec<(String, String)> = Vec::new();

    while let Some(header) = reader.next_file()? {
        if header.is_dir() {
            continue;
        }
        total += 1;

        match reader.check(None) {
            Ok(()) => {
                ok_count += 1;
                if verbose {
                    println!("  OK: {}", header.full_path());
                }
            }
            Err(err) => {
                errors.push((header.full_path(), err.to_string()));
                if verbose {
                    println!("  FAILED: {} - {}", header.full_path(), err);
                }
            }
        }
    }

    println!("{}/{} entries OK", ok_count, total);
    if !errors.is_empty() {
        for (name, err) in &errors {
            eprintln!("  {}: {}", name, err);
        }
        return Err(format!("{} entries failed", errors.len()).into());
    }
    Ok(())
}

/// A per-file progress bar driven by the decoder's block callback.
fn progress_callback(name: String) -> Box<dyn FnMut(u64, u64)> {
    let bar = ProgressBar::hidden();
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is valid"),
    );
    bar.set_message(name);

    Box::new(move |done, total| {
        if bar.is_hidden() && total > 0 {
            bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        }
        bar.set_length(total);
        bar.set_position(done);
        if done == total {
            bar.finish_and_clear();
        }
    })
}

/// Reject absolute paths and parent-directory components.
fn safe_relative_path(header: &FileHeaderRef) -> Option<PathBuf> {
    let full = header.full_path();
    if full.is_empty() {
        return None;
    }

    let path = Path::new(&full);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}
