//! Scene Export CLI
//!
//! Export a captured scene document to one of the supported formats.

use clap::{Parser, Subcommand};
use scene_export::{export_document, load_document, status_line, ExportFormat, OutputTarget};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "scene-export")]
#[command(author, version, about = "Export molecular viewer scenes to OBJ, X3D, IDTF and Tachyon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene document
    Write {
        /// Output format (obj, x3d, idtf, tachyon)
        #[arg(value_parser = parse_format)]
        format: ExportFormat,

        /// Output file path; `-` prints the result to stdout
        output: PathBuf,

        /// Input JSON file containing the view and draw commands
        #[arg(short, long)]
        scene: PathBuf,
    },

    /// List the supported formats
    Formats,
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse::<ExportFormat>().map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Write { format, output, scene } => {
            let result = load_document(&scene).and_then(|document| {
                let target = if output.as_os_str() == "-" {
                    OutputTarget::Buffer
                } else {
                    OutputTarget::file(&output)
                };
                export_document(format, target, &document)
            });
            if let Ok(status) = &result {
                if let Some(contents) = &status.contents {
                    print!("{}", contents);
                }
            }
            eprintln!("{}", status_line(&result));
            if result.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Formats => {
            for format in ExportFormat::ALL {
                println!("{:<8} .{:<8} {} space", format.name(), format.extension(), format.space());
            }
            ExitCode::SUCCESS
        }
    }
}
