//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Fill identity-card form fields by typing or scanning, then export the form as an image.
#[derive(Parser, Debug)]
#[command(name = "idcard-form", version, about, long_about = None)]
pub struct Cli {
    /// Accept any number of digits in the USC number and do not require it to save
    #[arg(long, global = true)]
    pub relaxed: bool,

    /// Disable the camera/OCR scan flow
    #[arg(long, global = true)]
    pub no_scan: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract card fields from OCR text (file, or stdin when omitted)
    Extract {
        file: Option<PathBuf>,
    },

    /// Capture a frame from an image file, OCR it and fill the form
    Scan {
        #[arg(long)]
        image: PathBuf,
    },

    /// Fill the form and export it as a JPEG
    Save(SaveArgs),

    /// Show the form and which controls are enabled
    Status(FieldArgs),

    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        write: bool,
    },
}

/// Values typed into the form, in field order.
#[derive(Args, Debug, Clone, Default)]
pub struct FieldArgs {
    /// Aadhaar number (non-digits are dropped, cut to 12 digits)
    #[arg(long)]
    pub aadhaar: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    /// USC number (non-digits are dropped)
    #[arg(long)]
    pub usc: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    #[command(flatten)]
    pub fields: FieldArgs,

    /// Scan this image first; typed values override scanned ones
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Output directory (defaults to the Downloads folder)
    #[arg(long, env = "IDCARD_OUTPUT_DIR")]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_save_with_global_flags() {
        let cli = Cli::try_parse_from([
            "idcard-form",
            "save",
            "--aadhaar",
            "1234 5678 9012",
            "--usc",
            "1234567890123",
            "--relaxed",
            "--out",
            "/tmp/x",
        ])
        .unwrap();
        assert!(cli.relaxed);
        match cli.command {
            Commands::Save(args) => {
                assert_eq!(args.fields.aadhaar.as_deref(), Some("1234 5678 9012"));
                assert_eq!(args.out, Some(PathBuf::from("/tmp/x")));
                assert!(args.image.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn scan_requires_image() {
        assert!(Cli::try_parse_from(["idcard-form", "scan"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
