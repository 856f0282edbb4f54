use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct Args {
    /// Path to TOML design file.
    #[arg(short, long, default_value = "nwgen.toml")]
    pub config: PathBuf,

    /// Directory to which output files should be saved.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Render an SVG preview of the chip layout.
    #[arg(long)]
    pub svg: bool,

    /// Render an SVG map of the occupied dies.
    #[arg(long)]
    pub map: bool,
}
