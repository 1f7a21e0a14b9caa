// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `build-csv`, `train` and
// `predict`, and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, PathBuf, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{build_csv_use_case::BuildCsvConfig, train_use_case::TrainConfig};
use crate::data::{augment::AugmentationPolicy, generator::GeneratorConfig};

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch artwork metadata for a pickled URL list and write a CSV
    BuildCsv(BuildCsvArgs),

    /// Train the artwork classifier on a CSV and an image directory
    Train(TrainArgs),

    /// Classify one image with a trained model
    Predict(PredictArgs),
}

/// All arguments for the `build-csv` command.
#[derive(Args, Debug)]
pub struct BuildCsvArgs {
    /// Pickled Python list of artwork page URLs
    #[arg(long, default_value = "data/artworks_urls_full.pkl")]
    pub url_list: PathBuf,

    /// Only fetch the first N URLs
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Where to write the CSV
    #[arg(short, long, default_value = "data/database.csv")]
    pub output: PathBuf,

    /// Size of the fetch worker pool
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Also download every artwork image into this directory
    #[arg(long)]
    pub download_images: Option<PathBuf>,

    /// Attempts per request before a URL is skipped
    #[arg(long, default_value_t = 3)]
    pub max_attempts: usize,
}

impl From<BuildCsvArgs> for BuildCsvConfig {
    fn from(a: BuildCsvArgs) -> Self {
        BuildCsvConfig {
            url_list:     a.url_list,
            output:       a.output,
            limit:        a.limit,
            workers:      a.workers,
            images_dir:   a.download_images,
            max_attempts: a.max_attempts,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Metadata CSV produced by build-csv
    #[arg(long, default_value = "data/db.csv")]
    pub csv: PathBuf,

    /// Directory holding the artwork images
    #[arg(long, default_value = "data/images")]
    pub images_dir: PathBuf,

    /// Where the model, class map and history are written
    #[arg(long, default_value = "data")]
    pub output_dir: PathBuf,

    /// Read only the first N rows of the CSV
    #[arg(long)]
    pub nrows: Option<usize>,

    /// Column to predict: genre, style, artistname, year or title
    #[arg(long, default_value = "genre")]
    pub feature: String,

    /// Column holding the image file name
    #[arg(long, default_value = "file_name")]
    pub image_column: String,

    /// Images are resized to WIDTH × HEIGHT
    #[arg(long, default_value_t = 256)]
    pub width: u32,

    #[arg(long, default_value_t = 256)]
    pub height: u32,

    /// Number of images processed together in one forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 16)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Fraction of rows held out for the final test
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Fraction of the training split used for validation
    #[arg(long, default_value_t = 0.2)]
    pub validation_split: f64,

    /// PyTorch vgg16 state dict for the frozen backbone
    #[arg(long)]
    pub backbone_weights: Option<PathBuf>,

    /// Make the shuffles reproducible
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            csv_path:   a.csv,
            images_dir: a.images_dir,
            output_dir: a.output_dir,
            nrows:      a.nrows,
            generator:  GeneratorConfig {
                image_size:       (a.width, a.height),
                batch_size:       a.batch_size,
                label_column:     a.feature,
                image_column:     a.image_column,
                test_fraction:    a.test_fraction,
                validation_split: a.validation_split,
                train_policy:     AugmentationPolicy::training(),
                test_policy:      AugmentationPolicy::rescale_only(),
            },
            epochs:           a.epochs,
            learning_rate:    a.lr,
            backbone_weights: a.backbone_weights,
            seed:             a.seed,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image to classify
    #[arg(long)]
    pub image: PathBuf,

    /// Output directory of a finished training run
    #[arg(long, default_value = "data")]
    pub model_dir: PathBuf,

    /// How many labels to print
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,
}
