// ============================================================
// Layer 2 — BuildCsvUseCase
// ============================================================
// Builds the metadata CSV the trainer reads:
//
//   Step 1: Load the pickled URL list       (Layer 4 - data)
//   Step 2: Fetch metadata in parallel      (Layer 6 - infra)
//   Step 3: Write the CSV                   (Layer 4 - data)
//   Step 4: Optionally download the images  (Layer 6 - infra)
//
// Fetching runs on a fixed-size rayon pool. par_iter()
// .filter_map().collect() keeps input order, so row i of the CSV
// follows URL i of the list (minus skipped failures).
// A failed fetch is logged and skipped; it never aborts the
// whole build. A record whose file_name was already taken by an
// earlier row is dropped as well, so no two rows share an image.
//
// Reference: Rust Book §16 (Fearless Concurrency)
//            rayon documentation (ThreadPoolBuilder)

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use crate::data::{table::write_records, url_list::load_url_list};
use crate::domain::{
    artwork::MetadataRecord,
    traits::{ImageSource, MetadataSource},
};
use crate::infra::{
    http::RetryConfig,
    wikiart::{large_image_url, WikiArtFetcher},
};

// ─── Build Configuration ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildCsvConfig {
    pub url_list:     PathBuf,
    pub output:       PathBuf,
    /// Only the first N URLs are fetched when set
    pub limit:        Option<usize>,
    pub workers:      usize,
    /// Also download each artwork image into this directory
    pub images_dir:   Option<PathBuf>,
    pub max_attempts: usize,
}

impl Default for BuildCsvConfig {
    fn default() -> Self {
        Self {
            url_list:     PathBuf::from("data/artworks_urls_full.pkl"),
            output:       PathBuf::from("data/database.csv"),
            limit:        None,
            workers:      4,
            images_dir:   None,
            max_attempts: RetryConfig::default().max_attempts,
        }
    }
}

/// Counts reported at the end of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub requested:         usize,
    pub written:           usize,
    pub failed:            usize,
    pub duplicates:        usize,
    pub images_downloaded: usize,
    pub images_present:    usize,
    pub images_failed:     usize,
}

// ─── BuildCsvUseCase ─────────────────────────────────────────────────────────
pub struct BuildCsvUseCase<S = WikiArtFetcher> {
    config: BuildCsvConfig,
    source: S,
}

impl BuildCsvUseCase<WikiArtFetcher> {
    /// Builder backed by the live WikiArt client.
    pub fn new(config: BuildCsvConfig) -> Self {
        let retry = RetryConfig {
            max_attempts: config.max_attempts.max(1),
            ..RetryConfig::default()
        };
        Self { config, source: WikiArtFetcher::new(retry) }
    }
}

impl<S: MetadataSource + ImageSource> BuildCsvUseCase<S> {
    pub fn with_source(config: BuildCsvConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn execute(&self) -> Result<BuildReport> {
        let cfg = &self.config;

        // ── Step 1: Load the URL list ────────────────────────────────────────
        let urls = load_url_list(&cfg.url_list, cfg.limit)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.workers.max(1))
            .build()
            .context("Cannot start the fetch worker pool")?;
        tracing::info!("Fetching {} artworks with {} workers", urls.len(), cfg.workers.max(1));

        // ── Step 2: Fetch metadata, input order preserved ────────────────────
        let fetched = pool.install(|| fetch_all(&self.source, &urls));
        let fetched_count = fetched.len();
        let records = drop_duplicate_files(fetched);

        let mut report = BuildReport {
            requested:  urls.len(),
            written:    records.len(),
            failed:     urls.len() - fetched_count,
            duplicates: fetched_count - records.len(),
            ..BuildReport::default()
        };
        if report.failed > 0 {
            tracing::warn!("{} of {} artworks could not be fetched", report.failed, report.requested);
        }

        // ── Step 3: Write the CSV ────────────────────────────────────────────
        write_records(&cfg.output, &records)?;

        // ── Step 4: Download images ──────────────────────────────────────────
        if let Some(dir) = &cfg.images_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create image directory '{}'", dir.display()))?;
            let outcomes = pool.install(|| {
                records
                    .par_iter()
                    .map(|r| download_image(&self.source, r, dir))
                    .collect::<Vec<_>>()
            });
            for outcome in outcomes {
                match outcome {
                    ImageOutcome::Downloaded => report.images_downloaded += 1,
                    ImageOutcome::Present    => report.images_present += 1,
                    ImageOutcome::Failed     => report.images_failed += 1,
                }
            }
            tracing::info!(
                "Images: {} downloaded, {} already present, {} failed",
                report.images_downloaded, report.images_present, report.images_failed
            );
        }

        Ok(report)
    }
}

/// Fetch every URL on the current rayon pool; failures are dropped.
pub fn fetch_all<S: MetadataSource + ?Sized>(source: &S, urls: &[String]) -> Vec<MetadataRecord> {
    urls.par_iter()
        .filter_map(|url| match source.fetch(url) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!("Skipping '{url}': {err}");
                None
            }
        })
        .collect()
}

/// Keep the first record for each file_name; later ones are logged and dropped.
fn drop_duplicate_files(records: Vec<MetadataRecord>) -> Vec<MetadataRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| {
            let fresh = seen.insert(r.file_name.clone());
            if !fresh {
                tracing::warn!("Skipping '{}': image file '{}' already used", r.id, r.file_name);
            }
            fresh
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageOutcome {
    Downloaded,
    Present,
    Failed,
}

fn download_image<S: ImageSource + ?Sized>(source: &S, record: &MetadataRecord, dir: &Path) -> ImageOutcome {
    let target = dir.join(&record.file_name);
    if target.is_file() {
        return ImageOutcome::Present;
    }
    let bytes = match source.download(&large_image_url(&record.image)) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("Skipping image for '{}': {err}", record.id);
            return ImageOutcome::Failed;
        }
    };
    // Only complete files ever carry the final name
    let partial = target.with_extension("part");
    let written = fs::write(&partial, &bytes).and_then(|_| fs::rename(&partial, &target));
    match written {
        Ok(()) => ImageOutcome::Downloaded,
        Err(err) => {
            tracing::warn!("Cannot save '{}': {err}", target.display());
            let _ = fs::remove_file(&partial);
            ImageOutcome::Failed
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::read_table;
    use crate::domain::artwork::file_name_from_image_url;
    use crate::infra::http::FetchError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubSource {
        failing:   HashSet<String>,
        downloads: AtomicUsize,
    }

    impl MetadataSource for StubSource {
        fn fetch(&self, url: &str) -> Result<MetadataRecord, FetchError> {
            if self.failing.contains(url) {
                return Err(FetchError::Status { url: url.to_string(), code: 503 });
            }
            // .../en/{artist}/{slug}
            let mut parts = url.rsplit('/');
            let id = parts.next().unwrap_or_default().to_string();
            let artist = parts.next().unwrap_or_default();
            let image = format!("https://img.example/images/{artist}/{id}.jpg!Portrait.jpg");
            Ok(MetadataRecord {
                id: id.clone(),
                title: format!("title {id}"),
                artistname: artist.to_string(),
                file_name: file_name_from_image_url(&image).unwrap_or_default(),
                image,
                genre: "portrait".into(),
                ..Default::default()
            })
        }
    }

    impl ImageSource for StubSource {
        fn download(&self, image_url: &str) -> Result<Vec<u8>, FetchError> {
            assert!(image_url.ends_with("!Large.jpg"));
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(image_url.as_bytes().to_vec())
        }
    }

    fn setup(n: usize) -> (tempfile::TempDir, BuildCsvConfig, Vec<String>) {
        let urls: Vec<String> = (0..n).map(|i| format!("https://www.wikiart.org/en/a/p{i}")).collect();
        setup_with(urls)
    }

    fn setup_with(urls: Vec<String>) -> (tempfile::TempDir, BuildCsvConfig, Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("urls.pkl");
        fs::write(&list, serde_pickle::to_vec(&urls, serde_pickle::SerOptions::new()).unwrap()).unwrap();
        let cfg = BuildCsvConfig {
            url_list: list,
            output: dir.path().join("out").join("db.csv"),
            workers: 3,
            ..Default::default()
        };
        (dir, cfg, urls)
    }

    #[test]
    fn test_n_urls_give_n_rows_in_order() {
        let (_dir, cfg, _) = setup(25);
        let report = BuildCsvUseCase::with_source(cfg.clone(), StubSource::default())
            .execute()
            .unwrap();
        assert_eq!(report.requested, 25);
        assert_eq!(report.written, 25);

        let text = fs::read_to_string(&cfg.output).unwrap();
        assert!(text.starts_with("_id,title,artistname,image,year,style,genre,file_name\n"));
        let ids: Vec<String> = read_table(&cfg.output, None).unwrap().into_iter().map(|r| r.id).collect();
        let expected: Vec<String> = (0..25).map(|i| format!("p{i}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_failures_are_skipped() {
        let (_dir, cfg, urls) = setup(6);
        let source = StubSource {
            failing: [urls[1].clone(), urls[4].clone()].into_iter().collect(),
            ..Default::default()
        };
        let report = BuildCsvUseCase::with_source(cfg.clone(), source).execute().unwrap();
        assert_eq!((report.written, report.failed), (4, 2));

        let ids: Vec<String> = read_table(&cfg.output, None).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["p0", "p2", "p3", "p5"]);
    }

    #[test]
    fn test_limit_truncates() {
        let (_dir, mut cfg, _) = setup(10);
        cfg.limit = Some(3);
        let report = BuildCsvUseCase::with_source(cfg, StubSource::default()).execute().unwrap();
        assert_eq!(report.written, 3);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (_dir, cfg, _) = setup(8);
        BuildCsvUseCase::with_source(cfg.clone(), StubSource::default()).execute().unwrap();
        let first = fs::read(&cfg.output).unwrap();
        BuildCsvUseCase::with_source(cfg.clone(), StubSource::default()).execute().unwrap();
        assert_eq!(fs::read(&cfg.output).unwrap(), first);
    }

    #[test]
    fn test_images_are_downloaded_once() {
        let (dir, mut cfg, _) = setup(4);
        cfg.images_dir = Some(dir.path().join("images"));
        let use_case = BuildCsvUseCase::with_source(cfg.clone(), StubSource::default());

        let first = use_case.execute().unwrap();
        assert_eq!(first.images_downloaded, 4);
        assert!(dir.path().join("images").join("a_p2.jpg!Large.jpg").is_file());

        let second = use_case.execute().unwrap();
        assert_eq!((second.images_downloaded, second.images_present), (0, 4));
        assert_eq!(use_case.source.downloads.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_same_title_by_two_artists_keeps_both_images() {
        let (dir, mut cfg, _) = setup_with(vec![
            "https://www.wikiart.org/en/hans-von-aachen/self-portrait".to_string(),
            "https://www.wikiart.org/en/albrecht-durer/self-portrait".to_string(),
        ]);
        let images = dir.path().join("images");
        cfg.images_dir = Some(images.clone());

        let report = BuildCsvUseCase::with_source(cfg.clone(), StubSource::default())
            .execute()
            .unwrap();
        assert_eq!((report.written, report.duplicates, report.images_downloaded), (2, 0, 2));

        let rows = read_table(&cfg.output, None).unwrap();
        assert_ne!(rows[0].file_name, rows[1].file_name);
        let first = fs::read(images.join(&rows[0].file_name)).unwrap();
        let second = fs::read(images.join(&rows[1].file_name)).unwrap();
        assert_ne!(first, second);
        assert!(String::from_utf8(second).unwrap().contains("/albrecht-durer/"));
    }

    #[test]
    fn test_repeated_url_is_written_once() {
        let url = "https://www.wikiart.org/en/a/p0".to_string();
        let (_dir, cfg, _) = setup_with(vec![url.clone(), "https://www.wikiart.org/en/a/p1".into(), url]);
        let report = BuildCsvUseCase::with_source(cfg.clone(), StubSource::default())
            .execute()
            .unwrap();
        assert_eq!((report.requested, report.written, report.duplicates, report.failed), (3, 2, 1, 0));
        let ids: Vec<String> = read_table(&cfg.output, None).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["p0", "p1"]);
    }
}
