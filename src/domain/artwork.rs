// ============================================================
// Layer 3 — Artwork Metadata Record
// ============================================================
// One row of the tabular dataset. The field order here IS the
// CSV column order, so the csv crate's serde support writes the
// header `_id,title,artistname,image,year,style,genre,file_name`
// straight from this struct.
//
// Example row:
//   5772847bedc2cb3880fded05,self-portrait,hans von aachen,
//   https://uploads4.wikiart.org/images/hans-von-aachen/self-portrait-1574.jpg,
//   1574,mannerism (late renaissance),self-portrait,
//   hans-von-aachen_self-portrait-1574.jpg!Large.jpg

use serde::{Deserialize, Serialize};

/// Column names in the order they are written to disk.
pub const CSV_COLUMNS: [&str; 8] = [
    "_id", "title", "artistname", "image", "year", "style", "genre", "file_name",
];

/// Columns a classifier can be trained to predict. Identifiers and
/// image references are unique per row and never make a label.
pub const LABEL_COLUMNS: [&str; 5] = ["genre", "style", "artistname", "year", "title"];

/// Size suffix the image host appends to downloadable files.
pub const LARGE_IMAGE_SUFFIX: &str = "!Large.jpg";

/// Metadata for a single artwork.
/// Missing values are kept as empty strings; the trainer decides
/// what counts as missing for the column it trains on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    #[serde(rename = "_id")]
    pub id:         String,
    pub title:      String,
    pub artistname: String,
    pub image:      String,
    pub year:       String,
    pub style:      String,
    pub genre:      String,
    pub file_name:  String,
}

impl MetadataRecord {
    /// Look up a field by its CSV column name.
    pub fn column(&self, name: &str) -> Option<&str> {
        let value = match name {
            "_id"        => &self.id,
            "title"      => &self.title,
            "artistname" => &self.artistname,
            "image"      => &self.image,
            "year"       => &self.year,
            "style"      => &self.style,
            "genre"      => &self.genre,
            "file_name"  => &self.file_name,
            _            => return None,
        };
        Some(value.as_str())
    }

    /// Mutable counterpart of [`MetadataRecord::column`].
    pub fn column_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "_id"        => Some(&mut self.id),
            "title"      => Some(&mut self.title),
            "artistname" => Some(&mut self.artistname),
            "image"      => Some(&mut self.image),
            "year"       => Some(&mut self.year),
            "style"      => Some(&mut self.style),
            "genre"      => Some(&mut self.genre),
            "file_name"  => Some(&mut self.file_name),
            _            => None,
        }
    }
}

/// Derive the on-disk file name from an image URL:
/// `{artist}_{last segment}!Large.jpg`, where `artist` is the path
/// segment before the file. Basenames such as `self-portrait.jpg`
/// repeat across artists, the artist folder keeps them apart.
/// Returns `None` when the URL has no usable last segment.
pub fn file_name_from_image_url(image_url: &str) -> Option<String> {
    let parsed = url::Url::parse(image_url).ok()?;
    let mut segments = parsed.path_segments()?.rev();
    let last = segments.next()?;
    // The host sometimes hands out URLs that already carry a size suffix
    let base = last.split('!').next().unwrap_or(last);
    if base.is_empty() {
        return None;
    }
    match segments.next().filter(|s| !s.is_empty() && *s != "images") {
        Some(artist) => Some(format!("{artist}_{base}{LARGE_IMAGE_SUFFIX}")),
        None         => Some(format!("{base}{LARGE_IMAGE_SUFFIX}")),
    }
}
