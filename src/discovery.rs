//! Image discovery
//!
//! Scans an image directory and seeds every image it finds into the
//! rating store. Seeding is idempotent, so running discovery on every
//! startup only adds files that appeared since the last run.

use crate::error::Result;
use crate::rating::RatingStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Extensions picked up when none are configured
pub const DEFAULT_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// An image file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredImage {
    pub filename: String,
    pub label: String,
}

/// Outcome of a discovery run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub discovered: usize,
    pub inserted: usize,
}

/// Turn a file stem into a display label: `sunset_beach` -> `Sunset Beach`
pub fn label_from_stem(stem: &str) -> String {
    let mut label = String::with_capacity(stem.len());
    let mut previous_is_alphabetic = false;

    for c in stem.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if previous_is_alphabetic {
                label.extend(c.to_lowercase());
            } else {
                label.extend(c.to_uppercase());
            }
            previous_is_alphabetic = true;
        } else {
            label.push(c);
            previous_is_alphabetic = false;
        }
    }

    label
}

/// Derive a label from a filename or URL by title-casing its last path
/// segment without the extension
pub fn label_from_reference(reference: &str) -> String {
    let without_query = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference)
        .trim_end_matches('/');
    let segment = without_query.rsplit('/').next().unwrap_or(without_query);
    let stem = Path::new(segment)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(segment);

    label_from_stem(stem)
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// List image files directly inside `dir`, sorted by filename
pub fn discover_images(dir: &Path, extensions: &[String]) -> Result<Vec<DiscoveredImage>> {
    let mut images = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if !entry.file_type()?.is_file() || !has_allowed_extension(&path, extensions) {
            continue;
        }

        let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
            warn!("Skipping image with non UTF-8 name: {}", path.display());
            continue;
        };
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(filename);

        images.push(DiscoveredImage {
            filename: filename.to_string(),
            label: label_from_stem(stem),
        });
    }

    images.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(images)
}

/// Discover images in `dir` and seed them into `store`.
///
/// A missing directory is not an error: it is logged and reported as an
/// empty run.
pub fn seed_from_directory(
    store: &dyn RatingStore,
    dir: &Path,
    extensions: &[String],
) -> Result<SeedReport> {
    if !dir.is_dir() {
        warn!(
            "Image directory {} does not exist, skipping discovery",
            dir.display()
        );
        return Ok(SeedReport::default());
    }

    let images = discover_images(dir, extensions)?;
    let mut report = SeedReport {
        discovered: images.len(),
        inserted: 0,
    };

    for image in &images {
        if store.seed(&image.filename, &image.label)? {
            debug!("Seeded image '{}' as '{}'", image.filename, image.label);
            report.inserted += 1;
        }
    }

    info!(
        "Image discovery in {}: {} found, {} new",
        dir.display(),
        report.discovered,
        report.inserted
    );

    Ok(report)
}
