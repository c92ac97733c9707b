use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;
use walkdir::WalkDir;

/// A raw labeled review as supplied by the dataset provider.
#[derive(Debug, Clone)]
pub struct RawReview {
    pub text: String,
    /// Star rating on a 1-10 scale; the corpus contains no neutral ratings.
    pub rating: u8,
}

/// A preprocessed training example. Immutable once built; the length is
/// cached so bucketing never re-counts tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub tokens: Vec<i64>,
    pub label: i64,
    pub length: usize,
}

impl Example {
    pub fn new(tokens: Vec<i64>, label: i64) -> Self {
        let length = tokens.len();
        Self {
            tokens,
            label,
            length,
        }
    }
}

/// In-memory review dataset for one split.
#[derive(Debug, Clone, Default)]
pub struct ReviewDataset {
    reviews: Vec<RawReview>,
}

impl ReviewDataset {
    pub fn from_reviews(reviews: Vec<RawReview>) -> Self {
        Self { reviews }
    }

    /// Load a split from an IMDB-style directory layout:
    /// `<root>/<split>/{pos,neg}/<id>_<rating>.txt`.
    pub fn from_dir(root: &Path, split: &str) -> Result<Self> {
        let split_dir = root.join(split);
        let mut reviews = Vec::new();

        for polarity in ["pos", "neg"] {
            let dir = split_dir.join(polarity);
            if !dir.exists() {
                anyhow::bail!("Missing dataset directory: {:?}", dir);
            }

            for entry in WalkDir::new(&dir)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) != Some("txt") {
                    continue;
                }

                let rating = parse_rating(path).with_context(|| {
                    format!("Failed to parse rating from filename: {:?}", path)
                })?;

                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read review file: {:?}", path))?;

                reviews.push(RawReview { text, rating });
            }
        }

        info!("Loaded {} reviews from {:?}", reviews.len(), split_dir);

        if reviews.is_empty() {
            anyhow::bail!("No reviews found under {:?}", split_dir);
        }

        Ok(Self { reviews })
    }

    pub fn reviews(&self) -> &[RawReview] {
        &self.reviews
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

/// Review filenames carry the rating after the final underscore.
fn parse_rating(path: &Path) -> Result<u8> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Filename is not valid UTF-8"))?;

    let rating_part = stem
        .rsplit('_')
        .next()
        .ok_or_else(|| anyhow::anyhow!("Filename has no rating suffix"))?;

    let rating: u8 = rating_part
        .parse()
        .with_context(|| format!("Rating suffix is not a number: {}", rating_part))?;

    Ok(rating)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_review(dir: &Path, name: &str, text: &str) {
        let mut file = fs::File::create(dir.join(name)).unwrap();
        write!(file, "{}", text).unwrap();
    }

    #[test]
    fn test_load_imdb_layout() {
        let root = TempDir::new().unwrap();
        let pos = root.path().join("train").join("pos");
        let neg = root.path().join("train").join("neg");
        fs::create_dir_all(&pos).unwrap();
        fs::create_dir_all(&neg).unwrap();

        write_review(&pos, "0_9.txt", "wonderful film");
        write_review(&pos, "1_8.txt", "loved it");
        write_review(&neg, "0_2.txt", "terrible film");

        let dataset = ReviewDataset::from_dir(root.path(), "train").unwrap();
        assert_eq!(dataset.len(), 3);
        assert!(dataset.reviews().iter().any(|r| r.rating == 2));
        assert!(dataset.reviews().iter().any(|r| r.rating == 9));
    }

    #[test]
    fn test_missing_split_fails() {
        let root = TempDir::new().unwrap();
        assert!(ReviewDataset::from_dir(root.path(), "train").is_err());
    }

    #[test]
    fn test_bad_rating_suffix_fails() {
        let root = TempDir::new().unwrap();
        let pos = root.path().join("train").join("pos");
        let neg = root.path().join("train").join("neg");
        fs::create_dir_all(&pos).unwrap();
        fs::create_dir_all(&neg).unwrap();
        write_review(&pos, "review.txt", "no rating here");
        write_review(&neg, "0_1.txt", "bad");

        assert!(ReviewDataset::from_dir(root.path(), "train").is_err());
    }

    #[test]
    fn test_example_caches_length() {
        let example = Example::new(vec![5, 6, 7], 1);
        assert_eq!(example.length, 3);
    }
}
