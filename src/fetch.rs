use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while acquiring the round data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to write cache file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to flush cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How the cached dataset was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The cache file already existed; no request was made.
    Cached(PathBuf),
    /// The dataset was downloaded and written to the cache file.
    Downloaded(PathBuf),
}

impl FetchOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::Cached(path) | FetchOutcome::Downloaded(path) => path,
        }
    }
}

/// Ensure a local copy of the round data exists at `cache_path`.
///
/// If the file is already present it is used as-is: no request, no freshness
/// check. Otherwise the dataset is fetched with a single blocking GET, the
/// body is split on newlines and commas, and rewritten as CSV rows.
pub fn fetch_round_data(url: &str, cache_path: &Path) -> Result<FetchOutcome, FetchError> {
    if cache_path.is_file() {
        println!("📁 Data already downloaded: {}", cache_path.display());
        return Ok(FetchOutcome::Cached(cache_path.to_path_buf()));
    }

    println!("🌐 Downloading round data from {}...", url);
    let response = reqwest::blocking::get(url).map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = response.text().map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;

    let mut writer = csv::Writer::from_path(cache_path).map_err(|source| FetchError::Csv {
        path: cache_path.to_path_buf(),
        source,
    })?;
    for line in body.lines() {
        if line.is_empty() {
            continue;
        }
        writer
            .write_record(line.split(','))
            .map_err(|source| FetchError::Csv {
                path: cache_path.to_path_buf(),
                source,
            })?;
    }
    writer.flush().map_err(|source| FetchError::Io {
        path: cache_path.to_path_buf(),
        source,
    })?;

    println!("💾 Round data saved to: {}", cache_path.display());
    Ok(FetchOutcome::Downloaded(cache_path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_existing_cache_short_circuits_network() {
        let temp_dir = TempDir::new().unwrap();
        let cache_path = temp_dir.path().join("round_data.csv");
        let contents = "model,round,corr,mmc\nbudbot_7,221,0.01,0.002\n";
        fs::write(&cache_path, contents).unwrap();

        // The URL is unreachable on purpose: a cache hit must return before
        // any request is issued.
        let outcome = fetch_round_data("http://127.0.0.1:1/never", &cache_path).unwrap();

        assert_eq!(outcome, FetchOutcome::Cached(cache_path.clone()));
        assert_eq!(fs::read_to_string(&cache_path).unwrap(), contents);
    }

    #[test]
    fn test_cache_hit_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let cache_path = temp_dir.path().join("round_data.csv");
        fs::write(&cache_path, "model,round,corr,mmc\n").unwrap();

        let before = fs::read(&cache_path).unwrap();
        fetch_round_data("http://127.0.0.1:1/never", &cache_path).unwrap();
        fetch_round_data("http://127.0.0.1:1/never", &cache_path).unwrap();
        let after = fs::read(&cache_path).unwrap();

        assert_eq!(before, after);
    }
}
