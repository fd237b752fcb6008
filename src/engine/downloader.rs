//! Weight downloader.
//!
//! Fetches missing weight files for a model variant from HuggingFace. Files
//! are streamed to disk in chunks so multi-hundred-MB graphs never sit in
//! memory whole.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use log::info;

use crate::error::{PipelineError, Result};

use super::model::{ModelSpec, REQUIRED_WEIGHT_FILES};

/// Downloads any missing weight files for the variant.
///
/// Returns Ok(()) if all files exist or were successfully downloaded.
/// config.json is fetched opportunistically; the variant defaults cover its
/// absence.
pub fn ensure_weights(model_dir: &Path, spec: ModelSpec) -> Result<()> {
    if !model_dir.exists() {
        fs::create_dir_all(model_dir).map_err(|e| {
            PipelineError::model_download_failed(format!(
                "failed to create model directory {}: {}",
                model_dir.display(),
                e
            ))
        })?;
    }

    let missing: Vec<&str> = REQUIRED_WEIGHT_FILES
        .iter()
        .copied()
        .filter(|file| !model_dir.join(file).exists())
        .collect();

    if missing.is_empty() {
        info!("all weight files present for {}", spec);
        return Ok(());
    }

    info!(
        "downloading {} missing weight files for {} (this may take several minutes on first run)",
        missing.len(),
        spec
    );

    let urls = spec.weight_urls();

    for file in &missing {
        let url = urls
            .iter()
            .find(|(name, _)| name == file)
            .map(|(_, url)| url.as_str())
            .ok_or_else(|| {
                PipelineError::model_download_failed(format!("no download URL for {}", file))
            })?;

        download_streaming(url, &model_dir.join(file))?;
    }

    // config.json is optional; ignore a failed fetch.
    let config_path = model_dir.join("config.json");
    if !config_path.exists() {
        if let Some((_, url)) = urls.iter().find(|(name, _)| *name == "config.json") {
            let _ = download_streaming(url, &config_path);
        }
    }

    info!("all weight files downloaded for {}", spec);
    Ok(())
}

/// Streams one URL to a destination file in 64KB chunks.
fn download_streaming(url: &str, dest: &Path) -> Result<()> {
    let filename = dest.file_name().unwrap_or_default().to_string_lossy();
    info!("downloading {}...", filename);

    // Large graphs over slow links need a generous timeout.
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(3600))
        .build()
        .map_err(|e| {
            PipelineError::model_download_failed(format!("failed to create HTTP client: {}", e))
        })?;

    let mut response = client.get(url).send().map_err(|e| {
        PipelineError::model_download_failed(format!("failed to download {}: {}", url, e))
    })?;

    if !response.status().is_success() {
        return Err(PipelineError::model_download_failed(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let mut file = fs::File::create(dest).map_err(|e| {
        PipelineError::model_download_failed(format!(
            "failed to create file {}: {}",
            dest.display(),
            e
        ))
    })?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 65536];

    loop {
        let bytes_read = response.read(&mut buffer).map_err(|e| {
            PipelineError::model_download_failed(format!("failed to read response: {}", e))
        })?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read]).map_err(|e| {
            PipelineError::model_download_failed(format!("failed to write file: {}", e))
        })?;

        downloaded += bytes_read as u64;
    }

    info!(
        "downloaded {} ({:.1} MB)",
        filename,
        downloaded as f64 / (1024.0 * 1024.0)
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_required_file_has_a_url() {
        for spec in [
            ModelSpec::Small,
            ModelSpec::Medium,
            ModelSpec::Large,
            ModelSpec::Melody,
        ] {
            let urls = spec.weight_urls();
            for file in REQUIRED_WEIGHT_FILES {
                assert!(
                    urls.iter().any(|(name, _)| name == file),
                    "missing URL for {} / {}",
                    spec,
                    file
                );
            }
        }
    }

    #[test]
    fn ensure_weights_skips_download_when_present() {
        let dir = tempfile::tempdir().unwrap();
        for file in REQUIRED_WEIGHT_FILES {
            std::fs::write(dir.path().join(file), b"stub").unwrap();
        }
        std::fs::write(dir.path().join("config.json"), b"{}").unwrap();
        // All files present: returns without touching the network.
        ensure_weights(dir.path(), ModelSpec::Small).unwrap();
    }
}
