//! Raster images: lossless re-encoding and progressive WebP alternatives.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ::image::codecs::jpeg::JpegEncoder;
use ::image::codecs::png::{CompressionType, FilterType, PngEncoder};
use ::image::{DynamicImage, ImageFormat};

use super::scan::sibling;
use super::{Plugin, copy_sibling, copy_to, with_suffix};
use crate::config::Options;
use crate::engine::{File, Related, RelatedKind};
use crate::utils::path::fs::write_atomic;

const JPEG_QUALITY: u8 = 85;

pub struct ImagePlugin;

fn encode(image: &DynamicImage, ext: &str) -> Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    match ext {
        "png" => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
            image.write_with_encoder(encoder)?;
        }
        "jpg" | "jpeg" => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
        }
        _ => return Ok(None),
    }
    Ok(Some(buf))
}

fn to_webp(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)?;
    Ok(buf)
}

impl Plugin for ImagePlugin {
    fn name(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png", "jpg", "jpeg", "gif", "webp"]
    }

    fn related(&self, file: &File, _options: &Options) -> Result<Vec<Related>> {
        if file.ext() == "webp" {
            return Ok(Vec::new());
        }
        Ok(vec![sibling(file, ".webp", RelatedKind::Alternative)])
    }

    fn transform(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>> {
        let mut written = copy_to(file, destination)?;
        if options.should_progressive(&file.location)
            && let Some(webp) = copy_sibling(file, ".webp", destination)?
        {
            written.push(webp);
        }
        Ok(written)
    }

    fn optimize(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>> {
        let compress = options.should_compress(&file.location);
        let progressive = options.should_progressive(&file.location) && file.ext() != "webp";
        if !compress && !progressive {
            return Ok(Vec::new());
        }

        let content =
            fs::read(destination).with_context(|| format!("Failed to read {}", destination.display()))?;
        let image = ::image::load_from_memory(&content)
            .with_context(|| format!("Failed to decode {}", file.path.display()))?;

        let mut written = Vec::new();
        if compress
            && let Some(encoded) = encode(&image, file.ext())?
            && encoded.len() < content.len()
        {
            write_atomic(destination, &encoded, file.permission)?;
            written.push(destination.to_path_buf());
        }

        // An author-provided alternative was already copied by `transform`
        let authored = with_suffix(&file.path, ".webp").is_file();
        let webp = with_suffix(destination, ".webp");
        if progressive && !authored {
            write_atomic(&webp, &to_webp(&image)?, file.permission)?;
            written.push(webp);
        }
        Ok(written)
    }

    fn artifacts(&self, destination: &Path) -> Vec<PathBuf> {
        vec![with_suffix(destination, ".webp")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    const RED: Rgba<u8> = Rgba([200, 30, 30, 255]);
    const BLUE: Rgba<u8> = Rgba([30, 30, 200, 255]);

    fn png(dir: &TempDir, rel: &str) -> File {
        paint(dir, rel, RED)
    }

    fn paint(dir: &TempDir, rel: &str, color: Rgba<u8>) -> File {
        let root = dir.path().join("src");
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(16, 16, color)
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        File::read(&path, &root)
    }

    fn options(dir: &TempDir) -> Options {
        Options {
            destination: dir.path().join("dist"),
            ..Default::default()
        }
    }

    #[test]
    fn test_related_webp_alternative() {
        let dir = TempDir::new().unwrap();
        let file = png(&dir, "img/logo.png");
        let related = ImagePlugin.related(&file, &Options::default()).unwrap();

        assert_eq!(related.len(), 1);
        assert_eq!(related[0].kind, RelatedKind::Alternative);
        assert_eq!(related[0].target, file.folder.join("logo.png.webp"));
        assert!(related[0].dependency);
    }

    #[test]
    fn test_progressive_writes_webp() {
        let dir = TempDir::new().unwrap();
        let file = png(&dir, "logo.png");
        let options = options(&dir);
        let destination = ImagePlugin.resolve(&file, &options).unwrap();

        ImagePlugin.transform(&file, &destination, &options).unwrap();
        let written = ImagePlugin.optimize(&file, &destination, &options).unwrap();

        let webp = with_suffix(&destination, ".webp");
        assert!(written.contains(&webp));
        let decoded = ::image::open(&webp).unwrap();
        assert_eq!(decoded.width(), 16);
    }

    #[test]
    fn test_webp_follows_source_changes() {
        let dir = TempDir::new().unwrap();
        let mut options = options(&dir);
        options.hashed = false;

        for color in [RED, BLUE] {
            let file = paint(&dir, "logo.png", color);
            let destination = ImagePlugin.resolve(&file, &options).unwrap();
            ImagePlugin.transform(&file, &destination, &options).unwrap();
            ImagePlugin.optimize(&file, &destination, &options).unwrap();

            let webp = ::image::open(with_suffix(&destination, ".webp")).unwrap().to_rgba8();
            assert_eq!(*webp.get_pixel(0, 0), color);
        }
    }

    #[test]
    fn test_authored_webp_is_kept() {
        let dir = TempDir::new().unwrap();
        let file = png(&dir, "logo.png");
        fs::write(with_suffix(&file.path, ".webp"), b"authored").unwrap();
        let options = options(&dir);
        let destination = ImagePlugin.resolve(&file, &options).unwrap();

        let mut written = ImagePlugin.transform(&file, &destination, &options).unwrap();
        written.extend(ImagePlugin.optimize(&file, &destination, &options).unwrap());

        let webp = with_suffix(&destination, ".webp");
        assert_eq!(fs::read(&webp).unwrap(), b"authored");
        assert_eq!(written.iter().filter(|p| **p == webp).count(), 1);
    }

    #[test]
    fn test_optimize_never_grows_file() {
        let dir = TempDir::new().unwrap();
        let file = png(&dir, "logo.png");
        let mut options = options(&dir);
        options.progressive.enabled = false;
        let destination = ImagePlugin.resolve(&file, &options).unwrap();

        ImagePlugin.transform(&file, &destination, &options).unwrap();
        ImagePlugin.optimize(&file, &destination, &options).unwrap();

        let size = fs::metadata(&destination).unwrap().len() as usize;
        assert!(size <= file.content.len());
        assert!(!with_suffix(&destination, ".webp").exists());
    }

    #[test]
    fn test_development_without_progressive_is_untouched() {
        let dir = TempDir::new().unwrap();
        let file = png(&dir, "logo.png");
        let mut options = options(&dir);
        options.development = true;
        options.progressive.enabled = false;
        let destination = ImagePlugin.resolve(&file, &options).unwrap();

        ImagePlugin.transform(&file, &destination, &options).unwrap();
        assert!(ImagePlugin.optimize(&file, &destination, &options).unwrap().is_empty());
        assert_eq!(fs::read(&destination).unwrap(), file.content);
    }
}
