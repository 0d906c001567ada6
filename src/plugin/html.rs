//! HTML: asset references in `script`, `link`, `img` and `source` tags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::minify::minify_html;
use super::scan::{Rule, scan};
use super::{Plugin, copy_to};
use crate::config::Options;
use crate::engine::{File, Related, RelatedKind};
use crate::pattern;
use crate::utils::path::fs::write_atomic;

pub struct HtmlPlugin;

impl Plugin for HtmlPlugin {
    fn name(&self) -> &'static str {
        "html"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["html", "htm"]
    }

    fn related(&self, file: &File, _options: &Options) -> Result<Vec<Related>> {
        let script = pattern!(r#"(?i)<script\b[^>]*?\bsrc\s*=\s*["'](?P<ref>[^"']+)["']"#);
        let link = pattern!(r#"(?i)<link\b[^>]*?\bhref\s*=\s*["'](?P<ref>[^"']+)["']"#);
        let img = pattern!(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["'](?P<ref>[^"']+)["']"#);
        let source = pattern!(r#"(?i)<source\b[^>]*?\bsrc\s*=\s*["'](?P<ref>[^"']+)["']"#);

        let rule = |pattern, kind| Rule {
            pattern,
            kind,
            dependency: false,
            extensions: &[],
        };

        Ok(scan(
            file,
            &[
                rule(script, RelatedKind::Import),
                rule(link, RelatedKind::Other("link".into())),
                rule(img, RelatedKind::Other("image".into())),
                rule(source, RelatedKind::Other("source".into())),
            ],
        ))
    }

    fn transform(&self, file: &File, destination: &Path, _options: &Options) -> Result<Vec<PathBuf>> {
        copy_to(file, destination)
    }

    fn optimize(&self, file: &File, destination: &Path, options: &Options) -> Result<Vec<PathBuf>> {
        if !options.should_compress(&file.location) {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(destination)
            .with_context(|| format!("Failed to read {}", destination.display()))?;
        write_atomic(destination, minify_html(&content).as_bytes(), file.permission)?;
        Ok(vec![destination.to_path_buf()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_related_tags() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for rel in ["js/app.js", "css/app.css", "img/logo.png", "video/intro.mp4"] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        let index = root.join("index.html");
        fs::write(
            &index,
            r#"<!DOCTYPE html>
<html>
<head>
  <link rel="stylesheet" href="css/app.css">
  <link rel="preconnect" href="https://fonts.example.com">
  <script defer src="/js/app.js"></script>
</head>
<body>
  <img alt="logo" src="img/logo.png">
  <video><source src="video/intro.mp4" type="video/mp4"></video>
  <a href="about.html">About</a>
</body>
</html>"#,
        )
        .unwrap();

        let file = File::read(&index, root);
        let related = HtmlPlugin.related(&file, &Options::default()).unwrap();

        let targets: Vec<_> = related.iter().map(|r| r.target.clone()).collect();
        assert_eq!(
            targets,
            vec![
                root.join("js/app.js"),
                root.join("css/app.css"),
                root.join("img/logo.png"),
                root.join("video/intro.mp4"),
            ]
        );
        assert_eq!(related[0].source, r#"<script defer src="/js/app.js""#);
        assert_eq!(related[0].reference, "/js/app.js");
        assert!(related.iter().all(|r| !r.dependency));
    }

    #[test]
    fn test_optimize_collapses_whitespace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("src/index.html");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<p>\n  hello   world\n</p>\n<!-- x -->\n").unwrap();

        let file = File::read(&path, &dir.path().join("src"));
        let options = Options {
            destination: dir.path().join("dist"),
            ..Default::default()
        };
        let destination = HtmlPlugin.resolve(&file, &options).unwrap();
        HtmlPlugin.transform(&file, &destination, &options).unwrap();
        HtmlPlugin.optimize(&file, &destination, &options).unwrap();

        assert_eq!(fs::read_to_string(&destination).unwrap(), "<p> hello world </p>");
    }
}
