//! In-process minifiers.
//!
//! oxc for JavaScript, lightningcss for CSS, serde_json for JSON, quick-xml
//! for XML/SVG and a conservative whitespace pass for HTML. Every minifier
//! is deterministic for identical input.

use std::io::Cursor;
use std::ops::Range;

use anyhow::{Result, anyhow, bail};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use quick_xml::{Reader, Writer, events::Event};

use crate::pattern;

/// Minify JavaScript. `module` selects ES module vs CommonJS parsing.
pub fn minify_js(source: &str, module: bool) -> Result<String> {
    let allocator = Allocator::default();
    let source_type = if module {
        SourceType::mjs()
    } else {
        SourceType::cjs()
    };

    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        bail!("JavaScript parse error: {error}");
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

/// Minify CSS.
pub fn minify_css(source: &str) -> Result<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default())
        .map_err(|e| anyhow!("CSS parse error: {e}"))?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("CSS print error: {e}"))?;
    Ok(result.code)
}

/// Re-serialize JSON without insignificant whitespace (key order preserved).
pub fn minify_json(source: &[u8]) -> Result<Vec<u8>> {
    let value: serde_json::Value = serde_json::from_slice(source)?;
    Ok(serde_json::to_vec(&value)?)
}

/// Rewrite XML dropping comments and whitespace-only text nodes.
pub fn minify_xml(source: &[u8]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new(Cursor::new(Vec::with_capacity(source.len())));

    loop {
        match reader.read_event() {
            Ok(Event::Comment(_)) => {}
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => bail!(
                "XML parse error at position {}: {:?}",
                reader.error_position(),
                e
            ),
        }
    }

    Ok(writer.into_inner().into_inner())
}

/// Collapse whitespace runs and drop comments outside `pre`, `textarea`,
/// `script` and `style` blocks. Conditional comments (`<!--[if`) are kept.
pub fn minify_html(source: &str) -> String {
    let protected = pattern!(
        r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>"
    );

    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for block in protected.find_iter(source) {
        out.push_str(&collapse_html(&source[last..block.start()]));
        out.push_str(block.as_str());
        last = block.end();
    }
    out.push_str(&collapse_html(&source[last..]));
    out.trim().to_owned()
}

fn collapse_html(segment: &str) -> String {
    let comment = pattern!(r"(?s)<!--.*?-->");
    let whitespace = pattern!(r"\s+");

    let mut kept = String::with_capacity(segment.len());
    let mut last = 0;
    for m in comment.find_iter(segment) {
        kept.push_str(&segment[last..m.start()]);
        if m.as_str().starts_with("<!--[if") {
            kept.push_str(m.as_str());
        }
        last = m.end();
    }
    kept.push_str(&segment[last..]);

    whitespace.replace_all(&kept, " ").into_owned()
}

/// Replace non-overlapping byte ranges of `text`, applied back to front.
pub fn splice(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = text.to_owned();
    for (range, replacement) in edits {
        out.replace_range(range, &replacement);
    }
    out
}
