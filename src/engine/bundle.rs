//! Custom bundles.
//!
//! A bundle is a package with no file of its own: its content is the
//! concatenation of every indexed file matching the bundle's patterns, and it
//! is built by the plugin of its target extension. Members keep building as
//! packages of their own unless excluded, and each carries a
//! [`RelatedKind::Member`] edge from the bundle so a member change rebuilds it.

use std::path::PathBuf;

use super::{Engine, File, Related, RelatedKind};
use crate::config::Bundle;
use crate::debug;

impl Engine {
    /// Reassemble every configured bundle from the current registry.
    ///
    /// A bundle whose members all vanished stays known with its last
    /// checksums, so its artifacts can still be deleted.
    pub fn resolve_bundles(&mut self) {
        for bundle in &self.options.bundles {
            let path = self.options.source.join(&bundle.target);
            if self.registry.contains(&path) {
                debug!("bundle"; "{} shadows a source file, skipped", bundle.target.display());
                continue;
            }

            let previous = self.bundles.remove(&path);
            let mut file = self.assemble(bundle, path.clone(), previous);
            let plugin = self.plugins.for_file(&file);
            file.destination = plugin.resolve(&file, &self.options).unwrap_or_else(|e| {
                debug!("resolve"; "{}: {:#}", path.display(), e);
                PathBuf::new()
            });
            self.bundles.insert(path, file);
        }
    }

    fn assemble(&self, bundle: &Bundle, path: PathBuf, previous: Option<File>) -> File {
        let mut members: Vec<(usize, &File)> = self
            .registry
            .iter()
            .filter(|file| file.exists)
            .filter_map(|file| bundle.member_rank(&file.location).map(|rank| (rank, file)))
            .collect();
        // Stable: path order within one pattern
        members.sort_by_key(|(rank, _)| *rank);

        if members.is_empty() {
            let mut file = previous.unwrap_or_else(|| {
                let mut file = File::assembled(&path, &self.options.source, Vec::new());
                file.checksum = String::new();
                file
            });
            file.mark_removed();
            return file;
        }

        let mut content = Vec::new();
        for (_, member) in &members {
            content.extend_from_slice(&member.content);
            if !content.is_empty() && !content.ends_with(b"\n") {
                content.push(b'\n');
            }
        }

        let mut file = File::assembled(&path, &self.options.source, content);
        if let Some(previous) = previous {
            file.previous = if !previous.checksum.is_empty() && previous.checksum != file.checksum {
                previous.checksum
            } else {
                previous.previous
            };
        }

        file.related = members
            .iter()
            .map(|(_, member)| Related::found(RelatedKind::Member, false, "", "", member.path.clone()))
            .collect();

        let plugin = self.plugins.for_file(&file);
        if plugin.accepts_content() {
            match plugin.related(&file, &self.options) {
                Ok(related) => file
                    .related
                    .extend(related.into_iter().filter(|edge| !edge.dependency)),
                Err(e) => debug!("related"; "{}: {:#}", path.display(), e),
            }
        }
        file
    }
}
