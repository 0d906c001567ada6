//! Incremental rebuilds for filesystem events.

use std::path::{Path, PathBuf};

use super::{BuildError, BuildReport, Engine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// A normalized filesystem change inside the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

impl Engine {
    /// Apply one event to the registry and rebuild everything it affects.
    ///
    /// Affected packages are collected before and after the registry change:
    /// the first set still sees edges that are about to disappear, the second
    /// sees edges that a new file just satisfied.
    pub fn handle_event(&mut self, event: &WatchEvent) -> Vec<Result<BuildReport, BuildError>> {
        let paths = self.event_paths(event);
        let mut before = Vec::new();
        for path in &paths {
            self.collect_affected(path, &mut before);
        }

        match event.kind {
            ChangeKind::Created | ChangeKind::Modified => {
                let source = self.options.source.clone();
                let dir = event
                    .path
                    .parent()
                    .filter(|dir| dir.starts_with(&source))
                    .unwrap_or(&source)
                    .to_path_buf();
                self.registry.index_tree(&source, &dir, &self.options);
            }
            ChangeKind::Removed => {
                for path in &paths {
                    self.registry.remove(path);
                }
            }
        }
        self.resolve_references();
        self.resolve_bundles();
        self.resolve_destinations();

        let mut targets = Vec::new();
        for path in self.event_paths(event).into_iter().chain(paths) {
            self.collect_affected(&path, &mut targets);
        }
        for package in before {
            if !targets.contains(&package) {
                targets.push(package);
            }
        }

        targets.iter().map(|package| self.build(package)).collect()
    }

    /// Registry paths an event covers: the path itself, or every known file
    /// under it when a whole directory went away.
    fn event_paths(&self, event: &WatchEvent) -> Vec<PathBuf> {
        if event.kind != ChangeKind::Removed || self.registry.contains(&event.path) {
            return vec![event.path.clone()];
        }
        self.registry
            .iter()
            .filter(|file| file.exists && file.path.starts_with(&event.path))
            .map(|file| file.path.clone())
            .collect()
    }

    /// Append the packages to rebuild for a change to `path`: its own
    /// package first, then every existing package with an edge to `path` or
    /// to that package. A bundle picked up this way also pulls in the
    /// packages that reference the bundle.
    fn collect_affected(&self, path: &Path, out: &mut Vec<PathBuf>) {
        let located = self.locate_package(path);
        if let Some(package) = &located
            && !out.contains(package)
        {
            out.push(package.clone());
        }

        for package in self.packages() {
            let Some(file) = self.lookup(&package) else {
                continue;
            };
            if !file.exists || out.contains(&package) {
                continue;
            }
            let references = file
                .related
                .iter()
                .any(|edge| edge.target == path || Some(&edge.target) == located.as_ref());
            if references {
                out.push(package);
            }
        }

        let bundles: Vec<PathBuf> = out
            .iter()
            .filter(|package| self.bundles.contains_key(*package))
            .cloned()
            .collect();
        for package in self.packages() {
            if out.contains(&package) {
                continue;
            }
            let references = self
                .lookup(&package)
                .filter(|file| file.exists)
                .is_some_and(|file| file.related.iter().any(|edge| bundles.contains(&edge.target)));
            if references {
                out.push(package);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{Project, hash_of};
    use super::*;
    use std::fs;

    fn built(results: &[Result<BuildReport, BuildError>]) -> Vec<PathBuf> {
        results
            .iter()
            .map(|r| r.as_ref().unwrap().package.clone())
            .collect()
    }

    #[test]
    fn test_propagates_new_hash_to_referencer() {
        let mut project = Project::new(|o| o.development = true);
        let app = project.write("js/app.js", "console.log(1);");
        let index = project.write("index.html", r#"<script src="js/app.js"></script>"#);
        project.engine.index().unwrap();
        project.engine.build_all();

        fs::write(&app, "console.log(2);").unwrap();
        let results = project
            .engine
            .handle_event(&WatchEvent::new(ChangeKind::Modified, &app));

        assert_eq!(built(&results), vec![app.clone(), index.clone()]);

        let html = project.engine.registry().get(&index).unwrap().destination.clone();
        let output = fs::read_to_string(html).unwrap();
        let new = hash_of("console.log(2);");
        let old = hash_of("console.log(1);");
        assert_eq!(output, format!(r#"<script src="js/app.{new}.js"></script>"#));
        assert!(!project.dist(&format!("js/app.{old}.js")).exists());
        assert!(project.dist(&format!("js/app.{new}.js")).exists());
    }

    #[test]
    fn test_dependency_change_rebuilds_owner() {
        let mut project = Project::new(|_| {});
        project.write("app.js", "console.log(1);");
        let map = project.write("app.js.map", r#"{"version":3}"#);
        project.engine.index().unwrap();

        fs::write(&map, r#"{"version":3,"names":[]}"#).unwrap();
        let results = project
            .engine
            .handle_event(&WatchEvent::new(ChangeKind::Modified, &map));

        assert_eq!(built(&results), vec![project.src("app.js")]);
        let report = results[0].as_ref().unwrap();
        assert!(report.written.iter().any(|p| p.to_string_lossy().ends_with(".js.map")));
    }

    #[test]
    fn test_removal_deletes_and_propagates() {
        let mut project = Project::new(|o| o.development = true);
        let css = project.write("site.css", "a{}");
        let index = project.write("index.html", r#"<link href="site.css">"#);
        project.engine.index().unwrap();
        project.engine.build_all();

        fs::remove_file(&css).unwrap();
        let results = project
            .engine
            .handle_event(&WatchEvent::new(ChangeKind::Removed, &css));

        assert_eq!(built(&results), vec![css.clone(), index.clone()]);
        assert!(!results[0].as_ref().unwrap().deleted.is_empty());
        assert!(!project.dist(&format!("site.{}.css", hash_of("a{}"))).exists());

        // The reference is now dangling and left as written
        let html = project.engine.registry().get(&index).unwrap().destination.clone();
        assert_eq!(fs::read_to_string(html).unwrap(), r#"<link href="site.css">"#);
    }

    #[test]
    fn test_created_file_satisfies_dangling_reference() {
        let mut project = Project::new(|o| {
            o.development = true;
            o.hashed = false;
        });
        let index = project.write("index.html", r#"<script src="app.js"></script>"#);
        project.engine.index().unwrap();
        project.engine.build_all();

        let app = project.write("app.js", "console.log(1);");
        let results = project
            .engine
            .handle_event(&WatchEvent::new(ChangeKind::Created, &app));

        assert_eq!(built(&results), vec![app, index]);
        assert_eq!(project.outputs(), vec!["app.js", "index.html"]);
    }

    #[test]
    fn test_rename_is_remove_then_create() {
        let mut project = Project::new(|o| o.hashed = false);
        let old = project.write("css/old.css", "a{}");
        project.engine.index().unwrap();
        project.engine.build_all();

        let new = project.src("css/new.css");
        fs::rename(&old, &new).unwrap();
        project
            .engine
            .handle_event(&WatchEvent::new(ChangeKind::Removed, &old));
        project
            .engine
            .handle_event(&WatchEvent::new(ChangeKind::Created, &new));

        assert_eq!(project.outputs(), vec!["css/new.css"]);
    }

    #[test]
    fn test_directory_removal() {
        let mut project = Project::new(|o| o.hashed = false);
        project.write("img/a.svg", "<svg/>");
        project.write("img/b.svg", "<svg/>");
        project.write("keep.txt", "k");
        project.engine.index().unwrap();
        project.engine.build_all();

        fs::remove_dir_all(project.src("img")).unwrap();
        let results = project
            .engine
            .handle_event(&WatchEvent::new(ChangeKind::Removed, project.src("img")));

        assert_eq!(results.len(), 2);
        assert_eq!(project.outputs(), vec!["keep.txt"]);
    }

    #[test]
    fn test_unknown_path_builds_nothing() {
        let mut project = Project::new(|_| {});
        project.write("a.css", "a{}");
        project.engine.index().unwrap();

        let results = project
            .engine
            .handle_event(&WatchEvent::new(ChangeKind::Removed, project.src("never.css")));
        assert!(results.is_empty());
    }
}
