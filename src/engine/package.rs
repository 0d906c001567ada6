//! Package selection.
//!
//! A package is a file that produces its own artifact: anything that is not
//! the target of some dependency edge and passes the source include/exclude
//! filter, plus every configured bundle. Dependency targets are built (and
//! deleted) through their owner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use super::Engine;

impl Engine {
    /// Targets of every dependency edge in the registry.
    fn dependency_targets(&self) -> FxHashSet<&Path> {
        self.registry
            .iter()
            .flat_map(|file| &file.related)
            .filter(|edge| edge.dependency)
            .map(|edge| edge.target.as_path())
            .collect()
    }

    /// All packages in path order, bundles last, including ones whose
    /// source is gone.
    pub fn packages(&self) -> Vec<PathBuf> {
        let ignored = self.dependency_targets();
        self.registry
            .iter()
            .filter(|file| !ignored.contains(file.path.as_path()))
            .filter(|file| self.options.is_selected(&file.location))
            .map(|file| file.path.clone())
            .chain(self.bundles.keys().cloned())
            .collect()
    }

    pub fn is_package(&self, path: &Path) -> bool {
        if self.bundles.contains_key(path) {
            return true;
        }
        let Some(file) = self.registry.get(path) else {
            return false;
        };
        self.options.is_selected(&file.location) && !self.dependency_targets().contains(path)
    }

    /// Find the package `path` belongs to.
    ///
    /// `path` may be a source path or a destination path. A package maps to
    /// itself; a dependency maps to the last package (in path order) whose
    /// dependency closure contains it. Unknown paths map to nothing.
    pub fn locate_package(&self, path: &Path) -> Option<PathBuf> {
        let candidate = self.source_path(path)?;
        if self.is_package(&candidate) {
            return Some(candidate);
        }

        self.packages()
            .into_iter()
            .rfind(|package| self.dependency_closure(package).contains(&candidate))
    }

    /// Map a destination path back to the source file that produces it.
    fn source_path(&self, path: &Path) -> Option<PathBuf> {
        if self.lookup(path).is_some() {
            return Some(path.to_path_buf());
        }
        let found = self
            .registry
            .iter()
            .chain(self.bundles.values())
            .find(|f| f.destination == path);
        if let Some(file) = found {
            return Some(file.path.clone());
        }
        let location = path.strip_prefix(&self.options.destination).ok()?;
        let source = self.options.source.join(location);
        self.lookup(&source).is_some().then_some(source)
    }

    /// Every file reachable from `root` through dependency edges.
    pub(super) fn dependency_closure(&self, root: &Path) -> FxHashSet<PathBuf> {
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([root.to_path_buf()]);

        while let Some(path) = queue.pop_front() {
            let Some(file) = self.lookup(&path) else {
                continue;
            };
            for edge in file.related.iter().filter(|e| e.dependency) {
                if edge.target != root && visited.insert(edge.target.clone()) {
                    queue.push_back(edge.target.clone());
                }
            }
        }

        visited
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::Project;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn test_partials_are_not_packages() {
        let mut project = Project::new(|_| {});
        project.write("scss/_b.scss", "$c: red;");
        project.write("scss/a.scss", "@import 'b';\nbody { color: $c; }");
        project.engine.index().unwrap();

        let packages = project.engine.packages();
        assert!(packages.contains(&project.src("scss/a.scss")));
        assert!(!packages.contains(&project.src("scss/_b.scss")));
    }

    #[test]
    fn test_siblings_are_not_packages() {
        let mut project = Project::new(|_| {});
        project.write("js/app.js", "export const a = 1;");
        project.write("js/app.js.map", "{}");
        project.write("js/app.d.ts", "export declare const a: number;");
        project.write("css/base.css", "a{}");
        project.write("css/main.css", "@import 'base.css';");
        project.engine.index().unwrap();

        let packages = project.engine.packages();
        assert_eq!(
            packages,
            vec![
                project.src("css/base.css"),
                project.src("css/main.css"),
                project.src("js/app.js"),
            ]
        );
    }

    #[test]
    fn test_exclude_and_include() {
        let mut project = Project::new(|o| {
            o.exclude.extend(["vendor/**"]);
            o.include.extend(["vendor/keep.js"]);
        });
        project.write("vendor/drop.js", "x");
        project.write("vendor/keep.js", "y");
        project.engine.index().unwrap();

        assert_eq!(project.engine.packages(), vec![project.src("vendor/keep.js")]);
    }

    #[test]
    fn test_locate_package() {
        let mut project = Project::new(|_| {});
        project.write("scss/_colors.scss", "$c: red;");
        project.write("scss/_theme.scss", "@use 'colors';");
        project.write("scss/main.scss", "@use 'theme';");
        project.write("js/app.js", "x");
        project.engine.index().unwrap();
        let engine = &project.engine;

        let main = project.src("scss/main.scss");
        assert_eq!(engine.locate_package(&main), Some(main.clone()));
        assert_eq!(engine.locate_package(&project.src("scss/_colors.scss")), Some(main));

        // Destination side maps back to the source
        let app = project.file("js/app.js").destination.clone();
        assert_eq!(engine.locate_package(&app), Some(project.src("js/app.js")));

        assert_eq!(engine.locate_package(&PathBuf::from("/elsewhere/x.js")), None);
    }

    #[test]
    fn test_shared_dependency_last_owner_wins() {
        let mut project = Project::new(|_| {});
        project.write("scss/_shared.scss", "$c: red;");
        project.write("scss/a.scss", "@use 'shared';");
        project.write("scss/b.scss", "@use 'shared';");
        project.engine.index().unwrap();

        assert_eq!(
            project.engine.locate_package(&project.src("scss/_shared.scss")),
            Some(project.src("scss/b.scss"))
        );
    }

    #[test]
    fn test_dependency_cycle_terminates() {
        let mut project = Project::new(|_| {});
        project.write("scss/_a.scss", "@use 'b';");
        project.write("scss/_b.scss", "@use 'a';");
        project.write("scss/main.scss", "@use 'a';");
        project.engine.index().unwrap();

        let closure = project.engine.dependency_closure(&project.src("scss/main.scss"));
        assert!(closure.contains(&project.src("scss/_a.scss")));
        assert!(closure.contains(&project.src("scss/_b.scss")));
        assert_eq!(
            project.engine.locate_package(&project.src("scss/_b.scss")),
            Some(project.src("scss/main.scss"))
        );
    }

    #[test]
    fn test_removed_package_still_located() {
        let mut project = Project::new(|_| {});
        let path = project.write("app.js", "x");
        project.engine.index().unwrap();
        fs::remove_file(&path).unwrap();
        project.engine.index().unwrap();

        assert_eq!(project.engine.locate_package(&path), Some(path));
    }
}
