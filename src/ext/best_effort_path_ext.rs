use std::path::{Component, Path, PathBuf};

/// Renders a path for error messages and logs.
///
/// Canonical form when the path exists; otherwise the path is made absolute
/// against the working directory and `.`/`..` are folded lexically. Never fails.
pub fn best_effort_path_display(path: &Path) -> String {
    if let Ok(canonical) = path.canonicalize() {
        return canonical.display().to_string();
    }

    let absolute = match (path.is_absolute(), std::env::current_dir()) {
        (false, Ok(cwd)) => cwd.join(path),
        _ => path.to_path_buf(),
    };
    lexically_normalize(&absolute).display().to_string()
}

fn lexically_normalize(path: &Path) -> PathBuf {
    path.components()
        .fold(Vec::new(), |mut parts, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if matches!(parts.last(), Some(Component::Normal(_))) {
                        parts.pop();
                    }
                }
                other => parts.push(other),
            }
            parts
        })
        .iter()
        .collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl<P: AsRef<Path> + ?Sized> BestEffortPathExt for P {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn existing_path_is_canonicalized() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        let dotted = temp_dir.path().join(".").join("sub").join("..");

        let expected = temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp directory");
        assert_eq!(dotted.best_effort_path_display(), expected.display().to_string());
    }

    #[test]
    fn missing_path_is_normalized_lexically() {
        let shown = Path::new("/does/not/./exist/../here").best_effort_path_display();
        assert_eq!(shown, Path::new("/does/not/here").display().to_string());
    }

    #[test]
    fn parent_components_never_escape_the_root() {
        let shown = Path::new("/../../nowhere-at-all").best_effort_path_display();
        assert_eq!(shown, Path::new("/nowhere-at-all").display().to_string());
    }
}
