use crate::context::ExecutionContext;
use log::debug;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Resolve a program name the way every context does.
///
/// Locations are tried in order and the first executable candidate wins:
/// - the process's own current directory,
/// - the context's `cwd`,
/// - each directory of the context's search path, in list order.
///
/// Names starting with `/` are used as-is at every step. Returns `None` when no
/// location holds an executable file; callers report that as "command not found".
pub fn resolve(context: &ExecutionContext, name: &str) -> Option<PathBuf> {
    let process_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_from(&process_dir, context, name)
}

/// Same as [`resolve`], with the process directory supplied by the caller.
pub fn resolve_from(process_dir: &Path, context: &ExecutionContext, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let bases = [Path::new(context.cwd())]
        .into_iter()
        .chain(context.search_path().iter().map(Path::new))
        .map(|base| process_dir.join(base));

    for base in std::iter::once(process_dir.to_path_buf()).chain(bases) {
        if let Some(found) = resolve_path(&base, name) {
            debug!("resolved {name} to {}", found.display());
            return Some(found);
        }
    }

    debug!("{name} not found in {} locations", context.search_path().len() + 2);
    None
}

/// Join `name` onto `base` and keep the result if it is an executable file.
pub fn resolve_path(base: &Path, name: &str) -> Option<PathBuf> {
    let candidate = base.join(name);
    if is_executable(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

/// A regular (non-directory) file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => access(path, libc::X_OK),
        _ => false,
    }
}

/// A directory the current user may search, i.e. `cd` into.
pub fn is_searchable_dir(path: &Path) -> bool {
    path.is_dir() && access(path, libc::X_OK)
}

fn access(path: &Path, mode: libc::c_int) -> bool {
    let Ok(raw) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: `raw` is a valid NUL-terminated string that outlives the call.
    unsafe { libc::access(raw.as_ptr(), mode) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_script;
    use std::fs;

    fn context_with(cwd: &Path, search: &[&Path]) -> ExecutionContext {
        let search: Vec<String> = search
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        ExecutionContext::create(&search, &cwd.to_string_lossy()).expect("context")
    }

    #[test]
    fn process_dir_wins_over_context_and_search_path() {
        let process = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        for dir in [process.path(), cwd.path(), bin.path()] {
            write_script(dir, "tool", "exit 0");
        }

        let ctx = context_with(cwd.path(), &[bin.path()]);
        let found = resolve_from(process.path(), &ctx, "tool").expect("resolves");
        assert_eq!(found, process.path().join("tool"));
    }

    #[test]
    fn context_cwd_wins_over_search_path() {
        let process = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        write_script(cwd.path(), "tool", "exit 0");
        write_script(bin.path(), "tool", "exit 0");

        let ctx = context_with(cwd.path(), &[bin.path()]);
        let found = resolve_from(process.path(), &ctx, "tool").expect("resolves");
        assert_eq!(found, cwd.path().join("tool"));
    }

    #[test]
    fn search_path_is_walked_in_order() {
        let process = tempfile::tempdir().unwrap();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_script(second.path(), "tool", "exit 0");

        let ctx = context_with(process.path(), &[first.path(), second.path()]);
        let found = resolve_from(process.path(), &ctx, "tool").expect("resolves");
        assert_eq!(found, second.path().join("tool"));

        write_script(first.path(), "tool", "exit 0");
        let found = resolve_from(process.path(), &ctx, "tool").expect("resolves");
        assert_eq!(found, first.path().join("tool"));
    }

    #[test]
    fn non_executable_files_and_directories_are_skipped() {
        let process = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        fs::write(process.path().join("tool"), "not a program").unwrap();
        fs::create_dir(process.path().join("subdir")).unwrap();

        let ctx = context_with(process.path(), &[bin.path()]);
        assert!(resolve_from(process.path(), &ctx, "tool").is_none());
        assert!(resolve_from(process.path(), &ctx, "subdir").is_none());
    }

    #[test]
    fn absolute_names_are_used_as_is() {
        let process = tempfile::tempdir().unwrap();
        let ctx = context_with(process.path(), &[]);
        assert_eq!(
            resolve_from(process.path(), &ctx, "/bin/sh"),
            Some(PathBuf::from("/bin/sh"))
        );
        assert!(resolve_from(process.path(), &ctx, "/bin/does-not-exist").is_none());
    }

    #[test]
    fn unknown_and_empty_names_do_not_resolve() {
        let process = tempfile::tempdir().unwrap();
        let ctx = context_with(process.path(), &[Path::new("/bin"), Path::new("/usr/bin")]);
        assert!(resolve_from(process.path(), &ctx, "surely-not-a-command-1234").is_none());
        assert!(resolve_from(process.path(), &ctx, "").is_none());
    }

    #[test]
    fn relative_search_entries_are_taken_from_the_process_dir() {
        let process = tempfile::tempdir().unwrap();
        fs::create_dir(process.path().join("bin")).unwrap();
        write_script(&process.path().join("bin"), "tool", "exit 0");
        let elsewhere = tempfile::tempdir().unwrap();

        let ctx = ExecutionContext::create(
            &["bin".to_string()],
            &elsewhere.path().to_string_lossy(),
        )
        .unwrap();
        let found = resolve_from(process.path(), &ctx, "tool").expect("resolves");
        assert_eq!(found, process.path().join("bin").join("tool"));
        assert!(found.is_absolute());
        assert!(resolve_from(elsewhere.path(), &ctx, "tool").is_none());
    }
}
