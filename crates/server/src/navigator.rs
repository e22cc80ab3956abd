//! Filesystem navigator.
//!
//! Executes the directory-mutating commands against a tab's working
//! directory. Every argument path is lexically normalized (no `..` left
//! unresolved) before any filesystem primitive runs, so the directory a
//! tab displays always matches what was actually touched. When a sandbox
//! root is configured, resolved paths must stay inside it.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("{0}: No such file or directory")]
    NotFound(String),
    #[error("{0}: Not a directory")]
    NotADirectory(String),
    #[error("{0}: File exists")]
    AlreadyExists(String),
    #[error("{0}: Permission denied")]
    PermissionDenied(String),
    #[error("{0}: Operation not permitted")]
    Forbidden(String),
    #[error("{0}")]
    InvalidArguments(String),
}

/// Result of a navigator operation. `new_dir` is set only by `change_dir`.
#[derive(Debug)]
pub struct NavOutcome {
    pub output: String,
    pub new_dir: Option<PathBuf>,
}

impl NavOutcome {
    fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            new_dir: None,
        }
    }
}

pub struct Navigator {
    /// Target of `cd` with no arguments and of `~` expansion
    home: PathBuf,
    /// Optional jail; resolved paths may not leave it
    sandbox_root: Option<PathBuf>,
}

impl Navigator {
    pub fn new(home: PathBuf, sandbox_root: Option<PathBuf>) -> Self {
        Self { home, sandbox_root }
    }

    /// List entries of `cwd` or of a path argument. Supports `-a`
    /// (hidden entries) and `-l` (long format).
    pub fn list(&self, cwd: &Path, args: &[String]) -> Result<NavOutcome, NavigatorError> {
        let mut show_hidden = false;
        let mut long_format = false;
        let mut target: Option<&str> = None;
        for arg in args {
            if let Some(flags) = arg.strip_prefix('-') {
                show_hidden |= flags.contains('a');
                long_format |= flags.contains('l');
            } else {
                target = Some(arg);
            }
        }

        let path = match target {
            Some(arg) => self.resolve(cwd, arg)?,
            None => cwd.to_path_buf(),
        };

        let display = target.unwrap_or(".");
        let mut entries: Vec<(String, fs::Metadata)> = Vec::new();
        let read = fs::read_dir(&path).map_err(|e| map_io(e, display))?;
        for entry in read {
            let entry = entry.map_err(|e| map_io(e, display))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !show_hidden && name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().map_err(|e| map_io(e, &name))?;
            entries.push((name, meta));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        if entries.is_empty() {
            return Ok(NavOutcome::text("(empty directory)"));
        }

        let output = if long_format {
            entries
                .iter()
                .map(|(name, meta)| {
                    let kind = if meta.is_dir() { 'd' } else { '-' };
                    let mtime = meta
                        .modified()
                        .ok()
                        .map(|t| DateTime::<Local>::from(t).format("%b %d %H:%M").to_string())
                        .unwrap_or_else(|| "???".to_string());
                    let suffix = if meta.is_dir() { "/" } else { "" };
                    format!("{kind} {:>10} {mtime} {name}{suffix}", meta.len())
                })
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            entries
                .iter()
                .map(|(name, meta)| {
                    if meta.is_dir() {
                        format!("{name}/")
                    } else {
                        name.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
        };
        Ok(NavOutcome::text(output))
    }

    /// Resolve and validate a directory change. The new directory is
    /// committed by the caller only on success, so a failed `cd` leaves
    /// the session's directory untouched.
    pub fn change_dir(&self, cwd: &Path, args: &[String]) -> Result<NavOutcome, NavigatorError> {
        let target = match args.first() {
            Some(arg) => self.resolve(cwd, arg)?,
            None => self.home.clone(),
        };

        let display = args.first().map(String::as_str).unwrap_or("~");
        let meta = fs::metadata(&target).map_err(|e| map_io(e, &format!("cd: {display}")))?;
        if !meta.is_dir() {
            return Err(NavigatorError::NotADirectory(format!("cd: {display}")));
        }

        Ok(NavOutcome {
            output: format!("Changed directory to: {}", target.display()),
            new_dir: Some(target),
        })
    }

    pub fn print_working_dir(&self, cwd: &Path) -> NavOutcome {
        NavOutcome::text(cwd.display().to_string())
    }

    /// Create one or more directories; `-p` creates parents and tolerates
    /// existing targets.
    pub fn make_dir(&self, cwd: &Path, args: &[String]) -> Result<NavOutcome, NavigatorError> {
        let parents = args.iter().any(|a| a == "-p");
        let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with('-')).collect();
        if paths.is_empty() {
            return Err(NavigatorError::InvalidArguments(
                "mkdir: missing operand".into(),
            ));
        }

        let mut lines = Vec::new();
        for raw in paths {
            let path = self.resolve(cwd, raw)?;
            let result = if parents {
                fs::create_dir_all(&path)
            } else {
                fs::create_dir(&path)
            };
            result.map_err(|e| map_io(e, &format!("mkdir: {raw}")))?;
            lines.push(format!("Directory created: {}", path.display()));
        }
        Ok(NavOutcome::text(lines.join("\n")))
    }

    /// Remove an empty directory.
    pub fn remove_dir(&self, cwd: &Path, args: &[String]) -> Result<NavOutcome, NavigatorError> {
        let raw = args.first().ok_or_else(|| {
            NavigatorError::InvalidArguments("rmdir: missing operand".into())
        })?;
        let path = self.resolve(cwd, raw)?;
        self.guard_destructive(cwd, &path, raw)?;
        fs::remove_dir(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => NavigatorError::NotFound(format!("rmdir: {raw}")),
            io::ErrorKind::PermissionDenied => {
                NavigatorError::PermissionDenied(format!("rmdir: {raw}"))
            }
            _ => NavigatorError::InvalidArguments(format!(
                "rmdir: failed to remove '{raw}': Directory not empty"
            )),
        })?;
        Ok(NavOutcome::text(format!("Directory removed: {}", path.display())))
    }

    /// Remove files or directories. Directories require `-r`; `-f`
    /// silences missing targets. The filesystem root, the sandbox root,
    /// and the tab's own working directory are always refused.
    pub fn remove(&self, cwd: &Path, args: &[String]) -> Result<NavOutcome, NavigatorError> {
        let recursive = args.iter().any(|a| a == "-r" || a == "-rf" || a == "-fr");
        let force = args.iter().any(|a| a == "-f" || a == "-rf" || a == "-fr");
        let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with('-')).collect();
        if paths.is_empty() {
            return Err(NavigatorError::InvalidArguments("rm: missing operand".into()));
        }

        let mut lines = Vec::new();
        for raw in paths {
            let path = self.resolve(cwd, raw)?;
            self.guard_destructive(cwd, &path, raw)?;

            let meta = match fs::symlink_metadata(&path) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound && force => continue,
                Err(e) => return Err(map_io(e, &format!("rm: {raw}"))),
            };

            if meta.is_dir() {
                if !recursive {
                    return Err(NavigatorError::InvalidArguments(format!(
                        "rm: cannot remove '{raw}': Is a directory"
                    )));
                }
                fs::remove_dir_all(&path).map_err(|e| map_io(e, &format!("rm: {raw}")))?;
                lines.push(format!("Removed directory: {}", path.display()));
            } else {
                fs::remove_file(&path).map_err(|e| map_io(e, &format!("rm: {raw}")))?;
                lines.push(format!("Removed file: {}", path.display()));
            }
        }
        Ok(NavOutcome::text(lines.join("\n")))
    }

    /// Copy a file, or a directory tree with `-r`.
    pub fn copy(&self, cwd: &Path, args: &[String]) -> Result<NavOutcome, NavigatorError> {
        let recursive = args.iter().any(|a| a == "-r" || a == "-R");
        let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with('-')).collect();
        let [source_raw, dest_raw] = paths.as_slice() else {
            return Err(NavigatorError::InvalidArguments(
                "cp: missing file operand".into(),
            ));
        };

        let source = self.resolve(cwd, source_raw)?;
        let mut dest = self.resolve(cwd, dest_raw)?;

        let meta = fs::metadata(&source).map_err(|e| map_io(e, &format!("cp: {source_raw}")))?;
        if meta.is_dir() {
            if !recursive {
                return Err(NavigatorError::InvalidArguments(format!(
                    "cp: -r not specified; omitting directory '{source_raw}'"
                )));
            }
            if dest.exists() && !dest.is_dir() {
                return Err(NavigatorError::InvalidArguments(format!(
                    "cp: cannot overwrite non-directory '{dest_raw}' with directory '{source_raw}'"
                )));
            }
            copy_dir_recursive(&source, &dest).map_err(|e| map_io(e, &format!("cp: {source_raw}")))?;
        } else {
            if dest.is_dir() {
                if let Some(file_name) = source.file_name() {
                    dest = dest.join(file_name);
                }
            }
            fs::copy(&source, &dest).map_err(|e| map_io(e, &format!("cp: {source_raw}")))?;
        }

        Ok(NavOutcome::text(format!(
            "Copied: {} -> {}",
            source.display(),
            dest.display()
        )))
    }

    /// Move or rename. Same root/sandbox guard as `remove`.
    pub fn move_entry(&self, cwd: &Path, args: &[String]) -> Result<NavOutcome, NavigatorError> {
        let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with('-')).collect();
        let [source_raw, dest_raw] = paths.as_slice() else {
            return Err(NavigatorError::InvalidArguments(
                "mv: missing file operand".into(),
            ));
        };

        let source = self.resolve(cwd, source_raw)?;
        let mut dest = self.resolve(cwd, dest_raw)?;
        self.guard_destructive(cwd, &source, source_raw)?;

        let meta = fs::metadata(&source).map_err(|e| map_io(e, &format!("mv: {source_raw}")))?;
        if dest.is_dir() && !meta.is_dir() {
            if let Some(file_name) = source.file_name() {
                dest = dest.join(file_name);
            }
        }
        fs::rename(&source, &dest).map_err(|e| map_io(e, &format!("mv: {source_raw}")))?;

        Ok(NavOutcome::text(format!(
            "Moved: {} -> {}",
            source.display(),
            dest.display()
        )))
    }

    /// Print file contents.
    pub fn read_file(&self, cwd: &Path, args: &[String]) -> Result<NavOutcome, NavigatorError> {
        if args.is_empty() {
            return Err(NavigatorError::InvalidArguments("cat: missing operand".into()));
        }
        let mut chunks = Vec::new();
        for raw in args {
            let path = self.resolve(cwd, raw)?;
            if path.is_dir() {
                return Err(NavigatorError::InvalidArguments(format!(
                    "cat: {raw}: Is a directory"
                )));
            }
            let content =
                fs::read_to_string(&path).map_err(|e| map_io(e, &format!("cat: {raw}")))?;
            chunks.push(content);
        }
        Ok(NavOutcome::text(chunks.join("\n")))
    }

    /// Create an empty file (or update its mtime by re-appending nothing).
    pub fn touch(&self, cwd: &Path, args: &[String]) -> Result<NavOutcome, NavigatorError> {
        if args.is_empty() {
            return Err(NavigatorError::InvalidArguments(
                "touch: missing file operand".into(),
            ));
        }
        let mut lines = Vec::new();
        for raw in args {
            let path = self.resolve(cwd, raw)?;
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| map_io(e, &format!("touch: {raw}")))?;
            lines.push(format!("Touched file: {}", path.display()));
        }
        Ok(NavOutcome::text(lines.join("\n")))
    }

    /// Expand `~`, join relative paths onto `cwd`, normalize lexically,
    /// and enforce the sandbox boundary.
    fn resolve(&self, cwd: &Path, arg: &str) -> Result<PathBuf, NavigatorError> {
        let expanded = if arg == "~" {
            self.home.clone()
        } else if let Some(rest) = arg.strip_prefix("~/") {
            self.home.join(rest)
        } else {
            let path = Path::new(arg);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                cwd.join(path)
            }
        };

        let normalized = normalize(&expanded);

        if let Some(sandbox) = &self.sandbox_root {
            if !normalized.starts_with(sandbox) {
                // `..` walked above the jail: clamp ancestors back to the
                // root, reject unrelated paths.
                if sandbox.starts_with(&normalized) {
                    return Ok(sandbox.clone());
                }
                return Err(NavigatorError::Forbidden(arg.to_string()));
            }
        }
        Ok(normalized)
    }

    /// `rm`/`mv`/`rmdir` may never operate on the filesystem root, the
    /// sandbox root, or the directory the tab is standing in (the working
    /// directory must still exist after the operation).
    fn guard_destructive(&self, cwd: &Path, path: &Path, raw: &str) -> Result<(), NavigatorError> {
        if path.parent().is_none() {
            return Err(NavigatorError::Forbidden(raw.to_string()));
        }
        if cwd.starts_with(path) {
            return Err(NavigatorError::Forbidden(raw.to_string()));
        }
        if let Some(sandbox) = &self.sandbox_root {
            if path == sandbox.as_path() {
                return Err(NavigatorError::Forbidden(raw.to_string()));
            }
        }
        Ok(())
    }
}

/// Lexically fold `.` and `..` components. `..` at the root stays at the
/// root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::RootDir.as_os_str());
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn map_io(err: io::Error, what: &str) -> NavigatorError {
    match err.kind() {
        io::ErrorKind::NotFound => NavigatorError::NotFound(what.to_string()),
        io::ErrorKind::PermissionDenied => NavigatorError::PermissionDenied(what.to_string()),
        io::ErrorKind::AlreadyExists => NavigatorError::AlreadyExists(what.to_string()),
        _ => NavigatorError::InvalidArguments(format!("{what}: {err}")),
    }
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
