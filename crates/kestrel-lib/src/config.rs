//! Per-project configuration.
//!
//! A `.kestrel` file of line directives, looked up from the document's
//! directory upward:
//!
//! ```text
//! SRC lib
//! SRC vendored/deps
//! FLG -w +a -strict-sequence
//! PKG widgets
//! SUFFIX .k .ki
//! STDLIB /usr/lib/kestrel
//! ```
//!
//! Flags the underlying compiler would accept but that are irrelevant to
//! analysis are kept for command-line compatibility and otherwise ignored.
//! A malformed file rejects requests for that buffer only; other buffers
//! are unaffected.

use std::path::{Path, PathBuf};

use crate::cache::FileCache;

pub const CONFIG_FILE_NAME: &str = ".kestrel";

/// Compiler flags accepted and ignored. `-w` consumes one argument.
const IGNORED_FLAGS: &[&str] = &[
    "-w",
    "-safe-string",
    "-strict-sequence",
    "-strict-formats",
    "-principal",
    "-short-paths",
    "-keep-locs",
    "-no-alias-deps",
    "-opaque",
    "-g",
];

const FLAGS_WITH_ARGUMENT: &[&str] = &["-w"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub include_paths: Vec<PathBuf>,
    pub flags: Vec<String>,
    pub packages: Vec<String>,
    /// Implementation/interface suffix pairs, e.g. `(".k", ".ki")`.
    pub suffixes: Vec<(String, String)>,
    pub stdlib: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}:{line}: {message}")]
pub struct ConfigError {
    pub path: String,
    pub line: usize,
    pub message: String,
}

/// Result of looking for a project configuration.
#[derive(Debug, Clone)]
pub enum Discovered {
    /// No configuration file anywhere above the document.
    None,
    /// Parsed successfully.
    Found(Config),
    /// Present but unusable: requests for this buffer are rejected.
    Invalid(ConfigError),
}

/// Walks parent directories from `document` looking for a config file.
///
/// I/O problems reading a file that exists are reported through
/// `notifications` and the search continues; analysis proceeds with the
/// information available.
pub fn discover(document: &Path, cache: &FileCache, notifications: &mut Vec<String>) -> Discovered {
    let start = if document.is_dir() {
        document
    } else {
        match document.parent() {
            Some(parent) => parent,
            None => return Discovered::None,
        }
    };
    for dir in start.ancestors() {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if !candidate.exists() {
            continue;
        }
        match cache.read(&candidate) {
            Ok(content) => {
                return match parse(&content, &candidate.display().to_string()) {
                    Ok(config) => Discovered::Found(config),
                    Err(err) => Discovered::Invalid(err),
                };
            }
            Err(io_err) => {
                notifications.push(format!("cannot read {}: {io_err}", candidate.display()));
            }
        }
    }
    Discovered::None
}

/// Parses a configuration file. `path` is only used in error messages.
pub fn parse(content: &str, path: &str) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    for (idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let error = |message: String| ConfigError {
            path: path.to_string(),
            line: idx + 1,
            message,
        };
        let (directive, rest) = match line.split_once(char::is_whitespace) {
            Some((d, rest)) => (d, rest.trim()),
            None => (line, ""),
        };
        match directive {
            "SRC" => {
                if rest.is_empty() {
                    return Err(error("SRC expects a directory".to_string()));
                }
                config.include_paths.push(PathBuf::from(rest));
            }
            "FLG" => {
                let flags: Vec<&str> = rest.split_whitespace().collect();
                validate_flags(&flags).map_err(error)?;
                config.flags.extend(flags.iter().map(|f| f.to_string()));
            }
            "PKG" => {
                if rest.is_empty() {
                    return Err(error("PKG expects a package name".to_string()));
                }
                config.packages.extend(rest.split_whitespace().map(String::from));
            }
            "SUFFIX" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(implementation), Some(interface), None) => {
                        if !implementation.starts_with('.') || !interface.starts_with('.') {
                            return Err(error("SUFFIX expects dotted extensions".to_string()));
                        }
                        config
                            .suffixes
                            .push((implementation.to_string(), interface.to_string()));
                    }
                    _ => {
                        return Err(error(
                            "SUFFIX expects an implementation and an interface extension"
                                .to_string(),
                        ));
                    }
                }
            }
            "STDLIB" => {
                if rest.is_empty() {
                    return Err(error("STDLIB expects a directory".to_string()));
                }
                config.stdlib = Some(PathBuf::from(rest));
            }
            other => {
                return Err(error(format!("unknown directive {other}")));
            }
        }
    }
    Ok(config)
}

fn validate_flags(flags: &[&str]) -> Result<(), String> {
    let mut i = 0;
    while i < flags.len() {
        let flag = flags[i];
        if flag.starts_with('-') {
            if !IGNORED_FLAGS.contains(&flag) {
                return Err(format!("unsupported flag {flag}"));
            }
            if FLAGS_WITH_ARGUMENT.contains(&flag) {
                i += 1;
                if i == flags.len() {
                    return Err(format!("{flag} expects an argument"));
                }
            }
        } else {
            return Err(format!("stray flag argument {flag}"));
        }
        i += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_directives() {
        let content = "# project config\nSRC lib\nSRC vendor\nFLG -w +a -principal\nPKG widgets base\nSUFFIX .k .ki\nSTDLIB /opt/kestrel\n";
        let config = parse(content, ".kestrel").unwrap();
        assert_eq!(config.include_paths.len(), 2);
        assert_eq!(config.flags, ["-w", "+a", "-principal"]);
        assert_eq!(config.packages, ["widgets", "base"]);
        assert_eq!(config.suffixes, [(".k".to_string(), ".ki".to_string())]);
        assert_eq!(config.stdlib.as_deref(), Some(Path::new("/opt/kestrel")));
    }

    #[test]
    fn empty_lines_and_comments_are_skipped() {
        let config = parse("\n# nothing here\n\n", ".kestrel").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn unknown_directive_is_rejected() {
        let err = parse("NOPE x\n", ".kestrel").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unknown directive"));
    }

    #[test]
    fn unsupported_flag_is_rejected() {
        let err = parse("FLG -unknown-thing\n", ".kestrel").unwrap_err();
        assert!(err.message.contains("unsupported flag"));
    }

    #[test]
    fn ignored_flags_pass_with_arguments() {
        let config = parse("FLG -w +a-4 -g -short-paths\n", ".kestrel").unwrap();
        assert_eq!(config.flags.len(), 4);
    }

    #[test]
    fn suffix_requires_two_dotted_parts() {
        assert!(parse("SUFFIX .k\n", ".kestrel").is_err());
        assert!(parse("SUFFIX k ki\n", ".kestrel").is_err());
    }
}
