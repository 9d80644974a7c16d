//! Configuration file parser.
//!
//! Grammar:
//!
//! ```text
//! # comment
//! <global directive>
//! include <file-or-directory>
//! <path> ["<path with spaces>" ...] {
//!     <directive>
//!     postrotate
//!         <script lines>
//!     endscript
//! }
//! ```
//!
//! Global directives seed the defaults copied into every section opened
//! after them. Lines are processed strictly top to bottom, across includes.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use logrot_common::expand_home_path;

use crate::directive::{self, Applied, Directive, DirectiveError};
use crate::error::{ConfigError, Result};
use crate::policy::{Policy, ScriptKind};
use crate::taboo::TabooList;

/// One `<paths> { ... }` block with its finished policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Path patterns exactly as written (after unquoting).
    pub patterns: Vec<String>,
    pub policy: Policy,
    /// File and line where the section was opened.
    pub source: PathBuf,
    pub line: usize,
}

/// Parsed configuration: sections in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub sections: Vec<Section>,
}

impl Config {
    /// Parse the given files or directories, in order, sharing global state.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut parser = ConfigParser::new();
        for path in paths {
            parser.parse_path(path.as_ref())?;
        }
        Ok(parser.finish())
    }
}

/// Splits a line into words; single or double quotes group words with spaces.
pub fn tokenize(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("unterminated {} quote", q));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// A bare path line waiting for its `{` on the following line.
fn looks_like_path(token: &str) -> bool {
    token.starts_with(['/', '~', '.'])
        || token.contains(['/', '\\', '*', '?', '['])
        || token.chars().nth(1) == Some(':')
}

struct OpenSection {
    patterns: Vec<String>,
    policy: Policy,
    line: usize,
}

struct OpenScript {
    kind: ScriptKind,
    lines: Vec<String>,
    line: usize,
}

/// Stateful parser; global defaults and taboo lists persist across files.
#[derive(Debug)]
pub struct ConfigParser {
    defaults: Policy,
    taboo: TabooList,
    sections: Vec<Section>,
    include_stack: Vec<PathBuf>,
    seen_includes: HashSet<PathBuf>,
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigParser {
    pub fn new() -> Self {
        Self {
            defaults: Policy::default(),
            taboo: TabooList::default(),
            sections: Vec::new(),
            include_stack: Vec::new(),
            seen_includes: HashSet::new(),
        }
    }

    /// Current global defaults.
    pub fn defaults(&self) -> &Policy {
        &self.defaults
    }

    pub fn taboo(&self) -> &TabooList {
        &self.taboo
    }

    pub fn finish(self) -> Config {
        Config {
            sections: self.sections,
        }
    }

    /// Parse a configuration file, or every eligible file in a directory.
    pub fn parse_path(&mut self, path: &Path) -> Result<()> {
        let metadata = fs::metadata(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if metadata.is_dir() {
            self.parse_directory(path)
        } else {
            self.parse_file(path)
        }
    }

    fn parse_directory(&mut self, dir: &Path) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                let taboo = self.taboo.is_taboo(name);
                if taboo {
                    debug!(path = %path.display(), "Skipping taboo include");
                }
                !taboo
            })
            .collect();

        // Directory scans are applied in reverse-alphabetical order.
        files.sort_by(|a, b| b.cmp(a));

        for file in files {
            self.parse_file(&file)?;
        }
        Ok(())
    }

    fn parse_file(&mut self, path: &Path) -> Result<()> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.include_stack.contains(&key) {
            return Err(ConfigError::IncludeCycle(path.to_path_buf()));
        }
        if !self.seen_includes.insert(key.clone()) {
            debug!(path = %path.display(), "Configuration file already read, skipping");
            return Ok(());
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.include_stack.push(key);
        let result = self.parse_str(path, &text);
        self.include_stack.pop();
        result
    }

    /// Parse configuration text; `source` is used for error locations and
    /// for resolving relative includes.
    pub fn parse_str(&mut self, source: &Path, text: &str) -> Result<()> {
        debug!(path = %source.display(), "Parsing configuration");

        let syntax = |line: usize, message: String| ConfigError::Syntax {
            path: source.to_path_buf(),
            line,
            message,
        };

        let mut section: Option<OpenSection> = None;
        let mut script: Option<OpenScript> = None;
        let mut pending_patterns: Option<(Vec<String>, usize)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;

            if let Some(open) = script.as_mut() {
                if raw.trim().eq_ignore_ascii_case("endscript") {
                    let finished = script.take().map(|s| (s.kind, s.lines));
                    if let Some((kind, lines)) = finished {
                        let target = match section.as_mut() {
                            Some(s) => &mut s.policy,
                            None => &mut self.defaults,
                        };
                        target.scripts.set(kind, lines);
                    }
                } else {
                    open.lines.push(raw.to_string());
                }
                continue;
            }

            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line == "}" {
                match section.take() {
                    Some(open) => {
                        trace!(patterns = ?open.patterns, "Closing section");
                        self.sections.push(Section {
                            patterns: open.patterns,
                            policy: open.policy,
                            source: source.to_path_buf(),
                            line: open.line,
                        });
                    }
                    None => return Err(syntax(line_no, "unexpected '}'".to_string())),
                }
                continue;
            }

            if let Some(head) = line.strip_suffix('{') {
                if section.is_some() {
                    return Err(syntax(line_no, "sections cannot be nested".to_string()));
                }
                let mut patterns = tokenize(head).map_err(|m| syntax(line_no, m))?;
                let mut opened_at = line_no;
                if patterns.is_empty() {
                    match pending_patterns.take() {
                        Some((pending, at)) => {
                            patterns = pending;
                            opened_at = at;
                        }
                        None => {
                            return Err(syntax(line_no, "section has no log paths".to_string()));
                        }
                    }
                } else if let Some((pending, at)) = pending_patterns.take() {
                    return Err(syntax(
                        at,
                        format!("paths {:?} are not followed by '{{'", pending),
                    ));
                }
                section = Some(OpenSection {
                    patterns,
                    policy: self.defaults.clone(),
                    line: opened_at,
                });
                continue;
            }

            let tokens = tokenize(line).map_err(|m| syntax(line_no, m))?;
            let Some(first) = tokens.first() else {
                continue;
            };
            let keyword = first.to_ascii_lowercase();

            if section.is_none() && !directive::is_known(&keyword) && looks_like_path(first) {
                if let Some((pending, at)) = pending_patterns.take() {
                    return Err(syntax(
                        at,
                        format!("paths {:?} are not followed by '{{'", pending),
                    ));
                }
                pending_patterns = Some((tokens, line_no));
                continue;
            }
            if let Some((pending, at)) = pending_patterns.take() {
                return Err(syntax(
                    at,
                    format!("paths {:?} are not followed by '{{'", pending),
                ));
            }

            let raw_args = line[first_token_len(line)..].trim();
            let args = &tokens[1..];

            match keyword.as_str() {
                "include" => {
                    if section.is_some() {
                        return Err(syntax(
                            line_no,
                            "include is not allowed inside a section".to_string(),
                        ));
                    }
                    let Some(target) = args.first() else {
                        return Err(ConfigError::MissingArgument {
                            path: source.to_path_buf(),
                            line: line_no,
                            directive: keyword.clone(),
                        });
                    };
                    self.include(source, line_no, target)?;
                }
                "tabooext" => self.taboo.update_extensions(args),
                "taboopat" => self
                    .taboo
                    .update_patterns(args)
                    .map_err(|(value, reason)| ConfigError::InvalidArgument {
                        path: source.to_path_buf(),
                        line: line_no,
                        directive: keyword.clone(),
                        value,
                        reason,
                    })?,
                "endscript" => {
                    return Err(syntax(line_no, "endscript without a script block".to_string()));
                }
                _ => {
                    let target = match section.as_mut() {
                        Some(s) => &mut s.policy,
                        None => &mut self.defaults,
                    };
                    let d = Directive {
                        keyword: &keyword,
                        args,
                        raw_args,
                    };
                    match directive::apply(target, &d) {
                        Ok(Applied::Done) => {}
                        Ok(Applied::BeginScript(kind)) => {
                            script = Some(OpenScript {
                                kind,
                                lines: Vec::new(),
                                line: line_no,
                            });
                        }
                        Err(err) => return Err(directive_error(source, line_no, &keyword, err)),
                    }
                }
            }
        }

        if let Some(open) = script {
            return Err(ConfigError::UnterminatedScript {
                path: source.to_path_buf(),
                line: open.line,
            });
        }
        if let Some(open) = section {
            return Err(ConfigError::UnterminatedSection {
                path: source.to_path_buf(),
                line: open.line,
            });
        }
        if let Some((pending, at)) = pending_patterns {
            return Err(syntax(
                at,
                format!("paths {:?} are not followed by '{{'", pending),
            ));
        }
        Ok(())
    }

    fn include(&mut self, source: &Path, line: usize, target: &str) -> Result<()> {
        let expanded = expand_home_path(Path::new(target)).map_err(|e| {
            ConfigError::InvalidArgument {
                path: source.to_path_buf(),
                line,
                directive: "include".to_string(),
                value: target.to_string(),
                reason: e.to_string(),
            }
        })?;
        let resolved = if expanded.is_relative() {
            source
                .parent()
                .map(|dir| dir.join(&expanded))
                .unwrap_or(expanded)
        } else {
            expanded
        };

        if !resolved.exists() {
            return Err(ConfigError::IncludeNotFound {
                path: source.to_path_buf(),
                line,
                target: resolved,
            });
        }

        debug!(target = %resolved.display(), "Including configuration");
        self.parse_path(&resolved)
    }
}

/// Byte length of the first word of `line`, quotes included.
fn first_token_len(line: &str) -> usize {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c.is_whitespace() => return i,
            None => {}
        }
    }
    line.len()
}

fn directive_error(source: &Path, line: usize, keyword: &str, err: DirectiveError) -> ConfigError {
    match err {
        DirectiveError::Unknown => ConfigError::UnknownDirective {
            path: source.to_path_buf(),
            line,
            directive: keyword.to_string(),
        },
        DirectiveError::MissingArgument => ConfigError::MissingArgument {
            path: source.to_path_buf(),
            line,
            directive: keyword.to_string(),
        },
        DirectiveError::InvalidArgument { value, reason } => ConfigError::InvalidArgument {
            path: source.to_path_buf(),
            line,
            directive: keyword.to_string(),
            value,
            reason,
        },
    }
}
