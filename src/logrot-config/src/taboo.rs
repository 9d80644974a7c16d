//! Exclusion lists for directory includes.

use glob::Pattern;

/// Extensions excluded by default when including a directory.
pub const DEFAULT_TABOO_EXTENSIONS: &[&str] = &[".swp"];

/// File names skipped while scanning an included directory.
#[derive(Debug, Clone)]
pub struct TabooList {
    extensions: Vec<String>,
    patterns: Vec<Pattern>,
}

impl Default for TabooList {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_TABOO_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            patterns: Vec::new(),
        }
    }
}

/// `tabooext + a b` appends; `tabooext a b` replaces.
fn split_append(args: &[String]) -> (bool, &[String]) {
    match args.first().map(String::as_str) {
        Some("+") => (true, &args[1..]),
        _ => (false, args),
    }
}

impl TabooList {
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn update_extensions(&mut self, args: &[String]) {
        let (append, values) = split_append(args);
        if !append {
            self.extensions.clear();
        }
        self.extensions.extend(
            values
                .iter()
                .flat_map(|v| v.split(','))
                .filter(|v| !v.is_empty())
                .map(String::from),
        );
    }

    /// Returns the offending pattern and reason when a glob does not compile.
    pub fn update_patterns(&mut self, args: &[String]) -> Result<(), (String, String)> {
        let (append, values) = split_append(args);
        let mut compiled = Vec::with_capacity(values.len());
        for value in values {
            let pattern =
                Pattern::new(value).map_err(|e| (value.to_string(), e.msg.to_string()))?;
            compiled.push(pattern);
        }
        if !append {
            self.patterns.clear();
        }
        self.patterns.extend(compiled);
        Ok(())
    }

    pub fn is_taboo(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
            || self.patterns.iter().any(|p| p.matches(file_name))
    }
}
