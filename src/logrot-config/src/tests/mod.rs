//! Parser tests against whole configuration texts and file trees.

mod include_tests;

use std::path::Path;

use crate::{Config, ConfigParser, Result};

/// Parse `text` as if it were the file `/etc/logrot.conf`.
pub(crate) fn parse(text: &str) -> Result<Config> {
    let mut parser = ConfigParser::new();
    parser.parse_str(Path::new("/etc/logrot.conf"), text)?;
    Ok(parser.finish())
}
