//! The directive keyword table.
//!
//! `apply` mutates a `Policy` for one directive line. Keywords that change
//! parser state rather than a policy (`include`, `tabooext`, `taboopat`) are
//! handled by the parser and only listed here so they are recognised.

use std::path::PathBuf;

use logrot_common::{expand_home_path, parse_size};

use crate::policy::{CreateMode, Disposition, MailTiming, Policy, Recreate, Schedule, ScriptKind};

/// Keywords handled by the parser itself.
pub const PARSER_DIRECTIVES: &[&str] = &["include", "tabooext", "taboopat", "endscript"];

/// Every keyword accepted by `apply`.
pub const POLICY_DIRECTIVES: &[&str] = &[
    "addextension",
    "compress",
    "compresscmd",
    "compressext",
    "compressoptions",
    "copy",
    "copytruncate",
    "create",
    "createolddir",
    "daily",
    "dateext",
    "dateformat",
    "datehourago",
    "dateyesterday",
    "delaycompress",
    "extension",
    "firstaction",
    "hourly",
    "ifempty",
    "ignoreduplicates",
    "lastaction",
    "mail",
    "mailfirst",
    "maillast",
    "maxage",
    "maxsize",
    "minage",
    "minsize",
    "minutes",
    "missingok",
    "monthly",
    "nocompress",
    "nocopy",
    "nocopytruncate",
    "nocreate",
    "nocreateolddir",
    "nodateext",
    "nodelaycompress",
    "nomail",
    "nomissingok",
    "noolddir",
    "nosharedscripts",
    "noshred",
    "nosmtpssl",
    "notifempty",
    "olddir",
    "postrotate",
    "prerotate",
    "preremove",
    "rotate",
    "sharedscripts",
    "shred",
    "shredcycles",
    "size",
    "smtpfrom",
    "smtpport",
    "smtpserver",
    "smtpssl",
    "smtpuser",
    "smtpuserpwd",
    "start",
    "uncompresscmd",
    "weekly",
    "yearly",
];

/// Whether `keyword` (lower-cased) is any known directive.
pub fn is_known(keyword: &str) -> bool {
    PARSER_DIRECTIVES.contains(&keyword) || POLICY_DIRECTIVES.contains(&keyword)
}

/// One tokenized directive line.
#[derive(Debug, Clone, Copy)]
pub struct Directive<'a> {
    /// Lower-cased keyword.
    pub keyword: &'a str,
    /// Whitespace/quote-split arguments.
    pub args: &'a [String],
    /// Argument text exactly as written after the keyword.
    pub raw_args: &'a str,
}

/// Why a directive could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    Unknown,
    MissingArgument,
    InvalidArgument { value: String, reason: String },
}

/// What the parser should do after a directive was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Done,
    /// Following lines up to `endscript` are the body of this script.
    BeginScript(ScriptKind),
}

type DirectiveResult<T> = Result<T, DirectiveError>;

fn first_arg<'a>(d: &Directive<'a>) -> DirectiveResult<&'a str> {
    d.args
        .first()
        .map(String::as_str)
        .ok_or(DirectiveError::MissingArgument)
}

fn invalid(value: &str, reason: impl Into<String>) -> DirectiveError {
    DirectiveError::InvalidArgument {
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn number_arg(d: &Directive<'_>) -> DirectiveResult<u32> {
    let raw = first_arg(d)?;
    raw.parse::<u32>()
        .map_err(|_| invalid(raw, "expected a non-negative integer"))
}

fn size_arg(d: &Directive<'_>) -> DirectiveResult<u64> {
    let raw = first_arg(d)?;
    parse_size(raw).map_err(|e| invalid(raw, e.to_string()))
}

fn path_arg(d: &Directive<'_>) -> DirectiveResult<PathBuf> {
    let raw = first_arg(d)?;
    expand_home_path(std::path::Path::new(raw)).map_err(|e| invalid(raw, e.to_string()))
}

/// Extensions are stored with exactly one leading dot.
fn dotted(ext: &str) -> String {
    format!(".{}", ext.trim_start_matches('.'))
}

fn parse_create(d: &Directive<'_>) -> DirectiveResult<CreateMode> {
    let mut mode = CreateMode::default();
    let mut args = d.args.iter();

    if let Some(raw) = args.next() {
        let parsed = u32::from_str_radix(raw, 8)
            .ok()
            .filter(|m| *m <= 0o7777)
            .ok_or_else(|| invalid(raw, "expected an octal mode such as 0640"))?;
        mode.mode = Some(parsed);
    }
    mode.owner = args.next().cloned();
    mode.group = args.next().cloned();
    Ok(mode)
}

/// Apply one directive to `policy`.
pub fn apply(policy: &mut Policy, d: &Directive<'_>) -> DirectiveResult<Applied> {
    match d.keyword {
        // Retention and scheduling
        "rotate" => policy.rotate = number_arg(d)?,
        "start" => policy.naming.start = number_arg(d)?,
        "maxage" => policy.max_age = number_arg(d)?,
        "minage" => policy.min_age = number_arg(d)?,
        "minutes" => {
            let minutes = number_arg(d)?;
            if minutes == 0 {
                return Err(invalid("0", "interval must be at least one minute"));
            }
            policy.schedule = Schedule::Minutes(minutes);
        }
        "hourly" => policy.schedule = Schedule::Hourly,
        "daily" => policy.schedule = Schedule::Daily,
        "weekly" => {
            let weekday = match d.args.first() {
                None => None,
                Some(raw) => match raw.parse::<u8>() {
                    Ok(7) => Some(0),
                    Ok(n) if n <= 6 => Some(n),
                    _ => return Err(invalid(raw, "weekday must be 0-7 (0 and 7 are Sunday)")),
                },
            };
            policy.schedule = Schedule::Weekly(weekday);
        }
        "monthly" => {
            let day = match d.args.first() {
                None => None,
                Some(raw) => match raw.parse::<u8>() {
                    Ok(n) if (1..=31).contains(&n) => Some(n),
                    _ => return Err(invalid(raw, "day of month must be 1-31")),
                },
            };
            policy.schedule = Schedule::Monthly(day);
        }
        "yearly" => policy.schedule = Schedule::Yearly,

        // Size thresholds
        "size" => policy.size = Some(size_arg(d)?),
        "minsize" => policy.minsize = Some(size_arg(d)?),
        "maxsize" => policy.maxsize = Some(size_arg(d)?),

        // Content and presence
        "ifempty" => policy.if_empty = true,
        "notifempty" => policy.if_empty = false,
        "missingok" => policy.missing_ok = true,
        "nomissingok" => policy.missing_ok = false,
        "ignoreduplicates" => policy.ignore_duplicates = true,

        // Disposition
        "copy" => policy.disposition = Disposition::Copy,
        "copytruncate" => policy.disposition = Disposition::CopyTruncate,
        "nocopy" => {
            if policy.disposition == Disposition::Copy {
                policy.disposition = Disposition::Rename;
            }
        }
        "nocopytruncate" => {
            if policy.disposition == Disposition::CopyTruncate {
                policy.disposition = Disposition::Rename;
            }
        }
        "create" => policy.recreate = Recreate::Create(parse_create(d)?),
        "nocreate" => policy.recreate = Recreate::Leave,

        // Naming
        "dateext" => policy.naming.dateext = true,
        "nodateext" => policy.naming.dateext = false,
        "dateformat" => policy.naming.dateformat = first_arg(d)?.to_string(),
        "dateyesterday" => policy.naming.dateyesterday = true,
        "datehourago" => policy.naming.datehourago = true,
        "extension" => policy.naming.extension = Some(dotted(first_arg(d)?)),
        "addextension" => policy.naming.add_extension = Some(dotted(first_arg(d)?)),

        // Compression
        "compress" => policy.compression.enabled = true,
        "nocompress" => policy.compression.enabled = false,
        "delaycompress" => policy.compression.delay = true,
        "nodelaycompress" => policy.compression.delay = false,
        "compresscmd" => policy.compression.command = Some(first_arg(d)?.to_string()),
        "uncompresscmd" => {
            policy.compression.uncompress_command = Some(first_arg(d)?.to_string())
        }
        "compressext" => {
            let ext = first_arg(d)?.trim_start_matches('.');
            if ext.is_empty() {
                return Err(invalid(first_arg(d)?, "extension must not be empty"));
            }
            policy.compression.extension = ext.to_string();
        }
        "compressoptions" => {
            policy.compression.options = shlex::split(d.raw_args)
                .ok_or_else(|| invalid(d.raw_args, "unbalanced quotes"))?;
        }

        // Relocation
        "olddir" => policy.olddir = Some(path_arg(d)?),
        "noolddir" => policy.olddir = None,
        "createolddir" => policy.create_olddir = true,
        "nocreateolddir" => policy.create_olddir = false,

        // Deletion
        "shred" => policy.shred.enabled = true,
        "noshred" => policy.shred.enabled = false,
        "shredcycles" => policy.shred.cycles = number_arg(d)?,

        // Scripts
        "sharedscripts" => policy.scripts.shared = true,
        "nosharedscripts" => policy.scripts.shared = false,
        "prerotate" | "postrotate" | "preremove" | "firstaction" | "lastaction" => {
            return ScriptKind::from_keyword(d.keyword)
                .map(Applied::BeginScript)
                .ok_or(DirectiveError::Unknown);
        }

        // Mail
        "mail" => policy.mail.address = Some(first_arg(d)?.to_string()),
        "nomail" => policy.mail.address = None,
        "mailfirst" => policy.mail.timing = MailTiming::First,
        "maillast" => policy.mail.timing = MailTiming::Last,
        "smtpserver" => policy.mail.smtp.server = Some(first_arg(d)?.to_string()),
        "smtpport" => {
            let raw = first_arg(d)?;
            policy.mail.smtp.port = raw
                .parse::<u16>()
                .map_err(|_| invalid(raw, "expected a port number"))?;
        }
        "smtpssl" => policy.mail.smtp.ssl = true,
        "nosmtpssl" => policy.mail.smtp.ssl = false,
        "smtpuser" => policy.mail.smtp.user = Some(first_arg(d)?.to_string()),
        "smtpuserpwd" => policy.mail.smtp.password = Some(first_arg(d)?.to_string()),
        "smtpfrom" => policy.mail.smtp.from = Some(first_arg(d)?.to_string()),

        _ => return Err(DirectiveError::Unknown),
    }
    Ok(Applied::Done)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(policy: &mut Policy, line: &str) -> DirectiveResult<Applied> {
        let mut parts = line.splitn(2, ' ');
        let keyword = parts.next().unwrap_or_default().to_string();
        let raw_args = parts.next().unwrap_or_default();
        let args: Vec<String> = raw_args.split_whitespace().map(String::from).collect();
        apply(
            policy,
            &Directive {
                keyword: &keyword,
                args: &args,
                raw_args,
            },
        )
    }

    #[test]
    fn test_every_policy_directive_is_known() {
        for keyword in POLICY_DIRECTIVES {
            assert!(is_known(keyword), "{keyword} missing from table");
        }
        assert!(is_known("include"));
        assert!(!is_known("rotat"));
    }

    #[test]
    fn test_last_directive_wins() {
        let mut policy = Policy::default();
        run(&mut policy, "create").unwrap();
        run(&mut policy, "nocreate").unwrap();
        assert_eq!(policy.recreate, Recreate::Leave);

        run(&mut policy, "copy").unwrap();
        run(&mut policy, "copytruncate").unwrap();
        assert_eq!(policy.disposition, Disposition::CopyTruncate);

        // nocopy does not undo copytruncate
        run(&mut policy, "nocopy").unwrap();
        assert_eq!(policy.disposition, Disposition::CopyTruncate);
        run(&mut policy, "nocopytruncate").unwrap();
        assert_eq!(policy.disposition, Disposition::Rename);

        run(&mut policy, "notifempty").unwrap();
        run(&mut policy, "ifempty").unwrap();
        assert!(policy.if_empty);
    }

    #[test]
    fn test_schedules() {
        let mut policy = Policy::default();
        run(&mut policy, "weekly").unwrap();
        assert_eq!(policy.schedule, Schedule::Weekly(None));
        run(&mut policy, "weekly 7").unwrap();
        assert_eq!(policy.schedule, Schedule::Weekly(Some(0)));
        run(&mut policy, "monthly 15").unwrap();
        assert_eq!(policy.schedule, Schedule::Monthly(Some(15)));
        run(&mut policy, "minutes 30").unwrap();
        assert_eq!(policy.schedule, Schedule::Minutes(30));

        assert!(run(&mut policy, "weekly 9").is_err());
        assert!(run(&mut policy, "monthly 0").is_err());
        assert!(run(&mut policy, "minutes 0").is_err());
    }

    #[test]
    fn test_sizes_and_numbers() {
        let mut policy = Policy::default();
        run(&mut policy, "size 100k").unwrap();
        run(&mut policy, "maxsize 1M").unwrap();
        run(&mut policy, "rotate 5").unwrap();
        assert_eq!(policy.size, Some(100 * 1024));
        assert_eq!(policy.maxsize, Some(1024 * 1024));
        assert_eq!(policy.rotate, 5);

        assert_eq!(run(&mut policy, "rotate"), Err(DirectiveError::MissingArgument));
        assert!(matches!(
            run(&mut policy, "rotate five"),
            Err(DirectiveError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_extensions_are_dotted() {
        let mut policy = Policy::default();
        run(&mut policy, "extension log").unwrap();
        run(&mut policy, "addextension .bak").unwrap();
        run(&mut policy, "compressext .bz2").unwrap();
        assert_eq!(policy.naming.extension.as_deref(), Some(".log"));
        assert_eq!(policy.naming.add_extension.as_deref(), Some(".bak"));
        assert_eq!(policy.compression.extension, "bz2");
    }

    #[test]
    fn test_create_mode() {
        let mut policy = Policy::default();
        run(&mut policy, "create 0640 www-data adm").unwrap();
        assert_eq!(
            policy.recreate,
            Recreate::Create(CreateMode {
                mode: Some(0o640),
                owner: Some("www-data".to_string()),
                group: Some("adm".to_string()),
            })
        );
        assert!(run(&mut policy, "create 0999").is_err());
    }

    #[test]
    fn test_compress_options_use_shell_words() {
        let mut policy = Policy::default();
        run(&mut policy, "compressoptions -9 --comment \"nightly run\"").unwrap();
        assert_eq!(
            policy.compression.options,
            vec!["-9", "--comment", "nightly run"]
        );
    }

    #[test]
    fn test_script_keywords_begin_blocks() {
        let mut policy = Policy::default();
        assert_eq!(
            run(&mut policy, "postrotate"),
            Ok(Applied::BeginScript(ScriptKind::PostRotate))
        );
        assert_eq!(run(&mut policy, "bogus"), Err(DirectiveError::Unknown));
    }
}
