//! Filename pattern compiler
//!
//! Turns a user-authored template such as
//! `^{date}(_{direction})?_{phone_number}` into an anchored, case-insensitive
//! regular expression with one named capture group per placeholder.
//!
//! The template itself is regex syntax; only `{name}` tokens are rewritten.
//! The compiled [`Regex`] is stateless, so a single [`CompiledPattern`] can
//! be matched against any number of filenames.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Placeholders accepted in a filename template
///
/// User templates depend on these names; treat the list as append-only.
pub const SUPPORTED_PLACEHOLDERS: &[&str] = &[
    "date",
    "date:year",
    "date:year2",
    "date:month",
    "date:day",
    "date:hours",
    "date:minutes",
    "date:seconds",
    "date:ampm",
    "date:tzHours",
    "date:tzMinutes",
    "direction",
    "sim_slot",
    "phone_number",
    "caller_name",
    "contact_name",
    "call_log_name",
];

/// A named, well-known filename template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilenameTemplate {
    pub name: &'static str,
    pub pattern: &'static str,
}

/// Templates for the call recorders we know about
pub const WELL_KNOWN_TEMPLATES: &[FilenameTemplate] = &[
    FilenameTemplate {
        name: "BCR (Basic Call Recorder)",
        pattern: "^{date}(_{direction})?(_sim{sim_slot})?_{phone_number}(_{contact_name})?",
    },
    FilenameTemplate {
        name: "ColorOS call recorder",
        pattern: "^{contact_name}-{date:year2}{date:month}{date:day}{date:hours}{date:minutes}",
    },
    FilenameTemplate {
        name: "GrapheneOS call recorder",
        pattern: "^CallRecord_{date:year}{date:month}{date:day}-{date:hours}{date:minutes}{date:seconds}_{phone_number}",
    },
    FilenameTemplate {
        name: "Huawei call recorder",
        pattern: "^{contact_name}@{phone_number}_{date:year}{date:month}{date:day}{date:hours}{date:minutes}{date:seconds}",
    },
    FilenameTemplate {
        name: "LineageOS call app",
        pattern: "^{phone_number}_{date:year2}{date:month}{date:day}_{date:hours}{date:minutes}{date:seconds}",
    },
];

// ASCII names only; `\w` is Unicode-aware in the regex crate
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z0-9_:]+?)\}").expect("placeholder regex is valid")
});

/// Template errors
#[derive(Debug, Error)]
pub enum PatternError {
    /// Template has no `{placeholder}` at all
    #[error("No format variables found, please add at least one {{var}} to your format")]
    NoPlaceholders,

    /// Template uses a placeholder outside the supported vocabulary
    #[error("Unsupported variable {{{0}}}")]
    UnsupportedVariable(String),

    /// Expanded template is not a valid regular expression
    #[error("Invalid filename pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// A value a compiled pattern can capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternField {
    Year,
    Year2,
    Month,
    Day,
    Hours,
    Minutes,
    Seconds,
    AmPm,
    TzHours,
    TzMinutes,
    Direction,
    SimSlot,
    PhoneNumber,
    CallerName,
}

impl PatternField {
    /// Base capture group name
    pub fn group_name(self) -> &'static str {
        match self {
            PatternField::Year => "date_year",
            PatternField::Year2 => "date_year2",
            PatternField::Month => "date_month",
            PatternField::Day => "date_day",
            PatternField::Hours => "date_hours",
            PatternField::Minutes => "date_minutes",
            PatternField::Seconds => "date_seconds",
            PatternField::AmPm => "date_ampm",
            PatternField::TzHours => "date_tzHours",
            PatternField::TzMinutes => "date_tzMinutes",
            PatternField::Direction => "direction",
            PatternField::SimSlot => "sim_slot",
            PatternField::PhoneNumber => "phone_number",
            PatternField::CallerName => "caller_name",
        }
    }

    fn capture_pattern(self) -> &'static str {
        match self {
            PatternField::Year => r"[0-9]{4}",
            PatternField::Year2 => r"[0-9]{2}",
            PatternField::Month
            | PatternField::Day
            | PatternField::Hours
            | PatternField::Minutes
            | PatternField::TzMinutes => r"[0-9]{2}",
            PatternField::Seconds => r"[0-9]{2}(?:\.[0-9]{1,3})?",
            PatternField::TzHours => r"[+\-]?[0-9]{2}",
            PatternField::AmPm => "AM|PM",
            PatternField::Direction => "in|out|conference",
            PatternField::PhoneNumber => r"[0-9+\- ]+|unknown",
            PatternField::SimSlot => r"[0-9]+",
            PatternField::CallerName => ".*",
        }
    }
}

enum Placeholder {
    /// `{date}`: the full BCR timestamp
    Date,
    Field(PatternField),
}

fn resolve_placeholder(name: &str) -> Option<Placeholder> {
    let field = match name {
        "date" => return Some(Placeholder::Date),
        "date:year" => PatternField::Year,
        "date:year2" => PatternField::Year2,
        "date:month" => PatternField::Month,
        "date:day" => PatternField::Day,
        "date:hours" => PatternField::Hours,
        "date:minutes" => PatternField::Minutes,
        "date:seconds" => PatternField::Seconds,
        "date:ampm" => PatternField::AmPm,
        "date:tzHours" => PatternField::TzHours,
        "date:tzMinutes" => PatternField::TzMinutes,
        "direction" => PatternField::Direction,
        "sim_slot" => PatternField::SimSlot,
        "phone_number" => PatternField::PhoneNumber,
        "caller_name" | "contact_name" | "call_log_name" => PatternField::CallerName,
        _ => return None,
    };
    Some(Placeholder::Field(field))
}

/// Placeholder names in order of appearance, duplicates included
pub fn extract_placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Check a template against the placeholder vocabulary
pub fn validate_template(template: &str) -> Result<(), PatternError> {
    let placeholders = extract_placeholders(template);

    if placeholders.is_empty() {
        return Err(PatternError::NoPlaceholders);
    }

    if let Some(unsupported) = placeholders
        .into_iter()
        .find(|p| !SUPPORTED_PLACEHOLDERS.contains(&p.as_str()))
    {
        return Err(PatternError::UnsupportedVariable(unsupported));
    }

    Ok(())
}

/// Validate then compile: the gate for accepting a user-edited template
pub fn accept_template(template: &str) -> Result<CompiledPattern, PatternError> {
    validate_template(template)?;
    compile(template)
}

/// Compile a template into an anchored, case-insensitive regex
///
/// Unknown placeholders are kept verbatim (and logged); if that leaves
/// invalid regex syntax, the error surfaces here as [`PatternError::Regex`].
pub fn compile(template: &str) -> Result<CompiledPattern, PatternError> {
    let mut expander = Expander::default();

    if !template.starts_with('^') {
        expander.source.push('^');
    }

    let mut last = 0;
    for m in PLACEHOLDER_RE.find_iter(template) {
        expander.source.push_str(&template[last..m.start()]);

        let token = m.as_str();
        let name = &token[1..token.len() - 1];
        match resolve_placeholder(name) {
            Some(Placeholder::Date) => expander.push_date(),
            Some(Placeholder::Field(field)) => expander.push_field(field),
            None => {
                warn!(placeholder = %name, "Unsupported placeholder left as literal text");
                expander.source.push_str(token);
            }
        }

        last = m.end();
    }
    expander.source.push_str(&template[last..]);

    let regex = RegexBuilder::new(&expander.source)
        .case_insensitive(true)
        .build()?;

    Ok(CompiledPattern {
        template: template.to_string(),
        regex,
        groups: expander.groups,
    })
}

/// Accumulates regex source and the group names allotted to each field
#[derive(Default)]
struct Expander {
    source: String,
    groups: HashMap<PatternField, Vec<String>>,
}

impl Expander {
    fn push_field(&mut self, field: PatternField) {
        // repeated placeholders get suffixed names; regex rejects duplicates
        let names = self.groups.entry(field).or_default();
        let name = if names.is_empty() {
            field.group_name().to_string()
        } else {
            format!("{}__{}", field.group_name(), names.len() + 1)
        };

        self.source.push_str("(?P<");
        self.source.push_str(&name);
        self.source.push('>');
        self.source.push_str(field.capture_pattern());
        self.source.push(')');

        names.push(name);
    }

    /// `{date}` as BCR writes it: `20230518_171143.015+0100`
    ///
    /// The timezone suffix is optional.
    fn push_date(&mut self) {
        self.push_field(PatternField::Year);
        self.push_field(PatternField::Month);
        self.push_field(PatternField::Day);
        self.source.push('_');
        self.push_field(PatternField::Hours);
        self.push_field(PatternField::Minutes);
        self.push_field(PatternField::Seconds);
        self.source.push_str("(?:");
        self.push_field(PatternField::TzHours);
        self.push_field(PatternField::TzMinutes);
        self.source.push_str(")?");
    }
}

/// A compiled filename template
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    regex: Regex,
    groups: HashMap<PatternField, Vec<String>>,
}

impl CompiledPattern {
    /// Template this pattern was compiled from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expanded regex source
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    /// Match a filename base name
    ///
    /// When a field was captured by several groups (repeated placeholder),
    /// the last participating group wins.
    pub fn captures(&self, haystack: &str) -> Option<PatternMatch> {
        let caps = self.regex.captures(haystack)?;

        let values = self
            .groups
            .iter()
            .filter_map(|(field, names)| {
                names
                    .iter()
                    .rev()
                    .find_map(|name| caps.name(name))
                    .map(|m| (*field, m.as_str().to_string()))
            })
            .collect();

        Some(PatternMatch { values })
    }
}

/// Field values captured from one filename
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternMatch {
    values: HashMap<PatternField, String>,
}

impl PatternMatch {
    pub fn get(&self, field: PatternField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
