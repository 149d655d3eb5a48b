//! Path template parsing and resolution.

/// One piece of a parsed path template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied verbatim.
    Literal(&'a str),
    /// `{name}` placeholder.
    Placeholder(&'a str),
}

/// Splits a template such as `/repos/{owner}/{repo}` into segments.
///
/// # Errors
///
/// Returns a description of the problem for unbalanced braces or empty
/// placeholder names.
pub fn parse(template: &str) -> Result<Vec<Segment<'_>>, String> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        if rest[open..].starts_with('}') {
            return Err(format!("unmatched `}}` in `{template}`"));
        }
        if open > 0 {
            segments.push(Segment::Literal(&rest[..open]));
        }
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| format!("unclosed `{{` in `{template}`"))?;
        let name = &after[..close];
        if name.is_empty() || name.contains('{') {
            return Err(format!("malformed placeholder in `{template}`"));
        }
        segments.push(Segment::Placeholder(name));
        rest = &after[close + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    Ok(segments)
}

/// Returns the placeholder names of a template in order of appearance.
///
/// # Errors
///
/// See [`parse`].
pub fn placeholders(template: &str) -> Result<Vec<&str>, String> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Substitutes every placeholder using `lookup`.
///
/// Values are inserted exactly as returned, so callers are responsible for
/// percent-encoding.
///
/// # Errors
///
/// Returns the name of the first placeholder `lookup` cannot resolve, or the
/// parse error for a malformed template. A resolved path never contains a
/// leftover `{name}`.
pub fn resolve<F>(template: &str, mut lookup: F) -> Result<String, Unresolved>
where
    F: FnMut(&str) -> Option<String>,
{
    let segments = parse(template).map_err(Unresolved::Malformed)?;
    let mut resolved = String::with_capacity(template.len());

    for segment in segments {
        match segment {
            Segment::Literal(text) => resolved.push_str(text),
            Segment::Placeholder(name) => {
                let value = lookup(name).ok_or_else(|| Unresolved::Missing(name.to_owned()))?;
                resolved.push_str(&value);
            }
        }
    }

    Ok(resolved)
}

/// Reason a template could not be fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// No value for the named placeholder.
    Missing(String),
    /// The template itself is malformed.
    Malformed(String),
}
