//! Task-data references (`$field`, `$items[0].text`).

use serde_json::Value;

/// Resolves a dotted/bracketed path (`items[2].text`, `items.2.text`)
/// against task data.
pub fn resolve_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path_segments(path)? {
        current = match segment {
            Segment::Key(key) => current.get(key)?,
            Segment::Index(idx) => match current {
                Value::Array(items) => items.get(idx)?,
                Value::Object(map) => map.get(&idx.to_string())?,
                _ => return None,
            },
        };
    }
    Some(current)
}

/// Resolves a `$reference` against task data.
///
/// The leading `$` is optional.
pub fn resolve_reference<'a>(data: &'a Value, reference: &str) -> Option<&'a Value> {
    let path = reference.trim();
    let path = path.strip_prefix('$').unwrap_or(path);
    if path.is_empty() {
        return None;
    }
    resolve_path(data, path)
}

/// Substitutes every `$reference` inside `template`.
///
/// A template consisting of exactly one reference resolves to the referenced
/// value itself (which may be an array or object). Otherwise each resolvable
/// reference is replaced by its string form; unresolvable references are left
/// untouched.
pub fn substitute_variables(template: &str, data: &Value) -> Value {
    let refs = find_references(template);

    if let [(start, end)] = refs.as_slice() {
        if *start == 0 && *end == template.len() {
            if let Some(value) = resolve_reference(data, &template[*start..*end]) {
                return value.clone();
            }
        }
    }

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for (start, end) in refs {
        out.push_str(&template[cursor..start]);
        let reference = &template[start..end];
        match resolve_reference(data, reference) {
            Some(Value::String(s)) => out.push_str(s),
            Some(Value::Null) | None => out.push_str(reference),
            Some(other) => out.push_str(&other.to_string()),
        }
        cursor = end;
    }
    out.push_str(&template[cursor..]);
    Value::String(out)
}

/// Byte ranges of `$reference` tokens in `text`.
fn find_references(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i + 1;
        while end < bytes.len() && is_reference_byte(bytes[end]) {
            end += 1;
        }
        // A trailing dot ends the sentence, not the path.
        while end > start + 1 && bytes[end - 1] == b'.' {
            end -= 1;
        }
        if end > start + 1 && is_ident_start(bytes[start + 1]) {
            out.push((start, end));
        }
        i = end.max(start + 1);
    }
    out
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_reference_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'[' | b']' | b'-')
}

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn path_segments(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut out = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return None;
        }
        let (key, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !key.is_empty() {
            match key.parse::<usize>() {
                Ok(idx) if !out.is_empty() => out.push(Segment::Index(idx)),
                _ => out.push(Segment::Key(key)),
            }
        }
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[')?;
            let close = inner.find(']')?;
            let idx = inner[..close].trim().parse::<usize>().ok()?;
            out.push(Segment::Index(idx));
            rest = &inner[close + 1..];
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task() -> Value {
        json!({
            "text": "Hello",
            "utterances": [{"text": "hi"}, {"text": "bye"}],
            "meta": {"lang": "en"}
        })
    }

    #[test]
    fn resolves_nested_paths() {
        let data = task();
        assert_eq!(resolve_reference(&data, "$text"), Some(&json!("Hello")));
        assert_eq!(
            resolve_reference(&data, "$utterances[1].text"),
            Some(&json!("bye"))
        );
        assert_eq!(
            resolve_reference(&data, "$utterances.0.text"),
            Some(&json!("hi"))
        );
        assert_eq!(resolve_reference(&data, "$missing"), None);
        assert_eq!(resolve_reference(&data, "$utterances[9]"), None);
    }

    #[test]
    fn whole_reference_keeps_value_type() {
        let data = task();
        let value = substitute_variables("$utterances", &data);
        assert!(value.is_array());
    }

    #[test]
    fn interpolates_inside_text() {
        let data = task();
        let value = substitute_variables("Say $text in $meta.lang.", &data);
        assert_eq!(value, json!("Say Hello in en."));
    }

    #[test]
    fn leaves_unknown_references() {
        let data = task();
        let value = substitute_variables("cost: $5 and $nope", &data);
        assert_eq!(value, json!("cost: $5 and $nope"));
    }
}
