//! Tiny wire helpers shared by the translators: AWS query-protocol form
//! decoding and the hand-built XML the legacy cloud APIs speak. The
//! emulated subsets are small and flat enough that a full XML parser
//! would be the heavier dependency.

use std::collections::HashMap;

pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Text content of the first `<tag>...</tag>` occurrence in `body`.
pub fn xml_text<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].trim())
}

/// Every `<tag>...</tag>` block (inner content) in document order.
pub fn xml_blocks<'a>(body: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut blocks = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find(&open) {
        let content_start = start + open.len();
        let Some(len) = rest[content_start..].find(&close) else {
            break;
        };
        blocks.push(&rest[content_start..content_start + len]);
        rest = &rest[content_start + len + close.len()..];
    }

    blocks
}

/// Decodes an `application/x-www-form-urlencoded` body (the AWS query
/// protocol) into a flat map. Later keys win; `+` means space.
pub fn parse_form(body: &str) -> HashMap<String, String> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    urlencoding::decode(&s).map(|c| c.into_owned()).unwrap_or(s)
}

/// Indexed members of an AWS query-protocol list parameter, e.g.
/// `InstanceId.1`, `InstanceId.2`, in index order.
pub fn form_list(form: &HashMap<String, String>, prefix: &str) -> Vec<String> {
    let mut members = Vec::new();
    for index in 1.. {
        match form.get(&format!("{prefix}.{index}")) {
            Some(value) => members.push(value.clone()),
            None => break,
        }
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_xml_metacharacters() {
        assert_eq!(xml_escape(r#"a<b>&"c""#), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn extracts_tag_text_and_blocks() {
        let body = "<Changes><Change><Action>CREATE</Action></Change><Change><Action>DELETE</Action></Change></Changes>";
        assert_eq!(xml_text(body, "Action"), Some("CREATE"));
        let changes = xml_blocks(body, "Change");
        assert_eq!(changes.len(), 2);
        assert_eq!(xml_text(changes[1], "Action"), Some("DELETE"));
    }

    #[test]
    fn parses_query_protocol_forms() {
        let form = parse_form("Action=SendMessage&MessageBody=hello+world&QueueUrl=https%3A%2F%2Fexample");
        assert_eq!(form.get("Action").unwrap(), "SendMessage");
        assert_eq!(form.get("MessageBody").unwrap(), "hello world");
        assert_eq!(form.get("QueueUrl").unwrap(), "https://example");
    }

    #[test]
    fn collects_indexed_list_members() {
        let form = parse_form("InstanceId.1=i-aaa&InstanceId.2=i-bbb");
        assert_eq!(form_list(&form, "InstanceId"), vec!["i-aaa", "i-bbb"]);
    }
}
