use tracing::{debug, instrument};

/// Type of a JSON node found by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Byte span of a balanced JSON structure inside a larger text, with the
/// balanced structures nested in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonNode {
    pub start: usize,
    /// inclusive index of the closing bracket/brace
    pub end: usize,
    pub kind: NodeType,
    pub children: Vec<JsonNode>,
}

impl JsonNode {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..=self.end]
    }
}

struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<JsonNode>,
}

/// Find the balanced top-level objects and arrays in `text`.
///
/// Brackets inside string literals are ignored. A frame that is never closed,
/// or closed by the wrong bracket, is dropped and its finished children are
/// promoted to the top level, so prose like "the form {title, ..." or
/// "see [1}" does not hide a payload that follows it.
#[instrument(target = "vignette_quiz::json", skip(text), fields(text_len = text.len()))]
pub fn find_json_structures(text: &str) -> Vec<JsonNode> {
    let mut roots = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            // quotes only matter once we are inside a structure
            b'"' if !stack.is_empty() => in_string = true,
            b'{' => stack.push(Frame { start: i, kind: NodeType::Object, children: Vec::new() }),
            b'[' => stack.push(Frame { start: i, kind: NodeType::Array, children: Vec::new() }),
            b'}' | b']' => {
                let closing = if b == b'}' { NodeType::Object } else { NodeType::Array };
                let Some(frame) = stack.pop() else { continue };
                if frame.kind == closing {
                    let node = JsonNode {
                        start: frame.start,
                        end: i,
                        kind: frame.kind,
                        children: frame.children,
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => roots.push(node),
                    }
                } else {
                    stack.push(frame);
                    promote(&mut stack, &mut roots);
                }
            }
            _ => {}
        }
    }
    promote(&mut stack, &mut roots);

    debug!(target: "vignette_quiz::json", count = roots.len(), "found top-level structures");
    roots
}

fn promote(stack: &mut Vec<Frame>, roots: &mut Vec<JsonNode>) {
    for frame in stack.drain(..) {
        roots.extend(frame.children);
    }
}

/// Every JSON object in `text`, outer objects before the ones nested in them.
///
/// Handles bare JSON as well as JSON wrapped in prose or code fences.
pub fn object_candidates(text: &str) -> Vec<&str> {
    fn collect<'a>(text: &'a str, node: &JsonNode, out: &mut Vec<&'a str>) {
        if node.kind == NodeType::Object {
            out.push(node.slice(text));
        }
        for child in &node.children {
            collect(text, child, out);
        }
    }

    let mut out = Vec::new();
    for node in &find_json_structures(text) {
        collect(text, node, &mut out);
    }
    out
}
