//! Text overlays
//!
//! Overlay text reaches the transcoder through two parsing levels: the
//! drawtext option value and the filter graph description. Text is reduced
//! to printable ASCII, quoted for the option level (single quotes become
//! `'\''`), and the whole option string is then escaped for the graph level.

/// Caption used when the request has none
pub const DEFAULT_CAPTION: &str = "Amazing Content!";

/// Call-to-action used when the request has none
pub const DEFAULT_CTA: &str = "Follow for more!";

/// Characters with meaning to the filter graph parser
const GRAPH_SPECIAL: &[char] = &['\\', '\'', '[', ']', ',', ';'];

/// Keep printable ASCII only, drop backslashes, collapse whitespace
pub fn sanitize(text: &str) -> String {
    let kept: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| (' '..='~').contains(c) && *c != '\\')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape single quotes for use inside a single-quoted value
pub fn escape_quotes(text: &str) -> String {
    text.replace('\'', r"'\''")
}

/// Quote a drawtext option value
pub fn quote_option_value(text: &str) -> String {
    format!("'{}'", escape_quotes(text))
}

/// Escape a filter's argument string for the graph level
pub fn escape_graph(args: &str) -> String {
    let mut out = String::with_capacity(args.len() + 8);
    for c in args.chars() {
        if GRAPH_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// One opaque-background text box
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub text: String,
    /// Vertical position expression
    pub y: &'static str,
    pub font_size: u32,
    pub box_color: &'static str,
    pub border: u32,
}

impl TextBox {
    /// Caption box near the top, dark background
    pub fn caption(text: &str) -> Self {
        Self {
            text: sanitized_or(text, DEFAULT_CAPTION),
            y: "80",
            font_size: 52,
            box_color: "black@0.7",
            border: 15,
        }
    }

    /// Call-to-action box near the bottom, accent background
    pub fn cta(text: &str) -> Self {
        Self {
            text: sanitized_or(text, DEFAULT_CTA),
            y: "h-150",
            font_size: 42,
            box_color: "red@0.8",
            border: 12,
        }
    }

    /// drawtext filter, ready to be joined into a graph
    pub fn filter(&self) -> String {
        let options = format!(
            "text={}:expansion=none:x=(w-text_w)/2:y={}:fontsize={}:fontcolor=white:box=1:boxcolor={}:boxborderw={}",
            quote_option_value(&self.text),
            self.y,
            self.font_size,
            self.box_color,
            self.border,
        );
        format!("drawtext={}", escape_graph(&options))
    }
}

fn sanitized_or(text: &str, fallback: &str) -> String {
    let clean = sanitize(text);
    if clean.is_empty() {
        fallback.to_string()
    } else {
        clean
    }
}
