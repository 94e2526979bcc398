use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head"];

const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

const CELL: &[&str] = &["td", "th"];

/// Approximates what a browser reports as an element's `innerText`: source
/// whitespace collapses (except inside `<pre>`), block boundaries and `<br>`
/// become line breaks, table cells are tab separated and blank lines
/// disappear. Lines outside `<pre>` are trimmed.
pub fn rendered_text(element: ElementRef<'_>) -> String {
    let mut buffer = TextBuffer::default();
    collect(element, &mut buffer, false);
    buffer.finish()
}

fn collect(element: ElementRef<'_>, out: &mut TextBuffer, preformatted: bool) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) if preformatted => out.push_verbatim(text),
            Node::Text(text) => out.push_collapsed(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.break_line();
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK.contains(&name);
                if block {
                    out.break_line();
                }
                collect(child_ref, out, preformatted || name == "pre");
                if CELL.contains(&name) {
                    out.end_cell();
                }
                if block {
                    out.break_line();
                }
            }
            _ => {}
        }
    }
}

#[derive(Default)]
struct TextBuffer {
    lines: Vec<String>,
    current: String,
    verbatim: bool,
}

impl TextBuffer {
    fn push_collapsed(&mut self, text: &str) {
        let collapsed = WHITESPACE_RUN.replace_all(text, " ");
        let at_boundary = self.current.is_empty() || self.current.ends_with(|c: char| c == ' ' || c == '\t');
        self.current.push_str(if at_boundary {
            collapsed.trim_start()
        } else {
            &collapsed[..]
        });
    }

    fn push_verbatim(&mut self, text: &str) {
        for (index, piece) in text.split('\n').enumerate() {
            if index > 0 {
                self.break_line();
            }
            self.current.push_str(piece.trim_end_matches('\r'));
            self.verbatim = true;
        }
    }

    fn end_cell(&mut self) {
        let kept = self.current.trim_end_matches(' ').len();
        self.current.truncate(kept);
        self.current.push('\t');
    }

    fn break_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        let verbatim = std::mem::take(&mut self.verbatim);
        if line.trim().is_empty() {
            return;
        }
        if verbatim {
            self.lines.push(line);
        } else {
            self.lines.push(line.trim().to_string());
        }
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

/// Text length as the user perceives it.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first(html: &str, selector: &str) -> String {
        let doc = Html::parse_document(html);
        let selector = Selector::parse(selector).unwrap();
        rendered_text(doc.select(&selector).next().unwrap())
    }

    #[test]
    fn collapses_source_whitespace() {
        let text = first("<div id='x'>  Hello\n     <b>dear</b>\tfriend  </div>", "#x");
        assert_eq!(text, "Hello dear friend");
    }

    #[test]
    fn blocks_and_breaks_become_lines() {
        let text = first(
            "<div id='x'><p>First line</p><p>Second<br>Third</p><div>  </div></div>",
            "#x",
        );
        assert_eq!(text, "First line\nSecond\nThird");
    }

    #[test]
    fn preformatted_text_keeps_its_whitespace() {
        let text = first(
            "<div id='x'><pre>IBAN:  DE00 1234\n    ref 77</pre><p>reply   soon</p></div>",
            "#x",
        );
        assert_eq!(text, "IBAN:  DE00 1234\n    ref 77\nreply soon");
    }

    #[test]
    fn table_cells_are_tab_separated() {
        let text = first(
            "<table id='t'><tr><td> Amount </td><td>$500</td></tr>\
             <tr><th>Pay to</th> <td>Unknown wallet</td></tr></table>",
            "#t",
        );
        assert_eq!(text, "Amount\t$500\nPay to\tUnknown wallet");
    }

    #[test]
    fn scripts_and_styles_are_not_visible() {
        let text = first(
            "<div id='x'>Visible<script>var hidden = 1;</script><style>.a{}</style></div>",
            "#x",
        );
        assert_eq!(text, "Visible");
    }
}
