//! Markdown-lite for assistant replies.
//!
//! Covers what models actually send back: `#`..`####` headings, `- ` / `* `
//! bullets, numbered items, fenced code blocks, and inline `**bold**`,
//! `` `code` `` and `[text](url)`. Anything else is shown verbatim.

use eframe::egui;

#[derive(Debug, Clone, PartialEq)]
pub enum Span<'a> {
    Text(&'a str),
    Bold(&'a str),
    Code(&'a str),
    Link { text: &'a str, url: &'a str },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block<'a> {
    Blank,
    Heading { level: usize, text: &'a str },
    Bullet(Vec<Span<'a>>),
    Numbered { marker: &'a str, spans: Vec<Span<'a>> },
    Paragraph(Vec<Span<'a>>),
    CodeBlock(Vec<&'a str>),
}

pub fn parse_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut fence: Option<Vec<&str>> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            match fence.take() {
                Some(code) => blocks.push(Block::CodeBlock(code)),
                None => fence = Some(Vec::new()),
            }
            continue;
        }
        if let Some(code) = fence.as_mut() {
            code.push(line);
            continue;
        }
        blocks.push(parse_line(trimmed));
    }
    // Unclosed fence while streaming: show what we have.
    if let Some(code) = fence {
        blocks.push(Block::CodeBlock(code));
    }
    blocks
}

fn parse_line(trimmed: &str) -> Block<'_> {
    if trimmed.is_empty() {
        return Block::Blank;
    }
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if (1..=4).contains(&hashes) {
        if let Some(rest) = trimmed[hashes..].strip_prefix(' ') {
            return Block::Heading {
                level: hashes,
                text: rest.trim(),
            };
        }
    }
    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        return Block::Bullet(parse_inline(rest));
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix(". ") {
            return Block::Numbered {
                marker: &trimmed[..digits + 1],
                spans: parse_inline(rest),
            };
        }
    }
    Block::Paragraph(parse_inline(trimmed))
}

/// Split one line into inline spans. Unclosed markers stay literal text.
pub fn parse_inline(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some((pos, marker)) = next_marker(rest) else {
            spans.push(Span::Text(rest));
            break;
        };
        if pos > 0 {
            spans.push(Span::Text(&rest[..pos]));
        }
        let after = &rest[pos..];
        let parsed = match marker {
            Marker::Bold => after[2..]
                .find("**")
                .map(|end| (Span::Bold(&after[2..2 + end]), 2 + end + 2)),
            Marker::Code => after[1..]
                .find('`')
                .map(|end| (Span::Code(&after[1..1 + end]), 1 + end + 1)),
            Marker::Link => after.find("](").and_then(|mid| {
                after[mid + 2..].find(')').map(|close| {
                    let url_start = mid + 2;
                    (
                        Span::Link {
                            text: &after[1..mid],
                            url: &after[url_start..url_start + close],
                        },
                        url_start + close + 1,
                    )
                })
            }),
        };
        match parsed {
            Some((span, consumed)) => {
                spans.push(span);
                rest = &after[consumed..];
            }
            None => {
                spans.push(Span::Text(after));
                break;
            }
        }
    }
    spans
}

#[derive(Debug, Clone, Copy)]
enum Marker {
    Bold,
    Code,
    Link,
}

fn next_marker(text: &str) -> Option<(usize, Marker)> {
    let candidates = [
        text.find("**").map(|p| (p, Marker::Bold)),
        text.find('`').map(|p| (p, Marker::Code)),
        text.find('[')
            .filter(|p| text[*p..].contains("]("))
            .map(|p| (p, Marker::Link)),
    ];
    candidates.into_iter().flatten().min_by_key(|(p, _)| *p)
}

/// Render markdown text into an egui UI region at `size` points.
pub fn render_markdown(ui: &mut egui::Ui, text: &str, base_color: egui::Color32, size: f32) {
    let code_bg = if base_color.r() > 128 {
        egui::Color32::from_rgb(60, 60, 70)
    } else {
        egui::Color32::from_rgb(230, 232, 236)
    };

    for block in parse_blocks(text) {
        match block {
            Block::Blank => ui.add_space(6.0),
            Block::Heading { level, text } => {
                let bump = (5 - level) as f32;
                ui.add_space(bump + 2.0);
                ui.label(
                    egui::RichText::new(text)
                        .strong()
                        .size(size + bump)
                        .color(base_color),
                );
            }
            Block::Bullet(spans) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new("  •  ").size(size).color(base_color));
                    render_spans(ui, &spans, base_color, code_bg, size);
                });
            }
            Block::Numbered { marker, spans } => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(
                        egui::RichText::new(format!("  {} ", marker))
                            .size(size)
                            .color(base_color),
                    );
                    render_spans(ui, &spans, base_color, code_bg, size);
                });
            }
            Block::Paragraph(spans) => {
                ui.horizontal_wrapped(|ui| render_spans(ui, &spans, base_color, code_bg, size));
            }
            Block::CodeBlock(lines) => {
                egui::Frame::none()
                    .fill(code_bg)
                    .rounding(egui::Rounding::same(6.0))
                    .inner_margin(egui::Margin::same(8.0))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(lines.join("\n"))
                                .monospace()
                                .size(size - 1.0)
                                .color(base_color),
                        );
                    });
            }
        }
    }
}

fn render_spans(
    ui: &mut egui::Ui,
    spans: &[Span<'_>],
    base_color: egui::Color32,
    code_bg: egui::Color32,
    size: f32,
) {
    let link_color = egui::Color32::from_rgb(100, 170, 240);
    for span in spans {
        match span {
            Span::Text(t) => {
                ui.label(egui::RichText::new(*t).size(size).color(base_color));
            }
            Span::Bold(t) => {
                ui.label(egui::RichText::new(*t).size(size).strong().color(base_color));
            }
            Span::Code(t) => {
                egui::Frame::none()
                    .fill(code_bg)
                    .rounding(egui::Rounding::same(3.0))
                    .inner_margin(egui::Margin::symmetric(4.0, 1.0))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(*t)
                                .size(size)
                                .monospace()
                                .color(base_color),
                        );
                    });
            }
            Span::Link { text, url } => {
                ui.add(egui::Hyperlink::from_label_and_url(
                    egui::RichText::new(*text)
                        .size(size)
                        .color(link_color)
                        .underline(),
                    *url,
                ))
                .on_hover_text(*url);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_spans() {
        let spans = parse_inline("Use **cargo** with `--release`, see [docs](https://doc.rust-lang.org).");
        assert_eq!(
            spans,
            vec![
                Span::Text("Use "),
                Span::Bold("cargo"),
                Span::Text(" with "),
                Span::Code("--release"),
                Span::Text(", see "),
                Span::Link {
                    text: "docs",
                    url: "https://doc.rust-lang.org"
                },
                Span::Text("."),
            ]
        );
    }

    #[test]
    fn test_unclosed_markers_stay_literal() {
        assert_eq!(parse_inline("2 ** 3"), vec![Span::Text("2 "), Span::Text("** 3")]);
        assert_eq!(parse_inline("[not a link]"), vec![Span::Text("[not a link]")]);
    }

    #[test]
    fn test_blocks() {
        let blocks = parse_blocks("# Title\n\n- one\n2. two\n#hashtag\n```rust\nfn main() {}\n```");
        assert_eq!(blocks[0], Block::Heading { level: 1, text: "Title" });
        assert_eq!(blocks[1], Block::Blank);
        assert_eq!(blocks[2], Block::Bullet(vec![Span::Text("one")]));
        assert_eq!(
            blocks[3],
            Block::Numbered {
                marker: "2.",
                spans: vec![Span::Text("two")]
            }
        );
        assert_eq!(blocks[4], Block::Paragraph(vec![Span::Text("#hashtag")]));
        assert_eq!(blocks[5], Block::CodeBlock(vec!["fn main() {}"]));
    }

    #[test]
    fn test_unclosed_fence_while_streaming() {
        let blocks = parse_blocks("text\n```\nlet x = 1;");
        assert_eq!(blocks.last(), Some(&Block::CodeBlock(vec!["let x = 1;"])));
    }
}
