//! Renderings of the keypad: an HTML/SVG picture of the physical pad with
//! each key's action, and a plain-text scan grid.

use std::fmt::Write as _;

use numpad_core::matrix::key_at;
use numpad_core::{Action, Col, Row, ACTIONS, NUM_KEYS, WIRING};

/// Physical columns. Keys are numbered row-major across a 4 x 6 grid.
const PHYS_COLS: usize = 4;
const PHYS_ROWS: usize = NUM_KEYS / PHYS_COLS;

/// Key unit size in SVG pixels.
const U: f64 = 72.0;
const GAP: f64 = 6.0;
const S: f64 = U + GAP;
const R: f64 = 6.0;
const MARGIN: f64 = 20.0;

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// What a key does, spelled out for the tooltip.
fn describe(action: &Action) -> String {
    match action {
        Action::ModifierShortcut { chord, then } => {
            let mut s = chord
                .iter()
                .map(|k| k.display_name())
                .collect::<Vec<_>>()
                .join("+");
            for k in then.iter() {
                s.push(' ');
                s.push_str(k.display_name());
            }
            s
        }
        Action::Consumer(code) => format!("consumer 0x{:03X}", code.usage()),
        Action::Text(text) => format!("types {} on release", text),
    }
}

fn render_keys() -> String {
    let mut svg = String::new();
    for (i, binding) in ACTIONS.iter().enumerate() {
        let x = MARGIN + (i % PHYS_COLS) as f64 * S;
        let y = MARGIN + (i / PHYS_COLS) as f64 * S;
        let wire = WIRING.iter().find(|w| w.key.as_usize() == i);

        let _ = write!(
            svg,
            r#"<g><title>{}</title><rect x="{x}" y="{y}" width="{U}" height="{U}" rx="{R}" class="key {}"/>"#,
            html_escape(&describe(&binding.action)),
            binding.action.kind(),
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" class="label">{}</text>"#,
            x + U / 2.0,
            y + U / 2.0,
            html_escape(binding.label),
        );
        let pos = wire.map_or_else(String::new, |w| format!("{}/{}", w.row, w.col));
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" class="index">{i} {pos}</text></g>"#,
            x + 5.0,
            y + U - 6.0,
        );
    }
    svg
}

/// Generate the complete HTML document with inline SVG.
pub fn generate_html() -> String {
    let width = PHYS_COLS as f64 * S - GAP + 2.0 * MARGIN;
    let height = PHYS_ROWS as f64 * S - GAP + 2.0 * MARGIN;

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Macro Numpad Layout</title>
<style>
  body {{
    background: #1a1a2e;
    color: #eee;
    font-family: system-ui, -apple-system, sans-serif;
    display: flex;
    justify-content: center;
    padding: 2em;
  }}
  .key {{ stroke-width: 1.5; }}
  .key.shortcut {{ fill: #1b2e4e; stroke: #53a8b6; }}
  .key.consumer {{ fill: #2d1b4e; stroke: #e94560; }}
  .key.text {{ fill: #16213e; stroke: #0f3460; }}
  .key:hover {{ stroke: #f5f5f5; }}
  .label {{
    fill: #eee;
    font-size: 18px;
    text-anchor: middle;
    dominant-baseline: middle;
    pointer-events: none;
  }}
  .index {{
    fill: #8892b0;
    font-family: "JetBrains Mono", "Fira Code", monospace;
    font-size: 9px;
    pointer-events: none;
  }}
</style>
</head>
<body>
<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg">
{}
</svg>
</body>
</html>
"#,
        render_keys()
    )
}

/// The row x column scan grid, one line per row.
pub fn scan_grid() -> String {
    let mut out = String::from("  ");
    for col in Col::ALL {
        let _ = write!(out, " {}", col);
    }
    out.push('\n');
    for row in Row::ALL {
        let mut line = row.to_string();
        for col in Col::ALL {
            match key_at(&WIRING, row, col) {
                Some(key) => {
                    let _ = write!(line, "[{:>2}]", key.get());
                }
                None => line.push_str(" .. "),
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_has_every_key() {
        let html = generate_html();
        assert_eq!(html.matches("<rect").count(), NUM_KEYS);
        assert_eq!(html.matches(r#"class="key text""#).count(), 16);
        assert_eq!(html.matches(r#"class="key consumer""#).count(), 5);
        assert_eq!(html.matches(r#"class="key shortcut""#).count(), 3);
        assert!(html.contains("R6/C17"));
    }

    #[test]
    fn test_describe_shortcut() {
        assert_eq!(describe(&ACTIONS[0].action), "RGui+X U U");
        assert_eq!(describe(&ACTIONS[3].action), "RGui+D");
        assert_eq!(describe(&ACTIONS[2].action), "consumer 0x192");
    }

    #[test]
    fn test_scan_grid() {
        let grid = scan_grid();
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "   C01 C09 C11 C12 C13 C14 C16 C17");
        assert_eq!(lines[1], "R0 .. [ 0][ 8][ 9][10][11][ 2] ..");
        assert_eq!(lines[2], "R1[ 1][19][12][13][14] ..  ..  ..");
        assert_eq!(lines[7], "R6 .. [21] ..  ..  ..  ..  .. [ 3]");
    }

    #[test]
    fn test_escape() {
        assert_eq!(html_escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
