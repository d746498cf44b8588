//! A small fixed-width text table renderer shared by every report kind
//! : right-align numeric-looking cells, left-align the rest, one
//! space of padding between columns.

/// Render `headers` plus `rows` as an aligned plain-text table. Every row
/// must have the same number of cells as `headers`.
pub fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    push_row(&mut out, headers.iter().map(|h| h.to_string()).collect::<Vec<_>>().as_slice(), &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let w = widths[i];
        if looks_numeric(cell) {
            out.push_str(&" ".repeat(w.saturating_sub(cell.len())));
            out.push_str(cell);
        } else {
            out.push_str(cell);
            out.push_str(&" ".repeat(w.saturating_sub(cell.len())));
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out.push('\n');
}

fn looks_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '%'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cells_right_align_text_cells_left_align() {
        let out = render(
            &["name", "t_mem"],
            &[vec!["n1".into(), "32762".into()], vec!["node-long".into(), "7".into()]],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("n1 "));
        assert!(lines[2].ends_with("7"));
    }
}
