//! Plain text layout helpers.

/// Center `text` in `width` columns, placing the odd space the way Python's
/// `str.center` does so tables line up with the reference tools.
pub fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let margin = width - len;
    let left = margin / 2 + (margin & width & 1);
    let right = margin - left;
    format!("{}{text}{}", " ".repeat(left), " ".repeat(right))
}

/// Render columns as an ASCII table: centered headers, a `=` rule and
/// left-aligned cells, columns separated by three spaces.
///
/// `rows` holds one `Vec` per row, in header order. Returns an empty string
/// when there are no rows.
pub fn ascii_table(header: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header_line: Vec<String> = header
        .iter()
        .zip(&widths)
        .map(|(h, w)| center(h, *w))
        .collect();
    let table_width = widths.iter().sum::<usize>() + 3 * (header.len().saturating_sub(1));

    let mut out = header_line.join("   ");
    out.push('\n');
    out.push_str(&"=".repeat(table_width));
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| format!("{:<w$}", row.get(i).map(String::as_str).unwrap_or("")))
            .collect();
        out.push_str(&cells.join("   "));
        out.push('\n');
    }
    out
}

/// `count` followed by the noun, pluralized with an `s`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
