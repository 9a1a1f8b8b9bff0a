use serde_json::Value;

const MAX_COL_WIDTH: usize = 60;

/// Render a list of Odoo records as an ASCII table.
/// Returns None when `val` is not a non-empty list of records, so callers can fall back to JSON.
pub fn render_records(val: &Value) -> Option<String> {
    let rows = match val {
        Value::Array(arr) if !arr.is_empty() && arr.iter().all(Value::is_object) => arr,
        _ => return None,
    };
    let cols = collect_columns(rows);
    if cols.is_empty() { return None; }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| cols.iter().map(|c| to_cell_string(r.get(c).unwrap_or(&Value::Null))).collect())
        .collect();

    let mut widths: Vec<usize> = cols.iter().map(|c| display_len(c).min(MAX_COL_WIDTH)).collect();
    for r in &cells {
        for (i, cell) in r.iter().enumerate() {
            widths[i] = widths[i].max(display_len(cell).min(MAX_COL_WIDTH));
        }
    }

    let sep = build_separator(&widths);
    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&build_row(&cols, &widths));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for r in &cells {
        out.push_str(&build_row(r, &widths));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&format!("records: {}, fields: {}", cells.len(), cols.len()));
    Some(out)
}

// Union of keys across records, `id` first, the rest sorted.
fn collect_columns(rows: &[Value]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for r in rows {
        if let Value::Object(map) = r {
            for k in map.keys() {
                if !keys.contains(k) { keys.push(k.clone()); }
            }
        }
    }
    keys.sort_by(|a, b| (a != "id").cmp(&(b != "id")).then_with(|| a.cmp(b)));
    keys
}

fn to_cell_string(v: &Value) -> String {
    match v {
        // Odoo sends `false` for empty non-boolean fields
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.replace('\n', " "),
        // many2one: [id, "display name"]
        Value::Array(pair) if pair.len() == 2 && pair[0].is_i64() && pair[1].is_string() => {
            format!("{} ({})", pair[1].as_str().unwrap_or_default(), pair[0])
        }
        other => other.to_string(),
    }
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(display_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if display_len(s) <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().any(|c| c.is_ascii_digit()) && st.chars().all(|c| c.is_ascii_digit() || ".-+eE".contains(c))
}
