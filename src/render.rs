// src/render.rs
use chrono::NaiveDateTime;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Two decimals with thousands separators, e.g. `1,234.50`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let sign = if value.is_sign_negative() && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, group_thousands(int_part), frac_part)
}

pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Anchor tag; `new_window` opens the target in a new tab.
pub fn link(label: &str, href: &str, tooltip: &str, new_window: bool) -> String {
    let target = if new_window {
        r#" target="_blank" rel="noopener noreferrer""#
    } else {
        ""
    };
    format!(
        r#"<a href="{}" title="{}"{}>{}</a>"#,
        escape(href),
        escape(tooltip),
        target,
        escape(label)
    )
}

/// Renders `rows` as an HTML table; the first row is the header.
///
/// Columns listed in `expose` get the `exposed` class so the page styles
/// them as identifiers. With `tooltip` every body cell repeats its text as
/// a `title` attribute.
pub fn html_table(
    rows: &[Vec<String>],
    table_id: &str,
    widths: &[Option<&str>],
    expose: &[usize],
    tooltip: bool,
) -> String {
    let mut html = format!(r#"<table id="{}" class="table">"#, escape(table_id));

    let mut rows = rows.iter();
    if let Some(header) = rows.next() {
        html.push_str("<thead><tr>");
        for (col, cell) in header.iter().enumerate() {
            match widths.get(col).copied().flatten() {
                Some(width) => html.push_str(&format!(
                    r#"<th style="width: {}">{}</th>"#,
                    escape(width),
                    escape(cell)
                )),
                None => html.push_str(&format!("<th>{}</th>", escape(cell))),
            }
        }
        html.push_str("</tr></thead>");
    }

    html.push_str("<tbody>");
    for row in rows {
        html.push_str("<tr>");
        for (col, cell) in row.iter().enumerate() {
            let class = if expose.contains(&col) { r#" class="exposed""# } else { "" };
            let title = if tooltip {
                format!(r#" title="{}""#, escape(cell))
            } else {
                String::new()
            };
            html.push_str(&format!("<td{}{}>{}</td>", class, title, escape(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}
