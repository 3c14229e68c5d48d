//! Markup primitives shared by the report sections.

use std::fmt::Write as _;

/// Three-level status carried by every cell and alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Warning,
    Failure,
}

impl Status {
    pub fn color(self) -> &'static str {
        match self {
            Self::Success => "LimeGreen",
            Self::Warning => "Orange",
            Self::Failure => "Tomato",
        }
    }

    pub fn alert_class(self) -> &'static str {
        match self {
            Self::Success => "alert-success",
            Self::Warning => "alert-warning",
            Self::Failure => "alert-danger",
        }
    }

    fn glyph(self) -> &'static str {
        match self {
            Self::Success => "glyphicon-ok-circle",
            Self::Warning => "glyphicon-warning-sign",
            Self::Failure => "glyphicon-ban-circle",
        }
    }
}

/// Escape text for element content and double-quoted attributes.
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

/// A status-colored table cell; `text` is escaped and keeps its line breaks.
pub fn cell(out: &mut String, status: Status, text: &str) {
    let color = status.color();
    let _ = writeln!(
        out,
        "      <td bgcolor=\"{color}\"><pre style=\"border:none; background-color:{color}\"><b>{}</b></pre></td>",
        escape(text)
    );
}

/// A bootstrap alert box; `message` is escaped.
pub fn alert(out: &mut String, status: Status, message: &str) {
    let _ = write!(
        out,
        "  <div class=\"alert {}\">\n      <strong>{} <span class=\"glyphicon {}\"></span></strong>\n  </div>\n",
        status.alert_class(),
        escape(message),
        status.glyph()
    );
}

/// Opening of a summary table with one column per network function.
pub fn summary_table_open(out: &mut String, title: &str, columns: &[&str]) {
    let _ = writeln!(out, "  <h2>{}</h2>", escape(title));
    out.push_str(
        "  <table class=\"table-bordered\" width = \"100%\" align = \"center\" border = \"1\">\n",
    );
    out.push_str("      <tr bgcolor=\"#33CCFF\" >\n        <th>Stage Name</th>\n");
    for column in columns {
        let _ = writeln!(out, "        <th>{}</th>", escape(column));
    }
    out.push_str("      </tr>\n");
}

pub fn summary_table_close(out: &mut String) {
    out.push_str("  </table>\n  <br>\n");
}

/// Row label cell, spanning `rowspan` rows when greater than one.
pub fn row_label(out: &mut String, label: &str, rowspan: usize) {
    if rowspan > 1 {
        let _ = writeln!(
            out,
            "       <td rowspan={rowspan} bgcolor=\"lightcyan\" >{}</td>",
            escape(label)
        );
    } else {
        let _ = writeln!(out, "       <td bgcolor=\"lightcyan\" >{}</td>", escape(label));
    }
}
