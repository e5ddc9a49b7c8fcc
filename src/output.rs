use serde::Serialize;

pub trait OutputFormatter {
    fn format_text(&self) -> String;
    fn format_json(&self, pretty: bool) -> crate::Result<String>;
}

pub fn print_output<T: OutputFormatter>(
    data: &T,
    as_json: bool,
    json_pretty: bool,
) -> crate::Result<()> {
    let output = if as_json {
        data.format_json(json_pretty)?
    } else {
        data.format_text()
    };

    println!("{}", output);
    Ok(())
}

pub fn to_json<T: Serialize>(data: &T, pretty: bool) -> crate::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(data)?)
    } else {
        Ok(serde_json::to_string(data)?)
    }
}

pub mod text {
    use colored::Colorize;
    use unicode_width::UnicodeWidthStr;

    pub fn success(msg: &str) -> String {
        format!("{} {}", "✓".green().bold(), msg)
    }

    pub fn error(msg: &str) -> String {
        format!("{} {}", "✗".red().bold(), msg)
    }

    pub fn warning(msg: &str) -> String {
        format!("{} {}", "⚠".yellow().bold(), msg)
    }

    pub fn info(msg: &str) -> String {
        format!("{} {}", "ℹ".blue().bold(), msg)
    }

    pub fn section(title: &str) -> String {
        format!("\n{}\n{}", title.bold(), "─".repeat(width(title)))
    }

    pub fn key_value(key: &str, value: &str) -> String {
        format!("  {}: {}", key.bold(), value)
    }

    /// Terminal column width; East Asian wide characters take two columns.
    pub fn width(s: &str) -> usize {
        UnicodeWidthStr::width(s)
    }

    pub fn pad(s: &str, target: usize) -> String {
        let w = width(s);
        if w >= target {
            s.to_string()
        } else {
            format!("{}{}", s, " ".repeat(target - w))
        }
    }
}

/// Left-aligned table whose columns grow to fit the widest cell.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn headers(mut self, headers: Vec<String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn row(mut self, row: Vec<String>) -> Self {
        self.rows.push(row);
        self
    }

    fn column_widths(&self) -> Vec<usize> {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);

        (0..columns)
            .map(|i| {
                self.rows
                    .iter()
                    .chain(std::iter::once(&self.headers))
                    .filter_map(|r| r.get(i))
                    .map(|cell| text::width(cell))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    pub fn build(self) -> String {
        use colored::Colorize;

        let widths = self.column_widths();
        let render = |cells: &[String]| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| text::pad(cell, widths[i]))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut output = String::new();

        if !self.headers.is_empty() {
            output.push_str(&render(&self.headers).bold().to_string());
            output.push('\n');
            let total = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
            output.push_str(&"─".repeat(total));
            output.push('\n');
        }

        for row in &self.rows {
            output.push_str(&render(row));
            output.push('\n');
        }

        output
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_not_pretty() {
        #[derive(Serialize)]
        struct TestData {
            name: String,
        }
        let data = TestData {
            name: "test".to_string(),
        };
        let json = to_json(&data, false).unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_to_json_pretty() {
        #[derive(Serialize)]
        struct TestData {
            name: String,
        }
        let data = TestData {
            name: "test".to_string(),
        };
        let json = to_json(&data, true).unwrap();
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_table_columns_fit_widest_cell() {
        colored::control::set_override(false);
        let table = TableBuilder::new()
            .headers(vec!["ID".to_string(), "Label".to_string()])
            .row(vec!["1".to_string(), "web-server-01".to_string()])
            .row(vec!["22222".to_string(), "db".to_string()])
            .build();

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID     Label");
        assert_eq!(lines[2], "1      web-server-01");
        assert_eq!(lines[3], "22222  db");
    }

    #[test]
    fn test_table_builder_default() {
        let table = TableBuilder::default().build();
        assert!(table.is_empty());
    }

    #[test]
    fn test_wide_characters_count_double() {
        assert_eq!(text::width("abc"), 3);
        assert_eq!(text::width("稼働中"), 6);
        assert_eq!(text::pad("停止", 6), "停止  ");
    }

    #[test]
    fn test_narrow_symbols_and_half_width_kana_count_single() {
        assert_eq!(text::width("ｳｪﾌﾞ"), 4);
        assert_eq!(text::width("ℹ"), 1);
        assert_eq!(text::width("a—b"), 3);
        assert_eq!(text::pad("ｳｪﾌﾞ", 6), "ｳｪﾌﾞ  ");
    }

    #[test]
    fn test_key_value() {
        let msg = text::key_value("IPv4", "192.0.2.1");
        assert!(msg.contains("IPv4"));
        assert!(msg.contains("192.0.2.1"));
    }
}
