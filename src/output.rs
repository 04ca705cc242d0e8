use serde::Serialize;

/// Envelope for every `--json` payload
#[derive(Debug, Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

pub fn print_json<T: Serialize>(data: T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&JsonOut { ok: true, data })?
    );
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    render: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        print_json(data)
    } else {
        println!("{}", render(&data));
        Ok(())
    }
}

/// Text framed in a box with the title in the top border
pub fn panel(title: &str, body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let width = lines
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(title.chars().count() + 2))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let title_fill = width - title.chars().count();
    out.push_str(&format!("┌─ {} {}┐\n", title, "─".repeat(title_fill.saturating_sub(1))));
    for line in &lines {
        let pad = width - line.chars().count();
        out.push_str(&format!("│ {}{} │\n", line, " ".repeat(pad)));
    }
    out.push_str(&format!("└{}┘", "─".repeat(width + 2)));
    out
}

/// Fraction rendered as a percentage with two decimals
pub fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_rows_share_a_width() {
        let rendered = panel("Status", "ready\nthree components");
        let widths: Vec<usize> = rendered.lines().map(|l| l.chars().count()).collect();

        assert!(rendered.starts_with("┌─ Status "));
        assert!(widths.iter().all(|w| *w == widths[0]), "{:?}", widths);
        assert_eq!(rendered.lines().count(), 4);
    }

    #[test]
    fn panel_widens_for_long_titles() {
        let rendered = panel("A very long panel title", "x");
        let widths: Vec<usize> = rendered.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]), "{:?}", widths);
    }

    #[test]
    fn percent_uses_two_decimals() {
        assert_eq!(percent(0.85), "85.00%");
        assert_eq!(percent(0.9), "90.00%");
    }
}
