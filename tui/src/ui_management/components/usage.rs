use ratatui::{
    style::Stylize,
    text::{Line, Span, Text},
};

#[derive(Debug, Clone)]
pub struct UsageInfoLine {
    pub keys: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct UsageInfo {
    pub description: Option<String>,
    pub lines: Vec<UsageInfoLine>,
}

impl UsageInfoLine {
    pub fn new(keys: &[&str], description: impl Into<String>) -> Self {
        Self {
            keys: keys.iter().copied().map(String::from).collect(),
            description: description.into(),
        }
    }
}

pub trait HasUsageInfo {
    fn usage_info(&self) -> UsageInfo;
}

fn key_to_span<'a>(key: &str) -> Span<'a> {
    Span::from(format!("({key})")).bold()
}

pub fn widget_usage_to_text<'a>(usage: UsageInfo) -> Text<'a> {
    let mut lines: Vec<Line> = vec![];
    if let Some(description) = usage.description {
        lines.push(Line::from(description));
    }

    for line in usage.lines {
        let mut bindings: Vec<Span> = match line.keys.as_slice() {
            [] => vec![],
            [key] => vec![key_to_span(key)],
            [first, second] => vec![key_to_span(first), " or ".into(), key_to_span(second)],
            [init @ .., last] => init
                .iter()
                .flat_map(|key| [key_to_span(key), ", ".into()])
                .chain(["or ".into(), key_to_span(last)])
                .collect(),
        };

        bindings.push(Span::from(format!(" {}", line.description)));

        lines.push(Line::from(bindings));
    }

    Text::from(lines)
}
