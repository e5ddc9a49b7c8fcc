use super::form::FormValues;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Name prefix the panel's web framework uses for server-generated postback
/// state (`__VIEWSTATE`, `__EVENTVALIDATION`, ...).
pub const HIDDEN_STATE_PREFIX: &str = "__";

static INPUT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input").expect("static selector"));

/// Collects every `<input type="hidden">` whose name carries the reserved
/// prefix, in document order. Everything else on the page is ignored.
pub fn harvest_hidden_fields(document: &Html) -> FormValues {
    let mut values = FormValues::new();

    for input in document.select(&INPUT_SELECTOR) {
        let element = input.value();
        let is_hidden = element
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"));
        if !is_hidden {
            continue;
        }

        let Some(name) = element.attr("name") else {
            continue;
        };
        if !name.starts_with(HIDDEN_STATE_PREFIX) {
            continue;
        }

        values.add(name, element.attr("value").unwrap_or_default());
    }

    values
}
