//! Control panel operations, each expressed as one or more chains of form
//! steps on the engine.

pub mod add;
pub mod auth;
pub mod label;
pub mod power;
pub mod remove;
pub mod ssh;
pub mod ssh_key;
pub mod stat;
pub mod vps;

use scraper::{ElementRef, Html, Selector};

/// Panel pages, relative to the configured base URL.
pub mod paths {
    pub const TOP: &str = "/";
    pub const LOGIN: &str = "/Login.aspx";
    pub const VPS_LIST: &str = "/Service/VPS/";
    pub const VPS_STATUS: &str = "/Service/VPS/GetVMStatus.aspx";
    pub const VPS_CONSOLE: &str = "/Service/VPS/Control/Console/";
    pub const VPS_COMMAND: &str = "/Service/VPS/Control/CommandSender.aspx";
    pub const VPS_ADD: &str = "/Service/VPS/Add/";
    pub const VPS_ADD_CONFIRM: &str = "/Service/VPS/Add/Confirm.aspx";
    pub const VPS_DELETE: &str = "/Service/VPS/Del/Default.aspx";
    pub const VPS_DELETE_CONFIRM: &str = "/Service/VPS/Del/Confirm.aspx";
    pub const CHANGE_LABEL: &str = "/Service/ChangeLabel.aspx";
    pub const KEY_PAIR: &str = "/Service/VPS/keyPair/";
}

/// ASP.NET control-name prefixes used by the panel's forms.
pub(crate) const CTL: &str = "ctl00$ContentPlaceHolder1$";
pub(crate) const CTL_NESTED: &str = "ctl00$ctl00$ContentPlaceHolder1$ContentPlaceHolder1$";

pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Concatenated text of every match, untrimmed.
pub(crate) fn select_text(document: &Html, selector: &Selector) -> String {
    document.select(selector).map(element_text).collect()
}

/// First match's attribute value; `None` when the element or attribute is
/// missing.
pub(crate) fn select_attr(document: &Html, selector: &Selector, attr: &str) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(str::to_string)
}

pub(crate) fn trim_cell(s: &str) -> String {
    s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
        .to_string()
}
