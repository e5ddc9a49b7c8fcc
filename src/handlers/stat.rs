use super::vps::Vm;
use super::{paths, select_text, selector, trim_cell};
use crate::engine::{ActionChain, FormValues, SessionContext, Shared, Step, StepRequest, StepResponse};
use crate::output::{self, OutputFormatter};
use crate::{PanelError, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

static DETAIL_CELLS: Lazy<Selector> = Lazy::new(|| selector("#subCtrlBox .subCtrlList td"));
static START_DATE: Lazy<Selector> = Lazy::new(|| selector("#subCtrlBoxNav .startData"));
static END_DATE: Lazy<Selector> = Lazy::new(|| selector("#subCtrlBoxNav .endData"));
static HOST_LIST: Lazy<Selector> = Lazy::new(|| selector("dl.listStyle01"));

static START_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("利用開始日:([0-9/]*)").expect("static regex"));
static END_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("削除予定日:([0-9/]*)").expect("static regex"));
static HOST_RE: Lazy<Regex> = Lazy::new(|| Regex::new("接続先：(.+)／").expect("static regex"));

const DETAIL_DATE_FORMAT: &str = "%Y/%m/%d";

/// Console page details for one VPS.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VmDetail {
    pub cpu_cores: String,
    pub memory: String,
    pub disk1_size: String,
    pub disk2_size: String,
    pub ipv4: String,
    pub ipv4_netmask: String,
    pub ipv4_gateway: String,
    pub ipv4_dns1: String,
    pub ipv4_dns2: String,
    pub ipv6: Vec<String>,
    pub ipv6_prefix: String,
    pub ipv6_gateway: String,
    pub ipv6_dns1: String,
    pub ipv6_dns2: String,
    pub house: String,
    pub common_server_id: String,
    pub started_on: Option<NaiveDate>,
    pub delete_on: Option<NaiveDate>,
    pub serial_console_host: String,
    pub iso_upload_host: String,
}

/// Cell text with the `<span>` captions left out.
fn text_without_labels(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(el) = ElementRef::wrap(child)
            && el.value().name() != "span"
        {
            out.push_str(&text_without_labels(el));
        }
    }
    out
}

fn capture_date(document: &Html, selector: &Selector, re: &Regex) -> Option<NaiveDate> {
    let body = select_text(document, selector);
    let raw = re.captures(&body)?.get(1)?.as_str().to_string();
    NaiveDate::parse_from_str(&raw, DETAIL_DATE_FORMAT).ok()
}

pub fn parse_vm_detail(document: &Html) -> Result<VmDetail> {
    let mut detail = VmDetail::default();

    for (i, cell) in document.select(&DETAIL_CELLS).enumerate() {
        let raw = text_without_labels(cell);
        let value = trim_cell(&raw);
        match i {
            0 => detail.cpu_cores = value,
            1 => detail.memory = value,
            2 => detail.disk1_size = value,
            3 => detail.disk2_size = value,
            5 => detail.ipv4 = value,
            6 => detail.ipv4_netmask = value,
            7 => detail.ipv4_gateway = value,
            8 => detail.ipv4_dns1 = value,
            9 => detail.ipv4_dns2 = value,
            10 => {
                detail.ipv6 = raw
                    .lines()
                    .map(trim_cell)
                    .filter(|addr| !addr.is_empty())
                    .collect();
            }
            11 => detail.ipv6_prefix = value,
            12 => detail.ipv6_gateway = value,
            13 => detail.ipv6_dns1 = value,
            14 => detail.ipv6_dns2 = value,
            15 => detail.house = value,
            16 => detail.common_server_id = value,
            _ => {}
        }
    }

    detail.started_on = Some(
        capture_date(document, &START_DATE, &START_DATE_RE)
            .ok_or_else(|| PanelError::ResponseParse("Can't detect the start date".into()))?,
    );
    detail.delete_on = capture_date(document, &END_DATE, &END_DATE_RE);

    let hosts = select_text(document, &HOST_LIST);
    let matches: Vec<String> = HOST_RE
        .captures_iter(&hosts)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();
    let [serial, iso] = <[String; 2]>::try_from(matches).map_err(|_| {
        PanelError::ResponseParse(
            "Can't detect ISO upload host or serial console host".into(),
        )
    })?;
    detail.serial_console_host = serial;
    detail.iso_upload_host = iso;

    Ok(detail)
}

pub fn stat_step(session: &SessionContext, id: &str, detail: Shared<VmDetail>) -> Result<Step> {
    let url = session.endpoint(&format!("{}{}", paths::VPS_CONSOLE, id))?;
    Ok(Step::document(
        move |_: &FormValues| -> Result<StepRequest> { Ok(StepRequest::get(url.clone())) },
        move |_: &StepResponse, doc: &Html| -> Result<()> {
            detail.set(parse_vm_detail(doc)?);
            Ok(())
        },
    ))
}

#[derive(Debug, Serialize)]
pub struct VmStatResult {
    #[serde(flatten)]
    pub vm: Vm,
    pub detail: VmDetail,
}

impl OutputFormatter for VmStatResult {
    fn format_text(&self) -> String {
        use crate::output::text;

        let vm = &self.vm;
        let d = &self.detail;
        let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());

        let mut lines = vec![
            text::section(&format!("VPS {}", vm.id)),
            text::key_value("Label", &vm.label),
            text::key_value("Plan", &vm.plan),
            text::key_value("Service Status", &vm.service_status),
            text::key_value("Service ID", &vm.service_id),
            text::key_value("Payment Span", &vm.payment_span),
            text::key_value("Start Date", &date(d.started_on)),
            text::key_value("Delete Date", &date(d.delete_on)),
            text::section("Resources"),
            text::key_value("CPU", &d.cpu_cores),
            text::key_value("Memory", &d.memory),
            text::key_value("Disk 1", &d.disk1_size),
            text::key_value("Disk 2", &d.disk2_size),
            text::section("IPv4"),
            text::key_value("Address", &d.ipv4),
            text::key_value("Netmask", &d.ipv4_netmask),
            text::key_value("Gateway", &d.ipv4_gateway),
            text::key_value("DNS", &format!("{} {}", d.ipv4_dns1, d.ipv4_dns2)),
            text::section("IPv6"),
        ];
        for addr in &d.ipv6 {
            lines.push(text::key_value("Address", addr));
        }
        lines.extend([
            text::key_value("Prefix", &d.ipv6_prefix),
            text::key_value("Gateway", &d.ipv6_gateway),
            text::key_value("DNS", &format!("{} {}", d.ipv6_dns1, d.ipv6_dns2)),
            text::section("Hosts"),
            text::key_value("House", &d.house),
            text::key_value("Common Server ID", &d.common_server_id),
            text::key_value("Serial Console", &d.serial_console_host),
            text::key_value("ISO Upload", &d.iso_upload_host),
        ]);

        lines.join("\n")
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub async fn vm_detail(session: &mut SessionContext, id: &str) -> Result<VmDetail> {
    let detail = Shared::new(VmDetail::default());
    let mut chain = ActionChain::new();
    chain.add_step(stat_step(session, id, detail.clone())?)?;
    chain.run(session).await?;
    Ok(detail.take())
}

/// Detail page for a VPS already read from the list.
pub async fn handle_stat(session: &mut SessionContext, vm: Vm) -> Result<VmStatResult> {
    let detail = vm_detail(session, &vm.id).await?;
    tracing::debug!(id = %vm.id, ipv4 = %detail.ipv4, "Fetched VPS detail");
    Ok(VmStatResult { vm, detail })
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const CONSOLE: &str = r#"<html><body>
<div id="subCtrlBoxNav">
  <p class="startData">利用開始日:2015/02/03</p>
  <p class="endData">削除予定日:</p>
</div>
<div id="subCtrlBox">
  <table class="subCtrlList">
    <tr><td><span>CPU</span>2Core</td><td><span>Memory</span>1GB</td></tr>
    <tr><td><span>Disk1</span>100GB</td><td><span>Disk2</span>-</td><td>-</td></tr>
    <tr><td><span>IPv4</span>192.0.2.10</td><td>255.255.254.0</td><td>192.0.2.1</td>
        <td>198.51.100.1</td><td>198.51.100.2</td></tr>
    <tr><td><span>IPv6</span>
        2001:db8::10
        2001:db8::11
    </td><td>64</td><td>2001:db8::1</td><td>2001:db8::53</td><td>2001:db8::54</td></tr>
    <tr><td>tyo1</td><td>CS-1234</td></tr>
  </table>
</div>
<dl class="listStyle01">
  <dt>Serial</dt><dd>接続先：console.example.jp／port 22</dd>
  <dt>ISO</dt><dd>接続先：upload.example.jp／ftp</dd>
</dl>
</body></html>"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_detail() {
        let doc = Html::parse_document(fixtures::CONSOLE);
        let detail = parse_vm_detail(&doc).unwrap();
        assert_eq!(detail.cpu_cores, "2Core");
        assert_eq!(detail.memory, "1GB");
        assert_eq!(detail.disk1_size, "100GB");
        assert_eq!(detail.ipv4, "192.0.2.10");
        assert_eq!(detail.ipv4_netmask, "255.255.254.0");
        assert_eq!(detail.ipv4_gateway, "192.0.2.1");
        assert_eq!(detail.ipv4_dns2, "198.51.100.2");
        assert_eq!(detail.ipv6, vec!["2001:db8::10", "2001:db8::11"]);
        assert_eq!(detail.ipv6_prefix, "64");
        assert_eq!(detail.house, "tyo1");
        assert_eq!(detail.common_server_id, "CS-1234");
        assert_eq!(detail.started_on, NaiveDate::from_ymd_opt(2015, 2, 3));
        assert_eq!(detail.delete_on, None);
        assert_eq!(detail.serial_console_host, "console.example.jp");
        assert_eq!(detail.iso_upload_host, "upload.example.jp");
    }

    #[test]
    fn test_missing_hosts_is_parse_error() {
        let page = fixtures::CONSOLE.replace("接続先：upload.example.jp／ftp", "");
        let doc = Html::parse_document(&page);
        assert!(matches!(
            parse_vm_detail(&doc).unwrap_err(),
            PanelError::ResponseParse(_)
        ));
    }

    #[test]
    fn test_missing_start_date_is_parse_error() {
        let page = fixtures::CONSOLE.replace("利用開始日:2015/02/03", "");
        let doc = Html::parse_document(&page);
        assert!(parse_vm_detail(&doc).is_err());
    }

    #[test]
    fn test_stat_step_targets_console_page() {
        let session = SessionContext::new(Default::default()).unwrap();
        let step = stat_step(&session, "100001", Shared::new(VmDetail::default())).unwrap();
        let req = step.producer.produce(&FormValues::new()).unwrap();
        assert_eq!(req.url.path(), "/Service/VPS/Control/Console/100001");
    }
}
