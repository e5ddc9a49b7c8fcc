use super::{element_text, paths, selector, trim_cell};
use crate::engine::{ActionChain, FormValues, SessionContext, Shared, Step, StepRequest, StepResponse};
use crate::output::{self, OutputFormatter, TableBuilder};
use crate::{PanelError, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

static LIST_ROWS: Lazy<Selector> = Lazy::new(|| selector("#gridServiceList tr"));
static CELLS: Lazy<Selector> = Lazy::new(|| selector("td"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));

const LIST_DATE_FORMAT: &str = "%b/%d/%Y %H:%M";

/// Panel times are Japan Standard Time.
pub(crate) fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("JST offset in range")
}

/// Power state reported by the status endpoint. The numeric codes are the
/// panel's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerStatus {
    Running,
    Offline,
    InUse,
    InFormulation,
    NoInformation,
    Unknown,
}

impl ServerStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Running => 1,
            Self::Offline => 4,
            Self::InUse => 6,
            Self::InFormulation => 8,
            Self::NoInformation => 98,
            Self::Unknown => 99,
        }
    }

    pub fn from_status_name(name: &str) -> Self {
        match name {
            "Running" => Self::Running,
            "Offline" => Self::Offline,
            "In-use" => Self::InUse,
            "In-formulation" => Self::InFormulation,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "Running",
            Self::Offline => "Offline",
            Self::InUse => "No status",
            Self::InFormulation => "Preparing",
            Self::NoInformation => "-",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// One row of the VPS list. Service status (billing) and server status
/// (power) are unrelated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vm {
    pub id: String,
    /// Row id of the list grid; only used to address the delete checkbox.
    #[serde(skip)]
    pub tr_id: String,
    pub label: String,
    pub server_status: ServerStatus,
    pub service_status: String,
    pub service_id: String,
    pub plan: String,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub delete_date: Option<DateTime<FixedOffset>>,
    pub payment_span: String,
}

impl Vm {
    fn from_row(tr_id: String) -> Self {
        Self {
            id: String::new(),
            tr_id,
            label: String::new(),
            server_status: ServerStatus::NoInformation,
            service_status: String::new(),
            service_id: String::new(),
            plan: String::new(),
            created_at: None,
            delete_date: None,
            payment_span: String::new(),
        }
    }

    pub fn is_windows(&self) -> bool {
        self.plan.contains("Windows")
    }
}

fn parse_list_date(value: &str) -> Option<DateTime<FixedOffset>> {
    NaiveDateTime::parse_from_str(value, LIST_DATE_FORMAT)
        .ok()?
        .and_local_timezone(jst())
        .single()
}

pub fn parse_vm_list(document: &Html) -> Result<Vec<Vm>> {
    let mut vms = Vec::new();

    for row in document.select(&LIST_ROWS) {
        let cells: Vec<_> = row.select(&CELLS).collect();
        if cells.is_empty() {
            continue;
        }

        let tr_id = row
            .value()
            .attr("id")
            .ok_or_else(|| PanelError::ResponseParse("TrID not exists".into()))?;
        let mut vm = Vm::from_row(tr_id.to_string());

        for (i, cell) in cells.iter().enumerate() {
            let value = trim_cell(&element_text(*cell));
            match i {
                2 => {
                    vm.label = value;
                    // VMs still being created have no console link yet
                    vm.id = cell
                        .select(&LINK)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .and_then(|href| href.split('/').nth(2))
                        .unwrap_or_default()
                        .to_string();
                }
                3 => vm.service_status = value,
                4 => vm.service_id = value,
                5 => vm.plan = value,
                6 => vm.created_at = parse_list_date(&value),
                7 => vm.delete_date = parse_list_date(&value),
                8 => vm.payment_span = value,
                _ => {}
            }
        }

        vms.push(vm);
    }

    Ok(vms)
}

pub fn list_step(session: &SessionContext, vms: Shared<Vec<Vm>>) -> Result<Step> {
    let url = session.endpoint(paths::VPS_LIST)?;
    Ok(Step::document(
        move |_: &FormValues| -> Result<StepRequest> { Ok(StepRequest::get(url.clone())) },
        move |_: &StepResponse, doc: &Html| -> Result<()> {
            vms.set(parse_vm_list(doc)?);
            Ok(())
        },
    ))
}

/// `{"status_id": .., "status_name": .., "status_class": ..}`; only the name
/// is meaningful.
#[derive(Debug, Deserialize)]
struct VmStatusJson {
    #[serde(default)]
    status_name: String,
}

/// JSON status lookup. The VPS id arrives through the chain seed as `evid`,
/// so the producer reads it from the carried parameters.
pub fn status_step(session: &SessionContext, status: Shared<ServerStatus>) -> Result<Step> {
    let url = session.endpoint(paths::VPS_STATUS)?;
    Ok(Step::raw(
        move |carried: &FormValues| -> Result<StepRequest> {
            Ok(StepRequest::get(url.clone()).with_query(carried))
        },
        move |resp: &StepResponse| -> Result<()> {
            status.set(ServerStatus::Unknown);
            let body: VmStatusJson = resp.json()?;
            status.set(ServerStatus::from_status_name(&body.status_name));
            Ok(())
        },
    ))
}

pub async fn list_vms(session: &mut SessionContext, with_status: bool) -> Result<Vec<Vm>> {
    let vms = Shared::new(Vec::new());
    let mut chain = ActionChain::new();
    chain.add_step(list_step(session, vms.clone())?)?;
    chain.run(session).await?;

    let mut vms = vms.take();
    tracing::debug!("Found {} VPS", vms.len());

    if with_status {
        for vm in &mut vms {
            vm.server_status = vm_status(session, &vm.id).await?;
        }
    }

    Ok(vms)
}

pub async fn vm_status(session: &mut SessionContext, id: &str) -> Result<ServerStatus> {
    if id.is_empty() {
        return Ok(ServerStatus::Unknown);
    }

    let status = Shared::new(ServerStatus::Unknown);
    let mut seed = FormValues::new();
    seed.add("evid", id);

    let mut chain = ActionChain::new();
    chain.add_step(status_step(session, status.clone())?)?;
    chain.seed(seed);
    chain.run(session).await?;

    let status = status.get();
    tracing::debug!(id, %status, "VPS status");
    Ok(status)
}

pub async fn find_vm(session: &mut SessionContext, id: &str) -> Result<Vm> {
    list_vms(session, false)
        .await?
        .into_iter()
        .find(|vm| vm.id == id)
        .ok_or_else(|| PanelError::VpsNotFound { id: id.to_string() })
}

#[derive(Debug, Serialize)]
pub struct VmListResult {
    pub vms: Vec<Vm>,
    #[serde(skip)]
    pub id_only: bool,
}

impl OutputFormatter for VmListResult {
    fn format_text(&self) -> String {
        if self.id_only {
            return self
                .vms
                .iter()
                .map(|vm| vm.id.as_str())
                .collect::<Vec<_>>()
                .join("\n");
        }

        if self.vms.is_empty() {
            return output::text::info("No VPS found");
        }

        let mut table = TableBuilder::new().headers(
            ["VPS ID", "Label", "Plan", "Server Status", "Service Status", "CreatedAt"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
        );
        for vm in &self.vms {
            table = table.row(vec![
                vm.id.clone(),
                vm.label.clone(),
                vm.plan.clone(),
                vm.server_status.to_string(),
                vm.service_status.clone(),
                vm.created_at
                    .map(|t| t.format("%Y/%m/%d %H:%M JST").to_string())
                    .unwrap_or_default(),
            ]);
        }
        table.build().trim_end().to_string()
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(&self.vms, pretty)
    }
}

pub async fn handle_list(
    session: &mut SessionContext,
    with_status: bool,
    id_only: bool,
) -> Result<VmListResult> {
    let vms = list_vms(session, with_status).await?;
    Ok(VmListResult { vms, id_only })
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const VPS_LIST: &str = r#"<html><body><form>
<input type="hidden" name="__VIEWSTATE" value="list-state">
<input type="hidden" name="__EVENTVALIDATION" value="list-ev">
<table id="gridServiceList">
  <tr><th></th><th>Status</th><th>Label</th></tr>
  <tr id="row-0">
    <td><input type="checkbox"></td>
    <td>稼働中</td>
    <td>
      <a href="Control/Console/100001">web-01</a>
    </td>
    <td>Active</td>
    <td>S-0001</td>
    <td>Basic 1GB</td>
    <td>Feb/03/2015 10:20</td>
    <td>-</td>
    <td>Monthly</td>
  </tr>
  <tr id="row-1">
    <td><input type="checkbox"></td>
    <td></td>
    <td>pending</td>
    <td>Preparing</td>
    <td>S-0002</td>
    <td>Windows 2GB</td>
    <td></td>
    <td></td>
    <td>Monthly</td>
  </tr>
</table>
</form></body></html>"#;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_vm_list() {
        let doc = Html::parse_document(fixtures::VPS_LIST);
        let vms = parse_vm_list(&doc).unwrap();
        assert_eq!(vms.len(), 2);

        let web = &vms[0];
        assert_eq!(web.id, "100001");
        assert_eq!(web.tr_id, "row-0");
        assert_eq!(web.label, "web-01");
        assert_eq!(web.service_status, "Active");
        assert_eq!(web.service_id, "S-0001");
        assert_eq!(web.plan, "Basic 1GB");
        assert_eq!(web.payment_span, "Monthly");
        assert_eq!(web.server_status, ServerStatus::NoInformation);

        let created = web.created_at.unwrap();
        assert_eq!((created.year(), created.month(), created.day()), (2015, 2, 3));
        assert_eq!(created.hour(), 10);
        assert_eq!(created.offset().local_minus_utc(), 9 * 3600);
        assert!(web.delete_date.is_none());
    }

    #[test]
    fn test_vm_without_link_has_empty_id() {
        let doc = Html::parse_document(fixtures::VPS_LIST);
        let vms = parse_vm_list(&doc).unwrap();
        assert_eq!(vms[1].id, "");
        assert!(vms[1].is_windows());
        assert!(vms[1].created_at.is_none());
    }

    #[test]
    fn test_row_without_id_is_parse_error() {
        let doc = Html::parse_document(
            r#"<table id="gridServiceList"><tr><td>x</td></tr></table>"#,
        );
        assert!(matches!(
            parse_vm_list(&doc).unwrap_err(),
            PanelError::ResponseParse(_)
        ));
    }

    #[test]
    fn test_status_name_mapping() {
        assert_eq!(ServerStatus::from_status_name("Running"), ServerStatus::Running);
        assert_eq!(ServerStatus::from_status_name("Offline"), ServerStatus::Offline);
        assert_eq!(ServerStatus::from_status_name("In-use"), ServerStatus::InUse);
        assert_eq!(
            ServerStatus::from_status_name("In-formulation"),
            ServerStatus::InFormulation
        );
        assert_eq!(ServerStatus::from_status_name("Rebooting"), ServerStatus::Unknown);
        assert_eq!(ServerStatus::Offline.code(), 4);
        assert_eq!(ServerStatus::NoInformation.to_string(), "-");
    }

    #[test]
    fn test_status_step_queries_seeded_id() {
        let session = SessionContext::new(Default::default()).unwrap();
        let step = status_step(&session, Shared::new(ServerStatus::Unknown)).unwrap();
        let mut carried = FormValues::new();
        carried.add("evid", "100001");
        let req = step.producer.produce(&carried).unwrap();
        assert_eq!(
            req.url.as_str(),
            "https://cp.conoha.jp/Service/VPS/GetVMStatus.aspx?evid=100001"
        );
        assert!(!step.consumer().is_document());
    }

    #[tokio::test]
    async fn test_empty_id_is_unknown_without_request() {
        // unroutable base: any request would fail
        let options = crate::engine::SessionOptions::with_base_url(
            url::Url::parse("http://127.0.0.1:9/").unwrap(),
        );
        let mut session = SessionContext::new(options).unwrap();
        assert_eq!(vm_status(&mut session, "").await.unwrap(), ServerStatus::Unknown);
    }

    #[test]
    fn test_id_only_output() {
        let doc = Html::parse_document(fixtures::VPS_LIST);
        let result = VmListResult {
            vms: parse_vm_list(&doc).unwrap(),
            id_only: true,
        };
        assert_eq!(result.format_text(), "100001\n");
    }

    #[test]
    fn test_json_output_skips_row_id() {
        let doc = Html::parse_document(fixtures::VPS_LIST);
        let result = VmListResult {
            vms: parse_vm_list(&doc).unwrap(),
            id_only: false,
        };
        let json = result.format_json(false).unwrap();
        assert!(json.contains("\"id\":\"100001\""));
        assert!(!json.contains("tr_id"));
        assert!(json.contains("\"server_status\":\"no-information\""));
    }
}
